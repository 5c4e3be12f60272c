use super::{Literal, Result, SatError};
use std::fmt::Display;

/// The literal encodings used by the wrapped engines.
///
/// Each engine adapter declares the codec it uses; the session controller converts every literal through it before calling the engine.
/// Engine literals are exchanged as `i64` values, the adapters narrowing them to their native integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralCodec {
    /// CDCL-descended engines: `2 * (|l| - 1) + (l < 0 ? 1 : 0)`.
    ///
    /// Sorting codes orders literals by variable, then by polarity (positive first).
    Arithmetic,
    /// Engines taking signed integers natively: the literal is passed unchanged.
    Direct,
}

impl LiteralCodec {
    /// Converts a literal into its engine representation.
    pub fn encode(self, lit: Literal) -> i64 {
        let l = isize::from(lit) as i64;
        match self {
            LiteralCodec::Arithmetic => 2 * (l.abs() - 1) + i64::from(l < 0),
            LiteralCodec::Direct => l,
        }
    }

    /// Converts an engine literal back into a literal.
    ///
    /// Codes that cannot be produced by [`encode`](Self::encode) (negative arithmetic codes, direct `0`) are rejected.
    pub fn decode(self, code: i64) -> Result<Literal> {
        let l = match self {
            LiteralCodec::Arithmetic => {
                if code < 0 {
                    return Err(SatError::invalid_usage(format!(
                        "{} is not an arithmetic literal code",
                        code
                    )));
                }
                let id = code / 2 + 1;
                if code & 1 == 0 {
                    id
                } else {
                    -id
                }
            }
            LiteralCodec::Direct => code,
        };
        let l = isize::try_from(l)
            .map_err(|_| SatError::invalid_usage(format!("{} is out of the literal range", l)))?;
        Literal::try_new(l)
    }

    /// Returns the zero-based variable index of an engine literal.
    ///
    /// The codes rejected by [`decode`](Self::decode) are rejected here too.
    pub fn variable_index(self, code: i64) -> Result<usize> {
        self.decode(code).map(|l| l.var().index())
    }
}

impl Display for LiteralCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralCodec::Arithmetic => write!(f, "arithmetic"),
            LiteralCodec::Direct => write!(f, "direct"),
        }
    }
}

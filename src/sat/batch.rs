use super::{Literal, LiteralCodec, Result, SatError};

/// A sequence of literals converted by a [`LiteralCodec`], ready to be handed to an engine.
///
/// Clauses and assumptions of at most three literals are kept inline, avoiding a heap allocation for the most common cases.
/// All the variants behave the same way through [`as_slice`](Self::as_slice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralBatch {
    /// No literal (e.g. the empty clause).
    Empty,
    /// A single literal.
    One([i64; 1]),
    /// Two literals.
    Two([i64; 2]),
    /// Three literals.
    Three([i64; 3]),
    /// Any number of literals.
    Many(Vec<i64>),
}

impl LiteralBatch {
    /// Converts a sequence of literals.
    ///
    /// Each literal must refer to a variable in `[1, n_vars]`; an [`InvalidUsage`](SatError::InvalidUsage) error is returned otherwise.
    /// The order of the literals is preserved.
    pub fn build(codec: LiteralCodec, literals: &[Literal], n_vars: usize) -> Result<Self> {
        if let Some(l) = literals.iter().find(|l| usize::from(l.var()) > n_vars) {
            return Err(SatError::invalid_usage(format!(
                "literal {} refers to an unallocated variable (the engine has {} variable(s))",
                l, n_vars
            )));
        }
        let e = |i: usize| codec.encode(literals[i]);
        Ok(match literals.len() {
            0 => LiteralBatch::Empty,
            1 => LiteralBatch::One([e(0)]),
            2 => LiteralBatch::Two([e(0), e(1)]),
            3 => LiteralBatch::Three([e(0), e(1), e(2)]),
            _ => LiteralBatch::Many(literals.iter().map(|l| codec.encode(*l)).collect()),
        })
    }

    /// Sorts the engine literals by increasing code.
    ///
    /// For the arithmetic codec, this is the canonical variable-then-polarity order.
    pub fn sort(&mut self) {
        match self {
            LiteralBatch::Empty | LiteralBatch::One(_) => {}
            LiteralBatch::Two(a) => a.sort_unstable(),
            LiteralBatch::Three(a) => a.sort_unstable(),
            LiteralBatch::Many(v) => v.sort_unstable(),
        }
    }

    /// Returns the engine literals.
    pub fn as_slice(&self) -> &[i64] {
        match self {
            LiteralBatch::Empty => &[],
            LiteralBatch::One(a) => &a[..],
            LiteralBatch::Two(a) => &a[..],
            LiteralBatch::Three(a) => &a[..],
            LiteralBatch::Many(v) => v.as_slice(),
        }
    }

    /// Returns the number of literals.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns `true` iff the batch contains no literal.
    pub fn is_empty(&self) -> bool {
        matches!(self, LiteralBatch::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause;

    #[test]
    fn test_fast_paths() {
        let c = LiteralCodec::Direct;
        assert_eq!(LiteralBatch::Empty, LiteralBatch::build(c, &clause![], 3).unwrap());
        assert_eq!(LiteralBatch::One([-1]), LiteralBatch::build(c, &clause![-1], 3).unwrap());
        assert_eq!(
            LiteralBatch::Two([2, -1]),
            LiteralBatch::build(c, &clause![2, -1], 3).unwrap()
        );
        assert_eq!(
            LiteralBatch::Three([3, 2, 1]),
            LiteralBatch::build(c, &clause![3, 2, 1], 3).unwrap()
        );
        assert_eq!(
            LiteralBatch::Many(vec![1, 2, 3, -1]),
            LiteralBatch::build(c, &clause![1, 2, 3, -1], 3).unwrap()
        );
    }

    #[test]
    fn test_fast_paths_match_general_path() {
        let c = LiteralCodec::Arithmetic;
        for lits in [clause![], clause![1], clause![-2, 1], clause![3, -2, 1]] {
            let general = lits.iter().map(|l| c.encode(*l)).collect::<Vec<i64>>();
            let batch = LiteralBatch::build(c, &lits, 3).unwrap();
            assert_eq!(general.as_slice(), batch.as_slice());
            assert_eq!(lits.len(), batch.len());
        }
    }

    #[test]
    fn test_order_preserved() {
        let batch = LiteralBatch::build(LiteralCodec::Arithmetic, &clause![3, -1, 2, 1], 3).unwrap();
        assert_eq!(&[4, 1, 2, 0], batch.as_slice());
    }

    #[test]
    fn test_sort() {
        let mut batch =
            LiteralBatch::build(LiteralCodec::Arithmetic, &clause![3, -1, 2, 1], 3).unwrap();
        batch.sort();
        assert_eq!(&[0, 1, 2, 4], batch.as_slice());
        let mut batch = LiteralBatch::build(LiteralCodec::Arithmetic, &clause![2, -1], 3).unwrap();
        batch.sort();
        assert_eq!(&[1, 2], batch.as_slice());
    }

    #[test]
    fn test_unallocated_variable() {
        let err = LiteralBatch::build(LiteralCodec::Direct, &clause![1, -4], 3).unwrap_err();
        assert!(err.is_invalid_usage());
    }

    #[test]
    fn test_empty() {
        let batch = LiteralBatch::build(LiteralCodec::Direct, &[], 0).unwrap();
        assert!(batch.is_empty());
        assert_eq!(0, batch.len());
    }
}

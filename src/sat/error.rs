use thiserror::Error;

/// The result type of the operations provided by the SAT facade.
pub type Result<T> = std::result::Result<T, SatError>;

/// Errors returned by the SAT facade.
///
/// Search outcomes (satisfiable, unsatisfiable, unknown) are never errors;
/// they are reported through [`SolvingResult`](super::SolvingResult).
#[derive(Debug, Error)]
pub enum SatError {
    /// The caller broke the usage contract (destroyed handle, unallocated variable, wrong session state, ...).
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// The engine does not provide the requested operation.
    #[error(r#"engine "{engine}" does not support {operation}"#)]
    Unsupported {
        /// the name of the engine
        engine: &'static str,
        /// the name of the unsupported operation
        operation: &'static str,
    },

    /// The engine could not allocate its resources.
    #[error("resource exhaustion: {0}")]
    ResourceExhausted(String),

    /// The engine reported a failure unrelated to the search itself.
    #[error("engine failure: {0}")]
    Engine(String),

    /// An I/O error occurred while communicating with an engine or writing a file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SatError {
    pub(crate) fn invalid_usage<S: Into<String>>(msg: S) -> Self {
        SatError::InvalidUsage(msg.into())
    }

    pub(crate) fn unsupported(engine: &'static str, operation: &'static str) -> Self {
        SatError::Unsupported { engine, operation }
    }

    /// Returns `true` iff this error is an [`InvalidUsage`](SatError::InvalidUsage) error.
    pub fn is_invalid_usage(&self) -> bool {
        matches!(self, SatError::InvalidUsage(_))
    }

    /// Returns `true` iff this error is an [`Unsupported`](SatError::Unsupported) error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SatError::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unsupported() {
        let e = SatError::unsupported("varisat", "freeze");
        assert_eq!(r#"engine "varisat" does not support freeze"#, e.to_string());
        assert!(e.is_unsupported());
        assert!(!e.is_invalid_usage());
    }

    #[test]
    fn test_display_invalid_usage() {
        let e = SatError::invalid_usage("handle 3 was destroyed");
        assert_eq!("invalid usage: handle 3 was destroyed", e.to_string());
        assert!(e.is_invalid_usage());
    }

    #[test]
    fn test_io_into_anyhow() {
        let e: SatError = std::io::Error::new(std::io::ErrorKind::Other, "foo").into();
        let any: anyhow::Error = e.into();
        assert_eq!("foo", any.to_string());
    }
}

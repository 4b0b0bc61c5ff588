//! Error types for the Warden core crate.

use thiserror::Error;

/// Top-level error type for Warden core operations.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("password generation error: {0}")]
    Password(String),
}

/// A convenience Result alias that defaults to [`WardenError`].
pub type Result<T> = std::result::Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = WardenError::Config("missing field".into());
        assert_eq!(err.to_string(), "configuration error: missing field");
    }

    #[test]
    fn io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = WardenError::from(io_err);
        assert!(matches!(err, WardenError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn result_alias_works() {
        let ok: Result<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: Result<i32> = Err(WardenError::Config("bad".into()));
        assert!(err.is_err());
    }
}

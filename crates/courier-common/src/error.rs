//! Error types for Courier

use thiserror::Error;

/// Main error type for Courier
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Orchestration error: {0}")]
    Orchestration(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Courier
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config(_) => 500,
            Error::Database(_) => 500,
            Error::Validation(_) => 400,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::Transport(_) => 502,
            Error::Orchestration(_) => 500,
            Error::Ingestion(_) => 500,
            Error::Internal(_) => 500,
            Error::Other(_) => 500,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::Transport(_) => "TRANSPORT_ERROR",
            Error::Orchestration(_) => "ORCHESTRATION_ERROR",
            Error::Ingestion(_) => "INGESTION_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NotFound("campaign".into()).status_code(), 404);
        assert_eq!(Error::Conflict("already sent".into()).status_code(), 409);
        assert_eq!(Error::Validation("bad email".into()).status_code(), 400);
        assert_eq!(Error::Orchestration("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Database("x".into()).code(), "DATABASE_ERROR");
        assert_eq!(Error::Ingestion("x".into()).code(), "INGESTION_ERROR");
    }
}

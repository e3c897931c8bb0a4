//! Error types for the db module.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a connection or its provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// The connection could not be opened.
    #[error("connection failed: {0}")]
    Connect(String),

    /// A statement ran past the query timeout (including lock waits).
    #[error("statement timed out after {after:?}: {detail}")]
    Timeout { after: Duration, detail: String },

    /// A lock conflict the database refused without waiting.
    #[error("database busy: {0}")]
    Busy(String),

    /// The database rejected or failed the statement.
    #[error("SQL error: {0}")]
    Statement(String),
}

impl DbError {
    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = DbError::Timeout {
            after: Duration::from_secs(2),
            detail: "database is locked".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "statement timed out after 2s: database is locked"
        );
        assert!(err.is_timeout());
        assert!(!DbError::Statement("no such table: t".to_string()).is_timeout());

        let busy = DbError::Busy("database is locked".to_string());
        assert_eq!(busy.to_string(), "database busy: database is locked");
        assert!(!busy.is_timeout());
    }
}

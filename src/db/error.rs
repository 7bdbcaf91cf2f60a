//! Database error types
//!
//! Defines all errors that can occur in the persistence layer.

use thiserror::Error;

/// Errors that can occur while reading or writing the CMS database
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite reported an error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed (creating the database directory, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested row does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Operation would break a relationship (column still has articles, etc.)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input rejected before reaching SQLite
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl StorageError {
    /// Whether a UNIQUE constraint rejected the write
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

/// Result type alias for database operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::NotFound("article".to_string());
        assert_eq!(err.to_string(), "article not found");

        let err = StorageError::Conflict("column has articles".to_string());
        assert_eq!(err.to_string(), "Conflict: column has articles");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StorageError = io_err.into();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(!err.is_unique_violation());
    }
}

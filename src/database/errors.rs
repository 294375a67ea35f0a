//! # Database Errors
//!
//! Error types surfaced by `Database` operations.

use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database operation errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The storage engine could not be opened at the configured location
    #[error("Storage unavailable at {location}: {source}")]
    StorageUnavailable {
        location: String,
        #[source]
        source: StorageError,
    },

    /// A write transaction failed; nothing was applied
    #[error("Write failed: {0}")]
    WriteFailed(#[source] StorageError),

    /// A stored record cannot be decoded into its model
    #[error("Data corruption in {collection}:{key}: {reason}")]
    DataCorruption {
        collection: String,
        key: String,
        reason: String,
    },

    /// The storage engine failed while reading back
    #[error("Read failed: {0}")]
    ReadFailed(#[source] StorageError),

    /// The configuration names no usable location
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DatabaseError {
    pub fn data_corruption(
        collection: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DatabaseError::DataCorruption {
            collection: collection.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DatabaseError::StorageUnavailable { .. } => "BOOKSHELF_STORAGE_UNAVAILABLE",
            DatabaseError::WriteFailed(_) => "BOOKSHELF_WRITE_FAILED",
            DatabaseError::DataCorruption { .. } => "BOOKSHELF_DATA_CORRUPTION",
            DatabaseError::ReadFailed(_) => "BOOKSHELF_READ_FAILED",
            DatabaseError::Config(_) => "BOOKSHELF_CONFIG_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_corruption_message_names_record() {
        let err = DatabaseError::data_corruption("books", "abc", "rating 9 out of range");
        assert_eq!(err.code(), "BOOKSHELF_DATA_CORRUPTION");
        let msg = err.to_string();
        assert!(msg.contains("books:abc"));
        assert!(msg.contains("rating 9"));
    }

    #[test]
    fn test_unavailable_keeps_source() {
        let err = DatabaseError::StorageUnavailable {
            location: "memory:test".to_string(),
            source: StorageError::data_corruption("checksum mismatch"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("memory:test"));
    }
}

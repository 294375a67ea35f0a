//! Storage error types
//!
//! Error codes:
//! - BOOKSHELF_STORAGE_IO_ERROR: open, metadata or truncate failed
//! - BOOKSHELF_STORAGE_LOCKED: another handle already owns the data directory
//! - BOOKSHELF_STORAGE_WRITE_FAILED: a frame was not made durable
//! - BOOKSHELF_STORAGE_READ_FAILED: the log could not be read back
//! - BOOKSHELF_DATA_CORRUPTION: a committed frame is damaged (FATAL)

use std::fmt;
use std::io;

/// How far a storage failure reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The call failed; the log is intact
    Error,
    /// The log will not replay until it is repaired
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Directory, log file or lock file could not be set up, or a
    /// rollback truncate failed
    IoError,
    /// The lock file is held by another open database
    Locked,
    /// Frame rejected before writing, or append/fsync failed
    WriteFailed,
    /// Seek or read of the log failed
    ReadFailed,
    /// Bad checksum, malformed body or out-of-order sequence in a
    /// committed frame
    DataCorruption,
}

impl StorageErrorCode {
    /// Stable string form, as printed and logged
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::IoError => "BOOKSHELF_STORAGE_IO_ERROR",
            StorageErrorCode::Locked => "BOOKSHELF_STORAGE_LOCKED",
            StorageErrorCode::WriteFailed => "BOOKSHELF_STORAGE_WRITE_FAILED",
            StorageErrorCode::ReadFailed => "BOOKSHELF_STORAGE_READ_FAILED",
            StorageErrorCode::DataCorruption => "BOOKSHELF_DATA_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::DataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A failed log operation: what failed, where in the log, and the
/// underlying I/O error if there was one
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::IoError,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Append or fsync of a frame failed
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::WriteFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// A write refused before touching the log
    pub fn write_failed_no_source(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::WriteFailed,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::ReadFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::DataCorruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Corruption found at `offset` bytes into the log
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::DataCorruption,
            message: reason.into(),
            details: Some(format!("byte_offset: {}", offset)),
            source: None,
        }
    }

    /// Lock file already held; `holder` names the lock path
    pub fn locked(holder: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::Locked,
            message: format!("Data directory is in use by another database: {}", holder.into()),
            details: None,
            source: Some(source),
        }
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Extra context such as the byte offset of a damaged frame
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Whether the log itself is damaged
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

//! Observable events for bookshelf
//!
//! Events are explicit and typed; each carries its own severity.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Database open begins
    DatabaseOpen,
    /// Database open complete, ready for operations
    DatabaseReady,
    /// Database could not be opened
    DatabaseUnavailable,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Replay
    /// Commit-log replay begins
    ReplayBegin,
    /// Commit-log replay complete
    ReplayComplete,
    /// Interrupted trailing frame discarded
    ReplayTornTail,

    // Writes
    /// Write transaction begins
    WriteBegin,
    /// Write transaction committed
    WriteCommit,
    /// Write transaction failed, nothing applied
    WriteFailed,
    /// A failed frame could not be cut from the log
    WriteRollbackFailed,
    /// Delete of a key that does not exist
    DeleteMissing,
    /// Every record removed
    DeleteAll,

    // Reads
    /// Fetch request executed
    FetchExecuted,
    /// Stored record could not be decoded
    DataCorruption,

    // Maintenance
    /// Log compaction begins
    CompactBegin,
    /// Log compaction complete
    CompactComplete,

    // Seeding
    /// Seed skipped because records already exist
    SeedSkipped,
    /// Seed records inserted
    SeedInserted,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DatabaseOpen => "DATABASE_OPEN_BEGIN",
            Event::DatabaseReady => "DATABASE_READY",
            Event::DatabaseUnavailable => "DATABASE_UNAVAILABLE",

            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::ReplayBegin => "LOG_REPLAY_BEGIN",
            Event::ReplayComplete => "LOG_REPLAY_COMPLETE",
            Event::ReplayTornTail => "LOG_TORN_TAIL_DISCARDED",

            Event::WriteBegin => "WRITE_BEGIN",
            Event::WriteCommit => "WRITE_COMMIT",
            Event::WriteFailed => "WRITE_FAILED",
            Event::WriteRollbackFailed => "WRITE_ROLLBACK_FAILED",
            Event::DeleteMissing => "DELETE_MISSING_KEY",
            Event::DeleteAll => "DELETE_ALL",

            Event::FetchExecuted => "FETCH_COMPLETE",
            Event::DataCorruption => "DATA_CORRUPTION",

            Event::CompactBegin => "COMPACT_BEGIN",
            Event::CompactComplete => "COMPACT_COMPLETE",

            Event::SeedSkipped => "SEED_SKIPPED",
            Event::SeedInserted => "SEED_INSERTED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::WriteBegin
            | Event::WriteCommit
            | Event::DeleteMissing
            | Event::FetchExecuted => Severity::Trace,
            Event::ReplayTornTail | Event::DataCorruption => Severity::Warn,
            Event::WriteFailed | Event::DatabaseUnavailable => Severity::Error,
            Event::WriteRollbackFailed => Severity::Fatal,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

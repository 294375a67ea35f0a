//! Embedded storage engine for bookshelf
//!
//! Records live in an append-only commit log that is replayed into an
//! in-memory table on open.
//!
//! # Design Principles
//!
//! - One frame per transaction (all-or-nothing)
//! - Checksum-verified on replay
//! - Latest write wins for the same primary key
//! - An interrupted trailing frame is discarded, never half-applied
//! - Damage to a committed frame refuses the open

mod backend;
mod checksum;
mod errors;
mod reader;
mod record;
mod store;

pub use backend::{FileBackend, LogBackend, MemoryBackend, LOCK_FILE_NAME, LOG_FILE_NAME};
pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use reader::LogReader;
pub use record::{CommitRecord, RecordOp, MIN_FRAME_SIZE};
pub use store::{ReplayReport, Store, StoreOptions, Transaction};

//! bookshelf - typed model persistence over an embedded commit-log store
//!
//! Domain models are mapped to storage records and persisted through
//! small operation types:
//!
//! - `CreateOrUpdate`: upsert, last write wins
//! - `FetchRequest`: predicate filter, multi-key sort, transform
//! - `DeleteRequest`: remove by primary key
//!
//! The storage engine is an append-only, CRC32-checksummed commit log
//! replayed into an in-memory table on open.

pub mod cli;
pub mod config;
pub mod database;
pub mod model;
pub mod observability;
pub mod operation;
pub mod query;
pub mod storage;

pub use config::{ConfigError, DatabaseConfig, Location};
pub use database::{Database, DatabaseError, DatabaseResult};
pub use model::{books_from_records, Book, BookRecord, InvalidRating, Rating, StorageRecord};
pub use operation::{CreateOrUpdate, DeleteRequest, FetchRequest};
pub use query::{Filter, FilterOp, Predicate, SortDirection, SortKey};

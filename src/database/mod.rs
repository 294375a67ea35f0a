//! Database: executes operation types against the storage engine
//!
//! # Usage
//!
//! ```ignore
//! use bookshelf::{Book, Database, DatabaseConfig};
//!
//! let mut db = Database::open(&DatabaseConfig::on_disk("./data"))?;
//! db.create_or_update(&Book::big_little_lies(), &Book::create_or_update())?;
//! let books = db.fetch(&Book::all())?;
//! ```

mod db;
mod errors;

pub use db::Database;
pub use errors::{DatabaseError, DatabaseResult};

//! Models and their storage records
//!
//! A model is an immutable domain value. Each model has a storage record:
//! the engine-native shadow that is actually persisted, one collection per
//! record type, keyed by its primary key.
//!
//! ## Example
//!
//! ```ignore
//! use bookshelf::model::{Book, BookRecord, Rating};
//!
//! let book = Book::new("Big Little Lies", None, Rating::Outstanding);
//! let record = BookRecord::from(&book);
//! assert!(!record.id.is_empty());
//! ```

mod book;

use serde::{de::DeserializeOwned, Serialize};

pub use book::{books_from_records, Book, BookRecord, InvalidRating, Rating};

/// A type the storage engine can persist.
pub trait StorageRecord: Serialize + DeserializeOwned {
    /// Collection holding every record of this type
    const COLLECTION: &'static str;

    /// Unique key of this record within its collection
    fn primary_key(&self) -> &str;
}

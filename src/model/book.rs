//! The `Book` model, its rating scale and its storage record

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::StorageRecord;
use crate::database::{DatabaseError, DatabaseResult};
use crate::operation::{CreateOrUpdate, DeleteRequest, FetchRequest};
use crate::query::{Filter, Predicate, SortKey};

/// Five-point rating scale, stored as its integer value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rating {
    NotRecommended = 0,
    Mediocre = 1,
    Good = 2,
    VeryGood = 3,
    Outstanding = 4,
}

impl Rating {
    /// Integer value as stored
    pub fn value(self) -> i64 {
        self as i64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::NotRecommended => "not recommended",
            Rating::Mediocre => "mediocre",
            Rating::Good => "good",
            Rating::VeryGood => "very good",
            Rating::Outstanding => "outstanding",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored rating outside the scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rating {0} is outside the scale 0..=4")]
pub struct InvalidRating(pub i64);

impl TryFrom<i64> for Rating {
    type Error = InvalidRating;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rating::NotRecommended),
            1 => Ok(Rating::Mediocre),
            2 => Ok(Rating::Good),
            3 => Ok(Rating::VeryGood),
            4 => Ok(Rating::Outstanding),
            other => Err(InvalidRating(other)),
        }
    }
}

/// A book. Immutable once built.
///
/// An empty `id` means the book has not been persisted yet; a fresh
/// identity is assigned when it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub comment: Option<String>,
    pub rating: Rating,
}

impl Book {
    /// A book with no identity yet
    pub fn new(name: impl Into<String>, comment: Option<&str>, rating: Rating) -> Self {
        Self::with_id("", name, comment, rating)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        comment: Option<&str>,
        rating: Rating,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            comment: comment.map(str::to_string),
            rating,
        }
    }

    /// Every book, sorted by name
    pub fn all() -> FetchRequest<Vec<Book>, BookRecord> {
        FetchRequest::new(None, vec![SortKey::name()], books_from_records)
    }

    /// Books rated `minimum` or better, sorted by name
    pub fn rated_at_least(minimum: Rating) -> FetchRequest<Vec<Book>, BookRecord> {
        Self::all().with_filter(Filter::with(Predicate::gte("rating", minimum.value())))
    }

    /// Upsert through `BookRecord::from_book`
    pub fn create_or_update() -> CreateOrUpdate<Book, BookRecord> {
        CreateOrUpdate::new(BookRecord::from_book)
    }

    /// Delete the book stored under `id`
    pub fn delete(id: impl Into<String>) -> DeleteRequest<BookRecord> {
        DeleteRequest::new(id)
    }

    pub fn big_little_lies() -> Self {
        Self::new(
            "Big Little Lies",
            Some("Three mothers, one school trivia night and a death nobody saw coming."),
            Rating::Outstanding,
        )
    }

    pub fn south_and_west() -> Self {
        Self::new(
            "South and West",
            Some("Notebook fragments from a road trip through the Gulf states."),
            Rating::VeryGood,
        )
    }

    /// Placeholder entry
    pub fn fake() -> Self {
        Self::new(
            "Fake Book",
            Some("Placeholder entry."),
            Rating::NotRecommended,
        )
    }

    /// Books inserted into an empty database on first run
    pub fn seed_data() -> Vec<Book> {
        vec![Self::big_little_lies(), Self::south_and_west(), Self::fake()]
    }
}

/// Stored shadow of a `Book`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(default = "new_identity")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub rating: i64,
}

fn new_identity() -> String {
    Uuid::new_v4().to_string()
}

impl Default for BookRecord {
    fn default() -> Self {
        Self {
            id: new_identity(),
            name: String::new(),
            comment: None,
            rating: 0,
        }
    }
}

impl BookRecord {
    /// Builds the record for `book`, assigning an identity if it has none
    pub fn from_book(book: &Book) -> Self {
        let id = if book.id.is_empty() {
            new_identity()
        } else {
            book.id.clone()
        };
        Self {
            id,
            name: book.name.clone(),
            comment: book.comment.clone(),
            rating: book.rating.value(),
        }
    }
}

impl From<&Book> for BookRecord {
    fn from(book: &Book) -> Self {
        BookRecord::from_book(book)
    }
}

impl StorageRecord for BookRecord {
    const COLLECTION: &'static str = "books";

    fn primary_key(&self) -> &str {
        &self.id
    }
}

impl TryFrom<BookRecord> for Book {
    type Error = DatabaseError;

    fn try_from(record: BookRecord) -> DatabaseResult<Self> {
        let rating = Rating::try_from(record.rating).map_err(|e| {
            DatabaseError::data_corruption(BookRecord::COLLECTION, record.id.as_str(), e.to_string())
        })?;
        Ok(Book {
            id: record.id,
            name: record.name,
            comment: record.comment,
            rating,
        })
    }
}

/// Converts records in order; the first corrupt one fails the batch.
pub fn books_from_records(records: Vec<BookRecord>) -> DatabaseResult<Vec<Book>> {
    records.into_iter().map(Book::try_from).collect()
}

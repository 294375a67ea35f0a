//! Database Invariant Tests
//!
//! Tests for the behaviour every caller relies on:
//! - Upsert is idempotent and last write wins
//! - Unpersisted models receive a fresh identity
//! - Delete removes exactly one record; deleting an absent key is a no-op
//! - Fetch honours sort keys, directions and filters
//! - Mapping a model to its record and back is lossless
//! - delete_all leaves nothing behind, in every collection
//! - Collections never see each other's records

use bookshelf::query::{Filter, Predicate, SortKey};
use bookshelf::{
    Book, BookRecord, Database, DatabaseError, DeleteRequest, FetchRequest, Rating, StorageRecord,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Test Utilities
// =============================================================================

fn open_db() -> Database {
    Database::in_memory("com.bookshelf.tests").expect("Failed to open in-memory database")
}

fn insert(db: &mut Database, book: &Book) -> String {
    db.create_or_update(book, &Book::create_or_update())
        .expect("Failed to write book")
}

fn names(books: &[Book]) -> Vec<&str> {
    books.iter().map(|b| b.name.as_str()).collect()
}

/// A second record type, stored in its own collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AuthorRecord {
    id: String,
    name: String,
}

impl StorageRecord for AuthorRecord {
    const COLLECTION: &'static str = "authors";

    fn primary_key(&self) -> &str {
        &self.id
    }
}

fn insert_author(db: &mut Database, id: &str, name: &str) {
    let author = AuthorRecord {
        id: id.to_string(),
        name: name.to_string(),
    };
    db.create_or_update_with(&author, AuthorRecord::clone)
        .expect("Failed to write author");
}

fn all_authors() -> FetchRequest<Vec<AuthorRecord>, AuthorRecord> {
    FetchRequest::new(None, vec![SortKey::asc("name")], |records| Ok(records))
}

// =============================================================================
// Creation and Identity
// =============================================================================

/// A book created with an empty id is stored under a fresh, non-empty id.
#[test]
fn test_creation_assigns_identity() {
    let mut db = open_db();
    let book = Book::big_little_lies();

    insert(&mut db, &book);

    let results = db.fetch(&Book::all()).unwrap();
    assert_eq!(results.len(), 1, "results count");
    let stored = &results[0];
    assert!(!stored.id.is_empty(), "book id is empty");
    assert_eq!(stored.name, book.name);
    assert_eq!(stored.comment, book.comment);
    assert_eq!(stored.rating, book.rating);
}

/// Two unpersisted books never share an identity.
#[test]
fn test_identities_are_distinct() {
    let mut db = open_db();
    let first = insert(&mut db, &Book::fake());
    let second = insert(&mut db, &Book::fake());

    assert_ne!(first, second);
    assert_eq!(db.fetch(&Book::all()).unwrap().len(), 2);
}

// =============================================================================
// Upsert
// =============================================================================

/// Writing the same book twice leaves one record.
#[test]
fn test_upsert_idempotent() {
    let mut db = open_db();
    let book = Book::with_id("fixed", "South and West", None, Rating::VeryGood);

    insert(&mut db, &book);
    insert(&mut db, &book);

    let results = db.fetch(&Book::all()).unwrap();
    assert_eq!(results, vec![book]);
}

/// Updating a stored book replaces every field.
#[test]
fn test_update_overwrites_record() {
    let mut db = open_db();
    insert(&mut db, &Book::fake());
    let stored = db.fetch(&Book::all()).unwrap().remove(0);

    let modified = Book::with_id(
        stored.id.as_str(),
        "New Name",
        Some("Change the rating and the name of this book."),
        Rating::Mediocre,
    );
    insert(&mut db, &modified);

    let results = db.fetch(&Book::all()).unwrap();
    assert_eq!(results, vec![modified]);
}

/// Clearing an optional field through an update sticks: no field merge.
#[test]
fn test_update_does_not_merge_fields() {
    let mut db = open_db();
    let id = insert(&mut db, &Book::new("A", Some("comment"), Rating::Good));

    insert(&mut db, &Book::with_id(id.as_str(), "A", None, Rating::Good));

    let stored: BookRecord = db.get(&id).unwrap().unwrap();
    assert_eq!(stored.comment, None);
}

// =============================================================================
// Deletion
// =============================================================================

/// Of three books, delete removes the targeted one; the other two are
/// unchanged field by field.
#[test]
fn test_delete_removes_exactly_one() {
    let mut db = open_db();
    let first = Book::with_id("first", "Big Little Lies", Some("trivia"), Rating::Outstanding);
    let target = Book::with_id("target", "South and West", None, Rating::VeryGood);
    let third = Book::with_id("third", "Fake Book", Some("placeholder"), Rating::NotRecommended);
    for book in [&first, &target, &third] {
        insert(&mut db, book);
    }

    assert!(db.delete(&Book::delete("target")).unwrap());

    let natural = Book::all().sorted_by(Vec::new());
    let results = db.fetch(&natural).unwrap();
    assert_eq!(results.len(), 2);
    for (stored, expected) in results.iter().zip([&first, &third]) {
        assert_eq!(stored.id, expected.id);
        assert_eq!(stored.name, expected.name);
        assert_eq!(stored.comment, expected.comment);
        assert_eq!(stored.rating, expected.rating);
    }
    assert!(db.get::<BookRecord>("target").unwrap().is_none());
}

/// Deleting an absent key reports false and changes nothing.
#[test]
fn test_delete_absent_is_noop() {
    let mut db = open_db();
    insert(&mut db, &Book::fake());
    let before = db.fetch(&Book::all()).unwrap();

    assert!(!db.delete(&Book::delete("does-not-exist")).unwrap());

    assert_eq!(db.fetch(&Book::all()).unwrap(), before);
}

/// delete_all empties every collection, not just books.
#[test]
fn test_delete_all_empties_database() {
    let mut db = open_db();
    db.create_or_update_all(&Book::seed_data(), &Book::create_or_update())
        .unwrap();
    insert_author(&mut db, "a-1", "Liane Moriarty");
    insert_author(&mut db, "a-2", "Joan Didion");

    db.delete_all().unwrap();

    assert!(db.fetch(&Book::all()).unwrap().is_empty());
    assert!(db.fetch(&all_authors()).unwrap().is_empty());
    assert_eq!(db.count::<BookRecord>(), 0);
    assert_eq!(db.count::<AuthorRecord>(), 0);
}

/// Writes after delete_all start from an empty database.
#[test]
fn test_delete_all_then_write() {
    let mut db = open_db();
    insert_author(&mut db, "a-1", "Joan Didion");
    db.delete_all().unwrap();

    insert(&mut db, &Book::fake());

    assert_eq!(db.count::<BookRecord>(), 1);
    assert_eq!(db.count::<AuthorRecord>(), 0);
}

// =============================================================================
// Fetch Ordering and Filtering
// =============================================================================

/// The listing request returns books in ascending name order.
#[test]
fn test_fetch_sorted_by_name() {
    let mut db = open_db();
    for name in ["Zen", "Alpha", "Moby Dick"] {
        insert(&mut db, &Book::new(name, None, Rating::Good));
    }

    let results = db.fetch(&Book::all()).unwrap();
    assert_eq!(names(&results), vec!["Alpha", "Moby Dick", "Zen"]);
}

/// Multiple sort keys apply lexicographically, each with its direction.
#[test]
fn test_fetch_multi_key_sort() {
    let mut db = open_db();
    insert(&mut db, &Book::new("B", None, Rating::Good));
    insert(&mut db, &Book::new("A", None, Rating::Mediocre));
    insert(&mut db, &Book::new("C", None, Rating::Good));
    insert(&mut db, &Book::new("D", None, Rating::Outstanding));

    let request = Book::all().sorted_by(vec![SortKey::desc("rating"), SortKey::asc("name")]);
    let results = db.fetch(&request).unwrap();

    assert_eq!(names(&results), vec!["D", "B", "C", "A"]);
}

/// Without sort keys, books come back in first-insert order, and
/// an update does not move a book.
#[test]
fn test_fetch_natural_order_survives_update() {
    let mut db = open_db();
    let first = insert(&mut db, &Book::new("first", None, Rating::Good));
    insert(&mut db, &Book::new("second", None, Rating::Good));
    insert(&mut db, &Book::with_id(first.as_str(), "first, edited", None, Rating::Good));

    let natural = Book::all().sorted_by(Vec::new());
    let results = db.fetch(&natural).unwrap();
    assert_eq!(names(&results), vec!["first, edited", "second"]);
}

/// Filters restrict the result set before sorting.
#[test]
fn test_fetch_with_predicates() {
    let mut db = open_db();
    db.create_or_update_all(&Book::seed_data(), &Book::create_or_update())
        .unwrap();

    let good = db.fetch(&Book::rated_at_least(Rating::Good)).unwrap();
    assert_eq!(names(&good), vec!["Big Little Lies", "South and West"]);

    let placeholder = Book::all().with_filter(
        Filter::with(Predicate::eq("name", "Fake Book")).and(Predicate::lt("rating", 1)),
    );
    assert_eq!(names(&db.fetch(&placeholder).unwrap()), vec!["Fake Book"]);

    let none = Book::all().with_filter(Filter::with(Predicate::gt("rating", 4)));
    assert!(db.fetch(&none).unwrap().is_empty());
}

/// A fetch may produce any model, not just a list of books.
#[test]
fn test_fetch_custom_transform() {
    let mut db = open_db();
    db.create_or_update_all(&Book::seed_data(), &Book::create_or_update())
        .unwrap();

    let total_rating: FetchRequest<i64, BookRecord> =
        FetchRequest::new(None, Vec::new(), |records: Vec<BookRecord>| {
            Ok(records.iter().map(|r| r.rating).sum())
        });
    assert_eq!(db.fetch(&total_rating).unwrap(), 4 + 3);
}

// =============================================================================
// Mapping
// =============================================================================

/// Book → record → book is the identity for a persisted book.
#[test]
fn test_mapping_round_trip_through_database() {
    let mut db = open_db();
    let book = Book::with_id("round-trip", "South and West", Some("notes"), Rating::VeryGood);
    insert(&mut db, &book);

    let stored: BookRecord = db.get("round-trip").unwrap().unwrap();
    assert_eq!(Book::try_from(stored).unwrap(), book);
}

/// A stored rating outside the scale fails the fetch; it never panics.
#[test]
fn test_out_of_range_rating_is_data_corruption() {
    let mut db = open_db();
    insert(&mut db, &Book::fake());
    db.create_or_update_with(&9i64, |rating: &i64| BookRecord {
        id: "corrupt".to_string(),
        name: "Corrupt".to_string(),
        comment: None,
        rating: *rating,
    })
    .unwrap();

    match db.fetch(&Book::all()) {
        Err(DatabaseError::DataCorruption {
            collection,
            key,
            reason,
        }) => {
            assert_eq!(collection, "books");
            assert_eq!(key, "corrupt");
            assert!(reason.contains('9'), "reason should name the value: {}", reason);
        }
        other => panic!("expected DataCorruption, got {:?}", other),
    }
}

// =============================================================================
// Isolation
// =============================================================================

/// The same key in two collections names two separate records.
#[test]
fn test_collections_are_isolated() {
    let mut db = open_db();
    let book = Book::with_id("shared", "Slouching Towards Bethlehem", None, Rating::Good);
    insert(&mut db, &book);
    insert_author(&mut db, "shared", "Joan Didion");
    insert_author(&mut db, "other", "Liane Moriarty");

    assert_eq!(db.count::<BookRecord>(), 1);
    assert_eq!(db.count::<AuthorRecord>(), 2);
    assert_eq!(db.fetch(&Book::all()).unwrap(), vec![book]);

    assert!(db.delete(&Book::delete("shared")).unwrap());

    assert_eq!(db.count::<BookRecord>(), 0);
    let authors = db.fetch(&all_authors()).unwrap();
    assert_eq!(authors.len(), 2);
    assert_eq!(authors[0].name, "Joan Didion");
    assert_eq!(authors[0].id, "shared");

    assert!(db.delete(&DeleteRequest::<AuthorRecord>::new("other")).unwrap());
    assert!(!db.delete(&DeleteRequest::<AuthorRecord>::new("other")).unwrap());
    assert_eq!(db.count::<AuthorRecord>(), 1);
}

/// Two in-memory databases with the same label do not share data.
#[test]
fn test_in_memory_databases_are_independent() {
    let mut first = open_db();
    let second = open_db();

    insert(&mut first, &Book::fake());

    assert_eq!(first.count::<BookRecord>(), 1);
    assert_eq!(second.count::<BookRecord>(), 0);
}

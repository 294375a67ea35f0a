//! Operation types
//!
//! One type per operation kind, each carrying exactly what its database
//! method needs:
//!
//! - `CreateOrUpdate`: model → record conversion for an upsert
//! - `FetchRequest`: filter, sort keys and records → model conversion
//! - `DeleteRequest`: primary key of the record to remove
//!
//! `M` is the model type a caller works with, `R` the stored record type.

use std::fmt;
use std::marker::PhantomData;

use crate::database::DatabaseResult;
use crate::model::StorageRecord;
use crate::query::{Filter, SortKey};

type ReverseTransform<M, R> = Box<dyn Fn(&M) -> R + Send + Sync>;
type Transform<M, R> = Box<dyn Fn(Vec<R>) -> DatabaseResult<M> + Send + Sync>;

/// Upsert of one model
pub struct CreateOrUpdate<M, R> {
    reverse_transform: ReverseTransform<M, R>,
}

impl<M, R: StorageRecord> CreateOrUpdate<M, R> {
    pub fn new<F>(reverse_transform: F) -> Self
    where
        F: Fn(&M) -> R + Send + Sync + 'static,
    {
        Self {
            reverse_transform: Box::new(reverse_transform),
        }
    }

    /// Builds the record to store for `model`
    pub fn to_record(&self, model: &M) -> R {
        (self.reverse_transform)(model)
    }
}

impl<M, R> fmt::Debug for CreateOrUpdate<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateOrUpdate").finish_non_exhaustive()
    }
}

/// Read of every matching record of `R`, converted into `M`
pub struct FetchRequest<M, R> {
    filter: Option<Filter>,
    sort_keys: Vec<SortKey>,
    transform: Transform<M, R>,
}

impl<M, R: StorageRecord> FetchRequest<M, R> {
    /// `filter: None` matches every record. Empty `sort_keys` keeps
    /// natural (first-insert) order.
    pub fn new<F>(filter: Option<Filter>, sort_keys: Vec<SortKey>, transform: F) -> Self
    where
        F: Fn(Vec<R>) -> DatabaseResult<M> + Send + Sync + 'static,
    {
        Self {
            filter,
            sort_keys,
            transform: Box::new(transform),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sorted_by(mut self, sort_keys: Vec<SortKey>) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    /// Active filter; empty filters count as none
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref().filter(|f| !f.is_empty())
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort_keys
    }

    /// Converts fetched records into the result model
    pub fn transform(&self, records: Vec<R>) -> DatabaseResult<M> {
        (self.transform)(records)
    }
}

impl<M, R> fmt::Debug for FetchRequest<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("filter", &self.filter)
            .field("sort_keys", &self.sort_keys)
            .finish_non_exhaustive()
    }
}

/// Removal of one record of `R` by primary key
pub struct DeleteRequest<R> {
    primary_key: String,
    record: PhantomData<fn() -> R>,
}

impl<R: StorageRecord> DeleteRequest<R> {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            record: PhantomData,
        }
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}

impl<R> Clone for DeleteRequest<R> {
    fn clone(&self) -> Self {
        Self {
            primary_key: self.primary_key.clone(),
            record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for DeleteRequest<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteRequest")
            .field("collection", &std::any::type_name::<R>())
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Book, BookRecord, Rating};
    use crate::query::Predicate;

    #[test]
    fn test_create_or_update_builds_record() {
        let op = Book::create_or_update();
        let record = op.to_record(&Book::with_id("k", "Name", None, Rating::Good));
        assert_eq!(record.id, "k");
        assert_eq!(record.rating, 2);
    }

    #[test]
    fn test_fetch_request_builders() {
        let request: FetchRequest<usize, BookRecord> =
            FetchRequest::new(None, Vec::new(), |records| Ok(records.len()))
                .with_filter(Filter::with(Predicate::eq("name", "A")))
                .sorted_by(vec![SortKey::desc("rating")]);

        assert_eq!(request.sort_keys(), &[SortKey::desc("rating")][..]);
        assert_eq!(request.filter().map(|f| f.predicates.len()), Some(1));
        assert_eq!(request.transform(Vec::new()).unwrap(), 0);
    }

    #[test]
    fn test_empty_filter_is_no_filter() {
        let request = Book::all().with_filter(Filter::new());
        assert!(request.filter().is_none());
    }

    #[test]
    fn test_delete_request_carries_key() {
        let request = Book::delete("abc");
        assert_eq!(request.primary_key(), "abc");
        assert_eq!(request.clone().primary_key(), "abc");
        assert!(format!("{:?}", request).contains("abc"));
    }
}

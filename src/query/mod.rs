//! Fetch-time querying over stored records
//!
//! Filtering and ordering work on the JSON shape of a record, so the
//! same machinery serves every record type.

mod ast;
mod filters;
mod sorter;

pub use ast::{Filter, FilterOp, Predicate, SortDirection, SortKey};
pub use filters::PredicateFilter;
pub use sorter::RecordSorter;

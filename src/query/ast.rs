//! Fetch-request building blocks: predicates and sort keys
//!
//! Both address record fields by name, against the JSON shape of the
//! stored record.

use serde_json::Value;

/// Filter operators
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Exact equality (no coercion)
    Eq(Value),
    /// Present, non-null and not equal
    Ne(Value),
    /// Greater than or equal
    Gte(Value),
    /// Greater than
    Gt(Value),
    /// Less than or equal
    Lte(Value),
    /// Less than
    Lt(Value),
    /// Field missing or null
    IsNull,
    /// Field present and not null
    IsNotNull,
}

/// A single field predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: FilterOp,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq(value.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Ne(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt(value.into()))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::IsNull)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::IsNotNull)
    }
}

/// Conjunction of predicates. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with a single predicate
    pub fn with(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
        }
    }

    /// Adds another predicate that must also hold
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl From<Predicate> for Filter {
    fn from(predicate: Predicate) -> Self {
        Filter::with(predicate)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One sort key: a field and a direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Ascending by `name`, the default listing order
    pub fn name() -> Self {
        Self::asc("name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_name_is_ascending() {
        let key = SortKey::name();
        assert_eq!(key.field, "name");
        assert_eq!(key.direction, SortDirection::Asc);
        assert_eq!(SortKey::desc("rating").direction.as_str(), "desc");
    }

    #[test]
    fn test_filter_builds_conjunction() {
        let filter =
            Filter::with(Predicate::gte("rating", 2)).and(Predicate::is_not_null("comment"));
        assert_eq!(filter.predicates.len(), 2);
        assert!(Filter::new().is_empty());
        assert_eq!(Filter::from(Predicate::eq("name", "A")).predicates.len(), 1);
    }
}

//! Predicate filtering over stored records
//!
//! No type coercion: numbers compare with numbers, strings with strings.
//! A missing or null field only satisfies `IsNull`.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{Filter, FilterOp, Predicate};

/// Evaluates filters against record bodies
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a record matches every predicate of the filter
    pub fn matches(record: &Value, filter: &Filter) -> bool {
        filter
            .predicates
            .iter()
            .all(|pred| Self::matches_predicate(record, pred))
    }

    fn matches_predicate(record: &Value, predicate: &Predicate) -> bool {
        let field_value = record.get(&predicate.field).filter(|v| !v.is_null());

        let actual = match (field_value, &predicate.op) {
            (None, FilterOp::IsNull) => return true,
            (None, _) => return false,
            (Some(_), FilterOp::IsNull) => return false,
            (Some(_), FilterOp::IsNotNull) => return true,
            (Some(v), _) => v,
        };

        match &predicate.op {
            FilterOp::Eq(expected) => actual == expected,
            FilterOp::Ne(expected) => actual != expected,
            FilterOp::Gte(bound) => Self::ordered(actual, bound).map_or(false, Ordering::is_ge),
            FilterOp::Gt(bound) => Self::ordered(actual, bound).map_or(false, Ordering::is_gt),
            FilterOp::Lte(bound) => Self::ordered(actual, bound).map_or(false, Ordering::is_le),
            FilterOp::Lt(bound) => Self::ordered(actual, bound).map_or(false, Ordering::is_lt),
            FilterOp::IsNull | FilterOp::IsNotNull => false,
        }
    }

    /// Ordering between two values of the same comparable kind
    fn ordered(actual: &Value, bound: &Value) -> Option<Ordering> {
        match (actual, bound) {
            (Value::Number(a), Value::Number(b)) => {
                if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                    return Some(ai.cmp(&bi));
                }
                match (a.as_f64(), b.as_f64()) {
                    (Some(af), Some(bf)) => af.partial_cmp(&bf),
                    _ => None,
                }
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

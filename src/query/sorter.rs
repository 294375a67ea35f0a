//! Multi-key record sorting
//!
//! Sort is stable and deterministic: earlier keys take precedence, ties
//! fall through to later keys, full ties keep the input (natural) order.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{SortDirection, SortKey};

/// Sorts records by their field values
pub struct RecordSorter;

impl RecordSorter {
    /// Sorts `items` by `keys`, reading each item's JSON body through `body`.
    ///
    /// An empty key list leaves the order untouched.
    pub fn sort<T, F>(items: &mut [T], keys: &[SortKey], body: F)
    where
        F: Fn(&T) -> &Value,
    {
        if keys.is_empty() {
            return;
        }

        items.sort_by(|a, b| {
            let (a, b) = (body(a), body(b));
            keys.iter()
                .map(|key| {
                    let ordering = Self::compare_values(a.get(&key.field), b.get(&key.field));
                    match key.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Compares two JSON values for sorting.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string
    /// - For same types, natural ordering
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let type_order = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                let a_type = type_order(a_val);
                let b_type = type_order(b_val);
                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                    (Value::Number(x), Value::Number(y)) => {
                        if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                            return xi.cmp(&yi);
                        }
                        let xf = x.as_f64().unwrap_or(0.0);
                        let yf = y.as_f64().unwrap_or(0.0);
                        xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    _ => Ordering::Equal,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(entries: &[(&str, i64)]) -> Vec<Value> {
        entries
            .iter()
            .map(|(name, rating)| json!({"name": name, "rating": rating}))
            .collect()
    }

    fn names(rows: &[Value]) -> Vec<&str> {
        rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_sort_ascending_by_name() {
        let mut items = rows(&[("B", 1), ("A", 2), ("C", 0)]);
        RecordSorter::sort(&mut items, &[SortKey::name()], |v| v);
        assert_eq!(names(&items), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_sort_descending() {
        let mut items = rows(&[("B", 1), ("A", 2), ("C", 0)]);
        RecordSorter::sort(&mut items, &[SortKey::desc("rating")], |v| v);
        assert_eq!(names(&items), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_sort_stable() {
        let mut items = rows(&[("x", 2), ("y", 2), ("z", 2)]);
        RecordSorter::sort(&mut items, &[SortKey::asc("rating")], |v| v);
        assert_eq!(names(&items), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_secondary_key_breaks_ties() {
        let mut items = rows(&[("b", 3), ("a", 1), ("c", 3), ("a", 4)]);
        RecordSorter::sort(
            &mut items,
            &[SortKey::asc("name"), SortKey::desc("rating")],
            |v| v,
        );
        let ratings: Vec<_> = items.iter().map(|r| r["rating"].as_i64().unwrap()).collect();
        assert_eq!(names(&items), vec!["a", "a", "b", "c"]);
        assert_eq!(ratings, vec![4, 1, 3, 3]);
    }

    #[test]
    fn test_empty_keys_keep_order() {
        let mut items = rows(&[("C", 0), ("A", 0), ("B", 0)]);
        RecordSorter::sort(&mut items, &[], |v| v);
        assert_eq!(names(&items), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_missing_and_null_sort_first() {
        let mut items = vec![
            json!({"name": "with", "comment": "text"}),
            json!({"name": "null", "comment": null}),
            json!({"name": "missing"}),
        ];
        RecordSorter::sort(&mut items, &[SortKey::asc("comment")], |v| v);
        assert_eq!(names(&items), vec!["missing", "null", "with"]);
    }
}

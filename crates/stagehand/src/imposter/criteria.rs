//! Subset matching for interaction criteria.
//!
//! Unlike a deep-equality check, criteria matching only constrains the fields
//! the criteria document names: a recorded request matches when every named
//! field is present with an equal value. Objects recurse, everything else
//! compares with plain equality, and extra request fields never fail a match.

use serde_json::Value;

/// True when `actual` contains `criteria` as a subset.
pub fn matches_criteria(criteria: &Value, actual: &Value) -> bool {
    match (criteria, actual) {
        (Value::Object(expected), Value::Object(fields)) => {
            expected.iter().all(|(key, value)| {
                fields
                    .get(key)
                    .is_some_and(|actual| matches_criteria(value, actual))
            })
        }
        _ => criteria == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_criteria_matches_anything() {
        assert!(matches_criteria(&json!({}), &json!({"method": "GET"})));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let actual = json!({"method": "GET", "path": "/users", "timestamp": "now"});
        assert!(matches_criteria(&json!({"method": "GET"}), &actual));
    }

    #[test]
    fn nested_objects_recurse() {
        let actual = json!({
            "path": "/users",
            "query": {"page": "2", "limit": "10"}
        });
        assert!(matches_criteria(&json!({"query": {"page": "2"}}), &actual));
        assert!(!matches_criteria(&json!({"query": {"page": "3"}}), &actual));
    }

    #[test]
    fn missing_field_fails() {
        assert!(!matches_criteria(
            &json!({"body": "x"}),
            &json!({"method": "GET"})
        ));
    }

    #[test]
    fn leaves_compare_by_equality() {
        assert!(matches_criteria(&json!("GET"), &json!("GET")));
        assert!(!matches_criteria(&json!("GET"), &json!("POST")));
        assert!(!matches_criteria(&json!(["a"]), &json!(["a", "b"])));
    }
}

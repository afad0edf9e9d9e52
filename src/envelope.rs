//! Unwrapping of the `{"data": {"records": [...]}}` envelope used by every
//! upstream endpoint.

use serde_json::Value;

/// Returns the record list only for the exact envelope shape.
/// None means "unexpected shape"; `Some(&[])` means "no records".
pub fn extract_records(raw: &Value) -> Option<&Vec<Value>> {
    raw.get("data")?.get("records")?.as_array()
}

/// Lenient variant: any other shape yields an empty list.
pub fn records_or_empty(raw: &Value) -> Vec<Value> {
    extract_records(raw).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_shape_returns_records_in_order() {
        let raw = json!({"data": {"records": [{"a": 1}, {"a": 2}, {"a": 3}]}});
        let records = extract_records(&raw).expect("envelope matches");
        assert_eq!(records, &vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})]);
        assert_eq!(records_or_empty(&raw).len(), 3);
    }

    #[test]
    fn empty_record_list_is_distinct_from_bad_shape() {
        let raw = json!({"data": {"records": []}});
        assert_eq!(extract_records(&raw).map(|r| r.len()), Some(0));
    }

    #[test]
    fn other_shapes_yield_nothing() {
        for raw in [
            json!(null),
            json!([]),
            json!({"records": [1]}),
            json!({"data": [1, 2]}),
            json!({"data": {"records": {"a": 1}}}),
            json!({"data": {"items": [1]}}),
        ] {
            assert!(extract_records(&raw).is_none(), "{raw}");
            assert!(records_or_empty(&raw).is_empty(), "{raw}");
        }
    }
}

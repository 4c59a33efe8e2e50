//! Deterministic cache keys for place lookups.
//!
//! Keys are built from the operation name and a canonical JSON rendering of
//! the request's semantic parameters — never from raw request objects, so
//! incidental fields cannot leak into the key. Canonicalization sorts object
//! keys recursively and strips nulls, so logically identical requests hash to
//! the same key regardless of struct field order or `None` representation.

use serde_json::Value;

/// Namespace prefix shared by every cache key; enables pattern invalidation.
pub(crate) const KEY_NAMESPACE: &str = "places";

/// Build the cache key for `operation` over canonicalized `params`.
pub(crate) fn cache_key(operation: &str, params: &Value) -> String {
    format!("{KEY_NAMESPACE}:{operation}:{}", canonicalize(params.clone()))
}

/// Recursively sort object keys and drop null members.
///
/// Plain JSON stringification is insertion-order-sensitive, which would let
/// two logically equal parameter sets diverge into distinct keys. Sorting
/// here guarantees determinism; dropping nulls makes an explicit `null` and
/// an omitted field equivalent.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(String, Value)> = map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            members.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(members.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_params_produce_identical_keys() {
        let a = json!({"query": "coffee", "maxResults": 5});
        let b = json!({"maxResults": 5, "query": "coffee"});
        assert_eq!(cache_key("search", &a), cache_key("search", &b));
    }

    #[test]
    fn nested_objects_are_canonicalized() {
        let a = json!({
            "query": "coffee",
            "locationBias": {"latitude": 1.0, "longitude": 2.0, "radius": 500.0}
        });
        let b = json!({
            "locationBias": {"radius": 500.0, "longitude": 2.0, "latitude": 1.0},
            "query": "coffee"
        });
        assert_eq!(cache_key("search", &a), cache_key("search", &b));
    }

    #[test]
    fn null_and_omitted_fields_are_equivalent() {
        let explicit = json!({"query": "coffee", "locationBias": null});
        let omitted = json!({"query": "coffee"});
        assert_eq!(cache_key("search", &explicit), cache_key("search", &omitted));
    }

    #[test]
    fn different_operations_never_collide() {
        let params = json!({"placeId": "abc"});
        assert_ne!(cache_key("details", &params), cache_key("photos", &params));
    }

    #[test]
    fn key_carries_namespace_prefix() {
        let key = cache_key("search", &json!({"query": "tea"}));
        assert!(key.starts_with("places:search:"));
    }

    #[test]
    fn array_element_order_is_preserved() {
        // Arrays are positional; only object key order is canonicalized.
        let a = json!({"fields": ["id", "rating"]});
        let b = json!({"fields": ["rating", "id"]});
        assert_ne!(cache_key("details", &a), cache_key("details", &b));
    }
}

pub type AnyValue = serde_json::Value;

/// Request or call parameters.
///
/// Insertion order is significant: it drives the response cache key and the
/// serialized query string / form body of dependency calls.
pub type ParamMap = indexmap::IndexMap<String, serde_json::Value>;

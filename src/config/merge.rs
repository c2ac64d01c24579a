//! Field-by-field merging of configuration tiers.
//!
//! Tiers are parsed into `serde_json::Value` trees and folded together, so a
//! higher tier only needs to mention the keys it changes.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// Maps merge key by key. Any other value in the overlay replaces the base,
/// except `null`, which means "not specified" and keeps the base.
///
/// ```
/// use ops_dashboard::config::deep_merge;
/// use serde_json::json;
///
/// let base = json!({"server": {"port": 5000, "bind": "127.0.0.1"}});
/// let overlay = json!({"server": {"port": 8080}});
/// assert_eq!(
///     deep_merge(base, overlay),
///     json!({"server": {"port": 8080, "bind": "127.0.0.1"}})
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold tiers lowest-priority first.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}

//! Shallow merge of top-level JSON keys.

use serde_json::{Map, Value};

/// Merge `overlay` into `base`, one level deep.
///
/// Every top-level key of `overlay` replaces (or is added to) the same key in
/// `base`; keys present only in `base` are kept. Nested objects under a shared
/// key are replaced wholesale, never merged. Existing keys keep their position
/// and new keys are appended in `overlay` order.
pub fn shallow_merge(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in overlay {
        base.insert(key, value);
    }
    base
}

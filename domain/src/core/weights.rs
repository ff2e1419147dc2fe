//! Domain weight lookup results

use std::collections::HashMap;

/// Weights keyed by participant id (decisions) or capability tag (scheduling)
pub type WeightMap = HashMap<String, f64>;

/// Look up `key`, falling back to `default` when the table has no entry
pub fn weight_or(weights: &WeightMap, key: &str, default: f64) -> f64 {
    weights.get(key).copied().unwrap_or(default)
}

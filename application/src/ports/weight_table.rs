//! Domain weight table port

use consilium_domain::{DecisionCategory, ResourceCategory, WeightMap};

/// Lookup key for [`DomainWeightTable::weights_for`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WeightKey {
    /// Participant id → weight
    Decision(DecisionCategory),
    /// Capability tag → weight
    Resource(ResourceCategory),
}

impl std::fmt::Display for WeightKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightKey::Decision(category) => write!(f, "decision:{}", category),
            WeightKey::Resource(category) => write!(f, "resource:{}", category),
        }
    }
}

/// Read-only weight lookup
pub trait DomainWeightTable: Send + Sync {
    /// Weights for `key`; an empty map when the table has none
    fn weights_for(&self, key: &WeightKey) -> WeightMap;
}

/// Table without entries; every weight falls back to its default
pub struct NoWeights;

impl DomainWeightTable for NoWeights {
    fn weights_for(&self, _key: &WeightKey) -> WeightMap {
        WeightMap::new()
    }
}

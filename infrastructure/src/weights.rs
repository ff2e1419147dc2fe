//! Static domain weight table
//!
//! Built-in participant weights per decision category, optionally
//! overridden per category from configuration, plus capability tag weights
//! per resource category.

use consilium_application::{DomainWeightTable, WeightKey};
use consilium_domain::{DecisionCategory, ResourceCategory, WeightMap};
use std::collections::HashMap;

/// Built-in participant weights for the four core decision categories
fn builtin_weights(category: DecisionCategory) -> &'static [(&'static str, f64)] {
    match category {
        DecisionCategory::HealthAssessment => {
            &[("xiaoai", 0.4), ("xiaoke", 0.3), ("laoke", 0.2), ("soer", 0.1)]
        }
        DecisionCategory::DiagnosisAnalysis => {
            &[("xiaoke", 0.4), ("laoke", 0.3), ("xiaoai", 0.2), ("soer", 0.1)]
        }
        DecisionCategory::TreatmentPlanning => {
            &[("laoke", 0.4), ("xiaoke", 0.3), ("soer", 0.2), ("xiaoai", 0.1)]
        }
        DecisionCategory::LifestyleGuidance => {
            &[("soer", 0.4), ("laoke", 0.3), ("xiaoai", 0.2), ("xiaoke", 0.1)]
        }
        _ => &[],
    }
}

/// In-memory weight table
///
/// A configured decision table replaces the built-in one for its category
/// entirely. Categories without any table yield an empty map, so every
/// participant gets the default weight.
#[derive(Debug, Clone, Default)]
pub struct StaticWeightTable {
    decision: HashMap<DecisionCategory, WeightMap>,
    resource: HashMap<ResourceCategory, WeightMap>,
}

impl StaticWeightTable {
    /// Table holding only the built-in decision weights
    pub fn with_defaults() -> Self {
        let decision = DecisionCategory::ALL
            .iter()
            .filter(|c| !builtin_weights(**c).is_empty())
            .map(|c| {
                let table = builtin_weights(*c)
                    .iter()
                    .map(|(participant, weight)| (participant.to_string(), *weight))
                    .collect();
                (*c, table)
            })
            .collect();
        Self {
            decision,
            resource: HashMap::new(),
        }
    }

    pub fn with_decision_overrides(mut self, overrides: HashMap<DecisionCategory, WeightMap>) -> Self {
        self.decision.extend(overrides);
        self
    }

    pub fn with_resource_weights(mut self, weights: HashMap<ResourceCategory, WeightMap>) -> Self {
        self.resource.extend(weights);
        self
    }
}

impl DomainWeightTable for StaticWeightTable {
    fn weights_for(&self, key: &WeightKey) -> WeightMap {
        let table = match key {
            WeightKey::Decision(category) => self.decision.get(category),
            WeightKey::Resource(category) => self.resource.get(category),
        };
        table.cloned().unwrap_or_default()
    }
}

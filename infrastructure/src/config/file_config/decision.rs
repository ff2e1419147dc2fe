//! Decision coordinator configuration from TOML (`[decision]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [decision]
//! per_call_timeout_secs = 30
//! default_timeout_secs = 300
//! default_policy = "majority"
//!
//! [decision.weights.diagnosis_analysis]
//! xiaoke = 0.4
//! laoke = 0.3
//! ```

use super::super::validation::{ConfigIssue, ConfigIssueCode};
use consilium_application::CoordinatorConfig;
use consilium_domain::{DecisionCategory, ParticipantId, VotingPolicy, WeightMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Raw `[decision]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDecisionConfig {
    /// Upper bound for a single vote call
    pub per_call_timeout_secs: u64,
    /// Timeout monitor period
    pub monitor_interval_secs: u64,
    /// Overall deadline for convenience submissions
    pub default_timeout_secs: u64,
    /// "weighted", "majority", "unanimous" or "expert_lead"
    pub default_policy: String,
    pub default_participants: Vec<String>,
    pub emergency_participants: Vec<String>,
    /// Category → participant → weight; overrides the built-in table per category
    pub weights: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Default for FileDecisionConfig {
    fn default() -> Self {
        let defaults = CoordinatorConfig::default();
        let ids = |list: &[ParticipantId]| list.iter().map(|p| p.to_string()).collect();
        Self {
            per_call_timeout_secs: defaults.per_call_timeout.as_secs(),
            monitor_interval_secs: defaults.monitor_interval.as_secs(),
            default_timeout_secs: defaults.default_timeout.as_secs(),
            default_policy: defaults.default_policy.as_str().to_string(),
            default_participants: ids(&defaults.default_participants),
            emergency_participants: ids(&defaults.emergency_participants),
            weights: BTreeMap::new(),
        }
    }
}

fn positive_secs(field: &str, secs: u64, issues: &mut Vec<ConfigIssue>) -> Option<Duration> {
    if secs == 0 {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::OutOfRange {
                field: field.to_string(),
            },
            format!("{}: must be greater than 0", field),
        ));
        return None;
    }
    Some(Duration::from_secs(secs))
}

impl FileDecisionConfig {
    /// Parse default_policy, falling back to weighted with a warning
    pub fn parse_policy(&self) -> (VotingPolicy, Vec<ConfigIssue>) {
        match self.default_policy.parse::<VotingPolicy>() {
            Ok(policy) => (policy, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "decision.default_policy".to_string(),
                        value: self.default_policy.clone(),
                        valid_values: ["weighted", "majority", "unanimous", "expert_lead"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    },
                    format!(
                        "decision.default_policy: unknown value '{}', falling back to 'weighted'",
                        self.default_policy
                    ),
                );
                (VotingPolicy::default(), vec![issue])
            }
        }
    }

    /// Parse the per-category weight overrides
    ///
    /// Unknown categories and negative or non-finite weights are skipped with
    /// a warning.
    pub fn parse_weights(&self) -> (HashMap<DecisionCategory, WeightMap>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut tables = HashMap::new();

        for (category, weights) in &self.weights {
            let Ok(parsed) = category.parse::<DecisionCategory>() else {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownCategory {
                        section: "decision.weights".to_string(),
                        category: category.clone(),
                    },
                    format!("decision.weights.{}: unknown decision category, ignored", category),
                ));
                continue;
            };

            let mut table = WeightMap::new();
            for (participant, weight) in weights {
                if !weight.is_finite() || *weight < 0.0 {
                    issues.push(ConfigIssue::warning(
                        ConfigIssueCode::OutOfRange {
                            field: format!("decision.weights.{}.{}", category, participant),
                        },
                        format!(
                            "decision.weights.{}.{}: weight {} must be a non-negative number, ignored",
                            category, participant, weight
                        ),
                    ));
                    continue;
                }
                table.insert(participant.clone(), *weight);
            }
            tables.insert(parsed, table);
        }
        (tables, issues)
    }

    /// Build the coordinator parameters, collecting every issue on the way
    pub fn to_coordinator_config(&self) -> (CoordinatorConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut config = CoordinatorConfig::default();

        if let Some(timeout) = positive_secs(
            "decision.per_call_timeout_secs",
            self.per_call_timeout_secs,
            &mut issues,
        ) {
            config = config.with_per_call_timeout(timeout);
        }
        if let Some(interval) = positive_secs(
            "decision.monitor_interval_secs",
            self.monitor_interval_secs,
            &mut issues,
        ) {
            config = config.with_monitor_interval(interval);
        }
        if let Some(timeout) = positive_secs(
            "decision.default_timeout_secs",
            self.default_timeout_secs,
            &mut issues,
        ) {
            config = config.with_default_timeout(timeout);
        }

        let (policy, policy_issues) = self.parse_policy();
        issues.extend(policy_issues);
        config = config.with_default_policy(policy);

        for (field, list) in [
            ("decision.default_participants", &self.default_participants),
            ("decision.emergency_participants", &self.emergency_participants),
        ] {
            if list.iter().all(|p| p.trim().is_empty()) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::EmptyValue {
                        field: field.to_string(),
                    },
                    format!("{}: no participants listed, keeping the built-in panel", field),
                ));
            }
        }
        let panel = |list: &[String]| -> Vec<ParticipantId> {
            list.iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(ParticipantId::from)
                .collect()
        };
        let default_panel = panel(&self.default_participants);
        if !default_panel.is_empty() {
            config = config.with_default_participants(default_panel);
        }
        let emergency_panel = panel(&self.emergency_participants);
        if !emergency_panel.is_empty() {
            config = config.with_emergency_participants(emergency_panel);
        }

        (config, issues)
    }
}

//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod catalog;
mod decision;
mod events;
mod scheduler;

pub use catalog::FileParticipantConfig;
pub use decision::FileDecisionConfig;
pub use events::FileEventsConfig;
pub use scheduler::FileSchedulerConfig;

use super::validation::{ConfigIssue, ConfigIssueCode};
use consilium_domain::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Decision coordinator settings
    pub decision: FileDecisionConfig,
    /// Resource scheduler settings
    pub scheduler: FileSchedulerConfig,
    /// Lifecycle event output
    pub events: FileEventsConfig,
    /// Participants that can be asked for votes
    pub participants: Vec<FileParticipantConfig>,
    /// Schedulable resources
    pub resources: Vec<ResourceDescriptor>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. Decision and scheduler parameters and their weight tables
    /// 2. Participant catalog (empty endpoints, duplicate ids)
    /// 3. Resource catalog (duplicate ids, empty categories)
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        // 1. Section parameters
        issues.extend(self.decision.to_coordinator_config().1);
        issues.extend(self.decision.parse_weights().1);
        issues.extend(self.scheduler.to_scheduler_config().1);
        issues.extend(self.scheduler.parse_weights().1);

        // 2. Participants
        let mut seen = HashSet::new();
        for participant in &self.participants {
            if !seen.insert(participant.id.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateId {
                        section: "participants".to_string(),
                        id: participant.id.clone(),
                    },
                    format!("participants: id '{}' is listed twice", participant.id),
                ));
            }
            if participant.endpoint.trim().is_empty() {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::EmptyValue {
                        field: format!("participants.{}.endpoint", participant.id),
                    },
                    format!(
                        "participants.{}: empty endpoint, participant will never vote",
                        participant.id
                    ),
                ));
            }
        }

        // 3. Resources
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.id.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateId {
                        section: "resources".to_string(),
                        id: resource.id.to_string(),
                    },
                    format!("resources: id '{}' is listed twice", resource.id),
                ));
            }
            if resource.category.as_str().trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyValue {
                        field: format!("resources.{}.category", resource.id),
                    },
                    format!("resources.{}: category cannot be empty", resource.id),
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.participants.is_empty());
        assert!(config.resources.is_empty());
        assert_eq!(config.decision.default_policy, "weighted");
        assert_eq!(config.scheduler.strategy, "profile_match");
        assert!(config.events.log);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[scheduler]
strategy = "round_robin"

[events]
jsonl_path = "/tmp/events.jsonl"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scheduler.strategy, "round_robin");
        assert_eq!(config.events.jsonl_path.as_deref(), Some("/tmp/events.jsonl"));
        // Defaults should apply
        assert_eq!(config.scheduler.max_reassignments, 5);
        assert_eq!(config.decision.per_call_timeout_secs, 30);
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let toml_str = r#"
[[participants]]
id = "xiaoai"
endpoint = "http://a"

[[participants]]
id = "xiaoai"
endpoint = ""

[[resources]]
id = "r"
category = "doctor"
capacity = 1

[[resources]]
id = "r"
category = ""
capacity = 1
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate();
        let duplicates = issues
            .iter()
            .filter(|i| matches!(i.code, ConfigIssueCode::DuplicateId { .. }))
            .count();
        assert_eq!(duplicates, 2);
        assert!(issues.iter().any(|i| !i.is_error()
            && matches!(&i.code, ConfigIssueCode::EmptyValue { field } if field == "participants.xiaoai.endpoint")));
        assert!(issues.iter().any(|i| i.is_error()
            && matches!(&i.code, ConfigIssueCode::EmptyValue { field } if field == "resources.r.category")));
    }
}

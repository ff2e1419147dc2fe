//! Resource scheduler configuration from TOML (`[scheduler]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [scheduler]
//! strategy = "load_balanced"
//! high_utilization = 0.85
//! low_utilization = 0.25
//!
//! [scheduler.weights.doctor]
//! cardiology = 0.5
//! ```

use super::super::validation::{ConfigIssue, ConfigIssueCode};
use consilium_application::SchedulerConfig;
use consilium_domain::{ResourceCategory, SchedulingStrategy, WeightMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Raw `[scheduler]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSchedulerConfig {
    pub strategy: String,
    pub high_utilization: f64,
    pub low_utilization: f64,
    /// Allocations starting later than this may be rebalanced
    pub reschedule_horizon_hours: u64,
    pub max_reassignments: usize,
    /// Period of deadline expiry and pending retry
    pub monitor_interval_secs: u64,
    pub rebalance_interval_secs: u64,
    /// Duration applied to scheduling input that does not state one
    pub default_duration_minutes: u32,
    /// Resource category → capability tag → weight
    pub weights: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Default for FileSchedulerConfig {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            strategy: defaults.strategy.as_str().to_string(),
            high_utilization: defaults.high_utilization,
            low_utilization: defaults.low_utilization,
            reschedule_horizon_hours: defaults.reschedule_horizon.as_secs() / 3600,
            max_reassignments: defaults.max_reassignments,
            monitor_interval_secs: defaults.monitor_interval.as_secs(),
            rebalance_interval_secs: defaults.rebalance_interval.as_secs(),
            default_duration_minutes: consilium_domain::scheduling::request::DEFAULT_DURATION_MINUTES,
            weights: BTreeMap::new(),
        }
    }
}

fn out_of_range(field: &str, message: String) -> ConfigIssue {
    ConfigIssue::error(
        ConfigIssueCode::OutOfRange {
            field: field.to_string(),
        },
        message,
    )
}

impl FileSchedulerConfig {
    pub fn parse_strategy(&self) -> (SchedulingStrategy, Vec<ConfigIssue>) {
        match self.strategy.parse::<SchedulingStrategy>() {
            Ok(strategy) => (strategy, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "scheduler.strategy".to_string(),
                        value: self.strategy.clone(),
                        valid_values: SchedulingStrategy::ALL
                            .iter()
                            .map(|s| s.as_str().to_string())
                            .collect(),
                    },
                    format!(
                        "scheduler.strategy: unknown value '{}', falling back to '{}'",
                        self.strategy,
                        SchedulingStrategy::default()
                    ),
                );
                (SchedulingStrategy::default(), vec![issue])
            }
        }
    }

    /// Capability tag weights per resource category
    pub fn parse_weights(&self) -> (HashMap<ResourceCategory, WeightMap>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut tables = HashMap::new();
        for (category, weights) in &self.weights {
            let mut table = WeightMap::new();
            for (tag, weight) in weights {
                if weight.is_finite() && *weight >= 0.0 {
                    table.insert(tag.clone(), *weight);
                } else {
                    issues.push(ConfigIssue::warning(
                        ConfigIssueCode::OutOfRange {
                            field: format!("scheduler.weights.{}.{}", category, tag),
                        },
                        format!(
                            "scheduler.weights.{}.{}: weight {} must be a non-negative number, ignored",
                            category, tag, weight
                        ),
                    ));
                }
            }
            tables.insert(ResourceCategory::new(category.as_str()), table);
        }
        (tables, issues)
    }

    /// Build the scheduler parameters, collecting every issue on the way
    pub fn to_scheduler_config(&self) -> (SchedulerConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let (strategy, strategy_issues) = self.parse_strategy();
        issues.extend(strategy_issues);
        let mut config = SchedulerConfig::default()
            .with_strategy(strategy)
            .with_max_reassignments(self.max_reassignments);

        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(self.high_utilization) || !in_unit(self.low_utilization) {
            issues.push(out_of_range(
                "scheduler.high_utilization",
                format!(
                    "scheduler: utilization thresholds must lie in [0, 1], got high {} and low {}",
                    self.high_utilization, self.low_utilization
                ),
            ));
        } else if self.low_utilization >= self.high_utilization {
            issues.push(out_of_range(
                "scheduler.low_utilization",
                format!(
                    "scheduler.low_utilization ({}) must be below high_utilization ({})",
                    self.low_utilization, self.high_utilization
                ),
            ));
        } else {
            config = config.with_thresholds(self.high_utilization, self.low_utilization);
        }

        if self.monitor_interval_secs == 0 {
            issues.push(out_of_range(
                "scheduler.monitor_interval_secs",
                "scheduler.monitor_interval_secs: must be greater than 0".to_string(),
            ));
        } else {
            config = config.with_monitor_interval(Duration::from_secs(self.monitor_interval_secs));
        }

        if self.rebalance_interval_secs == 0 {
            issues.push(out_of_range(
                "scheduler.rebalance_interval_secs",
                "scheduler.rebalance_interval_secs: must be greater than 0".to_string(),
            ));
        } else {
            config = config.with_rebalance_interval(Duration::from_secs(self.rebalance_interval_secs));
        }

        if self.default_duration_minutes == 0 {
            issues.push(out_of_range(
                "scheduler.default_duration_minutes",
                "scheduler.default_duration_minutes: must be greater than 0".to_string(),
            ));
        }

        config = config.with_reschedule_horizon(Duration::from_secs(
            self.reschedule_horizon_hours.saturating_mul(3600),
        ));
        (config, issues)
    }
}

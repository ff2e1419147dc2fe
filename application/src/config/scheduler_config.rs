//! Resource scheduler parameters.

use consilium_domain::SchedulingStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for [`ResourceScheduler`](crate::use_cases::resource_scheduler::ResourceScheduler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub strategy: SchedulingStrategy,
    /// Resources above this utilization are rebalancing sources.
    pub high_utilization: f64,
    /// Resources below this utilization are rebalancing targets.
    pub low_utilization: f64,
    /// Only allocations starting later than this may be moved.
    pub reschedule_horizon: Duration,
    /// Upper bound on moves per rebalancing sweep.
    pub max_reassignments: usize,
    /// Period of deadline expiry and pending retry.
    pub monitor_interval: Duration,
    /// Period of rebalancing sweeps.
    pub rebalance_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: SchedulingStrategy::ProfileMatch,
            high_utilization: 0.8,
            low_utilization: 0.3,
            reschedule_horizon: Duration::from_secs(24 * 3600),
            max_reassignments: 5,
            monitor_interval: Duration::from_secs(5),
            rebalance_interval: Duration::from_secs(300),
        }
    }
}

impl SchedulerConfig {
    // ==================== Builder Methods ====================

    pub fn with_strategy(mut self, strategy: SchedulingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_thresholds(mut self, high: f64, low: f64) -> Self {
        self.high_utilization = high;
        self.low_utilization = low;
        self
    }

    pub fn with_reschedule_horizon(mut self, horizon: Duration) -> Self {
        self.reschedule_horizon = horizon;
        self
    }

    pub fn with_max_reassignments(mut self, max: usize) -> Self {
        self.max_reassignments = max;
        self
    }

    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    pub fn with_rebalance_interval(mut self, interval: Duration) -> Self {
        self.rebalance_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.high_utilization, 0.8);
        assert_eq!(config.low_utilization, 0.3);
        assert_eq!(config.max_reassignments, 5);
        assert_eq!(config.reschedule_horizon, Duration::from_secs(86_400));
        assert_eq!(config.monitor_interval, Duration::from_secs(5));
        assert_eq!(config.rebalance_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_builder() {
        let config = SchedulerConfig::default()
            .with_strategy(SchedulingStrategy::LoadBalanced)
            .with_thresholds(0.9, 0.1)
            .with_max_reassignments(1);
        assert_eq!(config.strategy, SchedulingStrategy::LoadBalanced);
        assert_eq!(config.high_utilization, 0.9);
        assert_eq!(config.max_reassignments, 1);
    }
}

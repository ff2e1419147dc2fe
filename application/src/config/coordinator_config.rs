//! Decision coordinator parameters.

use consilium_domain::{DecisionCategory, ParticipantId, VotingPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for [`DecisionCoordinator`](crate::use_cases::decision_coordinator::DecisionCoordinator).
///
/// The participant lists back the convenience submission, which picks a
/// panel per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Upper bound for a single remote vote call.
    pub per_call_timeout: Duration,
    /// How often the timeout monitor sweeps the pool.
    pub monitor_interval: Duration,
    /// Overall deadline used by the convenience submission.
    pub default_timeout: Duration,
    pub default_policy: VotingPolicy,
    /// Panel for every category except emergency response.
    pub default_participants: Vec<ParticipantId>,
    /// Reduced panel for emergency response.
    pub emergency_participants: Vec<ParticipantId>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_secs(30),
            monitor_interval: Duration::from_secs(5),
            default_timeout: Duration::from_secs(300),
            default_policy: VotingPolicy::Weighted,
            default_participants: ["xiaoai", "xiaoke", "laoke", "soer"]
                .into_iter()
                .map(ParticipantId::from)
                .collect(),
            emergency_participants: ["xiaoai", "xiaoke"]
                .into_iter()
                .map(ParticipantId::from)
                .collect(),
        }
    }
}

impl CoordinatorConfig {
    // ==================== Builder Methods ====================

    pub fn with_per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self
    }

    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_default_policy(mut self, policy: VotingPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_default_participants(mut self, participants: Vec<ParticipantId>) -> Self {
        self.default_participants = participants;
        self
    }

    pub fn with_emergency_participants(mut self, participants: Vec<ParticipantId>) -> Self {
        self.emergency_participants = participants;
        self
    }

    /// Panel used by the convenience submission for `category`
    pub fn participants_for(&self, category: DecisionCategory) -> &[ParticipantId] {
        if category.is_emergency() {
            &self.emergency_participants
        } else {
            &self.default_participants
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.per_call_timeout, Duration::from_secs(30));
        assert_eq!(config.default_timeout, Duration::from_secs(300));
        assert_eq!(config.default_participants.len(), 4);
    }

    #[test]
    fn test_emergency_panel() {
        let config = CoordinatorConfig::default();
        let panel = config.participants_for(DecisionCategory::EmergencyResponse);
        assert_eq!(panel, &[ParticipantId::from("xiaoai"), ParticipantId::from("xiaoke")]);
        assert_eq!(config.participants_for(DecisionCategory::LifestyleGuidance).len(), 4);
    }

    #[test]
    fn test_builder() {
        let config = CoordinatorConfig::default()
            .with_per_call_timeout(Duration::from_secs(5))
            .with_default_policy(VotingPolicy::Unanimous)
            .with_default_participants(vec![ParticipantId::from("solo")]);
        assert_eq!(config.per_call_timeout, Duration::from_secs(5));
        assert_eq!(config.default_policy, VotingPolicy::Unanimous);
        assert_eq!(config.participants_for(DecisionCategory::HealthAssessment).len(), 1);
    }
}

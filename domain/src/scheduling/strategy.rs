//! Scheduling strategies

use serde::{Deserialize, Serialize};

/// Strategy used to pick a resource for a request
///
/// The first three order the pending queue; their resource choice falls back
/// to profile matching. The last three rank candidates directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingStrategy {
    Fifo,
    Priority,
    ShortestJobFirst,
    RoundRobin,
    #[default]
    ProfileMatch,
    LoadBalanced,
}

impl SchedulingStrategy {
    pub const ALL: [SchedulingStrategy; 6] = [
        SchedulingStrategy::Fifo,
        SchedulingStrategy::Priority,
        SchedulingStrategy::ShortestJobFirst,
        SchedulingStrategy::RoundRobin,
        SchedulingStrategy::ProfileMatch,
        SchedulingStrategy::LoadBalanced,
    ];

    /// Whether this strategy orders the pending queue rather than candidates
    pub fn is_queue_ordering(&self) -> bool {
        matches!(
            self,
            SchedulingStrategy::Fifo | SchedulingStrategy::Priority | SchedulingStrategy::ShortestJobFirst
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingStrategy::Fifo => "fifo",
            SchedulingStrategy::Priority => "priority",
            SchedulingStrategy::ShortestJobFirst => "shortest_job_first",
            SchedulingStrategy::RoundRobin => "round_robin",
            SchedulingStrategy::ProfileMatch => "profile_match",
            SchedulingStrategy::LoadBalanced => "load_balanced",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SchedulingStrategy::Fifo => "first in, first out",
            SchedulingStrategy::Priority => "highest computed priority first",
            SchedulingStrategy::ShortestJobFirst => "shortest requested duration first",
            SchedulingStrategy::RoundRobin => "cycle through eligible resources",
            SchedulingStrategy::ProfileMatch => "best capability match, penalized by load",
            SchedulingStrategy::LoadBalanced => "least loaded eligible resource",
        }
    }
}

impl std::fmt::Display for SchedulingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SchedulingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fifo" => Ok(SchedulingStrategy::Fifo),
            "priority" | "priority_based" => Ok(SchedulingStrategy::Priority),
            "shortest_job_first" | "sjf" => Ok(SchedulingStrategy::ShortestJobFirst),
            "round_robin" => Ok(SchedulingStrategy::RoundRobin),
            "profile_match" | "profile" | "constitution_match" => Ok(SchedulingStrategy::ProfileMatch),
            "load_balanced" => Ok(SchedulingStrategy::LoadBalanced),
            _ => Err(format!(
                "Unknown scheduling strategy: {}. Valid: fifo, priority, shortest_job_first, round_robin, profile_match, load_balanced",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy() {
        assert_eq!("SJF".parse::<SchedulingStrategy>().ok(), Some(SchedulingStrategy::ShortestJobFirst));
        assert_eq!(
            "load-balanced".parse::<SchedulingStrategy>().ok(),
            Some(SchedulingStrategy::LoadBalanced)
        );
        assert!("lottery".parse::<SchedulingStrategy>().is_err());
    }

    #[test]
    fn test_queue_ordering_split() {
        let ordering: Vec<_> = SchedulingStrategy::ALL
            .iter()
            .filter(|s| s.is_queue_ordering())
            .collect();
        assert_eq!(ordering.len(), 3);
    }
}

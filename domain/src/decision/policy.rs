//! Voting policies for reducing votes to one decision

use serde::{Deserialize, Serialize};

/// Weight assumed for a participant missing from the domain weight table
pub const DEFAULT_PARTICIPANT_WEIGHT: f64 = 0.25;

/// Minimum confidence every vote must reach under [`VotingPolicy::Unanimous`]
pub const UNANIMOUS_MIN_CONFIDENCE: f64 = 0.7;

/// Policy used to reduce a set of votes to a recommendation
///
/// - `Weighted`: per key, the vote with the highest `weight × confidence` wins (default)
/// - `Majority`: the single most confident vote wins
/// - `Unanimous`: every vote must be confident enough, payloads are merged
/// - `ExpertLead`: the highest-weighted participant decides when it voted
///
/// # Example
///
/// ```
/// use consilium_domain::VotingPolicy;
///
/// let policy: VotingPolicy = "expert-lead".parse().unwrap();
/// assert_eq!(policy, VotingPolicy::ExpertLead);
/// assert_eq!(VotingPolicy::default(), VotingPolicy::Weighted);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VotingPolicy {
    #[default]
    Weighted,
    Majority,
    Unanimous,
    ExpertLead,
}

impl VotingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotingPolicy::Weighted => "weighted",
            VotingPolicy::Majority => "majority",
            VotingPolicy::Unanimous => "unanimous",
            VotingPolicy::ExpertLead => "expert_lead",
        }
    }

    /// Get a human-readable description of this policy
    pub fn description(&self) -> &'static str {
        match self {
            VotingPolicy::Weighted => "weighted (highest weight x confidence per key)",
            VotingPolicy::Majority => "majority (most confident vote)",
            VotingPolicy::Unanimous => "unanimous (all votes at least 0.7 confidence)",
            VotingPolicy::ExpertLead => "expert-lead (highest-weighted participant decides)",
        }
    }
}

impl std::fmt::Display for VotingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VotingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "weighted" => Ok(VotingPolicy::Weighted),
            "majority" => Ok(VotingPolicy::Majority),
            "unanimous" => Ok(VotingPolicy::Unanimous),
            "expert_lead" | "expert" => Ok(VotingPolicy::ExpertLead),
            _ => Err(format!(
                "Unknown voting policy: {}. Valid: weighted, majority, unanimous, expert_lead",
                s
            )),
        }
    }
}

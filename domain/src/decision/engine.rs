//! Voting strategy engine
//!
//! A pure reduction of `(votes, policy, domain weights)` into a single
//! recommendation and a consensus score in `[0, 1]`. Votes are expected in
//! arrival order; ties are resolved in favour of the earlier vote unless a
//! policy states otherwise.

use crate::core::weights::{WeightMap, weight_or};
use crate::decision::policy::{DEFAULT_PARTICIPANT_WEIGHT, UNANIMOUS_MIN_CONFIDENCE, VotingPolicy};
use crate::decision::vote::{AgentVote, Recommendation};
use crate::util::{clamp_unit, mean};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a reduction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusOutcome {
    /// A recommendation was produced
    Reached,
    /// Votes were present but the policy refused to produce a recommendation
    NoConsensus,
    /// Nothing to reduce
    NoVotes,
}

impl ConsensusOutcome {
    pub fn is_reached(&self) -> bool {
        matches!(self, ConsensusOutcome::Reached)
    }
}

impl std::fmt::Display for ConsensusOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusOutcome::Reached => write!(f, "Reached"),
            ConsensusOutcome::NoConsensus => write!(f, "NoConsensus"),
            ConsensusOutcome::NoVotes => write!(f, "NoVotes"),
        }
    }
}

/// Recommendation plus consensus score produced by a policy
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus {
    pub recommendation: Recommendation,
    pub score: f64,
    pub outcome: ConsensusOutcome,
}

impl Consensus {
    fn reached(recommendation: Recommendation, score: f64) -> Self {
        Self {
            recommendation,
            score: clamp_unit(score),
            outcome: ConsensusOutcome::Reached,
        }
    }

    /// Empty recommendation with score 0 for an empty vote set
    pub fn empty() -> Self {
        Self {
            recommendation: Recommendation::new(),
            score: 0.0,
            outcome: ConsensusOutcome::NoVotes,
        }
    }

    pub fn no_consensus() -> Self {
        Self {
            recommendation: Recommendation::new(),
            score: 0.0,
            outcome: ConsensusOutcome::NoConsensus,
        }
    }
}

/// Reduces votes to a decision under a [`VotingPolicy`]
///
/// # Example
///
/// ```
/// use consilium_domain::{AgentVote, VotingPolicy, VotingStrategyEngine};
/// use consilium_domain::core::weights::WeightMap;
/// use serde_json::json;
///
/// let votes = vec![
///     AgentVote::new("a", 0.9, json!({"x": 1}).as_object().unwrap().clone()),
///     AgentVote::new("b", 0.4, json!({"x": 2}).as_object().unwrap().clone()),
/// ];
/// let consensus = VotingStrategyEngine::decide(&votes, VotingPolicy::Majority, &WeightMap::new());
/// assert_eq!(consensus.recommendation["x"], 1);
/// assert!((consensus.score - 0.65).abs() < 1e-9);
/// ```
pub struct VotingStrategyEngine;

impl VotingStrategyEngine {
    pub fn decide(votes: &[AgentVote], policy: VotingPolicy, weights: &WeightMap) -> Consensus {
        if votes.is_empty() {
            return Consensus::empty();
        }

        match policy {
            VotingPolicy::Weighted => Self::weighted(votes, weights),
            VotingPolicy::Majority => Self::majority(votes),
            VotingPolicy::Unanimous => Self::unanimous(votes),
            VotingPolicy::ExpertLead => Self::expert_lead(votes, weights),
        }
    }

    /// Participant with the highest configured weight.
    ///
    /// Equal weights resolve to the lexicographically smallest id so the
    /// choice does not depend on map iteration order.
    pub fn expert(weights: &WeightMap) -> Option<&str> {
        weights
            .iter()
            .fold(None::<(&String, f64)>, |best, (id, &w)| match best {
                Some((best_id, best_w)) if best_w > w || (best_w == w && best_id < id) => best,
                _ => Some((id, w)),
            })
            .map(|(id, _)| id.as_str())
    }

    fn weighted(votes: &[AgentVote], weights: &WeightMap) -> Consensus {
        let mut winners: HashMap<&String, (f64, &serde_json::Value)> = HashMap::new();

        for vote in votes {
            let influence = weight_or(weights, vote.participant.as_str(), DEFAULT_PARTICIPANT_WEIGHT)
                * vote.confidence;
            for (key, value) in &vote.recommendation {
                match winners.get(key) {
                    Some((best, _)) if *best >= influence => {}
                    _ => {
                        winners.insert(key, (influence, value));
                    }
                }
            }
        }

        let recommendation = winners
            .into_iter()
            .map(|(key, (_, value))| (key.clone(), value.clone()))
            .collect();

        Consensus::reached(recommendation, mean(votes.iter().map(|v| v.confidence)))
    }

    fn majority(votes: &[AgentVote]) -> Consensus {
        let mut winner = &votes[0];
        for vote in &votes[1..] {
            if vote.confidence > winner.confidence {
                winner = vote;
            }
        }

        Consensus::reached(
            winner.recommendation.clone(),
            mean(votes.iter().map(|v| v.confidence)),
        )
    }

    fn unanimous(votes: &[AgentVote]) -> Consensus {
        if votes.iter().any(|v| v.confidence < UNANIMOUS_MIN_CONFIDENCE) {
            return Consensus::no_consensus();
        }

        let mut merged = Recommendation::new();
        for vote in votes {
            for (key, value) in &vote.recommendation {
                merged.insert(key.clone(), value.clone());
            }
        }

        let min_confidence = votes
            .iter()
            .map(|v| v.confidence)
            .fold(f64::INFINITY, f64::min);

        Consensus::reached(merged, min_confidence)
    }

    fn expert_lead(votes: &[AgentVote], weights: &WeightMap) -> Consensus {
        let Some(expert_id) = Self::expert(weights) else {
            return Self::weighted(votes, weights);
        };
        let Some(expert_vote) = votes.iter().find(|v| v.participant.as_str() == expert_id) else {
            return Self::weighted(votes, weights);
        };

        let others: Vec<f64> = votes
            .iter()
            .filter(|v| v.participant.as_str() != expert_id)
            .map(|v| v.confidence)
            .collect();

        let score = if others.is_empty() {
            expert_vote.confidence
        } else {
            (expert_vote.confidence + mean(others)) / 2.0
        };

        Consensus::reached(expert_vote.recommendation.clone(), score)
    }
}

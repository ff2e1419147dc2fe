//! Decision lifecycle status and terminal results

use crate::decision::engine::{Consensus, ConsensusOutcome};
use crate::decision::request::DecisionId;
use crate::decision::vote::{AgentVote, Recommendation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a decision request
///
/// `Pending → Collecting → {Completed | Failed | Cancelled | TimedOut}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Pending,
    Collecting,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl DecisionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DecisionStatus::Pending | DecisionStatus::Collecting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Pending => "pending",
            DecisionStatus::Collecting => "collecting",
            DecisionStatus::Completed => "completed",
            DecisionStatus::Failed => "failed",
            DecisionStatus::Cancelled => "cancelled",
            DecisionStatus::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of a decision request
///
/// Written exactly once per request and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub request_id: DecisionId,
    pub status: DecisionStatus,
    pub recommendation: Recommendation,
    pub consensus_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ConsensusOutcome>,
    /// Votes actually used, in arrival order
    pub votes: Vec<AgentVote>,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecisionResult {
    fn terminal(request_id: DecisionId, status: DecisionStatus) -> Self {
        Self {
            request_id,
            status,
            recommendation: Recommendation::new(),
            consensus_score: 0.0,
            outcome: None,
            votes: Vec::new(),
            completed_at: Utc::now(),
            error: None,
        }
    }

    /// Result of a finished collection.
    ///
    /// No votes means the decision failed; otherwise it completed, possibly
    /// with an explicit "no consensus" outcome.
    pub fn from_consensus(request_id: DecisionId, consensus: Consensus, votes: Vec<AgentVote>) -> Self {
        if votes.is_empty() {
            return Self::failed(request_id, "No votes received from participants");
        }
        Self {
            recommendation: consensus.recommendation,
            consensus_score: consensus.score,
            outcome: Some(consensus.outcome),
            votes,
            ..Self::terminal(request_id, DecisionStatus::Completed)
        }
    }

    pub fn failed(request_id: DecisionId, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::terminal(request_id, DecisionStatus::Failed)
        }
    }

    /// Cancelled: votes gathered so far are discarded
    pub fn cancelled(request_id: DecisionId) -> Self {
        Self::terminal(request_id, DecisionStatus::Cancelled)
    }

    /// Timed out, carrying the votes that arrived before the deadline
    pub fn timed_out(request_id: DecisionId, partial_votes: Vec<AgentVote>) -> Self {
        Self {
            votes: partial_votes,
            error: Some("Decision deadline elapsed before collection finished".to_string()),
            ..Self::terminal(request_id, DecisionStatus::TimedOut)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DecisionStatus::Completed
    }
}

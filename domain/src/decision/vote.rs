//! Votes returned by participants

use crate::decision::request::ParticipantId;
use crate::util::clamp_unit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque recommendation payload carried by a vote or a result
pub type Recommendation = serde_json::Map<String, serde_json::Value>;

/// A single participant's vote on a decision request
///
/// Confidence is clamped to `[0, 1]` when the vote is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVote {
    pub participant: ParticipantId,
    pub confidence: f64,
    #[serde(default)]
    pub recommendation: Recommendation,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    pub received_at: DateTime<Utc>,
}

impl AgentVote {
    pub fn new(
        participant: impl Into<ParticipantId>,
        confidence: f64,
        recommendation: Recommendation,
    ) -> Self {
        Self {
            participant: participant.into(),
            confidence: clamp_unit(confidence),
            recommendation,
            rationale: String::new(),
            supporting_evidence: Vec::new(),
            received_at: Utc::now(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.supporting_evidence = evidence;
        self
    }

    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }
}

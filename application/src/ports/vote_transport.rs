//! Remote vote call port

use crate::ports::participant_directory::ParticipantRef;
use async_trait::async_trait;
use consilium_domain::{DecisionCategory, DecisionContext, DecisionId};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single remote vote call
///
/// The collector absorbs all of these; they never abort a decision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoteCallError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Participant rejected the call with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed vote payload: {0}")]
    Malformed(String),

    #[error("Vote call timed out after {0:?}")]
    Timeout(Duration),
}

impl VoteCallError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, VoteCallError::Timeout(_))
    }
}

/// What a participant is asked to vote on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteCall {
    pub request_id: DecisionId,
    pub category: DecisionCategory,
    pub context: DecisionContext,
}

/// Blocking-with-timeout remote call to one participant
///
/// Returns the raw vote payload. Parsing and validation happen in the
/// collector so transports stay format-agnostic.
#[async_trait]
pub trait VoteTransport: Send + Sync {
    async fn request_vote(
        &self,
        participant: &ParticipantRef,
        call: &VoteCall,
        timeout: Duration,
    ) -> Result<serde_json::Value, VoteCallError>;
}

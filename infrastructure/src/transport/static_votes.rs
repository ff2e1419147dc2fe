//! Vote transport answering from a fixed table

use async_trait::async_trait;
use consilium_application::{ParticipantRef, VoteCall, VoteCallError, VoteTransport};
use consilium_domain::ParticipantId;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Answers each participant with its recorded payload
///
/// Participants without an entry never answer, so their calls run into the
/// per-call timeout like a silent remote would.
#[derive(Debug, Clone, Default)]
pub struct StaticVoteTransport {
    payloads: HashMap<ParticipantId, Value>,
}

impl StaticVoteTransport {
    pub fn new(payloads: HashMap<ParticipantId, Value>) -> Self {
        Self { payloads }
    }

    pub fn with_vote(mut self, participant: impl Into<ParticipantId>, payload: Value) -> Self {
        self.payloads.insert(participant.into(), payload);
        self
    }

    /// Participants that have a recorded payload
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.payloads.keys()
    }
}

#[async_trait]
impl VoteTransport for StaticVoteTransport {
    async fn request_vote(
        &self,
        participant: &ParticipantRef,
        _call: &VoteCall,
        timeout: Duration,
    ) -> Result<Value, VoteCallError> {
        match self.payloads.get(&participant.id) {
            Some(payload) => Ok(payload.clone()),
            None => {
                tokio::time::sleep(timeout).await;
                Err(VoteCallError::Timeout(timeout))
            }
        }
    }
}

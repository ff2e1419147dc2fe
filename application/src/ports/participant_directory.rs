//! Participant directory port
//!
//! Resolves participant identifiers to reachable endpoints. Used to validate
//! required participants before a decision request is accepted.

use async_trait::async_trait;
use consilium_domain::ParticipantId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by directory lookups (participants or resources)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("Directory unreachable: {0}")]
    Unreachable(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),
}

/// A reachable participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub id: ParticipantId,
    /// Base address used by the vote transport
    pub endpoint: String,
}

impl ParticipantRef {
    pub fn new(id: impl Into<ParticipantId>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Directory of currently available participants
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Available instances of `participant`; empty when none is reachable
    async fn list_available(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<ParticipantRef>, DirectoryError>;
}

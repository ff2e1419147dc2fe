//! Decision request entity and its identifiers

use crate::core::error::DomainError;
use crate::core::priority::Priority;
use crate::decision::category::DecisionCategory;
use crate::decision::policy::VotingPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque key-value payload forwarded to every participant
pub type DecisionContext = serde_json::Map<String, serde_json::Value>;

/// Default overall deadline for a decision request
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(300);

/// Identifier of a decision request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(String);

impl DecisionId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DecisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DecisionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of an independently addressable participant (agent)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A request for a collaborative decision
///
/// # Example
///
/// ```
/// use consilium_domain::{DecisionCategory, DecisionRequest, VotingPolicy};
/// use std::time::Duration;
///
/// let request = DecisionRequest::new(DecisionCategory::DiagnosisAnalysis, ["xiaoke", "laoke"])
///     .with_policy(VotingPolicy::ExpertLead)
///     .with_timeout(Duration::from_secs(60));
///
/// assert!(request.validate().is_ok());
/// assert_eq!(request.participants.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub id: DecisionId,
    pub category: DecisionCategory,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub context: DecisionContext,
    /// Required participants, deduplicated, in the order given
    pub participants: Vec<ParticipantId>,
    #[serde(default)]
    pub policy: VotingPolicy,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_timeout() -> Duration {
    DEFAULT_DECISION_TIMEOUT
}

impl DecisionRequest {
    pub fn new<I, P>(category: DecisionCategory, participants: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ParticipantId>,
    {
        let mut unique: Vec<ParticipantId> = Vec::new();
        for participant in participants {
            let participant = participant.into();
            if !unique.contains(&participant) {
                unique.push(participant);
            }
        }

        Self {
            id: DecisionId::generate(),
            category,
            priority: Priority::default(),
            context: DecisionContext::new(),
            participants: unique,
            policy: VotingPolicy::default(),
            timeout: DEFAULT_DECISION_TIMEOUT,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<DecisionId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_policy(mut self, policy: VotingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_context(mut self, context: DecisionContext) -> Self {
        self.context = context;
        self
    }

    /// Add a single context entry
    pub fn with_context_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Wall-clock deadline: creation time plus timeout
    pub fn deadline(&self) -> DateTime<Utc> {
        let timeout = chrono::Duration::from_std(self.timeout).unwrap_or(chrono::Duration::MAX);
        self.created_at
            .checked_add_signed(timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Check the structural invariants of the request
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.participants.is_empty() {
            return Err(DomainError::NoParticipants);
        }
        if self.timeout.is_zero() {
            return Err(DomainError::NonPositiveTimeout);
        }
        Ok(())
    }
}

impl From<String> for DecisionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

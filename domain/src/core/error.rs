//! Domain error types

use thiserror::Error;

/// Domain-level validation errors
///
/// Raised synchronously when a request is malformed. A request that fails
/// validation never enters a coordinator or scheduler pool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("No required participants for decision request")]
    NoParticipants,

    #[error("Timeout must be greater than zero")]
    NonPositiveTimeout,

    #[error("Deadline {0} is not in the future")]
    DeadlineInPast(String),

    #[error("Resource category cannot be empty")]
    EmptyCategory,

    #[error("Requested duration must be greater than zero")]
    NonPositiveDuration,

    #[error("Unit size must be a positive finite number, got {0}")]
    InvalidUnits(f64),

    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),
}

impl DomainError {
    /// Check if this error concerns request timing (timeout or deadline)
    pub fn is_timing(&self) -> bool {
        matches!(
            self,
            DomainError::NonPositiveTimeout | DomainError::DeadlineInPast(_)
        )
    }
}

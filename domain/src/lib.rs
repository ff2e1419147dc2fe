//! Domain layer for consilium
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or async runtimes.
//!
//! # Core Concepts
//!
//! ## Decisions
//!
//! Several independent participants vote on a [`DecisionRequest`]. The
//! [`VotingStrategyEngine`] reduces their [`AgentVote`]s under a
//! [`VotingPolicy`] into a recommendation and a consensus score.
//!
//! ## Scheduling
//!
//! A [`SchedulingRequest`] is matched against capacity-constrained
//! [`ResourceDescriptor`]s by the [`SchedulingStrategyEngine`], producing an
//! [`Allocation`].
//!
//! Both subsystems share the urgency vocabulary in [`core::priority`] and the
//! convention that confidence and quality scores live in `[0, 1]`.

pub mod core;
pub mod decision;
pub mod scheduling;
pub mod util;

// Re-export commonly used types
pub use core::{
    error::DomainError,
    priority::{Priority, Urgency},
    weights::WeightMap,
};

pub use decision::{
    category::DecisionCategory,
    engine::{Consensus, ConsensusOutcome, VotingStrategyEngine},
    policy::VotingPolicy,
    request::{DecisionContext, DecisionId, DecisionRequest, ParticipantId},
    result::{DecisionResult, DecisionStatus},
    vote::{AgentVote, Recommendation},
};

pub use scheduling::{
    allocation::{Allocation, AllocationStatus, AlternativeOption, ScheduleState},
    engine::{MatchOutcome, PendingTicket, ScoredCandidate, SchedulingStrategyEngine},
    load::ResourceLoad,
    request::{
        GeoPoint, HardConstraints, MatchProfile, ResourceCategory, ScheduleId, SchedulingRequest,
        TimeWindow,
    },
    resource::{Ineligible, Quality, ResourceDescriptor, ResourceId, ResourceStatus},
    strategy::SchedulingStrategy,
};

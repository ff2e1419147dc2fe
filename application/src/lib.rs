//! Application layer for consilium
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.
//!
//! - [`DecisionCoordinator`] runs collaborative decisions end to end
//! - [`ResourceScheduler`] matches scheduling requests to resources

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{CoordinatorConfig, SchedulerConfig};
pub use ports::{
    event_sink::{EventSink, LifecycleEvent, NoEventSink},
    participant_directory::{DirectoryError, ParticipantDirectory, ParticipantRef},
    resource_directory::ResourceDirectory,
    vote_transport::{VoteCall, VoteCallError, VoteTransport},
    weight_table::{DomainWeightTable, NoWeights, WeightKey},
};
pub use use_cases::collect_votes::{AgentVoteCollector, CollectedVotes, parse_vote};
pub use use_cases::decision_coordinator::{DecisionCoordinator, DecisionError};
pub use use_cases::resource_load::{LoadStatistics, Reservation, ReserveError, ResourceLoadTracker};
pub use use_cases::resource_scheduler::{ResourceScheduler, ScheduleError, SchedulingMetrics};

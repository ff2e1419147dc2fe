//! Infrastructure layer for consilium
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod directory;
pub mod events;
pub mod transport;
pub mod weights;

// Re-export commonly used types
pub use config::{
    ConfigIssue, ConfigLoader, ConfigValidationError, FileConfig, FileDecisionConfig,
    FileEventsConfig, FileParticipantConfig, FileSchedulerConfig, Severity,
};
pub use directory::{InMemoryParticipantDirectory, InMemoryResourceDirectory};
pub use events::{FanoutEventSink, JsonlEventSink, TracingEventSink};
#[cfg(feature = "http-transport")]
pub use transport::HttpVoteTransport;
pub use transport::StaticVoteTransport;
pub use weights::StaticWeightTable;

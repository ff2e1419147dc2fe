//! In-memory directories
//!
//! Catalog-backed implementations of the participant and resource directory
//! ports, filled from configuration at startup and mutable at runtime.

mod participants;
mod resources;

pub use participants::InMemoryParticipantDirectory;
pub use resources::InMemoryResourceDirectory;

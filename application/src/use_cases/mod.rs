//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod collect_votes;
pub mod decision_coordinator;
pub mod resource_load;
pub mod resource_scheduler;

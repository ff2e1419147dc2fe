//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod event_sink;
pub mod participant_directory;
pub mod resource_directory;
pub mod vote_transport;
pub mod weight_table;

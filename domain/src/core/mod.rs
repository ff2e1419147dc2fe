//! Core domain concepts shared across both subsystems.
//!
//! - [`priority::Priority`] / [`priority::Urgency`]: the shared urgency vocabulary
//! - [`weights::WeightMap`]: result of a domain weight lookup
//! - [`error::DomainError`]: validation errors

pub mod error;
pub mod priority;
pub mod weights;

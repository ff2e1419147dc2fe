//! Application configuration
//!
//! Parameters that control how the use cases behave. Loading them from files
//! and the environment is an infrastructure concern.

pub mod coordinator_config;
pub mod scheduler_config;

pub use coordinator_config::CoordinatorConfig;
pub use scheduler_config::SchedulerConfig;

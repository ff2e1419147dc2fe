//! Resource directory port

use crate::ports::participant_directory::DirectoryError;
use async_trait::async_trait;
use consilium_domain::{HardConstraints, ResourceCategory, ResourceDescriptor};

/// Catalog of schedulable resources
///
/// Implementations may pre-filter by the hard constraints; the strategy
/// engine re-checks eligibility regardless.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn list_candidates(
        &self,
        category: &ResourceCategory,
        constraints: &HardConstraints,
    ) -> Result<Vec<ResourceDescriptor>, DirectoryError>;
}

//! Resource catalog backed by a map

use async_trait::async_trait;
use consilium_application::{DirectoryError, ResourceDirectory};
use consilium_domain::{
    HardConstraints, ResourceCategory, ResourceDescriptor, ResourceId, ResourceStatus,
};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Mutable resource catalog
///
/// Candidates are returned in id order. Only the category is filtered here;
/// the scheduler checks status and hard constraints itself.
#[derive(Debug, Default)]
pub struct InMemoryResourceDirectory {
    resources: RwLock<BTreeMap<ResourceId, ResourceDescriptor>>,
}

impl InMemoryResourceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources(resources: impl IntoIterator<Item = ResourceDescriptor>) -> Self {
        let directory = Self::new();
        for resource in resources {
            directory.add(resource);
        }
        directory
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ResourceId, ResourceDescriptor>> {
        self.resources.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ResourceId, ResourceDescriptor>> {
        self.resources.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a resource; returns the previous descriptor
    pub fn add(&self, resource: ResourceDescriptor) -> Option<ResourceDescriptor> {
        debug!("Adding resource {} ({})", resource.id, resource.category);
        self.write().insert(resource.id.clone(), resource)
    }

    pub fn remove(&self, id: &ResourceId) -> Option<ResourceDescriptor> {
        let removed = self.write().remove(id);
        if removed.is_some() {
            info!("Removed resource {}", id);
        }
        removed
    }

    /// Change a resource's status; false when unknown
    pub fn update_status(&self, id: &ResourceId, status: ResourceStatus) -> bool {
        match self.write().get_mut(id) {
            Some(resource) => {
                info!("Resource {} is now {}", id, status);
                resource.status = status;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &ResourceId) -> Option<ResourceDescriptor> {
        self.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[async_trait]
impl ResourceDirectory for InMemoryResourceDirectory {
    async fn list_candidates(
        &self,
        category: &ResourceCategory,
        _constraints: &HardConstraints,
    ) -> Result<Vec<ResourceDescriptor>, DirectoryError> {
        Ok(self
            .read()
            .values()
            .filter(|r| &r.category == category)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InMemoryResourceDirectory {
        InMemoryResourceDirectory::from_resources([
            ResourceDescriptor::new("dr-wang", "doctor", 2),
            ResourceDescriptor::new("dr-li", "doctor", 4),
            ResourceDescriptor::new("mri-1", "equipment", 1),
        ])
    }

    #[tokio::test]
    async fn test_list_candidates_by_category() {
        let directory = catalog();
        let doctors = directory
            .list_candidates(&ResourceCategory::new("doctor"), &HardConstraints::default())
            .await
            .unwrap();
        let ids: Vec<&str> = doctors.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["dr-li", "dr-wang"]);
    }

    #[tokio::test]
    async fn test_add_remove_update() {
        let directory = catalog();
        assert_eq!(directory.len(), 3);

        assert!(directory.update_status(&ResourceId::new("dr-li"), ResourceStatus::Offline));
        assert_eq!(
            directory.get(&ResourceId::new("dr-li")).unwrap().status,
            ResourceStatus::Offline
        );
        assert!(!directory.update_status(&ResourceId::new("ghost"), ResourceStatus::Busy));

        let previous = directory.add(ResourceDescriptor::new("dr-li", "doctor", 8));
        assert_eq!(previous.unwrap().capacity, 4);
        assert_eq!(directory.get(&ResourceId::new("dr-li")).unwrap().capacity, 8);

        assert!(directory.remove(&ResourceId::new("mri-1")).is_some());
        assert!(directory.remove(&ResourceId::new("mri-1")).is_none());
        let equipment = directory
            .list_candidates(&ResourceCategory::new("equipment"), &HardConstraints::default())
            .await
            .unwrap();
        assert!(equipment.is_empty());
    }
}

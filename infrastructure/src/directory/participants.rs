//! Participant directory backed by a map

use crate::config::FileParticipantConfig;
use async_trait::async_trait;
use consilium_application::{DirectoryError, ParticipantDirectory, ParticipantRef};
use consilium_domain::ParticipantId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    endpoint: String,
    available: bool,
}

/// Participants known at startup, each with an availability flag
#[derive(Debug, Default)]
pub struct InMemoryParticipantDirectory {
    entries: RwLock<HashMap<ParticipantId, Entry>>,
}

impl InMemoryParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[[participants]]` catalog; disabled entries start unavailable
    pub fn from_config(participants: &[FileParticipantConfig]) -> Self {
        let directory = Self::new();
        for participant in participants {
            directory.register(participant.id.as_str(), participant.endpoint.clone());
            if participant.disabled {
                directory.set_available(&ParticipantId::from(participant.id.as_str()), false);
            }
        }
        directory
    }

    /// Add or replace a participant; it starts available
    pub fn register(&self, id: impl Into<ParticipantId>, endpoint: impl Into<String>) {
        let id = id.into();
        debug!("Registering participant {}", id);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Entry {
                    endpoint: endpoint.into(),
                    available: true,
                },
            );
    }

    /// Mark a participant (un)available; false when unknown
    pub fn set_available(&self, id: &ParticipantId, available: bool) -> bool {
        match self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(id)
        {
            Some(entry) => {
                entry.available = available;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryParticipantDirectory {
    async fn list_available(&self, participant: &ParticipantId) -> Result<Vec<ParticipantRef>, DirectoryError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(participant)
            .filter(|entry| entry.available && !entry.endpoint.trim().is_empty())
            .map(|entry| ParticipantRef::new(participant.clone(), entry.endpoint.clone()))
            .into_iter()
            .collect())
    }
}

//! JSON input files for the `decide` and `schedule` commands

use anyhow::{Context, Result, bail};
use consilium_domain::{
    DecisionCategory, DecisionContext, ParticipantId, Priority, ResourceDescriptor,
    ScheduleId, SchedulingRequest,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Input for `consilium decide`
#[derive(Debug, Clone, Deserialize)]
pub struct DecideInput {
    pub category: DecisionCategory,
    /// Explicit panel; the configured panel for the category otherwise
    #[serde(default)]
    pub participants: Option<Vec<ParticipantId>>,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub context: DecisionContext,
    /// Canned vote payloads keyed by participant; skips the network
    #[serde(default)]
    pub votes: HashMap<ParticipantId, Value>,
}

/// Input for `consilium schedule`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleInput {
    /// Extra resources on top of the configured catalog
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
    /// Raw requests; missing ids and durations are filled in before parsing
    #[serde(default)]
    pub requests: Vec<Value>,
}

impl ScheduleInput {
    /// Parse the raw requests, applying `default_duration_minutes` and
    /// generating ids where the input omits them
    pub fn scheduling_requests(&self, default_duration_minutes: u32) -> Result<Vec<SchedulingRequest>> {
        self.requests
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let Value::Object(mut fields) = raw.clone() else {
                    bail!("requests[{}]: expected an object", index);
                };
                fields
                    .entry("id")
                    .or_insert_with(|| Value::String(ScheduleId::generate().to_string()));
                fields
                    .entry("duration_minutes")
                    .or_insert_with(|| Value::from(default_duration_minutes));
                serde_json::from_value(Value::Object(fields))
                    .with_context(|| format!("requests[{}]: invalid scheduling request", index))
            })
            .collect()
    }
}

/// Read and deserialize a JSON input file
pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

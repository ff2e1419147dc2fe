//! Lifecycle event output (`[events]` section)

use serde::{Deserialize, Serialize};

/// Where lifecycle events go
///
/// With `jsonl_path` set, events are appended to that file as JSON lines.
/// With `log` set, they are also logged through tracing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEventsConfig {
    pub jsonl_path: Option<String>,
    pub log: bool,
}

impl Default for FileEventsConfig {
    fn default() -> Self {
        Self {
            jsonl_path: None,
            log: true,
        }
    }
}

//! Participant and resource catalogs (`[[participants]]`, `[[resources]]`)
//!
//! ```toml
//! [[participants]]
//! id = "xiaoai"
//! endpoint = "http://xiaoai-service:8080"
//!
//! [[resources]]
//! id = "dr-li"
//! category = "doctor"
//! capacity = 4
//! capabilities = ["cardiology", "tcm"]
//! quality = { rating = 4.6, cost = 120.0 }
//! ```

use serde::{Deserialize, Serialize};

/// One participant reachable for votes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileParticipantConfig {
    pub id: String,
    /// Base URL of the participant's vote service
    pub endpoint: String,
    /// Listed but not offered for votes
    #[serde(default)]
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::super::FileConfig;
    use consilium_domain::ResourceStatus;

    #[test]
    fn test_catalog_deserialize() {
        let toml_str = r#"
[[participants]]
id = "xiaoai"
endpoint = "http://xiaoai:8080"

[[participants]]
id = "soer"
endpoint = "http://soer:8080"
disabled = true

[[resources]]
id = "dr-li"
category = "doctor"
capacity = 4
capabilities = ["cardiology"]
quality = { rating = 4.5 }

[[resources]]
id = "mri-1"
category = "equipment"
capacity = 1
status = "maintenance"
location = { lat = 31.23, lon = 121.47 }
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.participants.len(), 2);
        assert!(config.participants[1].disabled);

        assert_eq!(config.resources.len(), 2);
        let dr_li = &config.resources[0];
        assert_eq!(dr_li.capacity, 4);
        assert!(dr_li.capabilities.contains("cardiology"));
        assert_eq!(dr_li.quality.rating, 4.5);
        assert_eq!(dr_li.status, ResourceStatus::Available);
        assert_eq!(config.resources[1].status, ResourceStatus::Maintenance);
        assert!(config.resources[1].location.is_some());
    }
}

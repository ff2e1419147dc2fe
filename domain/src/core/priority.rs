//! Priority and urgency vocabulary shared by both subsystems.

use serde::{Deserialize, Serialize};

/// Priority of a decision request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "normal" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "emergency" => Ok(Priority::Emergency),
            _ => Err(format!(
                "Unknown priority: {}. Valid: low, medium, high, emergency",
                s
            )),
        }
    }
}

/// Urgency of a scheduling request
///
/// Ordered from least to most urgent. [`Urgency::weight`] feeds the
/// pending-queue priority score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
    Emergency,
}

impl Urgency {
    /// Base weight in the pending-queue priority score
    pub fn weight(&self) -> f64 {
        match self {
            Urgency::Low => 0.0,
            Urgency::Normal => 10.0,
            Urgency::High => 20.0,
            Urgency::Urgent => 30.0,
            Urgency::Emergency => 50.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::High => "high",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        }
    }
}

impl From<Priority> for Urgency {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => Urgency::Low,
            Priority::Medium => Urgency::Normal,
            Priority::High => Urgency::High,
            Priority::Emergency => Urgency::Emergency,
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "normal" | "medium" => Ok(Urgency::Normal),
            "high" => Ok(Urgency::High),
            "urgent" => Ok(Urgency::Urgent),
            "emergency" => Ok(Urgency::Emergency),
            _ => Err(format!(
                "Unknown urgency: {}. Valid: low, normal, high, urgent, emergency",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_ordering() {
        assert!(Urgency::Emergency > Urgency::Urgent);
        assert!(Urgency::High > Urgency::Normal);
        assert!(Urgency::Emergency.weight() > Urgency::Low.weight());
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!("HIGH".parse::<Priority>().ok(), Some(Priority::High));
        assert_eq!("normal".parse::<Priority>().ok(), Some(Priority::Medium));
        assert!("sometime".parse::<Priority>().is_err());
    }

    #[test]
    fn test_parse_urgency() {
        assert_eq!("urgent".parse::<Urgency>().ok(), Some(Urgency::Urgent));
        assert_eq!("medium".parse::<Urgency>().ok(), Some(Urgency::Normal));
    }

    #[test]
    fn test_priority_to_urgency() {
        assert_eq!(Urgency::from(Priority::Emergency), Urgency::Emergency);
        assert_eq!(Urgency::from(Priority::Medium), Urgency::Normal);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Urgency::Emergency).unwrap();
        assert_eq!(json, "\"emergency\"");
        let p: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(p, Priority::Low);
    }
}

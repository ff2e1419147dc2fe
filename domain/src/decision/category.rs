//! Decision categories

use serde::{Deserialize, Serialize};

/// Kind of decision a request asks participants to make
///
/// The category selects the domain weight table used by the weighted and
/// expert-lead policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCategory {
    HealthAssessment,
    DiagnosisAnalysis,
    TreatmentPlanning,
    LifestyleGuidance,
    EmergencyResponse,
    PreventiveCare,
    SyndromeDifferentiation,
}

impl DecisionCategory {
    pub const ALL: [DecisionCategory; 7] = [
        DecisionCategory::HealthAssessment,
        DecisionCategory::DiagnosisAnalysis,
        DecisionCategory::TreatmentPlanning,
        DecisionCategory::LifestyleGuidance,
        DecisionCategory::EmergencyResponse,
        DecisionCategory::PreventiveCare,
        DecisionCategory::SyndromeDifferentiation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionCategory::HealthAssessment => "health_assessment",
            DecisionCategory::DiagnosisAnalysis => "diagnosis_analysis",
            DecisionCategory::TreatmentPlanning => "treatment_planning",
            DecisionCategory::LifestyleGuidance => "lifestyle_guidance",
            DecisionCategory::EmergencyResponse => "emergency_response",
            DecisionCategory::PreventiveCare => "preventive_care",
            DecisionCategory::SyndromeDifferentiation => "syndrome_differentiation",
        }
    }

    /// Whether this category calls for a reduced, fast-responding panel
    pub fn is_emergency(&self) -> bool {
        matches!(self, DecisionCategory::EmergencyResponse)
    }
}

impl std::fmt::Display for DecisionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DecisionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('-', "_");
        DecisionCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unknown decision category: {}. Valid: {}",
                    s,
                    DecisionCategory::ALL
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!(
            "diagnosis-analysis".parse::<DecisionCategory>().ok(),
            Some(DecisionCategory::DiagnosisAnalysis)
        );
        assert_eq!(
            "EMERGENCY_RESPONSE".parse::<DecisionCategory>().ok(),
            Some(DecisionCategory::EmergencyResponse)
        );
        let err = "astrology".parse::<DecisionCategory>().unwrap_err();
        assert!(err.contains("health_assessment"));
    }

    #[test]
    fn test_display_matches_serde() {
        for category in DecisionCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category));
        }
    }
}

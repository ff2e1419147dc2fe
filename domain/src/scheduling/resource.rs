//! Resource descriptors and eligibility checks

use crate::scheduling::request::{GeoPoint, HardConstraints, ResourceCategory, SchedulingRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of a schedulable resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Operational status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    #[default]
    Available,
    Busy,
    Offline,
    Maintenance,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Available => "available",
            ResourceStatus::Busy => "busy",
            ResourceStatus::Offline => "offline",
            ResourceStatus::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(ResourceStatus::Available),
            "busy" => Ok(ResourceStatus::Busy),
            "offline" => Ok(ResourceStatus::Offline),
            "maintenance" => Ok(ResourceStatus::Maintenance),
            _ => Err(format!(
                "Unknown resource status: {}. Valid: available, busy, offline, maintenance",
                s
            )),
        }
    }
}

/// Static quality attributes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quality {
    /// Declared rating, typically 0-5
    pub rating: f64,
    pub cost: f64,
}

/// A capacity-constrained schedulable entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
    pub category: ResourceCategory,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Maximum concurrent units
    pub capacity: u32,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Why a resource is not eligible for a request
#[derive(Debug, Clone, PartialEq)]
pub enum Ineligible {
    NotAvailable(ResourceStatus),
    CategoryMismatch,
    MissingCapability(String),
    CostExceeded { cost: f64, max: f64 },
    TooFar { distance_km: f64, max: f64 },
}

impl std::fmt::Display for Ineligible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ineligible::NotAvailable(status) => write!(f, "resource is {}", status),
            Ineligible::CategoryMismatch => write!(f, "category mismatch"),
            Ineligible::MissingCapability(tag) => write!(f, "missing capability '{}'", tag),
            Ineligible::CostExceeded { cost, max } => write!(f, "cost {} exceeds {}", cost, max),
            Ineligible::TooFar { distance_km, max } => {
                write!(f, "distance {:.1} km exceeds {} km", distance_km, max)
            }
        }
    }
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<ResourceId>, category: impl Into<ResourceCategory>, capacity: u32) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            category: category.into(),
            capabilities: BTreeSet::new(),
            capacity,
            status: ResourceStatus::Available,
            quality: Quality::default(),
            location: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.quality.rating = rating;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.quality.cost = cost;
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_available(&self) -> bool {
        self.status == ResourceStatus::Available
    }

    /// Check the hard constraints alone.
    ///
    /// A distance limit is only enforced when both sides have a location.
    pub fn satisfies(&self, constraints: &HardConstraints, origin: Option<&GeoPoint>) -> Result<(), Ineligible> {
        if let Some(missing) = constraints
            .required_capabilities
            .iter()
            .find(|tag| !self.capabilities.contains(*tag))
        {
            return Err(Ineligible::MissingCapability(missing.clone()));
        }
        if let Some(max) = constraints.max_cost
            && self.quality.cost > max
        {
            return Err(Ineligible::CostExceeded {
                cost: self.quality.cost,
                max,
            });
        }
        if let (Some(max), Some(origin), Some(location)) =
            (constraints.max_distance_km, origin, self.location.as_ref())
        {
            let distance_km = origin.distance_km(location);
            if distance_km > max {
                return Err(Ineligible::TooFar { distance_km, max });
            }
        }
        Ok(())
    }

    /// Full eligibility: available, same category, hard constraints met
    pub fn eligibility(&self, request: &SchedulingRequest) -> Result<(), Ineligible> {
        if !self.is_available() {
            return Err(Ineligible::NotAvailable(self.status));
        }
        if self.category != request.category {
            return Err(Ineligible::CategoryMismatch);
        }
        self.satisfies(&request.constraints, request.location.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor() -> ResourceDescriptor {
        ResourceDescriptor::new("dr-li", "doctor", 2)
            .with_capability("tcm")
            .with_capability("acupuncture")
            .with_cost(200.0)
            .with_location(GeoPoint::new(39.90, 116.40))
    }

    #[test]
    fn test_eligible() {
        let request = SchedulingRequest::new("u-1", "doctor")
            .with_constraints(HardConstraints::default().with_required("tcm").with_max_cost(300.0));
        assert!(doctor().eligibility(&request).is_ok());
    }

    #[test]
    fn test_not_available() {
        let request = SchedulingRequest::new("u-1", "doctor");
        let resource = doctor().with_status(ResourceStatus::Maintenance);
        assert_eq!(
            resource.eligibility(&request),
            Err(Ineligible::NotAvailable(ResourceStatus::Maintenance))
        );
    }

    #[test]
    fn test_constraint_violations() {
        let base = SchedulingRequest::new("u-1", "doctor");

        let missing = base
            .clone()
            .with_constraints(HardConstraints::default().with_required("surgery"));
        assert_eq!(
            doctor().eligibility(&missing),
            Err(Ineligible::MissingCapability("surgery".to_string()))
        );

        let cheap = base
            .clone()
            .with_constraints(HardConstraints::default().with_max_cost(100.0));
        assert!(matches!(doctor().eligibility(&cheap), Err(Ineligible::CostExceeded { .. })));

        let far = base
            .clone()
            .with_location(GeoPoint::new(31.23, 121.47))
            .with_constraints(HardConstraints::default().with_max_distance_km(50.0));
        assert!(matches!(doctor().eligibility(&far), Err(Ineligible::TooFar { .. })));

        let other = SchedulingRequest::new("u-1", "equipment");
        assert_eq!(doctor().eligibility(&other), Err(Ineligible::CategoryMismatch));
    }

    #[test]
    fn test_distance_ignored_without_origin() {
        let request = SchedulingRequest::new("u-1", "doctor")
            .with_constraints(HardConstraints::default().with_max_distance_km(1.0));
        assert!(doctor().eligibility(&request).is_ok());
    }
}

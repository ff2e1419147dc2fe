//! Scheduling requests, time windows and hard constraints

use crate::core::error::DomainError;
use crate::core::priority::Urgency;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default requested duration when none is given
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Identifier of a scheduling request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(String);

impl ScheduleId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScheduleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Category of schedulable resource (e.g. "doctor", "equipment")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceCategory(String);

impl ResourceCategory {
    pub fn new(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceCategory {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Half-open interval `[start, end)` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    /// Window of `minutes` starting at `start`
    pub fn starting_at(start: DateTime<Utc>, minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.end <= self.start {
            return Err(DomainError::InvalidWindow(format!(
                "end {} is not after start {}",
                self.end.to_rfc3339(),
                self.start.to_rfc3339()
            )));
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether a slot of `minutes` fits inside the window
    pub fn fits(&self, minutes: u32) -> bool {
        self.duration() >= Duration::minutes(i64::from(minutes))
    }

    /// Morning (09:00) and afternoon (14:00) windows for the next seven days
    ///
    /// Each window is three hours long. Used when a request lists no
    /// preferred windows.
    pub fn default_slots(now: DateTime<Utc>) -> Vec<TimeWindow> {
        let mut slots = Vec::with_capacity(14);
        for day in 1..=7 {
            let date = (now + Duration::days(day)).date_naive();
            for hour in [9, 14] {
                if let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) {
                    let start = date.and_time(time).and_utc();
                    slots.push(TimeWindow {
                        start,
                        end: start + Duration::hours(3),
                    });
                }
            }
        }
        slots
    }
}

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in kilometres (haversine)
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Constraints a candidate must satisfy to be eligible at all
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardConstraints {
    pub max_distance_km: Option<f64>,
    pub max_cost: Option<f64>,
    pub required_capabilities: BTreeSet<String>,
}

impl HardConstraints {
    pub fn with_max_distance_km(mut self, km: f64) -> Self {
        self.max_distance_km = Some(km);
        self
    }

    pub fn with_max_cost(mut self, cost: f64) -> Self {
        self.max_cost = Some(cost);
        self
    }

    pub fn with_required(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }
}

/// Soft matching input: tags the requester would like the resource to have
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchProfile {
    pub tags: BTreeSet<String>,
    /// Free-form attributes carried along for external scorers
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl MatchProfile {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// A request for a resource slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingRequest {
    pub id: ScheduleId,
    pub requester: String,
    pub category: ResourceCategory,
    /// Preferred windows in order of preference
    #[serde(default)]
    pub preferred_windows: Vec<TimeWindow>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub profile: MatchProfile,
    #[serde(default)]
    pub constraints: HardConstraints,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    /// Concurrent capacity units consumed while allocated
    #[serde(default = "default_units")]
    pub units: f64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

fn default_units() -> f64 {
    1.0
}

impl SchedulingRequest {
    pub fn new(requester: impl Into<String>, category: impl Into<ResourceCategory>) -> Self {
        Self {
            id: ScheduleId::generate(),
            requester: requester.into(),
            category: category.into(),
            preferred_windows: Vec::new(),
            urgency: Urgency::default(),
            profile: MatchProfile::default(),
            constraints: HardConstraints::default(),
            location: None,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            units: 1.0,
            created_at: Utc::now(),
            deadline: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ScheduleId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.preferred_windows.push(window);
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_profile(mut self, profile: MatchProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_constraints(mut self, constraints: HardConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_units(mut self, units: f64) -> Self {
        self.units = units;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Check structural invariants at submission time `now`
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.category.as_str().trim().is_empty() {
            return Err(DomainError::EmptyCategory);
        }
        if self.duration_minutes == 0 {
            return Err(DomainError::NonPositiveDuration);
        }
        if !self.units.is_finite() || self.units <= 0.0 {
            return Err(DomainError::InvalidUnits(self.units));
        }
        if let Some(deadline) = self.deadline
            && deadline <= now
        {
            return Err(DomainError::DeadlineInPast(deadline.to_rfc3339()));
        }
        for window in &self.preferred_windows {
            window.validate()?;
        }
        Ok(())
    }

    /// Candidate slots: one per preferred window that can hold the duration
    ///
    /// Falls back to [`TimeWindow::default_slots`] when the request lists no
    /// windows.
    pub fn candidate_slots(&self, now: DateTime<Utc>) -> Vec<TimeWindow> {
        let windows = if self.preferred_windows.is_empty() {
            TimeWindow::default_slots(now)
        } else {
            self.preferred_windows.clone()
        };
        windows
            .into_iter()
            .filter(|w| w.fits(self.duration_minutes))
            .map(|w| TimeWindow::starting_at(w.start, self.duration_minutes))
            .collect()
    }
}

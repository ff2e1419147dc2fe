//! Allocations and scheduling request states

use crate::scheduling::request::{ScheduleId, TimeWindow};
use crate::scheduling::resource::ResourceId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Number of alternative options kept with an allocation
pub const MAX_ALTERNATIVES: usize = 3;

/// Lifecycle state of a scheduling request
///
/// `Pending → Matched → Allocated → {InProgress → Completed | Cancelled | Rescheduled}`.
/// A pending request whose deadline passes becomes `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    Pending,
    Matched,
    Allocated,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
    Expired,
}

impl ScheduleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScheduleState::Completed | ScheduleState::Cancelled | ScheduleState::Expired
        )
    }

    /// Whether the request may still be cancelled
    pub fn is_cancellable(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleState::Pending => "pending",
            ScheduleState::Matched => "matched",
            ScheduleState::Allocated => "allocated",
            ScheduleState::InProgress => "in_progress",
            ScheduleState::Completed => "completed",
            ScheduleState::Cancelled => "cancelled",
            ScheduleState::Rescheduled => "rescheduled",
            ScheduleState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of an allocation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AllocationStatus {
    /// Whether the allocation still holds reserved capacity
    pub fn holds_capacity(&self) -> bool {
        matches!(
            self,
            AllocationStatus::Confirmed | AllocationStatus::InProgress | AllocationStatus::Rescheduled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Confirmed => "confirmed",
            AllocationStatus::InProgress => "in_progress",
            AllocationStatus::Completed => "completed",
            AllocationStatus::Cancelled => "cancelled",
            AllocationStatus::Rescheduled => "rescheduled",
        }
    }
}

impl std::fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A runner-up resource recorded at match time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeOption {
    pub resource_id: ResourceId,
    pub score: f64,
}

/// A confirmed assignment of a request to a resource slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub request_id: ScheduleId,
    pub resource_id: ResourceId,
    pub scheduled_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub units: f64,
    /// Match confidence in `[0, 1]`
    pub score: f64,
    pub status: AllocationStatus,
    #[serde(default)]
    pub alternatives: Vec<AlternativeOption>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Allocation {
    pub fn new(
        request_id: ScheduleId,
        resource_id: ResourceId,
        slot: TimeWindow,
        units: f64,
        score: f64,
    ) -> Self {
        let now = Utc::now();
        let minutes = slot.duration().num_minutes().max(0);
        Self {
            request_id,
            resource_id,
            scheduled_time: slot.start,
            duration_minutes: u32::try_from(minutes).unwrap_or(u32::MAX),
            units,
            score,
            status: AllocationStatus::Confirmed,
            alternatives: Vec::new(),
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_alternatives(mut self, mut alternatives: Vec<AlternativeOption>) -> Self {
        alternatives.truncate(MAX_ALTERNATIVES);
        self.alternatives = alternatives;
        self
    }

    /// Time slot this allocation occupies
    pub fn slot(&self) -> TimeWindow {
        TimeWindow::starting_at(self.scheduled_time, self.duration_minutes)
    }

    /// Whether the allocation starts later than `horizon` from `now`
    pub fn starts_after(&self, now: DateTime<Utc>, horizon: Duration) -> bool {
        now.checked_add_signed(horizon)
            .is_some_and(|limit| self.scheduled_time > limit)
    }

    pub fn set_status(&mut self, status: AllocationStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
        self.updated_at = Utc::now();
    }
}

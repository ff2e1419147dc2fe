//! Port for lifecycle notifications.
//!
//! Defines the [`EventSink`] trait used to announce decision and scheduling
//! state transitions to external observers.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port carries machine-readable
//! lifecycle events.

use consilium_domain::{DecisionId, DecisionStatus, ResourceId, ScheduleId, ScheduleState};
use serde_json::{Value, json};

/// A lifecycle event.
///
/// Each event has a type string (e.g. `decision_completed`,
/// `schedule_allocated`) and a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub event_type: String,
    pub payload: Value,
}

impl LifecycleEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    /// Decision transition; the consensus score is only set for terminal states
    pub fn decision(request_id: &DecisionId, status: DecisionStatus, consensus_score: Option<f64>) -> Self {
        let mut payload = json!({
            "request_id": request_id,
            "status": status,
        });
        if let Some(score) = consensus_score {
            payload["consensus_score"] = json!(score);
        }
        Self::new(format!("decision_{}", status), payload)
    }

    /// Scheduling transition
    pub fn schedule(request_id: &ScheduleId, state: ScheduleState, resource_id: Option<&ResourceId>) -> Self {
        let mut payload = json!({
            "request_id": request_id,
            "state": state,
        });
        if let Some(resource_id) = resource_id {
            payload["resource_id"] = json!(resource_id);
        }
        Self::new(format!("schedule_{}", state), payload)
    }
}

/// Port for publishing lifecycle events.
///
/// `publish` is synchronous and non-fallible: a failing sink must never
/// affect decision or scheduling correctness, so implementations swallow
/// their own errors.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: LifecycleEvent);
}

/// No-op implementation for tests and when notifications are disabled.
pub struct NoEventSink;

impl EventSink for NoEventSink {
    fn publish(&self, _event: LifecycleEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_event() {
        let event = LifecycleEvent::decision(&DecisionId::new("d-1"), DecisionStatus::Completed, Some(0.65));
        assert_eq!(event.event_type, "decision_completed");
        assert_eq!(event.payload["request_id"], "d-1");
        assert_eq!(event.payload["status"], "completed");
        assert_eq!(event.payload["consensus_score"], 0.65);
    }

    #[test]
    fn test_non_terminal_decision_event_has_no_score() {
        let event = LifecycleEvent::decision(&DecisionId::new("d-1"), DecisionStatus::Collecting, None);
        assert_eq!(event.event_type, "decision_collecting");
        assert!(event.payload.get("consensus_score").is_none());
    }

    #[test]
    fn test_schedule_event() {
        let event = LifecycleEvent::schedule(
            &ScheduleId::new("s-1"),
            ScheduleState::Allocated,
            Some(&ResourceId::new("dr-li")),
        );
        assert_eq!(event.event_type, "schedule_allocated");
        assert_eq!(event.payload["resource_id"], "dr-li");
    }
}

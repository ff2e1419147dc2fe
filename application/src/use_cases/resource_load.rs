//! Resource load tracking
//!
//! Keeps the live [`ResourceLoad`] of every known resource together with the
//! reservations that make it up. Everything sits behind a single mutex, so
//! [`ResourceLoadTracker::try_reserve`] is an atomic check-and-reserve: two
//! concurrent callers can never both take the last free unit of a slot.

use consilium_domain::{ResourceId, ResourceLoad, ScheduleId, TimeWindow};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Slack for floating point unit sums
const UNIT_EPSILON: f64 = 1e-9;

/// Errors from reservation bookkeeping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReserveError {
    #[error("Resource {0} is not tracked")]
    UnknownResource(ResourceId),

    #[error("Resource {resource_id} has {available} of {requested} units free in the slot")]
    InsufficientCapacity {
        resource_id: ResourceId,
        requested: f64,
        available: f64,
    },

    #[error("Request {0} already holds a reservation")]
    AlreadyReserved(ScheduleId),

    #[error("Request {0} holds no reservation")]
    UnknownReservation(ScheduleId),
}

impl ReserveError {
    pub fn is_capacity(&self) -> bool {
        matches!(self, ReserveError::InsufficientCapacity { .. })
    }
}

/// Capacity held by one scheduling request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub resource_id: ResourceId,
    pub slot: TimeWindow,
    pub units: f64,
}

/// Aggregate view over all tracked resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadStatistics {
    pub total_resources: usize,
    pub average_utilization: f64,
    pub high_utilization: usize,
    pub low_utilization: usize,
    pub total_queue_length: usize,
}

#[derive(Default)]
struct TrackerState {
    loads: HashMap<ResourceId, ResourceLoad>,
    reservations: HashMap<ScheduleId, Reservation>,
}

impl TrackerState {
    /// Highest concurrent units already reserved on `resource_id` during `slot`
    ///
    /// Concurrency can only peak at the start of the slot or at the start of
    /// an overlapping reservation, so those instants are the only ones checked.
    fn peak_units(&self, resource_id: &ResourceId, slot: &TimeWindow, exclude: Option<&ScheduleId>) -> f64 {
        let overlapping: Vec<&Reservation> = self
            .reservations
            .iter()
            .filter(|(id, r)| {
                Some(*id) != exclude && &r.resource_id == resource_id && r.slot.overlaps(slot)
            })
            .map(|(_, r)| r)
            .collect();

        std::iter::once(slot.start)
            .chain(
                overlapping
                    .iter()
                    .map(|r| r.slot.start)
                    .filter(|start| *start > slot.start),
            )
            .map(|instant| {
                overlapping
                    .iter()
                    .filter(|r| r.slot.start <= instant && instant < r.slot.end)
                    .map(|r| r.units)
                    .sum::<f64>()
            })
            .fold(0.0, f64::max)
    }

    fn check_capacity(
        &self,
        resource_id: &ResourceId,
        slot: &TimeWindow,
        units: f64,
        exclude: Option<&ScheduleId>,
    ) -> Result<(), ReserveError> {
        let load = self
            .loads
            .get(resource_id)
            .ok_or_else(|| ReserveError::UnknownResource(resource_id.clone()))?;
        let available = f64::from(load.capacity) - self.peak_units(resource_id, slot, exclude);
        if units > available + UNIT_EPSILON {
            return Err(ReserveError::InsufficientCapacity {
                resource_id: resource_id.clone(),
                requested: units,
                available: available.max(0.0),
            });
        }
        Ok(())
    }
}

/// Live load bookkeeping for all resources
#[derive(Default)]
pub struct ResourceLoadTracker {
    state: Mutex<TrackerState>,
}

impl ResourceLoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a resource, or update its capacity
    pub fn register(&self, resource_id: &ResourceId, capacity: u32) {
        let mut state = self.state();
        match state.loads.get_mut(resource_id) {
            Some(load) if load.capacity != capacity => {
                debug!("Capacity of {} changed to {}", resource_id, capacity);
                load.set_capacity(capacity);
            }
            Some(_) => {}
            None => {
                state
                    .loads
                    .insert(resource_id.clone(), ResourceLoad::new(resource_id.clone(), capacity));
            }
        }
    }

    /// Stop tracking a resource with no outstanding reservations
    pub fn deregister(&self, resource_id: &ResourceId) -> bool {
        let mut state = self.state();
        if state.reservations.values().any(|r| &r.resource_id == resource_id) {
            return false;
        }
        state.loads.remove(resource_id).is_some()
    }

    /// Atomically check capacity for `slot` and reserve `units`
    pub fn try_reserve(
        &self,
        request_id: &ScheduleId,
        resource_id: &ResourceId,
        slot: TimeWindow,
        units: f64,
    ) -> Result<(), ReserveError> {
        let mut state = self.state();
        if state.reservations.contains_key(request_id) {
            return Err(ReserveError::AlreadyReserved(request_id.clone()));
        }
        state.check_capacity(resource_id, &slot, units, None)?;

        if let Some(load) = state.loads.get_mut(resource_id) {
            load.add(units);
        }
        state.reservations.insert(
            request_id.clone(),
            Reservation {
                resource_id: resource_id.clone(),
                slot,
                units,
            },
        );
        debug!("Reserved {} units on {} for {}", units, resource_id, request_id);
        Ok(())
    }

    /// Release the reservation held by `request_id`, returning it
    pub fn release(&self, request_id: &ScheduleId) -> Option<Reservation> {
        let mut state = self.state();
        let reservation = state.reservations.remove(request_id)?;
        if let Some(load) = state.loads.get_mut(&reservation.resource_id) {
            load.remove(reservation.units);
        }
        debug!(
            "Released {} units on {} held by {}",
            reservation.units, reservation.resource_id, request_id
        );
        Some(reservation)
    }

    /// Atomically move a reservation to another resource for the same slot
    pub fn transfer(&self, request_id: &ScheduleId, to: &ResourceId) -> Result<ResourceId, ReserveError> {
        let mut state = self.state();
        let reservation = state
            .reservations
            .get(request_id)
            .cloned()
            .ok_or_else(|| ReserveError::UnknownReservation(request_id.clone()))?;
        state.check_capacity(to, &reservation.slot, reservation.units, Some(request_id))?;

        if let Some(load) = state.loads.get_mut(&reservation.resource_id) {
            load.remove(reservation.units);
        }
        if let Some(load) = state.loads.get_mut(to) {
            load.add(reservation.units);
        }
        if let Some(held) = state.reservations.get_mut(request_id) {
            held.resource_id = to.clone();
        }
        info!(
            "Moved reservation of {} from {} to {}",
            request_id, reservation.resource_id, to
        );
        Ok(reservation.resource_id)
    }

    pub fn reservation(&self, request_id: &ScheduleId) -> Option<Reservation> {
        self.state().reservations.get(request_id).cloned()
    }

    pub fn get_load(&self, resource_id: &ResourceId) -> Option<ResourceLoad> {
        self.state().loads.get(resource_id).cloned()
    }

    /// Consistent copy of every tracked load
    pub fn snapshot(&self) -> HashMap<ResourceId, ResourceLoad> {
        self.state().loads.clone()
    }

    /// Record how long a request waited before service started
    pub fn record_wait(&self, resource_id: &ResourceId, minutes: f64) {
        if let Some(load) = self.state().loads.get_mut(resource_id) {
            load.record_wait(minutes);
        }
    }

    pub fn statistics(&self, high: f64, low: f64) -> LoadStatistics {
        let state = self.state();
        let total = state.loads.len();
        let average = if total == 0 {
            0.0
        } else {
            state.loads.values().map(|l| l.utilization).sum::<f64>() / total as f64
        };
        LoadStatistics {
            total_resources: total,
            average_utilization: average,
            high_utilization: state.loads.values().filter(|l| l.utilization > high).count(),
            low_utilization: state.loads.values().filter(|l| l.utilization < low).count(),
            total_queue_length: state.loads.values().map(|l| l.queue_length).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, hour, minute, 0).unwrap()
    }

    fn slot(start_hour: u32, minutes: u32) -> TimeWindow {
        TimeWindow::starting_at(at(start_hour, 0), minutes)
    }

    fn tracker_with(resource: &str, capacity: u32) -> (ResourceLoadTracker, ResourceId) {
        let tracker = ResourceLoadTracker::new();
        let id = ResourceId::new(resource);
        tracker.register(&id, capacity);
        (tracker, id)
    }

    #[test]
    fn test_reserve_until_full() {
        let (tracker, id) = tracker_with("dr-li", 2);
        tracker.try_reserve(&ScheduleId::new("s1"), &id, slot(9, 60), 1.0).unwrap();
        tracker.try_reserve(&ScheduleId::new("s2"), &id, slot(9, 60), 1.0).unwrap();

        let err = tracker
            .try_reserve(&ScheduleId::new("s3"), &id, slot(9, 60), 1.0)
            .unwrap_err();
        assert!(err.is_capacity());

        // A disjoint slot is still free
        tracker.try_reserve(&ScheduleId::new("s3"), &id, slot(11, 60), 1.0).unwrap();

        let load = tracker.get_load(&id).unwrap();
        assert_eq!(load.current_load, 3.0);
        assert_eq!(load.queue_length, 3);
    }

    #[test]
    fn test_peak_considers_actual_concurrency() {
        let (tracker, id) = tracker_with("room", 2);
        // 09:00-10:00 and 10:00-11:00 never run at the same time
        tracker.try_reserve(&ScheduleId::new("a"), &id, slot(9, 60), 1.0).unwrap();
        tracker.try_reserve(&ScheduleId::new("b"), &id, slot(10, 60), 1.0).unwrap();
        // 09:00-11:00 overlaps each of them, but only one at a time
        tracker.try_reserve(&ScheduleId::new("c"), &id, slot(9, 120), 1.0).unwrap();
        // Now both instants are full
        assert!(tracker
            .try_reserve(&ScheduleId::new("d"), &id, TimeWindow::starting_at(at(10, 30), 10), 1.0)
            .is_err());
    }

    #[test]
    fn test_fractional_units() {
        let (tracker, id) = tracker_with("scanner", 1);
        tracker.try_reserve(&ScheduleId::new("a"), &id, slot(9, 30), 0.5).unwrap();
        tracker.try_reserve(&ScheduleId::new("b"), &id, slot(9, 30), 0.5).unwrap();
        assert!(tracker.try_reserve(&ScheduleId::new("c"), &id, slot(9, 30), 0.1).is_err());
    }

    #[test]
    fn test_release_returns_exact_units() {
        let (tracker, id) = tracker_with("dr-wang", 4);
        tracker.try_reserve(&ScheduleId::new("a"), &id, slot(9, 60), 1.5).unwrap();
        tracker.try_reserve(&ScheduleId::new("b"), &id, slot(9, 60), 1.0).unwrap();

        let before = tracker.get_load(&id).unwrap().current_load;
        let released = tracker.release(&ScheduleId::new("a")).unwrap();
        let after = tracker.get_load(&id).unwrap().current_load;

        assert_eq!(released.units, 1.5);
        assert!((before - after - 1.5).abs() < 1e-9);
        assert!(tracker.release(&ScheduleId::new("a")).is_none());
    }

    #[test]
    fn test_unknown_resource_and_duplicate() {
        let (tracker, id) = tracker_with("dr-li", 1);
        let err = tracker
            .try_reserve(&ScheduleId::new("a"), &ResourceId::new("ghost"), slot(9, 60), 1.0)
            .unwrap_err();
        assert_eq!(err, ReserveError::UnknownResource(ResourceId::new("ghost")));

        tracker.try_reserve(&ScheduleId::new("a"), &id, slot(9, 60), 1.0).unwrap();
        assert_eq!(
            tracker.try_reserve(&ScheduleId::new("a"), &id, slot(12, 60), 1.0),
            Err(ReserveError::AlreadyReserved(ScheduleId::new("a")))
        );
    }

    #[test]
    fn test_transfer_moves_load() {
        let tracker = ResourceLoadTracker::new();
        let hot = ResourceId::new("hot");
        let cold = ResourceId::new("cold");
        tracker.register(&hot, 1);
        tracker.register(&cold, 1);
        tracker.try_reserve(&ScheduleId::new("a"), &hot, slot(9, 60), 1.0).unwrap();

        let from = tracker.transfer(&ScheduleId::new("a"), &cold).unwrap();
        assert_eq!(from, hot);
        assert_eq!(tracker.get_load(&hot).unwrap().current_load, 0.0);
        assert_eq!(tracker.get_load(&cold).unwrap().current_load, 1.0);
        assert_eq!(tracker.reservation(&ScheduleId::new("a")).unwrap().resource_id, cold);

        // cold is now full for that slot
        tracker.try_reserve(&ScheduleId::new("b"), &hot, slot(9, 60), 1.0).unwrap();
        assert!(tracker.transfer(&ScheduleId::new("b"), &cold).unwrap_err().is_capacity());
    }

    #[test]
    fn test_deregister_requires_no_reservations() {
        let (tracker, id) = tracker_with("dr-li", 1);
        tracker.try_reserve(&ScheduleId::new("a"), &id, slot(9, 60), 1.0).unwrap();
        assert!(!tracker.deregister(&id));
        tracker.release(&ScheduleId::new("a"));
        assert!(tracker.deregister(&id));
        assert!(tracker.get_load(&id).is_none());
    }

    #[test]
    fn test_statistics() {
        let tracker = ResourceLoadTracker::new();
        for (name, capacity, units) in [("a", 10, 9.0), ("b", 10, 2.0), ("c", 10, 5.0)] {
            let id = ResourceId::new(name);
            tracker.register(&id, capacity);
            tracker
                .try_reserve(&ScheduleId::new(format!("s-{}", name)), &id, slot(9, 60), units)
                .unwrap();
        }
        let stats = tracker.statistics(0.8, 0.3);
        assert_eq!(stats.total_resources, 3);
        assert_eq!(stats.high_utilization, 1);
        assert_eq!(stats.low_utilization, 1);
        assert!((stats.average_utilization - 16.0 / 30.0).abs() < 1e-9);
        assert_eq!(stats.total_queue_length, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_never_exceed_capacity() {
        let (tracker, id) = tracker_with("dr-zhang", 3);
        let tracker = Arc::new(tracker);

        let mut handles = Vec::new();
        for i in 0..16 {
            let tracker = Arc::clone(&tracker);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                tracker
                    .try_reserve(&ScheduleId::new(format!("s{}", i)), &id, slot(9, 60), 1.0)
                    .is_ok()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 3);
        assert_eq!(tracker.get_load(&id).unwrap().current_load, 3.0);
    }
}

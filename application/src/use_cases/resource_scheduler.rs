//! Resource scheduler
//!
//! Owns the lifecycle of every scheduling request:
//!
//! ```text
//! Pending → Matched → Allocated → { InProgress → Completed | Cancelled | Rescheduled }
//! Pending → Expired
//! ```
//!
//! `Matched` is an internal claim held while a request is being matched; it
//! keeps two passes from matching the same request. A request is only
//! `Allocated` after [`ResourceLoadTracker::try_reserve`] succeeded for the
//! exact slot, and the allocation is committed only if nobody cancelled the
//! request in the meantime. Otherwise the reservation is released again.
//!
//! Lock order: requests, then allocations. The tracker and the counters have
//! their own locks and are never held across the others.

use crate::config::SchedulerConfig;
use crate::ports::event_sink::{EventSink, LifecycleEvent};
use crate::ports::resource_directory::ResourceDirectory;
use crate::ports::weight_table::{DomainWeightTable, WeightKey};
use crate::use_cases::resource_load::{LoadStatistics, ResourceLoadTracker};
use chrono::{DateTime, Utc};
use consilium_domain::scheduling::engine::{priority_score, sort_pending};
use consilium_domain::util::mean;
use consilium_domain::{
    Allocation, AllocationStatus, AlternativeOption, DomainError, PendingTicket, ResourceId,
    ResourceLoad, ScheduleId, ScheduleState, SchedulingRequest, SchedulingStrategy,
    SchedulingStrategyEngine, ScoredCandidate, TimeWindow,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors surfaced by the resource scheduler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid scheduling request: {0}")]
    Validation(#[from] DomainError),

    #[error("Scheduling request {0} already exists")]
    Duplicate(ScheduleId),

    #[error("Scheduling request {0} not found")]
    NotFound(ScheduleId),

    #[error("Cannot {action} scheduling request {id} in state {from}")]
    InvalidTransition {
        id: ScheduleId,
        from: ScheduleState,
        action: &'static str,
    },
}

impl ScheduleError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScheduleError::NotFound(_))
    }
}

/// Aggregate scheduling counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulingMetrics {
    pub total_requests: u64,
    pub successful_allocations: u64,
    pub failed_matches: u64,
    pub cancellations: u64,
    pub reschedules: u64,
    pub pending: usize,
    pub success_rate: f64,
    pub average_match_score: f64,
    /// 1 − variance of resource utilization; 1.0 is perfectly even
    pub optimization_score: f64,
}

#[derive(Default)]
struct Counters {
    total_requests: u64,
    successful_allocations: u64,
    failed_matches: u64,
    cancellations: u64,
    reschedules: u64,
    match_score_sum: f64,
}

struct RequestEntry {
    request: SchedulingRequest,
    state: ScheduleState,
    seq: u64,
}

#[derive(Default)]
struct RequestTable {
    entries: HashMap<ScheduleId, RequestEntry>,
    next_seq: u64,
}

/// Result of one matching attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchAttempt {
    Allocated,
    NoMatch,
    /// The request was not pending, or left Matched while being matched
    Skipped,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SchedulerInner {
    directory: Arc<dyn ResourceDirectory>,
    weights: Arc<dyn DomainWeightTable>,
    events: Arc<dyn EventSink>,
    config: SchedulerConfig,
    engine: SchedulingStrategyEngine,
    tracker: ResourceLoadTracker,
    requests: Mutex<RequestTable>,
    allocations: Mutex<HashMap<ScheduleId, Allocation>>,
    counters: Mutex<Counters>,
}

impl SchedulerInner {
    fn publish(&self, id: &ScheduleId, state: ScheduleState, resource_id: Option<&ResourceId>) {
        self.events.publish(LifecycleEvent::schedule(id, state, resource_id));
    }

    /// Claim a pending request for matching
    fn claim(&self, id: &ScheduleId) -> Option<SchedulingRequest> {
        let mut table = lock(&self.requests);
        let entry = table.entries.get_mut(id)?;
        if entry.state != ScheduleState::Pending {
            return None;
        }
        entry.state = ScheduleState::Matched;
        Some(entry.request.clone())
    }

    fn unclaim(&self, id: &ScheduleId) {
        let mut table = lock(&self.requests);
        if let Some(entry) = table.entries.get_mut(id)
            && entry.state == ScheduleState::Matched
        {
            entry.state = ScheduleState::Pending;
        }
    }

    async fn try_match(&self, id: &ScheduleId, now: DateTime<Utc>) -> MatchAttempt {
        let Some(request) = self.claim(id) else {
            return MatchAttempt::Skipped;
        };

        let candidates = match self
            .directory
            .list_candidates(&request.category, &request.constraints)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Resource lookup for {} failed: {}", id, e);
                self.unclaim(id);
                return MatchAttempt::NoMatch;
            }
        };
        for candidate in &candidates {
            self.tracker.register(&candidate.id, candidate.capacity);
        }

        let weights = self
            .weights
            .weights_for(&WeightKey::Resource(request.category.clone()));
        let ranked = self.engine.rank(
            self.config.strategy,
            &request,
            &candidates,
            &self.tracker.snapshot(),
            &weights,
        );
        if ranked.is_empty() {
            debug!("No eligible resource for {} among {} candidates", id, candidates.len());
            self.unclaim(id);
            return MatchAttempt::NoMatch;
        }

        let Some((chosen, slot)) = self.reserve_first_fit(&request, &ranked, now) else {
            debug!("No free slot for {} on {} ranked resources", id, ranked.len());
            self.unclaim(id);
            return MatchAttempt::NoMatch;
        };

        let alternatives = ranked
            .iter()
            .filter(|c| c.resource_id != chosen.resource_id)
            .map(|c| AlternativeOption {
                resource_id: c.resource_id.clone(),
                score: c.confidence,
            })
            .collect();
        let allocation = Allocation::new(
            id.clone(),
            chosen.resource_id.clone(),
            slot,
            request.units,
            chosen.confidence,
        )
        .with_alternatives(alternatives);

        let committed = {
            let mut table = lock(&self.requests);
            match table.entries.get_mut(id) {
                Some(entry) if entry.state == ScheduleState::Matched => {
                    entry.state = ScheduleState::Allocated;
                    lock(&self.allocations).insert(id.clone(), allocation);
                    true
                }
                _ => false,
            }
        };
        if !committed {
            debug!("Request {} left matching before commit, releasing reservation", id);
            self.tracker.release(id);
            return MatchAttempt::Skipped;
        }

        {
            let mut counters = lock(&self.counters);
            counters.successful_allocations += 1;
            counters.match_score_sum += chosen.confidence;
        }
        info!(
            "Request {} allocated to {} at {} (score {:.2})",
            id, chosen.resource_id, slot.start, chosen.confidence
        );
        self.publish(id, ScheduleState::Allocated, Some(&chosen.resource_id));
        MatchAttempt::Allocated
    }

    /// Walk the ranking best first and reserve the first slot with room
    fn reserve_first_fit<'a>(
        &self,
        request: &SchedulingRequest,
        ranked: &'a [ScoredCandidate],
        now: DateTime<Utc>,
    ) -> Option<(&'a ScoredCandidate, TimeWindow)> {
        let slots = request.candidate_slots(now);
        for candidate in ranked {
            for slot in &slots {
                match self
                    .tracker
                    .try_reserve(&request.id, &candidate.resource_id, *slot, request.units)
                {
                    Ok(()) => return Some((candidate, *slot)),
                    Err(e) => debug!("{} at {}: {}", candidate.resource_id, slot.start, e),
                }
            }
        }
        None
    }

    /// Move one far-out allocation off a hot resource; returns the new resource
    async fn relocate(
        &self,
        id: &ScheduleId,
        request: &SchedulingRequest,
        from: &ResourceId,
        cold: &HashSet<ResourceId>,
    ) -> Option<ResourceId> {
        let candidates: Vec<_> = match self
            .directory
            .list_candidates(&request.category, &request.constraints)
            .await
        {
            Ok(candidates) => candidates
                .into_iter()
                .filter(|c| &c.id != from && cold.contains(&c.id))
                .collect(),
            Err(e) => {
                warn!("Resource lookup while rebalancing {} failed: {}", id, e);
                return None;
            }
        };

        let ranked = self.engine.rank(
            SchedulingStrategy::LoadBalanced,
            request,
            &candidates,
            &self.tracker.snapshot(),
            &HashMap::new(),
        );
        for target in ranked {
            let still_cold = self
                .tracker
                .get_load(&target.resource_id)
                .is_some_and(|load| load.utilization < self.config.low_utilization);
            if !still_cold {
                continue;
            }
            match self.tracker.transfer(id, &target.resource_id) {
                Ok(_) => return Some(target.resource_id),
                Err(e) => debug!("Cannot move {} to {}: {}", id, target.resource_id, e),
            }
        }
        None
    }
}

/// Schedules requests onto capacity-constrained resources
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ResourceScheduler {
    inner: Arc<SchedulerInner>,
}

impl ResourceScheduler {
    pub fn new(
        directory: Arc<dyn ResourceDirectory>,
        weights: Arc<dyn DomainWeightTable>,
        events: Arc<dyn EventSink>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                directory,
                weights,
                events,
                config,
                engine: SchedulingStrategyEngine::new(),
                tracker: ResourceLoadTracker::new(),
                requests: Mutex::new(RequestTable::default()),
                allocations: Mutex::new(HashMap::new()),
                counters: Mutex::new(Counters::default()),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Validate and queue a request, then try to match it right away.
    ///
    /// A request that cannot be matched now stays Pending and is retried by
    /// [`process_pending`](Self::process_pending).
    pub async fn submit_schedule(&self, request: SchedulingRequest) -> Result<ScheduleId, ScheduleError> {
        let now = Utc::now();
        request.validate(now)?;

        let id = request.id.clone();
        {
            let mut table = lock(&self.inner.requests);
            if table.entries.contains_key(&id) {
                return Err(ScheduleError::Duplicate(id));
            }
            let seq = table.next_seq;
            table.next_seq += 1;
            info!(
                "Scheduling request {} accepted: {} for {}, urgency {}, priority {:.1}",
                id,
                request.category,
                request.requester,
                request.urgency,
                priority_score(&request, now)
            );
            table.entries.insert(
                id.clone(),
                RequestEntry {
                    request,
                    state: ScheduleState::Pending,
                    seq,
                },
            );
        }
        lock(&self.inner.counters).total_requests += 1;
        self.inner.publish(&id, ScheduleState::Pending, None);

        if self.inner.try_match(&id, now).await == MatchAttempt::NoMatch {
            lock(&self.inner.counters).failed_matches += 1;
            info!("Request {} stays pending until a resource frees up", id);
        }
        Ok(id)
    }

    /// Offer every pending request, in strategy order, another match
    pub async fn process_pending(&self, now: DateTime<Utc>) -> usize {
        let mut tickets: Vec<PendingTicket> = {
            let table = lock(&self.inner.requests);
            table
                .entries
                .iter()
                .filter(|(_, entry)| entry.state == ScheduleState::Pending)
                .map(|(id, entry)| PendingTicket {
                    request_id: id.clone(),
                    seq: entry.seq,
                    priority: priority_score(&entry.request, now),
                    duration_minutes: entry.request.duration_minutes,
                })
                .collect()
        };
        if tickets.is_empty() {
            return 0;
        }
        sort_pending(self.inner.config.strategy, &mut tickets);

        let mut allocated = 0;
        for ticket in &tickets {
            if self.inner.try_match(&ticket.request_id, now).await == MatchAttempt::Allocated {
                allocated += 1;
            }
        }
        if allocated > 0 {
            info!("Matched {} of {} pending requests", allocated, tickets.len());
        }
        allocated
    }

    /// Expire pending requests whose deadline is at or before `now`
    pub fn expire_pending(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<ScheduleId> = {
            let mut table = lock(&self.inner.requests);
            table
                .entries
                .iter_mut()
                .filter(|(_, entry)| {
                    entry.state == ScheduleState::Pending
                        && entry.request.deadline.is_some_and(|deadline| deadline <= now)
                })
                .map(|(id, entry)| {
                    entry.state = ScheduleState::Expired;
                    id.clone()
                })
                .collect()
        };
        for id in &expired {
            warn!("Scheduling request {} expired before a match", id);
            self.inner.publish(id, ScheduleState::Expired, None);
        }
        expired.len()
    }

    /// Cancel a request and release its capacity; false when unknown or terminal
    pub fn cancel_schedule(&self, id: &ScheduleId, reason: &str) -> bool {
        let resource_id = {
            let mut table = lock(&self.inner.requests);
            let Some(entry) = table.entries.get_mut(id) else {
                debug!("Cancel ignored for unknown scheduling request {}", id);
                return false;
            };
            if !entry.state.is_cancellable() {
                debug!("Cancel ignored for {}: already {}", id, entry.state);
                return false;
            }
            entry.state = ScheduleState::Cancelled;

            let mut allocations = lock(&self.inner.allocations);
            allocations.get_mut(id).map(|allocation| {
                allocation.set_status(AllocationStatus::Cancelled);
                allocation.add_note(format!("Cancelled: {}", reason));
                allocation.resource_id.clone()
            })
        };

        if let Some(released) = self.inner.tracker.release(id) {
            debug!("Cancel of {} released {} units", id, released.units);
        }
        lock(&self.inner.counters).cancellations += 1;
        info!("Scheduling request {} cancelled: {}", id, reason);
        self.inner.publish(id, ScheduleState::Cancelled, resource_id.as_ref());
        true
    }

    /// Begin service of an allocated request
    pub fn start_schedule(&self, id: &ScheduleId) -> Result<Allocation, ScheduleError> {
        let (allocation, waited_minutes) = {
            let mut table = lock(&self.inner.requests);
            let entry = table
                .entries
                .get_mut(id)
                .ok_or_else(|| ScheduleError::NotFound(id.clone()))?;
            if !matches!(entry.state, ScheduleState::Allocated | ScheduleState::Rescheduled) {
                return Err(ScheduleError::InvalidTransition {
                    id: id.clone(),
                    from: entry.state,
                    action: "start",
                });
            }

            let mut allocations = lock(&self.inner.allocations);
            let allocation = allocations
                .get_mut(id)
                .ok_or_else(|| ScheduleError::NotFound(id.clone()))?;
            entry.state = ScheduleState::InProgress;
            allocation.set_status(AllocationStatus::InProgress);
            let waited = (Utc::now() - entry.request.created_at).num_seconds().max(0) as f64 / 60.0;
            (allocation.clone(), waited)
        };

        self.inner
            .tracker
            .record_wait(&allocation.resource_id, waited_minutes);
        info!("Scheduling request {} started on {}", id, allocation.resource_id);
        self.inner
            .publish(id, ScheduleState::InProgress, Some(&allocation.resource_id));
        Ok(allocation)
    }

    /// Finish service and release the held capacity
    pub fn complete_schedule(&self, id: &ScheduleId) -> Result<Allocation, ScheduleError> {
        let allocation = {
            let mut table = lock(&self.inner.requests);
            let entry = table
                .entries
                .get_mut(id)
                .ok_or_else(|| ScheduleError::NotFound(id.clone()))?;
            if entry.state != ScheduleState::InProgress {
                return Err(ScheduleError::InvalidTransition {
                    id: id.clone(),
                    from: entry.state,
                    action: "complete",
                });
            }

            let mut allocations = lock(&self.inner.allocations);
            let allocation = allocations
                .get_mut(id)
                .ok_or_else(|| ScheduleError::NotFound(id.clone()))?;
            entry.state = ScheduleState::Completed;
            allocation.set_status(AllocationStatus::Completed);
            allocation.clone()
        };

        self.inner.tracker.release(id);
        info!("Scheduling request {} completed on {}", id, allocation.resource_id);
        self.inner
            .publish(id, ScheduleState::Completed, Some(&allocation.resource_id));
        Ok(allocation)
    }

    /// Move far-out allocations from hot resources to cold ones
    ///
    /// Only confirmed allocations starting beyond the reschedule horizon are
    /// considered, furthest first, and at most `max_reassignments` move.
    pub async fn rebalance(&self, now: DateTime<Utc>) -> usize {
        let config = &self.inner.config;
        let snapshot = self.inner.tracker.snapshot();
        let hot: HashSet<ResourceId> = snapshot
            .values()
            .filter(|l| l.utilization > config.high_utilization)
            .map(|l| l.resource_id.clone())
            .collect();
        let cold: HashSet<ResourceId> = snapshot
            .values()
            .filter(|l| l.utilization < config.low_utilization)
            .map(|l| l.resource_id.clone())
            .collect();
        if hot.is_empty() || cold.is_empty() {
            return 0;
        }

        let horizon =
            chrono::Duration::from_std(config.reschedule_horizon).unwrap_or(chrono::Duration::MAX);
        let mut movable: Vec<(ScheduleId, SchedulingRequest, ResourceId, DateTime<Utc>)> = {
            let table = lock(&self.inner.requests);
            let allocations = lock(&self.inner.allocations);
            allocations
                .values()
                .filter(|a| {
                    a.status == AllocationStatus::Confirmed
                        && hot.contains(&a.resource_id)
                        && a.starts_after(now, horizon)
                })
                .filter_map(|a| {
                    let entry = table.entries.get(&a.request_id)?;
                    (entry.state == ScheduleState::Allocated).then(|| {
                        (
                            a.request_id.clone(),
                            entry.request.clone(),
                            a.resource_id.clone(),
                            a.scheduled_time,
                        )
                    })
                })
                .collect()
        };
        movable.sort_by(|a, b| b.3.cmp(&a.3).then_with(|| a.0.cmp(&b.0)));

        let mut moved = 0;
        for (id, request, from, _) in movable {
            if moved >= config.max_reassignments {
                break;
            }
            let Some(to) = self.inner.relocate(&id, &request, &from, &cold).await else {
                continue;
            };

            let committed = {
                let mut table = lock(&self.inner.requests);
                match table.entries.get_mut(&id) {
                    Some(entry) if entry.state == ScheduleState::Allocated => {
                        entry.state = ScheduleState::Rescheduled;
                        if let Some(allocation) = lock(&self.inner.allocations).get_mut(&id) {
                            allocation.resource_id = to.clone();
                            allocation.set_status(AllocationStatus::Rescheduled);
                            allocation.add_note(format!("Rebalanced from {} to {}", from, to));
                        }
                        true
                    }
                    _ => false,
                }
            };
            if !committed {
                // Started or cancelled while moving; put the reservation back
                if let Err(e) = self.inner.tracker.transfer(&id, &from) {
                    debug!("Reservation of {} not restored: {}", id, e);
                }
                continue;
            }

            moved += 1;
            lock(&self.inner.counters).reschedules += 1;
            info!("Rebalanced {} from {} to {}", id, from, to);
            self.inner.publish(&id, ScheduleState::Rescheduled, Some(&to));
        }
        moved
    }

    pub fn get_allocation(&self, id: &ScheduleId) -> Option<Allocation> {
        lock(&self.inner.allocations).get(id).cloned()
    }

    pub fn schedule_state(&self, id: &ScheduleId) -> Option<ScheduleState> {
        lock(&self.inner.requests).entries.get(id).map(|e| e.state)
    }

    pub fn get_resource_load(&self, resource_id: &ResourceId) -> Option<ResourceLoad> {
        self.inner.tracker.get_load(resource_id)
    }

    pub fn load_statistics(&self) -> LoadStatistics {
        let config = &self.inner.config;
        self.inner
            .tracker
            .statistics(config.high_utilization, config.low_utilization)
    }

    pub fn metrics(&self) -> SchedulingMetrics {
        let pending = lock(&self.inner.requests)
            .entries
            .values()
            .filter(|e| e.state == ScheduleState::Pending)
            .count();
        let utilizations: Vec<f64> = self
            .inner
            .tracker
            .snapshot()
            .values()
            .map(|l| l.utilization)
            .collect();
        let average = mean(utilizations.iter().copied());
        let variance = mean(utilizations.iter().map(|u| (u - average).powi(2)));

        let counters = lock(&self.inner.counters);
        let ratio = |part: f64, whole: u64| if whole == 0 { 0.0 } else { part / whole as f64 };
        SchedulingMetrics {
            total_requests: counters.total_requests,
            successful_allocations: counters.successful_allocations,
            failed_matches: counters.failed_matches,
            cancellations: counters.cancellations,
            reschedules: counters.reschedules,
            pending,
            success_rate: ratio(counters.successful_allocations as f64, counters.total_requests),
            average_match_score: ratio(counters.match_score_sum, counters.successful_allocations),
            optimization_score: (1.0 - variance).max(0.0),
        }
    }

    /// Spawn the maintenance loop
    ///
    /// Expiry and pending retry run every `monitor_interval`; rebalancing
    /// runs every `rebalance_interval`.
    pub fn start_maintenance(&self, token: CancellationToken) -> JoinHandle<()> {
        let scheduler = self.clone();
        let config = &self.inner.config;
        let (monitor_period, rebalance_period) = (config.monitor_interval, config.rebalance_interval);

        tokio::spawn(async move {
            let mut monitor = tokio::time::interval(monitor_period);
            monitor.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut rebalancing = tokio::time::interval(rebalance_period);
            rebalancing.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Scheduler maintenance stopped");
                        break;
                    }
                    _ = monitor.tick() => {
                        let now = Utc::now();
                        scheduler.expire_pending(now);
                        scheduler.process_pending(now).await;
                    }
                    _ = rebalancing.tick() => {
                        let moved = scheduler.rebalance(Utc::now()).await;
                        if moved > 0 {
                            info!("Maintenance pass moved {} allocations", moved);
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::event_sink::NoEventSink;
    use crate::ports::participant_directory::DirectoryError;
    use crate::ports::weight_table::NoWeights;
    use async_trait::async_trait;
    use consilium_domain::{
        HardConstraints, MatchProfile, ResourceCategory, ResourceDescriptor, ResourceStatus,
        Urgency,
    };
    use chrono::Duration;

    // ==================== Mocks ====================

    #[derive(Default)]
    struct MockResourceDirectory {
        resources: Mutex<Vec<ResourceDescriptor>>,
    }

    impl MockResourceDirectory {
        fn with(resources: Vec<ResourceDescriptor>) -> Arc<Self> {
            Arc::new(Self {
                resources: Mutex::new(resources),
            })
        }

        fn add(&self, resource: ResourceDescriptor) {
            self.resources.lock().unwrap().push(resource);
        }
    }

    #[async_trait]
    impl ResourceDirectory for MockResourceDirectory {
        async fn list_candidates(
            &self,
            category: &ResourceCategory,
            _constraints: &HardConstraints,
        ) -> Result<Vec<ResourceDescriptor>, DirectoryError> {
            Ok(self
                .resources
                .lock()
                .unwrap()
                .iter()
                .filter(|r| &r.category == category)
                .cloned()
                .collect())
        }
    }

    struct TagWeights;

    impl DomainWeightTable for TagWeights {
        fn weights_for(&self, _key: &WeightKey) -> consilium_domain::WeightMap {
            [("cardiology".to_string(), 0.5)].into_iter().collect()
        }
    }

    fn scheduler_with(directory: Arc<MockResourceDirectory>, config: SchedulerConfig) -> ResourceScheduler {
        ResourceScheduler::new(directory, Arc::new(NoWeights), Arc::new(NoEventSink), config)
    }

    fn window_in(hours: i64) -> TimeWindow {
        TimeWindow::starting_at(Utc::now() + Duration::hours(hours), 120)
    }

    fn request(id: &str, hours_out: i64) -> SchedulingRequest {
        SchedulingRequest::new("u-1", "doctor")
            .with_id(id)
            .with_window(window_in(hours_out))
    }

    fn doctor(id: &str, capacity: u32) -> ResourceDescriptor {
        ResourceDescriptor::new(id, "doctor", capacity)
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_submit_allocates_best_profile_match() {
        let directory = MockResourceDirectory::with(vec![
            doctor("general", 2),
            doctor("cardio", 2).with_capability("cardiology"),
        ]);
        let scheduler = ResourceScheduler::new(
            directory,
            Arc::new(TagWeights),
            Arc::new(NoEventSink),
            SchedulerConfig::default(),
        );

        let req = request("s-1", 48).with_profile(MatchProfile::default().with_tag("cardiology"));
        let id = scheduler.submit_schedule(req).await.unwrap();

        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::Allocated));
        let allocation = scheduler.get_allocation(&id).unwrap();
        assert_eq!(allocation.resource_id.as_str(), "cardio");
        assert_eq!(allocation.status, AllocationStatus::Confirmed);
        assert_eq!(allocation.alternatives.len(), 1);
        assert_eq!(allocation.alternatives[0].resource_id.as_str(), "general");
        assert_eq!(
            scheduler.get_resource_load(&ResourceId::new("cardio")).unwrap().current_load,
            1.0
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_never_exceed_capacity() {
        let directory = MockResourceDirectory::with(vec![doctor("dr-li", 2)]);
        let scheduler = scheduler_with(directory, SchedulerConfig::default());
        let window = window_in(30);

        let mut handles = Vec::new();
        for i in 0..5 {
            let scheduler = scheduler.clone();
            let req = SchedulingRequest::new("u", "doctor")
                .with_id(format!("s-{}", i).as_str())
                .with_window(window);
            handles.push(tokio::spawn(async move {
                scheduler.submit_schedule(req).await.unwrap()
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        let allocated = ids
            .iter()
            .filter(|id| scheduler.schedule_state(id) == Some(ScheduleState::Allocated))
            .count();
        let pending = ids
            .iter()
            .filter(|id| scheduler.schedule_state(id) == Some(ScheduleState::Pending))
            .count();
        assert_eq!(allocated, 2);
        assert_eq!(pending, 3);
        assert_eq!(
            scheduler.get_resource_load(&ResourceId::new("dr-li")).unwrap().current_load,
            2.0
        );
    }

    #[tokio::test]
    async fn test_no_match_stays_pending_then_retried() {
        let directory = MockResourceDirectory::with(vec![
            doctor("offline", 5).with_status(ResourceStatus::Offline),
        ]);
        let scheduler = scheduler_with(Arc::clone(&directory), SchedulerConfig::default());

        let id = scheduler.submit_schedule(request("s-1", 10)).await.unwrap();
        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::Pending));
        assert!(scheduler.get_allocation(&id).is_none());
        assert_eq!(scheduler.metrics().failed_matches, 1);

        directory.add(doctor("dr-wang", 1));
        assert_eq!(scheduler.process_pending(Utc::now()).await, 1);
        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::Allocated));
        assert_eq!(
            scheduler.get_allocation(&id).unwrap().resource_id.as_str(),
            "dr-wang"
        );
    }

    #[tokio::test]
    async fn test_pending_served_in_priority_order() {
        let directory = MockResourceDirectory::default();
        let directory = Arc::new(directory);
        let scheduler = scheduler_with(Arc::clone(&directory), SchedulerConfig::default());
        let window = window_in(20);

        let low = SchedulingRequest::new("u", "doctor")
            .with_id("low")
            .with_window(window)
            .with_urgency(Urgency::Low);
        let urgent = SchedulingRequest::new("u", "doctor")
            .with_id("urgent")
            .with_window(window)
            .with_urgency(Urgency::Emergency);
        scheduler.submit_schedule(low).await.unwrap();
        scheduler.submit_schedule(urgent).await.unwrap();

        // One seat for two waiting requests
        directory.add(doctor("dr-li", 1));
        assert_eq!(scheduler.process_pending(Utc::now()).await, 1);
        assert_eq!(
            scheduler.schedule_state(&ScheduleId::new("urgent")),
            Some(ScheduleState::Allocated)
        );
        assert_eq!(
            scheduler.schedule_state(&ScheduleId::new("low")),
            Some(ScheduleState::Pending)
        );
    }

    #[tokio::test]
    async fn test_load_balanced_picks_least_utilized() {
        let directory = MockResourceDirectory::with(vec![doctor("busy", 10), doctor("idle", 10)]);
        let scheduler = scheduler_with(
            directory,
            SchedulerConfig::default().with_strategy(SchedulingStrategy::LoadBalanced),
        );
        let tracker = &scheduler.inner.tracker;
        let far = window_in(24 * 6);
        tracker.register(&ResourceId::new("busy"), 10);
        tracker.register(&ResourceId::new("idle"), 10);
        tracker
            .try_reserve(&ScheduleId::new("x1"), &ResourceId::new("busy"), far, 9.0)
            .unwrap();
        tracker
            .try_reserve(&ScheduleId::new("x2"), &ResourceId::new("idle"), far, 2.0)
            .unwrap();

        let id = scheduler.submit_schedule(request("s-1", 5)).await.unwrap();
        let allocation = scheduler.get_allocation(&id).unwrap();
        assert_eq!(allocation.resource_id.as_str(), "idle");
        assert!((allocation.score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cancel_releases_exact_units() {
        let directory = MockResourceDirectory::with(vec![doctor("dr-li", 4)]);
        let scheduler = scheduler_with(directory, SchedulerConfig::default());
        let dr_li = ResourceId::new("dr-li");

        scheduler
            .submit_schedule(request("keep", 12).with_units(1.0))
            .await
            .unwrap();
        let id = scheduler
            .submit_schedule(request("drop", 12).with_units(1.5))
            .await
            .unwrap();
        assert_eq!(scheduler.get_resource_load(&dr_li).unwrap().current_load, 2.5);

        assert!(scheduler.cancel_schedule(&id, "patient request"));
        assert_eq!(scheduler.get_resource_load(&dr_li).unwrap().current_load, 1.0);
        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::Cancelled));

        let allocation = scheduler.get_allocation(&id).unwrap();
        assert_eq!(allocation.status, AllocationStatus::Cancelled);
        assert!(allocation.notes.iter().any(|n| n.contains("patient request")));

        // Terminal: second cancel is a no-op and releases nothing
        assert!(!scheduler.cancel_schedule(&id, "again"));
        assert_eq!(scheduler.get_resource_load(&dr_li).unwrap().current_load, 1.0);
        assert!(!scheduler.cancel_schedule(&ScheduleId::new("ghost"), "x"));
        assert_eq!(scheduler.metrics().cancellations, 1);
    }

    #[tokio::test]
    async fn test_cancel_pending_request() {
        let scheduler = scheduler_with(MockResourceDirectory::with(vec![]), SchedulerConfig::default());
        let id = scheduler.submit_schedule(request("s-1", 3)).await.unwrap();
        assert!(scheduler.cancel_schedule(&id, "no longer needed"));
        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::Cancelled));
        assert_eq!(scheduler.process_pending(Utc::now()).await, 0);
    }

    #[tokio::test]
    async fn test_expire_pending_past_deadline() {
        let scheduler = scheduler_with(MockResourceDirectory::with(vec![]), SchedulerConfig::default());
        let deadline = Utc::now() + Duration::hours(2);
        let id = scheduler
            .submit_schedule(request("s-1", 1).with_deadline(deadline))
            .await
            .unwrap();
        let open = scheduler.submit_schedule(request("s-2", 1)).await.unwrap();

        assert_eq!(scheduler.expire_pending(deadline - Duration::minutes(1)), 0);
        assert_eq!(scheduler.expire_pending(deadline), 1);
        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::Expired));
        assert_eq!(scheduler.schedule_state(&open), Some(ScheduleState::Pending));
        assert!(!scheduler.cancel_schedule(&id, "too late"));
    }

    #[tokio::test]
    async fn test_start_and_complete() {
        let directory = MockResourceDirectory::with(vec![doctor("dr-li", 1)]);
        let scheduler = scheduler_with(directory, SchedulerConfig::default());
        let id = scheduler.submit_schedule(request("s-1", 6)).await.unwrap();

        let err = scheduler.complete_schedule(&id).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidTransition { from: ScheduleState::Allocated, .. }
        ));

        let started = scheduler.start_schedule(&id).unwrap();
        assert_eq!(started.status, AllocationStatus::InProgress);
        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::InProgress));

        let done = scheduler.complete_schedule(&id).unwrap();
        assert_eq!(done.status, AllocationStatus::Completed);
        assert_eq!(
            scheduler.get_resource_load(&ResourceId::new("dr-li")).unwrap().current_load,
            0.0
        );
        assert!(scheduler.start_schedule(&ScheduleId::new("ghost")).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_validation_and_duplicate() {
        let scheduler = scheduler_with(MockResourceDirectory::with(vec![]), SchedulerConfig::default());

        let err = scheduler
            .submit_schedule(request("bad", 1).with_units(0.0))
            .await
            .unwrap_err();
        assert_eq!(err, ScheduleError::Validation(DomainError::InvalidUnits(0.0)));
        assert!(scheduler.schedule_state(&ScheduleId::new("bad")).is_none());

        scheduler.submit_schedule(request("s-1", 1)).await.unwrap();
        let err = scheduler.submit_schedule(request("s-1", 1)).await.unwrap_err();
        assert_eq!(err, ScheduleError::Duplicate(ScheduleId::new("s-1")));
        assert_eq!(scheduler.metrics().total_requests, 1);
    }

    #[tokio::test]
    async fn test_rebalance_moves_only_far_allocations() {
        let directory = MockResourceDirectory::with(vec![doctor("hot", 2)]);
        let scheduler = scheduler_with(Arc::clone(&directory), SchedulerConfig::default());

        let far = scheduler.submit_schedule(request("far", 72)).await.unwrap();
        let near = scheduler.submit_schedule(request("near", 2)).await.unwrap();
        directory.add(doctor("cold", 10));
        scheduler.inner.tracker.register(&ResourceId::new("cold"), 10);

        assert_eq!(scheduler.rebalance(Utc::now()).await, 1);

        let moved = scheduler.get_allocation(&far).unwrap();
        assert_eq!(moved.resource_id.as_str(), "cold");
        assert_eq!(moved.status, AllocationStatus::Rescheduled);
        assert_eq!(scheduler.schedule_state(&far), Some(ScheduleState::Rescheduled));
        assert_eq!(scheduler.get_allocation(&near).unwrap().resource_id.as_str(), "hot");
        assert_eq!(
            scheduler.get_resource_load(&ResourceId::new("hot")).unwrap().current_load,
            1.0
        );
        assert_eq!(
            scheduler.get_resource_load(&ResourceId::new("cold")).unwrap().current_load,
            1.0
        );
        assert_eq!(scheduler.metrics().reschedules, 1);

        // A rescheduled allocation can still be started
        scheduler.start_schedule(&far).unwrap();
    }

    #[tokio::test]
    async fn test_rebalance_respects_move_limit() {
        let directory = MockResourceDirectory::with(vec![doctor("hot", 3)]);
        let scheduler = scheduler_with(
            Arc::clone(&directory),
            SchedulerConfig::default().with_max_reassignments(1),
        );
        for (i, hours) in [48, 72, 96].into_iter().enumerate() {
            scheduler
                .submit_schedule(request(&format!("s-{}", i), hours))
                .await
                .unwrap();
        }
        directory.add(doctor("cold", 20));
        scheduler.inner.tracker.register(&ResourceId::new("cold"), 20);

        assert_eq!(scheduler.rebalance(Utc::now()).await, 1);
        // Furthest allocation moves first
        assert_eq!(
            scheduler.get_allocation(&ScheduleId::new("s-2")).unwrap().resource_id.as_str(),
            "cold"
        );
    }

    #[tokio::test]
    async fn test_rebalance_noop_without_cold_resources() {
        let directory = MockResourceDirectory::with(vec![doctor("only", 1)]);
        let scheduler = scheduler_with(directory, SchedulerConfig::default());
        scheduler.submit_schedule(request("s-1", 72)).await.unwrap();
        assert_eq!(scheduler.rebalance(Utc::now()).await, 0);
    }

    #[tokio::test]
    async fn test_metrics_and_statistics() {
        let directory = MockResourceDirectory::with(vec![doctor("a", 1), doctor("b", 4)]);
        let scheduler = scheduler_with(
            directory,
            SchedulerConfig::default().with_strategy(SchedulingStrategy::LoadBalanced),
        );
        let window = window_in(8);
        for i in 0..3 {
            let req = SchedulingRequest::new("u", "doctor")
                .with_id(format!("s-{}", i).as_str())
                .with_window(window);
            scheduler.submit_schedule(req).await.unwrap();
        }

        let metrics = scheduler.metrics();
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.successful_allocations, 3);
        assert_eq!(metrics.failed_matches, 0);
        assert!((metrics.success_rate - 1.0).abs() < 1e-9);
        assert!(metrics.average_match_score > 0.0 && metrics.average_match_score <= 1.0);
        assert!(metrics.optimization_score > 0.0 && metrics.optimization_score <= 1.0);

        let stats = scheduler.load_statistics();
        assert_eq!(stats.total_resources, 2);
        assert_eq!(stats.total_queue_length, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_maintenance_expires_on_monitor_cadence() {
        let scheduler = scheduler_with(MockResourceDirectory::with(vec![]), SchedulerConfig::default());
        let id = scheduler
            .submit_schedule(request("s-1", 1).with_deadline(Utc::now() + Duration::milliseconds(100)))
            .await
            .unwrap();

        let token = CancellationToken::new();
        let handle = scheduler.start_maintenance(token.clone());
        tokio::task::yield_now().await;
        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::Pending));

        // Deadlines are wall-clock; let it pass, then one monitor period
        std::thread::sleep(std::time::Duration::from_millis(200));
        tokio::time::sleep(std::time::Duration::from_secs(6)).await;
        assert_eq!(scheduler.schedule_state(&id), Some(ScheduleState::Expired));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_maintenance_loop_stops_on_cancel() {
        let directory = MockResourceDirectory::with(vec![]);
        let scheduler = scheduler_with(
            directory,
            SchedulerConfig::default()
                .with_monitor_interval(std::time::Duration::from_millis(10))
                .with_rebalance_interval(std::time::Duration::from_millis(10)),
        );
        let token = CancellationToken::new();
        let handle = scheduler.start_maintenance(token.clone());
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        token.cancel();
        handle.await.unwrap();
    }
}

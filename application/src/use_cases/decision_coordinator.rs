//! Decision coordinator
//!
//! Owns the lifecycle of every decision request:
//!
//! ```text
//! Pending → Collecting → { Completed | Failed | Cancelled | TimedOut }
//! ```
//!
//! Each accepted request runs as its own task. The task collects votes with
//! [`AgentVoteCollector`], reduces them with [`VotingStrategyEngine`] and
//! writes exactly one [`DecisionResult`]. Cancellation and the timeout
//! monitor race the worker for that write; the first writer wins and later
//! attempts are no-ops.
//!
//! The pool of in-flight requests and the result store each sit behind their
//! own mutex. When both are needed the pool is locked first.

use crate::config::CoordinatorConfig;
use crate::ports::event_sink::{EventSink, LifecycleEvent};
use crate::ports::participant_directory::{DirectoryError, ParticipantDirectory, ParticipantRef};
use crate::ports::vote_transport::{VoteCall, VoteTransport};
use crate::ports::weight_table::{DomainWeightTable, WeightKey};
use crate::use_cases::collect_votes::{AgentVoteCollector, deadline_after};
use consilium_domain::{
    AgentVote, DecisionCategory, DecisionContext, DecisionId, DecisionRequest, DecisionResult,
    DecisionStatus, DomainError, ParticipantId, Priority, VotingPolicy, VotingStrategyEngine,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors surfaced by the decision coordinator
#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("Invalid decision request: {0}")]
    Validation(#[from] DomainError),

    #[error("Participant {0} is not available")]
    UnavailableParticipant(ParticipantId),

    #[error("Participant directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Decision request {0} already exists")]
    Duplicate(DecisionId),

    #[error("Decision request {0} not found")]
    NotFound(DecisionId),

    #[error("Timed out waiting for decision {0}")]
    WaitTimeout(DecisionId),
}

impl DecisionError {
    /// Whether the request was rejected before entering the pool
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DecisionError::Validation(_)
                | DecisionError::UnavailableParticipant(_)
                | DecisionError::Directory(_)
                | DecisionError::Duplicate(_)
        )
    }
}

struct PoolEntry {
    status: DecisionStatus,
    deadline: Instant,
    partial_votes: Vec<AgentVote>,
    cancel: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner<T: VoteTransport + 'static> {
    collector: AgentVoteCollector<T>,
    directory: Arc<dyn ParticipantDirectory>,
    weights: Arc<dyn DomainWeightTable>,
    events: Arc<dyn EventSink>,
    config: CoordinatorConfig,
    pool: Mutex<HashMap<DecisionId, PoolEntry>>,
    results: Mutex<HashMap<DecisionId, DecisionResult>>,
    result_written: Notify,
}

/// Work handed to a decision task
struct Assignment {
    id: DecisionId,
    participants: Vec<ParticipantRef>,
    call: VoteCall,
    policy: VotingPolicy,
    category: DecisionCategory,
    deadline: Instant,
    cancel: CancellationToken,
}

impl<T: VoteTransport + 'static> Inner<T> {
    /// Move a live request to `status`; false when it is no longer in the pool
    fn transition(&self, id: &DecisionId, status: DecisionStatus) -> bool {
        {
            let mut pool = lock(&self.pool);
            match pool.get_mut(id) {
                Some(entry) => entry.status = status,
                None => return false,
            }
        }
        debug!("Decision {} is now {}", id, status);
        self.events.publish(LifecycleEvent::decision(id, status, None));
        true
    }

    fn record_partial(&self, id: &DecisionId, vote: &AgentVote) {
        if let Some(entry) = lock(&self.pool).get_mut(id) {
            entry.partial_votes.push(vote.clone());
        }
    }

    /// Write the terminal result if nobody has yet.
    ///
    /// Removes the request from the pool, stops its worker and stores the
    /// result built from the removed entry.
    fn finish(
        &self,
        id: &DecisionId,
        build: impl FnOnce(PoolEntry) -> DecisionResult,
    ) -> Option<DecisionResult> {
        let result = {
            let mut pool = lock(&self.pool);
            let entry = pool.remove(id)?;
            entry.cancel.cancel();
            let result = build(entry);
            lock(&self.results).insert(id.clone(), result.clone());
            result
        };

        info!(
            "Decision {} finished: {} (consensus {:.2}, {} votes)",
            id,
            result.status,
            result.consensus_score,
            result.votes.len()
        );
        self.events.publish(LifecycleEvent::decision(
            id,
            result.status,
            Some(result.consensus_score),
        ));
        self.result_written.notify_waiters();
        Some(result)
    }

    async fn run(self: Arc<Self>, assignment: Assignment) {
        let Assignment {
            id,
            participants,
            call,
            policy,
            category,
            deadline,
            cancel,
        } = assignment;

        if !self.transition(&id, DecisionStatus::Collecting) {
            return;
        }

        let observer = |vote: &AgentVote| self.record_partial(&id, vote);
        let collected = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Decision {} worker stopped before collection finished", id);
                return;
            }
            collected = self.collector.collect_until(&participants, call, deadline, &observer) => collected,
        };

        if collected.deadline_reached {
            self.finish(&id, |_| DecisionResult::timed_out(id.clone(), collected.votes));
            return;
        }

        let weights = self.weights.weights_for(&WeightKey::Decision(category));
        let consensus = VotingStrategyEngine::decide(&collected.votes, policy, &weights);
        if !consensus.outcome.is_reached() {
            info!("Decision {} ended without consensus ({})", id, consensus.outcome);
        }
        self.finish(&id, |_| {
            DecisionResult::from_consensus(id.clone(), consensus, collected.votes)
        });
    }

    /// Run the worker and turn a panic into a failed result
    async fn supervise(self: Arc<Self>, assignment: Assignment) {
        let id = assignment.id.clone();
        let worker = tokio::spawn(Arc::clone(&self).run(assignment));
        if let Err(e) = worker.await
            && e.is_panic()
        {
            error!("Decision {} worker panicked: {}", id, e);
            self.finish(&id, |_| {
                DecisionResult::failed(id.clone(), "Decision worker terminated unexpectedly")
            });
        }
    }
}

/// Coordinates collaborative decisions
///
/// Cheap to clone; clones share the same pool and result store.
pub struct DecisionCoordinator<T: VoteTransport + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: VoteTransport + 'static> Clone for DecisionCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: VoteTransport + 'static> DecisionCoordinator<T> {
    pub fn new(
        transport: Arc<T>,
        directory: Arc<dyn ParticipantDirectory>,
        weights: Arc<dyn DomainWeightTable>,
        events: Arc<dyn EventSink>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                collector: AgentVoteCollector::new(transport, config.per_call_timeout),
                directory,
                weights,
                events,
                config,
                pool: Mutex::new(HashMap::new()),
                results: Mutex::new(HashMap::new()),
                result_written: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Validate and accept a decision request.
    ///
    /// Rejected synchronously, without entering the pool, when the request is
    /// malformed or any required participant is unreachable.
    pub async fn submit_decision(&self, request: DecisionRequest) -> Result<DecisionId, DecisionError> {
        request.validate()?;
        if self.is_known(&request.id) {
            return Err(DecisionError::Duplicate(request.id));
        }

        let participants = self.resolve_participants(&request.participants).await?;

        let id = request.id.clone();
        let deadline = deadline_after(request.timeout);
        let cancel = CancellationToken::new();
        {
            let mut pool = lock(&self.inner.pool);
            if pool.contains_key(&id) || lock(&self.inner.results).contains_key(&id) {
                return Err(DecisionError::Duplicate(id));
            }
            pool.insert(
                id.clone(),
                PoolEntry {
                    status: DecisionStatus::Pending,
                    deadline,
                    partial_votes: Vec::new(),
                    cancel: cancel.clone(),
                },
            );
        }

        info!(
            "Decision {} accepted: {} with {} participants, policy {}, priority {}",
            id,
            request.category,
            participants.len(),
            request.policy,
            request.priority
        );
        self.inner
            .events
            .publish(LifecycleEvent::decision(&id, DecisionStatus::Pending, None));

        let assignment = Assignment {
            id: id.clone(),
            participants,
            call: VoteCall {
                request_id: id.clone(),
                category: request.category,
                context: request.context,
            },
            policy: request.policy,
            category: request.category,
            deadline,
            cancel,
        };
        tokio::spawn(Arc::clone(&self.inner).supervise(assignment));

        Ok(id)
    }

    /// Submit with the configured panel, timeout and policy for `category`
    pub async fn submit_collaborative_decision(
        &self,
        category: DecisionCategory,
        context: DecisionContext,
        priority: Priority,
    ) -> Result<DecisionId, DecisionError> {
        let config = &self.inner.config;
        let request = DecisionRequest::new(category, config.participants_for(category).to_vec())
            .with_context(context)
            .with_priority(priority)
            .with_policy(config.default_policy)
            .with_timeout(config.default_timeout);
        self.submit_decision(request).await
    }

    /// Terminal result, if the request has finished
    pub fn get_decision_result(&self, id: &DecisionId) -> Option<DecisionResult> {
        lock(&self.inner.results).get(id).cloned()
    }

    /// Current status of a live or finished request
    pub fn decision_status(&self, id: &DecisionId) -> Option<DecisionStatus> {
        let pool = lock(&self.inner.pool);
        if let Some(entry) = pool.get(id) {
            return Some(entry.status);
        }
        lock(&self.inner.results).get(id).map(|r| r.status)
    }

    /// Cancel a pending or collecting request; false otherwise
    pub fn cancel_decision(&self, id: &DecisionId) -> bool {
        let cancelled = self
            .inner
            .finish(id, |_| DecisionResult::cancelled(id.clone()))
            .is_some();
        if cancelled {
            info!("Decision {} cancelled", id);
        } else {
            debug!("Cancel ignored for decision {}: not in flight", id);
        }
        cancelled
    }

    /// Wait until the request has a terminal result
    pub async fn wait_for_result(
        &self,
        id: &DecisionId,
        timeout: Duration,
    ) -> Result<DecisionResult, DecisionError> {
        let deadline = deadline_after(timeout);
        loop {
            let notified = self.inner.result_written.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = self.get_decision_result(id) {
                return Ok(result);
            }
            if self.decision_status(id).is_none() {
                return Err(DecisionError::NotFound(id.clone()));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(DecisionError::WaitTimeout(id.clone()));
            }
        }
    }

    /// Move every request whose deadline is at or before `now` to TimedOut
    pub fn expire_overdue(&self, now: Instant) -> usize {
        let overdue: Vec<DecisionId> = lock(&self.inner.pool)
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        overdue
            .iter()
            .filter(|id| {
                self.inner
                    .finish(id, |entry| {
                        DecisionResult::timed_out((*id).clone(), entry.partial_votes)
                    })
                    .is_some()
            })
            .count()
    }

    /// Number of requests still in flight
    pub fn in_flight(&self) -> usize {
        lock(&self.inner.pool).len()
    }

    /// Spawn the periodic timeout monitor; it stops when `token` is cancelled
    pub fn start_timeout_monitor(&self, token: CancellationToken) -> JoinHandle<()> {
        let coordinator = self.clone();
        let period = self.inner.config.monitor_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Decision timeout monitor stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let expired = coordinator.expire_overdue(Instant::now());
                        if expired > 0 {
                            warn!("{} decision requests timed out", expired);
                        }
                    }
                }
            }
        })
    }

    fn is_known(&self, id: &DecisionId) -> bool {
        let pool = lock(&self.inner.pool);
        pool.contains_key(id) || lock(&self.inner.results).contains_key(id)
    }

    async fn resolve_participants(
        &self,
        participants: &[ParticipantId],
    ) -> Result<Vec<ParticipantRef>, DecisionError> {
        let lookups = participants
            .iter()
            .map(|participant| self.inner.directory.list_available(participant));
        let answers = futures::future::join_all(lookups).await;

        let mut resolved = Vec::with_capacity(participants.len());
        for (participant, answer) in participants.iter().zip(answers) {
            match answer {
                Ok(refs) => match refs.into_iter().next() {
                    Some(found) => resolved.push(found),
                    None => {
                        warn!("Rejecting decision: participant {} unavailable", participant);
                        return Err(DecisionError::UnavailableParticipant(participant.clone()));
                    }
                },
                Err(e) => {
                    error!("Participant directory lookup for {} failed: {}", participant, e);
                    return Err(DecisionError::Directory(e));
                }
            }
        }
        Ok(resolved)
    }
}

//! Scheduling strategy engine
//!
//! Given a request, the candidate resources and their current loads, the
//! engine filters out ineligible candidates and ranks the rest under a
//! [`SchedulingStrategy`]. Ranking is pure apart from the round-robin cursor.
//!
//! Queue-ordering strategies (FIFO, priority, shortest job first) decide the
//! order in which pending requests are offered, see [`sort_pending`]. Their
//! resource choice uses profile matching.

use crate::core::weights::{WeightMap, weight_or};
use crate::scheduling::load::ResourceLoad;
use crate::scheduling::request::{ScheduleId, SchedulingRequest};
use crate::scheduling::resource::{ResourceDescriptor, ResourceId};
use crate::scheduling::strategy::SchedulingStrategy;
use crate::util::clamp_unit;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// Weight of a matched profile tag missing from the weight table
pub const DEFAULT_TAG_WEIGHT: f64 = 0.1;
/// Profile score penalty per unit of utilization
pub const LOAD_PENALTY: f64 = 0.2;
/// Profile score bonus per rating point
pub const RATING_BONUS: f64 = 0.1;
/// Fixed confidence reported for round-robin picks
pub const ROUND_ROBIN_CONFIDENCE: f64 = 0.7;

/// Priority score added per hour spent waiting
const WAIT_BONUS_PER_HOUR: f64 = 5.0;

/// An eligible candidate with its ranking score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub resource_id: ResourceId,
    /// Strategy-specific ranking score, higher is better
    pub score: f64,
    /// Match confidence in `[0, 1]` recorded on the allocation
    pub confidence: f64,
    pub current_load: f64,
}

/// Result of a selection
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched {
        best: ScoredCandidate,
        alternatives: Vec<ScoredCandidate>,
    },
    /// No eligible candidate; the caller decides whether to queue or reject
    NoMatch,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }
}

/// Pending-queue entry used for ordering
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTicket {
    pub request_id: ScheduleId,
    /// Submission sequence number
    pub seq: u64,
    pub priority: f64,
    pub duration_minutes: u32,
}

/// Priority score of a pending request at `now`, higher is served first
///
/// Urgency weight, plus five points per hour waited, plus 20 points when the
/// deadline is under a day away (10 when under three days).
pub fn priority_score(request: &SchedulingRequest, now: DateTime<Utc>) -> f64 {
    let waited_hours = ((now - request.created_at).num_seconds().max(0) as f64) / 3600.0;
    let deadline_bonus = match request.deadline {
        Some(deadline) => {
            let hours_left = (deadline - now).num_seconds() as f64 / 3600.0;
            if hours_left < 24.0 {
                20.0
            } else if hours_left < 72.0 {
                10.0
            } else {
                0.0
            }
        }
        None => 0.0,
    };
    request.urgency.weight() + waited_hours * WAIT_BONUS_PER_HOUR + deadline_bonus
}

/// Order pending tickets for the given strategy; submission order breaks ties
///
/// FIFO orders by submission, shortest job first by duration, every other
/// strategy by descending priority.
pub fn sort_pending(strategy: SchedulingStrategy, tickets: &mut [PendingTicket]) {
    tickets.sort_by(|a, b| {
        let primary = match strategy {
            SchedulingStrategy::Fifo => Ordering::Equal,
            SchedulingStrategy::ShortestJobFirst => a.duration_minutes.cmp(&b.duration_minutes),
            _ => b.priority.total_cmp(&a.priority),
        };
        primary.then(a.seq.cmp(&b.seq))
    });
}

/// Ranks candidate resources under a strategy
#[derive(Debug, Default)]
pub struct SchedulingStrategyEngine {
    round_robin_cursor: AtomicUsize,
}

impl SchedulingStrategyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the best eligible candidate, keeping up to three runners-up
    pub fn select(
        &self,
        strategy: SchedulingStrategy,
        request: &SchedulingRequest,
        candidates: &[ResourceDescriptor],
        loads: &HashMap<ResourceId, ResourceLoad>,
        weights: &WeightMap,
    ) -> MatchOutcome {
        let mut ranked = self.rank(strategy, request, candidates, loads, weights).into_iter();
        match ranked.next() {
            Some(best) => MatchOutcome::Matched {
                best,
                alternatives: ranked.take(crate::scheduling::allocation::MAX_ALTERNATIVES).collect(),
            },
            None => MatchOutcome::NoMatch,
        }
    }

    /// All eligible candidates, best first
    pub fn rank(
        &self,
        strategy: SchedulingStrategy,
        request: &SchedulingRequest,
        candidates: &[ResourceDescriptor],
        loads: &HashMap<ResourceId, ResourceLoad>,
        weights: &WeightMap,
    ) -> Vec<ScoredCandidate> {
        let eligible: Vec<(&ResourceDescriptor, ResourceLoad)> = candidates
            .iter()
            .filter(|r| r.eligibility(request).is_ok())
            .map(|r| {
                let load = loads
                    .get(&r.id)
                    .cloned()
                    .unwrap_or_else(|| ResourceLoad::new(r.id.clone(), r.capacity));
                (r, load)
            })
            .collect();

        if eligible.is_empty() {
            return Vec::new();
        }

        match strategy {
            SchedulingStrategy::RoundRobin => self.round_robin(eligible),
            SchedulingStrategy::LoadBalanced => Self::load_balanced(eligible),
            _ => Self::profile_match(request, eligible, weights),
        }
    }

    fn round_robin(&self, eligible: Vec<(&ResourceDescriptor, ResourceLoad)>) -> Vec<ScoredCandidate> {
        let start = self.round_robin_cursor.fetch_add(1, AtomicOrdering::Relaxed) % eligible.len();
        let len = eligible.len();
        eligible
            .iter()
            .cycle()
            .skip(start)
            .take(len)
            .map(|(resource, load)| ScoredCandidate {
                resource_id: resource.id.clone(),
                score: ROUND_ROBIN_CONFIDENCE,
                confidence: ROUND_ROBIN_CONFIDENCE,
                current_load: load.current_load,
            })
            .collect()
    }

    fn load_balanced(mut eligible: Vec<(&ResourceDescriptor, ResourceLoad)>) -> Vec<ScoredCandidate> {
        eligible.sort_by(|(ra, la), (rb, lb)| {
            la.current_load
                .total_cmp(&lb.current_load)
                .then(rb.quality.rating.total_cmp(&ra.quality.rating))
        });
        eligible
            .into_iter()
            .map(|(resource, load)| ScoredCandidate {
                resource_id: resource.id.clone(),
                score: -load.current_load,
                confidence: clamp_unit(1.0 - load.utilization),
                current_load: load.current_load,
            })
            .collect()
    }

    fn profile_match(
        request: &SchedulingRequest,
        eligible: Vec<(&ResourceDescriptor, ResourceLoad)>,
        weights: &WeightMap,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = eligible
            .into_iter()
            .map(|(resource, load)| {
                let score = Self::profile_score(request, resource, &load, weights);
                ScoredCandidate {
                    resource_id: resource.id.clone(),
                    score,
                    confidence: clamp_unit(score),
                    current_load: load.current_load,
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.current_load.total_cmp(&b.current_load))
        });
        scored
    }

    /// Σ weights of shared tags − utilization × 0.2 + rating × 0.1
    pub fn profile_score(
        request: &SchedulingRequest,
        resource: &ResourceDescriptor,
        load: &ResourceLoad,
        weights: &WeightMap,
    ) -> f64 {
        let tag_score: f64 = request
            .profile
            .tags
            .iter()
            .filter(|tag| resource.capabilities.contains(*tag))
            .map(|tag| weight_or(weights, tag, DEFAULT_TAG_WEIGHT))
            .sum();
        tag_score - load.utilization * LOAD_PENALTY + resource.quality.rating * RATING_BONUS
    }
}

//! Agent vote collection
//!
//! Fans one remote call out per participant and gathers whatever votes
//! arrive before the overall deadline. Failed, timed-out and malformed calls
//! are logged and omitted.

use crate::ports::participant_directory::ParticipantRef;
use crate::ports::vote_transport::{VoteCall, VoteCallError, VoteTransport};
use consilium_domain::{AgentVote, ParticipantId, Recommendation};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Confidence assumed when a payload carries none
pub const DEFAULT_VOTE_CONFIDENCE: f64 = 0.5;

/// Stand-in deadline for timeouts too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Votes gathered by one collection, in arrival order
#[derive(Debug, Clone, Default)]
pub struct CollectedVotes {
    pub votes: Vec<AgentVote>,
    /// The overall deadline elapsed while calls were outstanding
    pub deadline_reached: bool,
}

/// Collects votes from participants concurrently
pub struct AgentVoteCollector<T: VoteTransport + 'static> {
    transport: Arc<T>,
    per_call_timeout: Duration,
}

impl<T: VoteTransport + 'static> AgentVoteCollector<T> {
    pub fn new(transport: Arc<T>, per_call_timeout: Duration) -> Self {
        Self {
            transport,
            per_call_timeout,
        }
    }

    pub fn per_call_timeout(&self) -> Duration {
        self.per_call_timeout
    }

    /// Collect with an overall timeout measured from now
    pub async fn collect(
        &self,
        participants: &[ParticipantRef],
        call: VoteCall,
        timeout: Duration,
    ) -> CollectedVotes {
        self.collect_until(participants, call, deadline_after(timeout), &|_| {})
            .await
    }

    /// Collect until `deadline`, handing each accepted vote to `on_vote` as it arrives
    pub async fn collect_until(
        &self,
        participants: &[ParticipantRef],
        call: VoteCall,
        deadline: Instant,
        on_vote: &(dyn Fn(&AgentVote) + Send + Sync),
    ) -> CollectedVotes {
        let mut collected = CollectedVotes::default();
        if participants.is_empty() {
            return collected;
        }

        // Each call gets the per-call timeout, capped by what is left overall
        let per_call = self
            .per_call_timeout
            .min(deadline.saturating_duration_since(Instant::now()));

        info!(
            "Requesting votes for decision {} from {} participants",
            call.request_id,
            participants.len()
        );

        let mut join_set = JoinSet::new();
        for participant in participants {
            let transport = Arc::clone(&self.transport);
            let participant = participant.clone();
            let call = call.clone();

            join_set.spawn(async move {
                let result =
                    match tokio::time::timeout(per_call, transport.request_vote(&participant, &call, per_call))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(VoteCallError::Timeout(per_call)),
                    };
                (participant, result)
            });
        }

        let overall = tokio::time::sleep_until(deadline);
        tokio::pin!(overall);

        loop {
            let result = tokio::select! {
                biased;
                _ = &mut overall => {
                    // Calls that finished at the deadline still count
                    tokio::task::yield_now().await;
                    while let Some(result) = join_set.try_join_next() {
                        absorb(&mut collected, result, on_vote);
                    }
                    if !join_set.is_empty() {
                        warn!(
                            "Decision {} deadline reached with {} calls outstanding",
                            call.request_id,
                            join_set.len()
                        );
                        collected.deadline_reached = true;
                    }
                    join_set.abort_all();
                    break;
                }
                result = join_set.join_next() => result,
            };

            match result {
                Some(result) => absorb(&mut collected, result, on_vote),
                None => break,
            }
        }

        collected
    }
}

type CallOutcome = (ParticipantRef, Result<Value, VoteCallError>);

/// Fold one finished call into `collected`
fn absorb(
    collected: &mut CollectedVotes,
    result: Result<CallOutcome, JoinError>,
    on_vote: &(dyn Fn(&AgentVote) + Send + Sync),
) {
    match result {
        Ok((participant, Ok(payload))) => match parse_vote(&participant.id, payload) {
            Ok(vote) => {
                if collected.votes.iter().any(|v| v.participant == vote.participant) {
                    debug!("Ignoring duplicate vote from {}", vote.participant);
                    return;
                }
                info!(
                    "Participant {} voted with confidence {:.2}",
                    vote.participant, vote.confidence
                );
                on_vote(&vote);
                collected.votes.push(vote);
            }
            Err(e) => {
                warn!("Participant {} returned an unusable vote: {}", participant.id, e);
            }
        },
        Ok((participant, Err(e))) => {
            warn!("Participant {} vote failed: {}", participant.id, e);
        }
        Err(e) => {
            warn!("Task join error: {}", e);
        }
    }
}

/// `now + timeout`, clamped to a far deadline instead of overflowing
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Parse a raw vote payload.
///
/// Expected shape: `{confidence, recommendation, reasoning | rationale,
/// supporting_evidence}`. Only `recommendation` is required to be an object
/// when present; a missing confidence defaults to 0.5.
pub fn parse_vote(participant: &ParticipantId, payload: Value) -> Result<AgentVote, VoteCallError> {
    let Value::Object(mut fields) = payload else {
        return Err(VoteCallError::Malformed("payload is not a JSON object".to_string()));
    };

    let confidence = match fields.remove("confidence") {
        None | Some(Value::Null) => DEFAULT_VOTE_CONFIDENCE,
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| VoteCallError::Malformed("confidence is not a finite number".to_string()))?,
        Some(other) => {
            return Err(VoteCallError::Malformed(format!(
                "confidence must be a number, got {}",
                other
            )));
        }
    };

    let recommendation = match fields.remove("recommendation") {
        None | Some(Value::Null) => Recommendation::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(VoteCallError::Malformed(
                "recommendation must be a JSON object".to_string(),
            ));
        }
    };

    let rationale = fields
        .remove("reasoning")
        .or_else(|| fields.remove("rationale"))
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let evidence = match fields.remove("supporting_evidence") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(AgentVote::new(participant.clone(), confidence, recommendation)
        .with_rationale(rationale)
        .with_evidence(evidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consilium_domain::{DecisionCategory, DecisionContext, DecisionId};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Behavior {
        Respond(Value),
        RespondAfter(Duration, Value),
        Fail,
        Silent,
    }

    struct MockTransport {
        behaviors: HashMap<String, Behavior>,
        calls: Mutex<Vec<(String, Duration)>>,
    }

    impl MockTransport {
        fn new(behaviors: Vec<(&str, Behavior)>) -> Self {
            Self {
                behaviors: behaviors.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VoteTransport for MockTransport {
        async fn request_vote(
            &self,
            participant: &ParticipantRef,
            _call: &VoteCall,
            timeout: Duration,
        ) -> Result<Value, VoteCallError> {
            self.calls
                .lock()
                .unwrap()
                .push((participant.id.to_string(), timeout));
            match self.behaviors.get(participant.id.as_str()) {
                Some(Behavior::Respond(v)) => Ok(v.clone()),
                Some(Behavior::RespondAfter(delay, v)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(v.clone())
                }
                Some(Behavior::Fail) => Err(VoteCallError::Transport("connection refused".to_string())),
                Some(Behavior::Silent) | None => std::future::pending().await,
            }
        }
    }

    fn call() -> VoteCall {
        VoteCall {
            request_id: DecisionId::new("d-1"),
            category: DecisionCategory::HealthAssessment,
            context: DecisionContext::new(),
        }
    }

    fn refs(ids: &[&str]) -> Vec<ParticipantRef> {
        ids.iter()
            .map(|id| ParticipantRef::new(*id, format!("http://{}.local", id)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_participant_is_omitted_after_deadline() {
        let transport = Arc::new(MockTransport::new(vec![
            ("a", Behavior::Respond(json!({"confidence": 0.9, "recommendation": {"x": 1}}))),
            ("b", Behavior::Respond(json!({"confidence": 0.4, "recommendation": {"x": 2}}))),
            ("c", Behavior::Silent),
        ]));
        let collector = AgentVoteCollector::new(transport, Duration::from_secs(30));

        let started = Instant::now();
        let collected = collector
            .collect(&refs(&["a", "b", "c"]), call(), Duration::from_secs(10))
            .await;

        assert_eq!(collected.votes.len(), 2);
        assert!(collected.deadline_reached);
        assert!(started.elapsed() <= Duration::from_secs(10) + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_vote_finishing_at_deadline_is_kept() {
        let transport = Arc::new(MockTransport::new(vec![
            (
                "a",
                Behavior::RespondAfter(Duration::from_secs(10), json!({"confidence": 0.8})),
            ),
            ("b", Behavior::Silent),
        ]));
        let collector = AgentVoteCollector::new(transport, Duration::from_secs(30));

        let collected = collector
            .collect(&refs(&["a", "b"]), call(), Duration::from_secs(10))
            .await;

        assert_eq!(collected.votes.len(), 1);
        assert_eq!(collected.votes[0].participant.as_str(), "a");
        assert!(collected.deadline_reached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_overall_timeout_does_not_overflow() {
        let transport = Arc::new(MockTransport::new(vec![(
            "a",
            Behavior::Respond(json!({"confidence": 0.6})),
        )]));
        let collector = AgentVoteCollector::new(transport, Duration::from_secs(30));

        let collected = collector
            .collect(&refs(&["a"]), call(), Duration::from_secs(u64::MAX))
            .await;

        assert_eq!(collected.votes.len(), 1);
        assert!(!collected.deadline_reached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_timeout_capped_by_deadline() {
        let transport = Arc::new(MockTransport::new(vec![(
            "a",
            Behavior::Respond(json!({"confidence": 0.7})),
        )]));
        let collector = AgentVoteCollector::new(Arc::clone(&transport), Duration::from_secs(30));

        collector.collect(&refs(&["a"]), call(), Duration::from_secs(5)).await;

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1 <= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_participant_hits_per_call_timeout() {
        let transport = Arc::new(MockTransport::new(vec![
            ("fast", Behavior::Respond(json!({"confidence": 0.8}))),
            (
                "slow",
                Behavior::RespondAfter(Duration::from_secs(60), json!({"confidence": 0.9})),
            ),
        ]));
        let collector = AgentVoteCollector::new(transport, Duration::from_secs(2));

        let collected = collector
            .collect(&refs(&["fast", "slow"]), call(), Duration::from_secs(300))
            .await;

        assert_eq!(collected.votes.len(), 1);
        assert_eq!(collected.votes[0].participant.as_str(), "fast");
        assert!(!collected.deadline_reached);
    }

    #[tokio::test]
    async fn test_failures_and_malformed_payloads_are_omitted() {
        let transport = Arc::new(MockTransport::new(vec![
            ("ok", Behavior::Respond(json!({"confidence": 1.5, "recommendation": {"plan": "rest"}}))),
            ("err", Behavior::Fail),
            ("bad", Behavior::Respond(json!("not an object"))),
            ("worse", Behavior::Respond(json!({"confidence": "high"}))),
        ]));
        let collector = AgentVoteCollector::new(transport, Duration::from_secs(1));

        let collected = collector
            .collect(&refs(&["ok", "err", "bad", "worse"]), call(), Duration::from_secs(5))
            .await;

        assert_eq!(collected.votes.len(), 1);
        assert_eq!(collected.votes[0].confidence, 1.0);
        assert_eq!(collected.votes[0].recommendation["plan"], "rest");
    }

    #[tokio::test]
    async fn test_observer_sees_each_vote() {
        let transport = Arc::new(MockTransport::new(vec![
            ("a", Behavior::Respond(json!({"confidence": 0.6}))),
            ("b", Behavior::Respond(json!({"confidence": 0.7}))),
        ]));
        let collector = AgentVoteCollector::new(transport, Duration::from_secs(1));
        let seen = Mutex::new(Vec::new());

        let collected = collector
            .collect_until(
                &refs(&["a", "b"]),
                call(),
                Instant::now() + Duration::from_secs(5),
                &|vote| seen.lock().unwrap().push(vote.participant.to_string()),
            )
            .await;

        let seen = seen.into_inner().unwrap();
        let arrival: Vec<String> = collected.votes.iter().map(|v| v.participant.to_string()).collect();
        assert_eq!(seen, arrival);
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_parse_vote_defaults() {
        let vote = parse_vote(&ParticipantId::from("laoke"), json!({})).unwrap();
        assert_eq!(vote.confidence, DEFAULT_VOTE_CONFIDENCE);
        assert!(vote.recommendation.is_empty());
        assert!(vote.rationale.is_empty());
    }

    #[test]
    fn test_parse_vote_fields() {
        let vote = parse_vote(
            &ParticipantId::from("laoke"),
            json!({
                "confidence": 0.82,
                "recommendation": {"formula": "si jun zi tang"},
                "reasoning": "spleen qi deficiency",
                "supporting_evidence": ["pale tongue", null, 3]
            }),
        )
        .unwrap();
        assert_eq!(vote.rationale, "spleen qi deficiency");
        assert_eq!(vote.supporting_evidence, vec!["pale tongue".to_string(), "3".to_string()]);
        assert_eq!(vote.recommendation["formula"], "si jun zi tang");
    }

    #[test]
    fn test_parse_vote_rejects_non_object_recommendation() {
        let err = parse_vote(&ParticipantId::from("a"), json!({"recommendation": [1, 2]})).unwrap_err();
        assert!(matches!(err, VoteCallError::Malformed(_)));
    }
}

//! HTTP vote transport
//!
//! Sends `POST {endpoint}/api/v1/vote` with
//! `{request_id, decision_type, context, timeout}` and returns the JSON body.

use async_trait::async_trait;
use consilium_application::{ParticipantRef, VoteCall, VoteCallError, VoteTransport};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Path appended to each participant endpoint
pub const VOTE_PATH: &str = "/api/v1/vote";

/// Maximum vote response body size (1 MB)
const MAX_BODY_SIZE: usize = 1024 * 1024;

#[derive(Serialize)]
struct VoteRequestBody<'a> {
    request_id: &'a str,
    decision_type: &'a str,
    context: &'a consilium_domain::DecisionContext,
    /// Seconds the participant has to answer
    timeout: u64,
}

/// Vote transport over HTTP using a shared `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct HttpVoteTransport {
    client: reqwest::Client,
}

impl HttpVoteTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn vote_url(endpoint: &str) -> String {
        format!("{}{}", endpoint.trim_end_matches('/'), VOTE_PATH)
    }
}

fn map_send_error(e: reqwest::Error, timeout: Duration) -> VoteCallError {
    if e.is_timeout() {
        VoteCallError::Timeout(timeout)
    } else {
        VoteCallError::Transport(e.to_string())
    }
}

#[async_trait]
impl VoteTransport for HttpVoteTransport {
    async fn request_vote(
        &self,
        participant: &ParticipantRef,
        call: &VoteCall,
        timeout: Duration,
    ) -> Result<serde_json::Value, VoteCallError> {
        let url = Self::vote_url(&participant.endpoint);
        let body = VoteRequestBody {
            request_id: call.request_id.as_str(),
            decision_type: call.category.as_str(),
            context: &call.context,
            timeout: timeout.as_secs().max(1),
        };
        debug!("Requesting vote from {} at {}", participant.id, url);

        let response = self
            .client
            .post(&url)
            .header("User-Agent", "consilium/0.4 (vote)")
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VoteCallError::Rejected {
                status: status.as_u16(),
                message: consilium_domain::util::truncate_str(&message, 200).to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_send_error(e, timeout))?;
        if bytes.len() > MAX_BODY_SIZE {
            return Err(VoteCallError::Malformed(format!(
                "Response too large: {} bytes",
                bytes.len()
            )));
        }
        serde_json::from_slice(&bytes).map_err(|e| VoteCallError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consilium_domain::{DecisionCategory, DecisionContext, DecisionId};

    #[test]
    fn test_vote_url_joins_path() {
        assert_eq!(
            HttpVoteTransport::vote_url("http://xiaoai:8080/"),
            "http://xiaoai:8080/api/v1/vote"
        );
        assert_eq!(
            HttpVoteTransport::vote_url("http://laoke"),
            "http://laoke/api/v1/vote"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let mut context = DecisionContext::new();
        context.insert("user_id".to_string(), serde_json::json!("u-1"));
        let body = VoteRequestBody {
            request_id: "d-1",
            decision_type: DecisionCategory::DiagnosisAnalysis.as_str(),
            context: &context,
            timeout: 30,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["request_id"], "d-1");
        assert_eq!(value["decision_type"], "diagnosis_analysis");
        assert_eq!(value["context"]["user_id"], "u-1");
        assert_eq!(value["timeout"], 30);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let transport = HttpVoteTransport::new();
        let call = VoteCall {
            request_id: DecisionId::new("d-1"),
            category: DecisionCategory::HealthAssessment,
            context: DecisionContext::new(),
        };
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let result = transport
            .request_vote(
                &ParticipantRef::new("xiaoai", "http://127.0.0.1:9"),
                &call,
                Duration::from_secs(2),
            )
            .await;
        assert!(result.is_err());
    }
}

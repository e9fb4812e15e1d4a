//! Upstream scraping provider client.
//!
//! The provider's request and response shapes are not contractually
//! guaranteed, so submission negotiates an ordered list of request-body
//! shapes and resolution polls an ordered list of status-endpoint
//! templates. All tie-breaking is first-match in fixed order: the first
//! accepted shape wins, the first matching token field wins, the first
//! endpoint that resolves wins.

use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::{PipelineError, Result};

/// Token field names checked on a `200`/`202` submission response,
/// in priority order.
pub const TOKEN_FIELDS: [&str; 4] = ["uuid", "job_id", "id", "task_id"];

const DONE_STATUSES: [&str; 3] = ["completed", "done", "success"];
const FAILED_STATUSES: [&str; 2] = ["failed", "error"];
const PENDING_STATUSES: [&str; 3] = ["processing", "running", "pending"];

/// Outcome of a successful submission: either the content came back
/// inline, or the provider handed out a token for asynchronous polling.
#[derive(Debug)]
pub enum SubmitOutcome {
    Resolved(Value),
    Accepted(String),
}

/// Result of one request-shape attempt. The candidate loop inspects this
/// to decide whether to advance; only a `202` without a token aborts the
/// loop outright (propagated as an error from [`ScrapeClient::submit`]).
enum Attempt {
    Accepted(SubmitOutcome),
    /// The provider answered with a non-acceptable status.
    Rejected(String),
    /// The request never produced an HTTP response.
    Unreachable(String),
}

/// Classification of one `200` polling response body.
enum PollState {
    Done,
    Failed(String),
    Pending,
    Unrecognized,
}

pub struct ScrapeClient {
    client: reqwest::Client,
    endpoint: String,
    status_endpoints: Vec<String>,
    api_key: Option<String>,
    poll_rounds: u32,
    poll_interval: Duration,
}

impl ScrapeClient {
    pub fn new(config: &ScraperConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            status_endpoints: config.status_endpoints.clone(),
            api_key,
            poll_rounds: config.poll_rounds,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }

    /// Submits an acquisition request, trying each candidate request shape
    /// in order until one is accepted.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::AcquisitionFailed`] — every shape was rejected,
    ///   or a `202` acceptance carried no discoverable token.
    /// - [`PipelineError::ProviderUnreachable`] — no attempt produced an
    ///   HTTP response at all.
    pub async fn submit(
        &self,
        url: &str,
        max_pages: u32,
        max_depth: u32,
    ) -> Result<SubmitOutcome> {
        let shapes = request_payloads(url, max_pages, max_depth);
        let total = shapes.len();
        let mut rejected: Option<String> = None;
        let mut unreachable: Option<String> = None;

        for (i, payload) in shapes.iter().enumerate() {
            debug!(shape = i + 1, total, url, "attempting request shape");

            match self.try_shape(payload).await? {
                Attempt::Accepted(outcome) => {
                    info!(shape = i + 1, url, "request shape accepted");
                    return Ok(outcome);
                }
                Attempt::Rejected(reason) => {
                    warn!(shape = i + 1, %reason, "request shape rejected");
                    rejected = Some(reason);
                }
                Attempt::Unreachable(reason) => {
                    warn!(shape = i + 1, %reason, "request attempt failed in transport");
                    unreachable = Some(reason);
                }
            }
        }

        // Any HTTP rejection proves the provider was reachable; only a clean
        // sweep of transport failures counts as unreachable.
        match (rejected, unreachable) {
            (Some(reason), _) => Err(PipelineError::AcquisitionFailed(format!(
                "all {} request shapes failed (last: {})",
                total, reason
            ))),
            (None, Some(reason)) => Err(PipelineError::ProviderUnreachable(reason)),
            (None, None) => Err(PipelineError::AcquisitionFailed(
                "no request shapes to attempt".to_string(),
            )),
        }
    }

    async fn try_shape(&self, payload: &Value) -> Result<Attempt> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return Ok(Attempt::Unreachable(e.to_string())),
        };

        match response.status().as_u16() {
            200 => {
                let body: Value = match response.json().await {
                    Ok(v) => v,
                    Err(e) => return Ok(Attempt::Rejected(format!("unparseable body: {}", e))),
                };

                if has_embedded_results(&body) {
                    return Ok(Attempt::Accepted(SubmitOutcome::Resolved(body)));
                }
                if let Some(token) = find_token(&body) {
                    return Ok(Attempt::Accepted(SubmitOutcome::Accepted(token)));
                }
                // 200 with neither nested results nor a token: hand the body
                // to extraction as-is rather than guessing further.
                Ok(Attempt::Accepted(SubmitOutcome::Resolved(body)))
            }
            202 => {
                let body: Value = response.json().await.map_err(|e| {
                    PipelineError::AcquisitionFailed(format!(
                        "async acceptance with unparseable body: {}",
                        e
                    ))
                })?;
                match find_token(&body) {
                    Some(token) => Ok(Attempt::Accepted(SubmitOutcome::Accepted(token))),
                    // Fatal for the whole submission, not retried with the
                    // next shape.
                    None => Err(PipelineError::AcquisitionFailed(
                        "async job accepted but no job token found in response".to_string(),
                    )),
                }
            }
            status => Ok(Attempt::Rejected(format!("provider returned {}", status))),
        }
    }

    /// Turns a submission outcome into a final payload, polling if needed.
    pub async fn resolve(&self, outcome: SubmitOutcome) -> Result<Value> {
        match outcome {
            SubmitOutcome::Resolved(payload) => Ok(payload),
            SubmitOutcome::Accepted(token) => self.poll(&token).await,
        }
    }

    /// Polls every candidate status endpoint once per round, up to the
    /// configured round budget. The first endpoint that reports completion
    /// short-circuits the remaining endpoints and rounds.
    async fn poll(&self, token: &str) -> Result<Value> {
        let endpoints: Vec<String> = self
            .status_endpoints
            .iter()
            .map(|template| template.replace("{token}", token))
            .collect();

        info!(token, rounds = self.poll_rounds, "polling for job results");

        for round in 1..=self.poll_rounds {
            for endpoint in &endpoints {
                tokio::time::sleep(self.poll_interval).await;

                let mut request = self.client.get(endpoint);
                if let Some(key) = &self.api_key {
                    request = request.bearer_auth(key);
                }

                let response = match request.send().await {
                    Ok(r) => r,
                    Err(e) => {
                        debug!(endpoint, error = %e, "status request failed");
                        continue;
                    }
                };

                match response.status().as_u16() {
                    200 => {
                        let body: Value = match response.json().await {
                            Ok(v) => v,
                            Err(e) => {
                                debug!(endpoint, error = %e, "unparseable status body");
                                continue;
                            }
                        };
                        match classify_poll(&body) {
                            PollState::Done => {
                                info!(round, endpoint, "scraping job resolved");
                                return Ok(body);
                            }
                            PollState::Failed(reason) => {
                                return Err(PipelineError::ResolutionFailed(reason));
                            }
                            PollState::Pending => {
                                debug!(round, endpoint, "job still in progress");
                                continue;
                            }
                            PollState::Unrecognized => {
                                debug!(round, endpoint, "no status field and no data, continuing");
                                continue;
                            }
                        }
                    }
                    // Wrong endpoint shape — try the next candidate.
                    404 => continue,
                    status => {
                        warn!(round, endpoint, status, "unexpected status response");
                        continue;
                    }
                }
            }
            debug!(round, total = self.poll_rounds, "polling round completed");
        }

        Err(PipelineError::ResolutionTimeout {
            rounds: self.poll_rounds,
        })
    }
}

/// The candidate request-body shapes, in the order they are attempted.
fn request_payloads(url: &str, max_pages: u32, max_depth: u32) -> Vec<Value> {
    vec![
        json!({
            "type": "web",
            "arguments": {
                "type": "scraper",
                "url": url,
                "max_pages": max_pages,
                "max_depth": max_depth,
            }
        }),
        json!({
            "url": url,
            "max_pages": max_pages,
            "max_depth": max_depth,
        }),
        json!({
            "query": url,
            "type": "scrape",
            "max_pages": max_pages,
            "max_depth": max_depth,
        }),
    ]
}

/// True when the body already carries nested results (`data.results`).
fn has_embedded_results(body: &Value) -> bool {
    body.get("data")
        .map(|data| data.get("results").is_some())
        .unwrap_or(false)
}

/// Searches the fixed token field list; the first present field wins even
/// when later fields are also set. Accepts string and integer tokens.
fn find_token(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    for field in TOKEN_FIELDS {
        if let Some(value) = obj.get(field) {
            if let Some(s) = value.as_str() {
                return Some(s.to_string());
            }
            if let Some(n) = value.as_u64() {
                return Some(n.to_string());
            }
        }
    }
    None
}

fn classify_poll(body: &Value) -> PollState {
    let has_data = body.get("data").is_some() || body.get("results").is_some();

    match body.get("status").and_then(Value::as_str) {
        Some(status) => {
            let status = status.to_ascii_lowercase();
            if DONE_STATUSES.contains(&status.as_str()) {
                PollState::Done
            } else if FAILED_STATUSES.contains(&status.as_str()) {
                let reason = body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                PollState::Failed(reason)
            } else if PENDING_STATUSES.contains(&status.as_str()) {
                PollState::Pending
            } else if has_data {
                // Unknown status but data is present — treat as done.
                PollState::Done
            } else {
                PollState::Unrecognized
            }
        }
        None => {
            if has_data {
                PollState::Done
            } else {
                PollState::Unrecognized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_request_shapes_in_order() {
        let shapes = request_payloads("https://example.org/docs", 5, 2);
        assert_eq!(shapes.len(), 3);
        // First shape nests arguments; second is flat; third uses `query`.
        assert_eq!(shapes[0]["arguments"]["url"], "https://example.org/docs");
        assert_eq!(shapes[1]["url"], "https://example.org/docs");
        assert_eq!(shapes[2]["query"], "https://example.org/docs");
        assert_eq!(shapes[2]["type"], "scrape");
    }

    #[test]
    fn test_token_field_priority() {
        // `uuid` wins even though `id` and `task_id` are also present.
        let body = json!({"id": "later", "uuid": "first", "task_id": "last"});
        assert_eq!(find_token(&body), Some("first".to_string()));

        let body = json!({"task_id": "only"});
        assert_eq!(find_token(&body), Some("only".to_string()));
    }

    #[test]
    fn test_token_accepts_integer_ids() {
        let body = json!({"job_id": 42});
        assert_eq!(find_token(&body), Some("42".to_string()));
    }

    #[test]
    fn test_no_token_found() {
        assert_eq!(find_token(&json!({"message": "accepted"})), None);
        assert_eq!(find_token(&json!("not an object")), None);
    }

    #[test]
    fn test_embedded_results_detection() {
        assert!(has_embedded_results(
            &json!({"data": {"results": [{"content": "x"}]}})
        ));
        assert!(!has_embedded_results(&json!({"data": {}})));
        assert!(!has_embedded_results(&json!({"results": []})));
    }

    #[test]
    fn test_poll_classification_done_set() {
        for status in ["completed", "done", "success", "COMPLETED"] {
            assert!(matches!(
                classify_poll(&json!({"status": status})),
                PollState::Done
            ));
        }
    }

    #[test]
    fn test_poll_classification_failed_carries_reason() {
        let body = json!({"status": "failed", "error": "robots disallowed"});
        match classify_poll(&body) {
            PollState::Failed(reason) => assert_eq!(reason, "robots disallowed"),
            _ => panic!("expected failure classification"),
        }
    }

    #[test]
    fn test_poll_classification_pending_and_data() {
        assert!(matches!(
            classify_poll(&json!({"status": "processing"})),
            PollState::Pending
        ));
        // No status field at all, but data present — done.
        assert!(matches!(
            classify_poll(&json!({"results": [1]})),
            PollState::Done
        ));
        // Unknown status with data — done.
        assert!(matches!(
            classify_poll(&json!({"status": "finalizing", "data": {}})),
            PollState::Done
        ));
        // Nothing recognizable.
        assert!(matches!(
            classify_poll(&json!({"note": "??"})),
            PollState::Unrecognized
        ));
    }
}

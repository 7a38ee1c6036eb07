//! Remote source reader.
//!
//! [`HttpFetcher`] performs exactly one `GET` per call and maps the JSON
//! body into a [`Candidate`]. There is no retry here; the scheduler's next
//! tick is the retry.

use crate::config::FetcherConfig;
use crate::error::{PollError, Result};
use crate::store::Candidate;
use async_trait::async_trait;
use tracing::debug;

/// Longest slice of an error body quoted in a [`PollError::FetchFailed`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Produces one candidate per tick.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_candidate(&self) -> Result<Candidate>;
}

/// Reads candidates from a JSON HTTP endpoint.
pub struct HttpFetcher {
    config: FetcherConfig,
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with its own client.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("tracklog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PollError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl CandidateSource for HttpFetcher {
    async fn fetch_candidate(&self) -> Result<Candidate> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(PollError::FetchFailed(if detail.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {detail}", status.as_u16())
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let candidate = parse_candidate(
            &body,
            &self.config.primary_field,
            &self.config.secondary_field,
        )?;
        debug!(
            primary = %candidate.primary_label,
            secondary = %candidate.secondary_label,
            "fetched candidate"
        );
        Ok(candidate)
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> PollError {
    if err.is_timeout() {
        PollError::FetchFailed(format!("request timed out: {err}"))
    } else if err.is_connect() {
        PollError::FetchFailed(format!("connection failed: {err}"))
    } else {
        PollError::FetchFailed(format!("transport error: {err}"))
    }
}

/// Map a JSON object body onto a [`Candidate`].
///
/// Both fields must be present and be JSON strings.
pub fn parse_candidate(body: &str, primary_field: &str, secondary_field: &str) -> Result<Candidate> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PollError::FetchFailed(format!("malformed response body: {e}")))?;
    let object = json
        .as_object()
        .ok_or_else(|| PollError::FetchFailed("response body is not a JSON object".into()))?;

    let field = |name: &str| -> Result<String> {
        match object.get(name) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(PollError::FetchFailed(format!(
                "field `{name}` is not a string: {other}"
            ))),
            None => Err(PollError::FetchFailed(format!("field `{name}` is missing"))),
        }
    };

    Ok(Candidate {
        primary_label: field(primary_field)?,
        secondary_label: field(secondary_field)?,
    })
}

//! HTTP client for the Warsaw WSStore queue-status API.
//!
//! Two upstream endpoints: an HTML page carrying the office list and a
//! JSON endpoint reporting per-matter queue state. [`WsStoreClient`]
//! wraps both behind [`QueueSource`], classifies failures into the
//! connection/response taxonomy, and retries transient connection
//! failures with a bounded fixed backoff.

mod html;
mod json;
pub mod query;

use std::{future::Future, time::Duration};

use kolejka_core::{
  Error, Result, matter::MatterWithSample, office::Office, source::QueueSource,
};
use tracing::{debug, warn};

pub use query::append_parameters;

/// HTTP request timeout. The upstream answers fast or not at all.
const HTTP_TIMEOUT_SECS: u64 = 5;

// ─── Retry policy ────────────────────────────────────────────────────────────

/// Bounded retry for transient connection failures. Response errors are
/// permanent for the call and never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  /// Total attempts, the first one included.
  pub attempts: u32,
  /// Fixed pause between attempts.
  pub backoff:  Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts: 5,
      backoff:  Duration::from_secs(2),
    }
  }
}

async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let mut attempt = 1u32;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(e) if e.is_transient() && attempt < policy.attempts => {
        warn!(attempt, error = %e, "transient fetch failure, backing off");
        tokio::time::sleep(policy.backoff).await;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

/// Sort a reqwest failure into the taxonomy: HTTP status and decode
/// problems mean the upstream answered (response error); everything on
/// the transport side is a connection error.
fn classify(e: reqwest::Error) -> Error {
  if e.is_status() || e.is_decode() {
    Error::Response(e.to_string())
  } else {
    Error::Connection(e.to_string())
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Raw client for the two WSStore endpoints.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct WsStoreClient {
  http:     reqwest::Client,
  html_url: String,
  json_url: String,
  api_key:  String,
  retry:    RetryPolicy,
}

impl WsStoreClient {
  /// Build a client for the given endpoint base URLs. `api_key` is the
  /// caller-supplied upstream secret; surrounding whitespace (a trailing
  /// newline from a secret file, typically) is dropped.
  pub fn new(
    html_url: impl Into<String>,
    json_url: impl Into<String>,
    api_key: &str,
  ) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
      .build()
      .map_err(|e| Error::Connection(format!("failed to build HTTP client: {e}")))?;
    Ok(Self {
      http,
      html_url: html_url.into(),
      json_url: json_url.into(),
      api_key: api_key.trim().to_owned(),
      retry: RetryPolicy::default(),
    })
  }

  /// Replace the default retry policy (5 attempts, 2 s apart).
  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  async fn get_text(&self, url: &str) -> Result<String> {
    let response = self.http.get(url).send().await.map_err(classify)?;
    let response = response.error_for_status().map_err(classify)?;
    response.text().await.map_err(classify)
  }
}

impl QueueSource for WsStoreClient {
  async fn fetch_offices(&self) -> Result<Vec<Office>> {
    let offices = with_retry(&self.retry, || async {
      let page = self.get_text(&self.html_url).await?;
      Ok(html::parse_office_list(&page))
    })
    .await?;
    debug!(count = offices.len(), "fetched office list");
    Ok(offices)
  }

  async fn fetch_matters(&self, office_key: &str) -> Result<Vec<MatterWithSample>> {
    let url = append_parameters(
      &self.json_url,
      &[("id", office_key), ("apikey", &self.api_key)],
    )?;
    let pairs = with_retry(&self.retry, || async {
      let payload = self.get_text(&url).await?;
      json::parse_matters(&payload)
    })
    .await?;
    debug!(office_key, count = pairs.len(), "fetched matters with samples");
    Ok(pairs)
  }
}

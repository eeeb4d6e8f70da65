//! Client for a remote deployment of the batch endpoint.

use std::future::Future;
use std::time::Duration;

use ceac_core::{BatchEntry, BatchResult, SubmissionResult, TerminalError};
use reqwest::{Client, Url};

use crate::client::{check_status, parse_url};
use crate::error::PortalError;

/// Returned by [`RemoteTrackerClient::query_one`] once every try failed.
pub const MSG_SERVER_ERROR: &str = "Server Error";

pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Transport failures worth another try. Malformed JSON is not.
fn is_retriable(err: &PortalError) -> bool {
    matches!(
        err,
        PortalError::Http(_) | PortalError::UnexpectedStatus { .. }
    )
}

/// Runs `operation` up to `max_retries + 1` times, sleeping `delay` between
/// tries. Non-retriable errors are returned at once.
async fn retry_with_delay<T, F, Fut>(
    max_retries: u32,
    delay: Duration,
    mut operation: F,
) -> Result<T, PortalError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortalError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "remote tracker call failed; retrying"
                );
            }
        }
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Talks to another instance's `POST /` endpoint.
#[derive(Debug, Clone)]
pub struct RemoteTrackerClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl RemoteTrackerClient {
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidUrl`] for a malformed endpoint and
    /// [`PortalError::Http`] if the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, PortalError> {
        let endpoint = parse_url(endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: None,
            max_attempts: 5,
            retry_delay: Duration::from_secs(1),
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Sends `entries` in one request, without retrying.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Http`], [`PortalError::UnexpectedStatus`] or
    /// [`PortalError::Deserialize`].
    pub async fn query_batch(&self, entries: &[BatchEntry]) -> Result<BatchResult, PortalError> {
        let mut request = self.client.post(self.endpoint.clone()).json(entries);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let body = check_status(request.send().await?)?.text().await?;
        serde_json::from_str(&body).map_err(|e| PortalError::Deserialize {
            context: format!("batch response from {}", self.endpoint),
            source: e,
        })
    }

    /// Queries a single case, retrying transport failures. Every failure mode
    /// is folded into the returned result.
    pub async fn query_one(&self, entry: &BatchEntry) -> SubmissionResult {
        let entries = std::slice::from_ref(entry);
        let outcome = retry_with_delay(self.max_attempts - 1, self.retry_delay, || {
            self.query_batch(entries)
        })
        .await;

        match outcome {
            Ok(mut results) => results.remove(&entry.case_number).unwrap_or_else(|| {
                SubmissionResult::Terminal(TerminalError::Other(format!(
                    "no result for case {} in response",
                    entry.case_number
                )))
            }),
            Err(err) => {
                tracing::error!(
                    case_number = %entry.case_number,
                    error = %err,
                    "remote tracker unavailable"
                );
                SubmissionResult::Terminal(TerminalError::Other(MSG_SERVER_ERROR.to_string()))
            }
        }
    }

    /// Sends `entries` in sequential chunks of at most `chunk_size`.
    ///
    /// A failed chunk marks each of its entries with the error message and
    /// does not stop later chunks.
    pub async fn query_chunked(&self, entries: &[BatchEntry], chunk_size: usize) -> BatchResult {
        let mut merged = BatchResult::with_capacity(entries.len());
        for (index, chunk) in entries.chunks(chunk_size.max(1)).enumerate() {
            match self.query_batch(chunk).await {
                Ok(results) => merged.extend(results),
                Err(err) => {
                    tracing::error!(chunk = index, error = %err, "remote batch chunk failed");
                    let message = err.to_string();
                    for entry in chunk {
                        merged.insert(
                            entry.case_number.clone(),
                            SubmissionResult::Terminal(TerminalError::Other(message.clone())),
                        );
                    }
                }
            }
        }
        merged
    }
}

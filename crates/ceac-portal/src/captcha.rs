use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::client::{check_status, parse_url};
use crate::error::PortalError;

/// Black-box captcha classifier: image bytes in, best-effort guess out.
///
/// A wrong guess is normal and is handled by the retry loop. Return an error
/// only when no guess could be produced at all.
pub trait CaptchaSolver: Send + Sync {
    fn predict(&self, image: &[u8]) -> impl Future<Output = Result<String, PortalError>> + Send;
}

/// Trims and uppercases a raw guess.
///
/// An empty or garbled guess is still a guess: the portal rejects it as a
/// captcha mismatch and the retry loop takes another attempt.
#[must_use]
pub fn normalize_guess(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    result: String,
}

/// Captcha solver hosted as an HTTP service.
///
/// POSTs the raw image as `application/octet-stream` and expects
/// `{"result": "<guess>"}` back.
#[derive(Debug, Clone)]
pub struct RemoteCaptchaSolver {
    client: Client,
    endpoint: Url,
}

impl RemoteCaptchaSolver {
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidUrl`] for a malformed endpoint and
    /// [`PortalError::Http`] if the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, PortalError> {
        let endpoint = parse_url(endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

impl CaptchaSolver for RemoteCaptchaSolver {
    async fn predict(&self, image: &[u8]) -> Result<String, PortalError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?;
        let body = check_status(response)?.text().await?;
        let parsed: PredictResponse =
            serde_json::from_str(&body).map_err(|e| PortalError::Deserialize {
                context: format!("captcha prediction from {}", self.endpoint),
                source: e,
            })?;
        Ok(normalize_guess(&parsed.result))
    }
}

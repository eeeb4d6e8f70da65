use std::time::Duration;

use ceac_core::{AppConfig, ResolvedQuery};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};

use crate::error::PortalError;
use crate::form::{self, SessionDocument};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
                           image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Connection and identity settings shared by every [`PortalClient`] a
/// dispatcher creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSettings {
    /// Absolute URL of the status page, including the `App=NIV` query.
    pub status_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl PortalSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            status_url: config.portal_url.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// HTTP client for the status page.
///
/// Each instance owns its own cookie jar, so one client corresponds to one
/// browser-like session lineage. Do not share a client between queries that
/// run concurrently.
#[derive(Debug)]
pub struct PortalClient {
    client: Client,
    status_url: Url,
}

impl PortalClient {
    /// Creates a client with a fresh cookie store, browser navigation headers
    /// and the configured timeout.
    ///
    /// # Errors
    ///
    /// - [`PortalError::InvalidUrl`] if `status_url` is not an absolute URL.
    /// - [`PortalError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed.
    pub fn new(settings: &PortalSettings) -> Result<Self, PortalError> {
        let status_url = parse_url(&settings.status_url)?;
        let client = Client::builder()
            .cookie_store(true)
            .default_headers(browser_headers())
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client, status_url })
    }

    #[must_use]
    pub fn status_url(&self) -> &Url {
        &self.status_url
    }

    /// GETs the status page and extracts a fresh session from it.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Http`] or [`PortalError::UnexpectedStatus`] on
    /// transport failure, and [`PortalError::MalformedPage`] if the page has
    /// no captcha image.
    pub async fn fetch_initial_page(&self) -> Result<SessionDocument, PortalError> {
        let response = self.client.get(self.status_url.clone()).send().await?;
        let html = read_text(response).await?;
        form::extract(&html)
    }

    /// Resolves `image_ref` against the status page URL.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidUrl`] if the reference cannot be joined.
    pub fn captcha_url(&self, image_ref: &str) -> Result<Url, PortalError> {
        self.status_url
            .join(image_ref)
            .map_err(|e| PortalError::InvalidUrl {
                url: image_ref.to_string(),
                reason: e.to_string(),
            })
    }

    /// Downloads the captcha image within the current cookie session.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidUrl`], [`PortalError::Http`] or
    /// [`PortalError::UnexpectedStatus`].
    pub async fn fetch_captcha_image(&self, image_ref: &str) -> Result<Vec<u8>, PortalError> {
        let url = self.captcha_url(image_ref)?;
        let response = self.client.get(url).send().await?;
        let response = check_status(response)?;
        Ok(response.bytes().await?.to_vec())
    }

    /// POSTs the form built from `session`, `query` and `captcha_guess` and
    /// returns the response body.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Http`] or [`PortalError::UnexpectedStatus`].
    pub async fn submit(
        &self,
        session: &SessionDocument,
        query: &ResolvedQuery,
        captcha_guess: &str,
    ) -> Result<String, PortalError> {
        let fields = form::build_submission(session, query, captcha_guess);
        let response = self
            .client
            .post(self.status_url.clone())
            .form(&fields)
            .send()
            .await?;
        read_text(response).await
    }
}

pub(crate) fn parse_url(raw: &str) -> Result<Url, PortalError> {
    Url::parse(raw).map_err(|e| PortalError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PortalError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PortalError::UnexpectedStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

async fn read_text(response: reqwest::Response) -> Result<String, PortalError> {
    Ok(check_status(response)?.text().await?)
}

/// Headers a desktop Chrome sends on a top-level navigation.
///
/// `Accept-Encoding` is left to reqwest so that it only advertises encodings
/// it can decode.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(
            r#""Google Chrome";v="123", "Not:A-Brand";v="8", "Chromium";v="123""#,
        ),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-mobile"),
        HeaderValue::from_static("?0"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static(r#""Windows""#),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

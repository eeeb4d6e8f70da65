//! Shared fixtures for the portal integration tests: canned portal pages,
//! stub captcha solvers and request counting helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use ceac_core::{QueryCredentials, QueryRequest, MSG_CAPTCHA_MISMATCH, MSG_NO_SUCH_CASE};
use ceac_portal::{CaptchaSolver, PortalError, PortalSettings, RetryPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const STATUS_PATH: &str = "/CEACStatTracker/Status.aspx";
pub const CAPTCHA_PATH: &str = "/CEACStatTracker/BotDetectCaptcha.ashx";
pub const CAPTCHA_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-captcha";

pub fn settings(server: &MockServer) -> PortalSettings {
    PortalSettings {
        status_url: format!("{}{STATUS_PATH}?App=NIV", server.uri()),
        timeout_secs: 5,
        user_agent: "ceac-test/0.1".to_string(),
    }
}

/// Five attempts with a short backoff so retry tests stay fast.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        backoff: Duration::from_millis(10),
    }
}

pub fn request(case_number: &str) -> QueryRequest {
    QueryRequest::new("BEJ", case_number, QueryCredentials::None).expect("valid test request")
}

fn form(body: &str) -> String {
    format!(
        r#"<html><body><form method="post" action="./Status.aspx?App=NIV" id="aspnetForm">
<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="dDwtMTA4MzE0MjEwNTs7Pg==" />
<input type="hidden" name="__VIEWSTATEGENERATOR" value="B9C5F3C5" />
<input type="hidden" name="__EVENTVALIDATION" value="ev-token" />
<img id="c_status_ctl00_contentplaceholder1_defaultcaptcha_CaptchaImage"
     src="BotDetectCaptcha.ashx?get=image&amp;c=c_status_ctl00_contentplaceholder1_defaultcaptcha&amp;t=abc123" />
{body}
</form></body></html>"#
    )
}

/// The status page as served on a plain GET.
pub fn form_page() -> String {
    form(r#"<div id="ctl00_ContentPlaceHolder1_ValidationSummary1" style="display:none"></div>"#)
}

pub fn summary_page(message: &str) -> String {
    form(&format!(
        r#"<div id="ctl00_ContentPlaceHolder1_ValidationSummary1"><ul><li>{message}</li></ul></div>"#
    ))
}

pub fn no_data_page() -> String {
    summary_page(MSG_NO_SUCH_CASE)
}

pub fn mismatch_page() -> String {
    summary_page(MSG_CAPTCHA_MISMATCH)
}

/// A response with no validation summary at all.
pub fn silent_reject_page() -> String {
    "<html><body><p>Please wait...</p></body></html>".to_string()
}

pub fn success_page(case_number: &str) -> String {
    form(&format!(
        r#"<div id="ctl00_ContentPlaceHolder1_ValidationSummary1" style="display:none"></div>
<span id="ctl00_ContentPlaceHolder1_lblError"></span>
<span id="ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblStatus">Issued</span>
<span id="ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblCaseNo">{case_number}</span>
<span id="ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblSubmitDate">02-Jan-2024</span>
<span id="ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblStatusDate">15-Mar-2024</span>
<span id="ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblMessage">Your visa is in final processing.</span>"#
    ))
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

/// Serves the status page on GET and the captcha image.
pub async fn mount_session(server: &MockServer) {
    mount_captcha(server).await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(html(form_page()))
        .mount(server)
        .await;
}

pub async fn mount_captcha(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(CAPTCHA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(CAPTCHA_PNG, "image/png"))
        .mount(server)
        .await;
}

/// Number of requests received with `verb` on `request_path`.
pub async fn count(server: &MockServer, verb: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == request_path)
        .count()
}

pub async fn total_requests(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

/// Always answers with the same guess.
#[derive(Default)]
pub struct FixedSolver {
    calls: AtomicU32,
}

impl FixedSolver {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CaptchaSolver for FixedSolver {
    async fn predict(&self, image: &[u8]) -> Result<String, PortalError> {
        assert_eq!(image, CAPTCHA_PNG, "solver received unexpected image bytes");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("X7KQ2".to_string())
    }
}

/// A solver whose backend is down.
pub struct UnavailableSolver;

impl CaptchaSolver for UnavailableSolver {
    async fn predict(&self, _image: &[u8]) -> Result<String, PortalError> {
        Err(PortalError::Captcha {
            reason: "solver offline".to_string(),
        })
    }
}

//! Maps a submission response page to a [`SubmissionResult`].

use ceac_core::{CaseNumber, RetryableError, StatusRecord, SubmissionResult};
use scraper::Html;

use crate::error::PortalError;
use crate::form::selector;

const VALIDATION_SUMMARY_ID: &str = "ctl00_ContentPlaceHolder1_ValidationSummary1";
const ERROR_LABEL_ID: &str = "ctl00_ContentPlaceHolder1_lblError";
const STATUS_ID: &str = "ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblStatus";
const CASE_NO_ID: &str = "ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblCaseNo";
const SUBMIT_DATE_ID: &str = "ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblSubmitDate";
const STATUS_DATE_ID: &str = "ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblStatusDate";
const MESSAGE_ID: &str = "ctl00_ContentPlaceHolder1_ucApplicationStatusView_lblMessage";

/// Classifies a response page, checked in this order:
///
/// 1. No validation summary element: the portal rejected the form before
///    validation ran, treated as a captcha mismatch.
/// 2. Non-empty validation summary text: mapped with
///    [`SubmissionResult::from_message`].
/// 3. Non-empty error label text: mapped the same way.
/// 4. Otherwise the status view is read and its case number must equal
///    `expected`.
///
/// # Errors
///
/// - [`PortalError::CaseMismatch`] if the page describes another case.
/// - [`PortalError::MalformedPage`] if a status view field is missing.
pub fn classify(html: &str, expected: &CaseNumber) -> Result<SubmissionResult, PortalError> {
    let document = Html::parse_document(html);

    let Some(summary) = element_text(&document, VALIDATION_SUMMARY_ID)? else {
        return Ok(SubmissionResult::Retryable(RetryableError::CaptchaMismatch));
    };
    if !summary.is_empty() {
        return Ok(SubmissionResult::from_message(&summary));
    }

    if let Some(error) = element_text(&document, ERROR_LABEL_ID)? {
        if !error.is_empty() {
            return Ok(SubmissionResult::from_message(&error));
        }
    }

    let found = required_text(&document, CASE_NO_ID)?;
    if found != expected.as_str() {
        return Err(PortalError::CaseMismatch {
            expected: expected.as_str().to_string(),
            found,
        });
    }

    Ok(SubmissionResult::Success(StatusRecord {
        status: required_text(&document, STATUS_ID)?,
        submit_date: required_text(&document, SUBMIT_DATE_ID)?,
        status_date: required_text(&document, STATUS_DATE_ID)?,
        message: required_text(&document, MESSAGE_ID)?,
    }))
}

/// Trimmed text content of the element with `id`, or `None` if absent.
fn element_text(document: &Html, id: &str) -> Result<Option<String>, PortalError> {
    let sel = selector(&format!("#{id}"))?;
    Ok(document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string()))
}

fn required_text(document: &Html, id: &str) -> Result<String, PortalError> {
    element_text(document, id)?.ok_or_else(|| PortalError::MalformedPage {
        reason: format!("status view element #{id} not found"),
    })
}

#[cfg(test)]
mod tests {
    use ceac_core::{TerminalError, MSG_INVALID_IDENTIFIER, MSG_NO_SUCH_CASE};

    use super::*;

    fn case(raw: &str) -> CaseNumber {
        CaseNumber::parse(raw).unwrap()
    }

    fn page(summary: Option<&str>, error: &str, body: &str) -> String {
        let summary = summary
            .map(|text| format!(r#"<div id="{VALIDATION_SUMMARY_ID}">{text}</div>"#))
            .unwrap_or_default();
        format!(
            r#"<html><body>{summary}<span id="{ERROR_LABEL_ID}">{error}</span>{body}</body></html>"#
        )
    }

    fn status_view(case_no: &str) -> String {
        format!(
            r#"<span id="{STATUS_ID}">Issued</span>
               <span id="{CASE_NO_ID}"> {case_no} </span>
               <span id="{SUBMIT_DATE_ID}">02-Jan-2024</span>
               <span id="{STATUS_DATE_ID}">15-Mar-2024</span>
               <span id="{MESSAGE_ID}">Your visa is in final processing.</span>"#
        )
    }

    #[test]
    fn missing_summary_is_captcha_mismatch() {
        let html = "<html><body><p>Session expired</p></body></html>";
        assert_eq!(
            classify(html, &case("AA00A38G49")).unwrap(),
            SubmissionResult::Retryable(RetryableError::CaptchaMismatch)
        );
    }

    #[test]
    fn summary_text_is_classified() {
        let html = page(Some(&format!("<ul><li>{MSG_NO_SUCH_CASE}</li></ul>")), "", "");
        assert_eq!(
            classify(&html, &case("AA00A38G49")).unwrap(),
            SubmissionResult::Terminal(TerminalError::NoSuchCase)
        );
    }

    #[test]
    fn summary_captcha_text_is_retryable() {
        let html = page(
            Some("The code entered does not match the code displayed on the page."),
            "",
            "",
        );
        assert!(classify(&html, &case("AA00A38G49")).unwrap().is_retryable());
    }

    #[test]
    fn unknown_summary_text_is_terminal_other() {
        let html = page(Some("Location is required."), "", "");
        assert_eq!(
            classify(&html, &case("AA00A38G49")).unwrap(),
            SubmissionResult::Terminal(TerminalError::Other("Location is required.".to_string()))
        );
    }

    #[test]
    fn error_label_is_used_when_summary_is_empty() {
        let html = page(Some("  "), MSG_INVALID_IDENTIFIER, "");
        assert_eq!(
            classify(&html, &case("AA00A38G49")).unwrap(),
            SubmissionResult::Terminal(TerminalError::InvalidIdentifierFormat)
        );
    }

    #[test]
    fn status_view_yields_record() {
        let html = page(Some(""), "", &status_view("AA00A38G49"));
        let result = classify(&html, &case("aa00a38g49")).unwrap();
        assert_eq!(
            result,
            SubmissionResult::Success(StatusRecord {
                status: "Issued".to_string(),
                submit_date: "02-Jan-2024".to_string(),
                status_date: "15-Mar-2024".to_string(),
                message: "Your visa is in final processing.".to_string(),
            })
        );
    }

    #[test]
    fn foreign_case_number_is_protocol_violation() {
        let html = page(Some(""), "", &status_view("AA00899Z9W"));
        let err = classify(&html, &case("AA00A38G49")).unwrap_err();
        assert!(
            matches!(err, PortalError::CaseMismatch { ref expected, ref found }
                if expected == "AA00A38G49" && found == "AA00899Z9W"),
            "expected CaseMismatch, got: {err:?}"
        );
    }

    #[test]
    fn case_number_echo_must_match_exactly() {
        let html = page(Some(""), "", &status_view("aa00a38g49"));
        let err = classify(&html, &case("AA00A38G49")).unwrap_err();
        assert!(
            matches!(err, PortalError::CaseMismatch { ref found, .. } if found == "aa00a38g49"),
            "expected CaseMismatch, got: {err:?}"
        );
    }

    #[test]
    fn incomplete_status_view_is_malformed() {
        let html = page(
            Some(""),
            "",
            &format!(r#"<span id="{CASE_NO_ID}">AA00A38G49</span>"#),
        );
        let err = classify(&html, &case("AA00A38G49")).unwrap_err();
        assert!(
            matches!(err, PortalError::MalformedPage { .. }),
            "expected MalformedPage, got: {err:?}"
        );
    }
}

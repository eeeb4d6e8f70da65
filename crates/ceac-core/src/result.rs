//! Outcome types for a single status query and for a batch.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const MSG_CAPTCHA_MISMATCH: &str =
    "The code entered does not match the code displayed on the page.";
pub const MSG_NO_SUCH_CASE: &str = "Your search did not return any data.";
pub const MSG_INVALID_IDENTIFIER: &str = "Invalid Application ID or Case Number.";
pub const MSG_DECRYPTION_FAILED: &str = "Decryption failed.";

/// Date format used by the portal for submit and status dates, e.g. `15-Mar-2024`.
pub const PORTAL_DATE_FORMAT: &str = "%d-%b-%Y";

/// Status fields scraped from a successful result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub status: String,
    pub submit_date: String,
    pub status_date: String,
    pub message: String,
}

impl StatusRecord {
    #[must_use]
    pub fn submit_date_parsed(&self) -> Option<NaiveDate> {
        parse_portal_date(&self.submit_date)
    }

    #[must_use]
    pub fn status_date_parsed(&self) -> Option<NaiveDate> {
        parse_portal_date(&self.status_date)
    }
}

/// Parses a `DD-Mon-YYYY` portal date.
#[must_use]
pub fn parse_portal_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), PORTAL_DATE_FORMAT).ok()
}

#[must_use]
pub fn format_portal_date(date: NaiveDate) -> String {
    date.format(PORTAL_DATE_FORMAT).to_string()
}

/// Failures that a fresh session and captcha may fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryableError {
    #[error("The code entered does not match the code displayed on the page.")]
    CaptchaMismatch,
}

/// Failures that retrying will not fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalError {
    #[error("Your search did not return any data.")]
    NoSuchCase,

    #[error("Invalid Application ID or Case Number.")]
    InvalidIdentifierFormat,

    #[error("Decryption failed.")]
    DecryptionFailed,

    #[error("{0}")]
    Other(String),
}

/// Result of one status query after the retry loop has finished.
///
/// Serializes as `[status, submit_date, status_date, message]` on success and
/// as the bare error message otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Success(StatusRecord),
    Retryable(RetryableError),
    Terminal(TerminalError),
}

impl SubmissionResult {
    /// Maps a message shown by the portal (or received on the wire) to the
    /// matching variant. Unknown text becomes [`TerminalError::Other`].
    #[must_use]
    pub fn from_message(text: &str) -> Self {
        match text.trim() {
            MSG_CAPTCHA_MISMATCH => Self::Retryable(RetryableError::CaptchaMismatch),
            MSG_NO_SUCH_CASE => Self::Terminal(TerminalError::NoSuchCase),
            MSG_INVALID_IDENTIFIER => Self::Terminal(TerminalError::InvalidIdentifierFormat),
            MSG_DECRYPTION_FAILED => Self::Terminal(TerminalError::DecryptionFailed),
            other => Self::Terminal(TerminalError::Other(other.to_string())),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// The error text for a failed result, `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Retryable(e) => Some(e.to_string()),
            Self::Terminal(e) => Some(e.to_string()),
        }
    }
}

impl Serialize for SubmissionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(r) => {
                (&r.status, &r.submit_date, &r.status_date, &r.message).serialize(serializer)
            }
            Self::Retryable(e) => serializer.collect_str(e),
            Self::Terminal(e) => serializer.collect_str(e),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireResult {
    Record(String, String, String, String),
    Message(String),
}

impl<'de> Deserialize<'de> for SubmissionResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireResult::deserialize(deserializer)? {
            WireResult::Record(status, submit_date, status_date, message) => {
                Self::Success(StatusRecord {
                    status,
                    submit_date,
                    status_date,
                    message,
                })
            }
            WireResult::Message(text) => Self::from_message(&text),
        })
    }
}

/// Case number (as supplied by the caller) to outcome.
pub type BatchResult = HashMap<String, SubmissionResult>;

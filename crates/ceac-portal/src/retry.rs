//! Per-query retry loop: GET, solve, POST, classify, repeat on captcha
//! mismatch.

use std::time::Duration;

use ceac_core::{
    AppConfig, QueryRequest, ResolvedQuery, RetryableError, StatusRecord, SubmissionResult,
    TerminalError,
};

use crate::captcha::CaptchaSolver;
use crate::classify::classify;
use crate::client::PortalClient;
use crate::credentials::{self, CredentialDecryptor};
use crate::error::PortalError;
use crate::form::{self, SessionDocument};

/// Attempt budget and the fixed pause after each retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// What one retry loop produced.
#[derive(Debug)]
pub struct QueryOutcome {
    pub result: SubmissionResult,
    /// Attempts started, counting the one that ended the loop. Zero when the
    /// query failed before any network call.
    pub attempts: u32,
    /// Session extracted from the accepted result page, usable as the next
    /// query's hint. Always `None` after a failure.
    pub next_session: Option<SessionDocument>,
}

enum AttemptState {
    NeedSession,
    Classifying { html: String },
    RetryableFailed(RetryableError),
    Accepted {
        record: StatusRecord,
        next_session: Option<SessionDocument>,
    },
    TerminalFailed(TerminalError),
    Exhausted(RetryableError),
}

/// Decrypts credentials once, then runs the retry loop.
///
/// A decryption failure returns [`TerminalError::DecryptionFailed`] without
/// any HTTP call and hands `hint` back untouched.
pub async fn query_status<S: CaptchaSolver>(
    client: &PortalClient,
    solver: &S,
    decryptor: Option<&dyn CredentialDecryptor>,
    policy: &RetryPolicy,
    request: &QueryRequest,
    hint: Option<SessionDocument>,
) -> QueryOutcome {
    let query = match credentials::resolve(request, decryptor) {
        Ok(query) => query,
        Err(err) => {
            tracing::warn!(
                location = %request.location,
                case_number = %request.case_number,
                error = %err,
                "credential decryption failed"
            );
            return QueryOutcome {
                result: SubmissionResult::Terminal(TerminalError::DecryptionFailed),
                attempts: 0,
                next_session: hint,
            };
        }
    };
    run_query(client, solver, policy, &query, hint).await
}

/// Runs the GET, solve, POST, classify cycle for one resolved query.
///
/// `hint` replaces the GET of the first attempt only. Captcha mismatches are
/// retried after `policy.backoff` with a fresh session until the budget is
/// spent, at which point the last mismatch is returned as-is. Any transport,
/// parse or protocol error ends the loop immediately as
/// [`TerminalError::Other`].
pub async fn run_query<S: CaptchaSolver>(
    client: &PortalClient,
    solver: &S,
    policy: &RetryPolicy,
    query: &ResolvedQuery,
    hint: Option<SessionDocument>,
) -> QueryOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut carried = hint;
    let mut attempts = 0u32;
    let mut state = AttemptState::NeedSession;

    loop {
        state = match state {
            AttemptState::NeedSession => {
                attempts += 1;
                match submit_attempt(client, solver, query, carried.take()).await {
                    Ok(html) => AttemptState::Classifying { html },
                    Err(err) => fail(query, attempts, &err),
                }
            }
            AttemptState::Classifying { html } => match classify(&html, &query.case_number) {
                Ok(SubmissionResult::Success(record)) => AttemptState::Accepted {
                    record,
                    next_session: form::extract(&html).ok(),
                },
                Ok(SubmissionResult::Retryable(err)) if attempts < max_attempts => {
                    AttemptState::RetryableFailed(err)
                }
                Ok(SubmissionResult::Retryable(err)) => AttemptState::Exhausted(err),
                Ok(SubmissionResult::Terminal(err)) => AttemptState::TerminalFailed(err),
                Err(err) => fail(query, attempts, &err),
            },
            AttemptState::RetryableFailed(err) => {
                tracing::debug!(
                    case_number = %query.case_number,
                    attempt = attempts,
                    max_attempts,
                    error = %err,
                    "submission rejected; retrying with a fresh session"
                );
                tokio::time::sleep(policy.backoff).await;
                AttemptState::NeedSession
            }
            AttemptState::Accepted {
                record,
                next_session,
            } => {
                tracing::info!(
                    case_number = %query.case_number,
                    attempts,
                    status = %record.status,
                    "status query succeeded"
                );
                return QueryOutcome {
                    result: SubmissionResult::Success(record),
                    attempts,
                    next_session,
                };
            }
            AttemptState::TerminalFailed(err) => {
                tracing::info!(
                    case_number = %query.case_number,
                    attempts,
                    error = %err,
                    "status query finished with terminal error"
                );
                return QueryOutcome {
                    result: SubmissionResult::Terminal(err),
                    attempts,
                    next_session: None,
                };
            }
            AttemptState::Exhausted(err) => {
                tracing::warn!(
                    case_number = %query.case_number,
                    attempts,
                    "attempt budget exhausted"
                );
                return QueryOutcome {
                    result: SubmissionResult::Retryable(err),
                    attempts,
                    next_session: None,
                };
            }
        };
    }
}

/// One network round trip. The session is consumed by this attempt whether
/// or not it succeeds.
async fn submit_attempt<S: CaptchaSolver>(
    client: &PortalClient,
    solver: &S,
    query: &ResolvedQuery,
    carried: Option<SessionDocument>,
) -> Result<String, PortalError> {
    let session = match carried {
        Some(session) => session,
        None => client.fetch_initial_page().await?,
    };
    let image = client.fetch_captcha_image(session.captcha_image_ref()).await?;
    let guess = solver.predict(&image).await?;
    client.submit(&session, query, &guess).await
}

fn fail(query: &ResolvedQuery, attempt: u32, err: &PortalError) -> AttemptState {
    let message = if matches!(err, PortalError::CaseMismatch { .. }) {
        "portal answered for a different case"
    } else {
        "status query aborted"
    };
    tracing::error!(
        location = %query.location,
        case_number = %query.case_number,
        attempt,
        error = %err,
        "{message}"
    );
    AttemptState::TerminalFailed(TerminalError::Other(err.to_string()))
}

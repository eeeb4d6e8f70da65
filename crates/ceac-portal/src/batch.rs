use std::collections::HashSet;
use std::sync::Arc;

use ceac_core::{BatchEntry, BatchResult, SubmissionResult, TerminalError, ValidationError};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::captcha::CaptchaSolver;
use crate::client::{PortalClient, PortalSettings};
use crate::credentials::CredentialDecryptor;
use crate::error::BatchError;
use crate::probe;
use crate::retry::{query_status, RetryPolicy};

pub const MSG_BATCH_CANCELLED: &str = "batch cancelled";

/// Runs a batch of status queries and collects `case_no -> result`.
///
/// The batch is split into contiguous lanes, at most `max_concurrent` of
/// them. Each lane owns one [`PortalClient`] (and so one cookie jar) and
/// walks its entries in order, offering the session of each accepted result
/// page to the next entry as a hint.
pub struct BatchDispatcher<S> {
    settings: PortalSettings,
    solver: Arc<S>,
    decryptor: Option<Arc<dyn CredentialDecryptor>>,
    policy: RetryPolicy,
    max_concurrent: usize,
    debug_probe: bool,
}

impl<S: CaptchaSolver> BatchDispatcher<S> {
    pub fn new(settings: PortalSettings, solver: S, policy: RetryPolicy) -> Self {
        Self {
            settings,
            solver: Arc::new(solver),
            decryptor: None,
            policy,
            max_concurrent: 1,
            debug_probe: false,
        }
    }

    #[must_use]
    pub fn with_decryptor(mut self, decryptor: Arc<dyn CredentialDecryptor>) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Answer the `TEST` case locally with a synthetic record.
    #[must_use]
    pub fn with_debug_probe(mut self, enabled: bool) -> Self {
        self.debug_probe = enabled;
        self
    }

    /// # Errors
    ///
    /// Returns [`BatchError::DuplicateCase`] if two entries share a case
    /// number; nothing is sent in that case.
    pub async fn run(&self, entries: Vec<BatchEntry>) -> Result<BatchResult, BatchError> {
        self.run_with_cancel(entries, &CancellationToken::new())
            .await
    }

    /// Like [`Self::run`], but stops starting new queries once `cancel`
    /// fires. Queries already in flight finish normally; entries never
    /// started are reported as `"batch cancelled"`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::DuplicateCase`] if two entries share a case
    /// number.
    pub async fn run_with_cancel(
        &self,
        entries: Vec<BatchEntry>,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, BatchError> {
        check_unique(&entries)?;
        if entries.is_empty() {
            return Ok(BatchResult::new());
        }

        let lane_count = self.max_concurrent.min(entries.len());
        let lane_len = entries.len().div_ceil(lane_count);
        let lanes: Vec<Vec<BatchEntry>> = entries.chunks(lane_len).map(<[_]>::to_vec).collect();

        tracing::info!(
            entries = entries.len(),
            lanes = lanes.len(),
            "dispatching status batch"
        );

        let finished: Vec<Vec<(String, SubmissionResult)>> = stream::iter(lanes)
            .map(|lane| self.run_lane(lane, cancel))
            .buffer_unordered(lane_count)
            .collect()
            .await;

        Ok(finished.into_iter().flatten().collect())
    }

    async fn run_lane(
        &self,
        lane: Vec<BatchEntry>,
        cancel: &CancellationToken,
    ) -> Vec<(String, SubmissionResult)> {
        let client = match PortalClient::new(&self.settings) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "failed to build portal client");
                let message = err.to_string();
                return lane
                    .into_iter()
                    .map(|entry| {
                        let result =
                            SubmissionResult::Terminal(TerminalError::Other(message.clone()));
                        (entry.case_number, result)
                    })
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(lane.len());
        let mut hint = None;
        for entry in lane {
            if cancel.is_cancelled() {
                results.push((
                    entry.case_number,
                    SubmissionResult::Terminal(TerminalError::Other(
                        MSG_BATCH_CANCELLED.to_string(),
                    )),
                ));
                continue;
            }

            let request = match entry.to_request() {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!(
                        case_number = %entry.case_number,
                        error = %err,
                        "rejecting invalid batch entry"
                    );
                    results.push((entry.case_number, validation_failure(err)));
                    continue;
                }
            };

            if self.debug_probe && probe::is_probe(&request) {
                results.push((
                    entry.case_number,
                    SubmissionResult::Success(probe::probe_record(&request)),
                ));
                continue;
            }

            let outcome = query_status(
                &client,
                self.solver.as_ref(),
                self.decryptor.as_deref(),
                &self.policy,
                &request,
                hint.take(),
            )
            .await;
            hint = outcome.next_session;
            results.push((entry.case_number, outcome.result));
        }
        results
    }
}

fn check_unique(entries: &[BatchEntry]) -> Result<(), BatchError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.case_number.as_str()) {
            return Err(BatchError::DuplicateCase(entry.case_number.clone()));
        }
    }
    Ok(())
}

fn validation_failure(err: ValidationError) -> SubmissionResult {
    match err {
        ValidationError::InvalidCaseNumber(_) => {
            SubmissionResult::Terminal(TerminalError::InvalidIdentifierFormat)
        }
        other => SubmissionResult::Terminal(TerminalError::Other(other.to_string())),
    }
}

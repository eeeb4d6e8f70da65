//! Session-replay client for the CEAC visa status portal.
//!
//! A query is a GET of the status page, a captcha image download, a
//! classifier guess and a form POST whose response is classified into a
//! [`ceac_core::SubmissionResult`]. Captcha mismatches are retried with a
//! fresh session; everything else ends the query.

pub mod batch;
pub mod captcha;
pub mod classify;
pub mod client;
pub mod credentials;
pub mod error;
pub mod form;
pub mod probe;
pub mod remote;
pub mod retry;

pub use batch::{BatchDispatcher, MSG_BATCH_CANCELLED};
pub use captcha::{normalize_guess, CaptchaSolver, RemoteCaptchaSolver};
pub use classify::classify;
pub use client::{PortalClient, PortalSettings};
pub use credentials::{CredentialDecryptor, RsaOaepDecryptor};
pub use error::{BatchError, CredentialError, PortalError};
pub use form::SessionDocument;
pub use remote::{RemoteTrackerClient, DEFAULT_CHUNK_SIZE, MSG_SERVER_ERROR};
pub use retry::{query_status, run_query, QueryOutcome, RetryPolicy};

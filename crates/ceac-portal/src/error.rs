use thiserror::Error;

/// Errors raised while talking to the status portal or its collaborators.
///
/// Within a retry loop every variant is terminal: it is logged and reported to
/// the caller as `TerminalError::Other`.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The page is missing an element the form flow depends on.
    #[error("malformed portal page: {reason}")]
    MalformedPage { reason: String },

    #[error("captcha solver failed: {reason}")]
    Captcha { reason: String },

    /// The result page describes a different case than the one submitted.
    #[error("protocol violation: portal returned case {found} for requested case {expected}")]
    CaseMismatch { expected: String, found: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while recovering passport number and surname from an
/// encrypted credential blob.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential decryptor is configured")]
    NotConfigured,

    #[error("failed to read private key {path}: {source}")]
    KeyIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse private key: {0}")]
    KeyParse(String),

    #[error("ciphertext is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("RSA decryption failed: {0}")]
    Decrypt(#[from] rsa::Error),

    #[error("decrypted credentials are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("decrypted credentials are not of the form \"passport_number,surname\"")]
    Format,
}

/// Errors that reject a whole batch before any request is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("duplicate case number in batch: {0}")]
    DuplicateCase(String),
}

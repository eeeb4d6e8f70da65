use thiserror::Error;

/// Errors raised while loading [`crate::AppConfig`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Errors raised while turning caller input into a [`crate::QueryRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid location code \"{0}\": expected 3 ASCII letters")]
    InvalidLocation(String),

    #[error("invalid case number \"{0}\": expected 1-20 ASCII letters or digits")]
    InvalidCaseNumber(String),

    #[error("malformed batch entry: {0}")]
    MalformedEntry(String),
}

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub portal_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub batch_max_concurrent: usize,
    pub max_batch_size: usize,
    pub captcha_solver_url: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub debug_probe: bool,
}

impl AppConfig {
    /// The captcha solver endpoint, for callers that cannot run without one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming `CEAC_CAPTCHA_SOLVER_URL`
    /// when it is unset or blank.
    pub fn require_captcha_solver_url(&self) -> Result<&str, ConfigError> {
        self.captcha_solver_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("CEAC_CAPTCHA_SOLVER_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("portal_url", &self.portal_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("batch_max_concurrent", &self.batch_max_concurrent)
            .field("max_batch_size", &self.max_batch_size)
            .field(
                "captcha_solver_url",
                &self.captcha_solver_url.as_ref().map(|_| "[redacted]"),
            )
            .field("private_key_path", &self.private_key_path)
            .field("debug_probe", &self.debug_probe)
            .finish()
    }
}

pub mod app_config;
pub mod config;
pub mod error;
pub mod query;
pub mod result;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, ValidationError};
pub use query::{
    BatchEntry, CaseNumber, Credentials, LocationCode, QueryCredentials, QueryRequest,
    ResolvedQuery,
};
pub use result::{
    format_portal_date, parse_portal_date, BatchResult, RetryableError, StatusRecord,
    SubmissionResult, TerminalError, MSG_CAPTCHA_MISMATCH, MSG_DECRYPTION_FAILED,
    MSG_INVALID_IDENTIFIER, MSG_NO_SUCH_CASE,
};

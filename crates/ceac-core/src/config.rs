use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_PORTAL_URL: &str = "https://ceac.state.gov/CEACStatTracker/Status.aspx?App=NIV";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    };

    let non_empty = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let env = parse_environment(&or_default("CEAC_ENV", "development"))?;
    let bind_addr = parse_addr("CEAC_BIND_ADDR", "0.0.0.0:9000")?;
    let log_level = or_default("CEAC_LOG_LEVEL", "info");
    let portal_url = or_default("CEAC_PORTAL_URL", DEFAULT_PORTAL_URL);
    let request_timeout_secs = parse_u64("CEAC_REQUEST_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("CEAC_USER_AGENT", DEFAULT_USER_AGENT);

    let max_attempts = parse_u32("CEAC_MAX_ATTEMPTS", "5")?;
    if max_attempts == 0 {
        return Err(invalid("CEAC_MAX_ATTEMPTS", "must be at least 1".to_string()));
    }
    let retry_backoff_ms = parse_u64("CEAC_RETRY_BACKOFF_MS", "1000")?;

    let batch_max_concurrent = parse_usize("CEAC_BATCH_MAX_CONCURRENT", "1")?.max(1);
    let max_batch_size = parse_usize("CEAC_MAX_BATCH_SIZE", "50")?;

    let captcha_solver_url = non_empty("CEAC_CAPTCHA_SOLVER_URL");
    let private_key_path = non_empty("CEAC_PRIVATE_KEY_PATH").map(PathBuf::from);
    let debug_probe = parse_bool("CEAC_DEBUG_PROBE", "false")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        portal_url,
        request_timeout_secs,
        user_agent,
        max_attempts,
        retry_backoff_ms,
        batch_max_concurrent,
        max_batch_size,
        captcha_solver_url,
        private_key_path,
        debug_probe,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CEAC_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

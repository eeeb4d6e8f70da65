//! Command handlers. Results go to stdout as JSON; diagnostics go through
//! `tracing` on stderr.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use ceac_core::{AppConfig, BatchEntry, Credentials, QueryCredentials};
use ceac_portal::{
    query_status, BatchDispatcher, CredentialDecryptor, PortalClient, PortalSettings,
    RemoteCaptchaSolver, RemoteTrackerClient, RetryPolicy, RsaOaepDecryptor,
};
use tokio_util::sync::CancellationToken;

use crate::captcha::{CliSolver, ManualCaptchaSolver};

pub(crate) fn single_entry(
    location: String,
    case_number: String,
    passport: Option<String>,
    surname: Option<String>,
    encrypted: Option<String>,
) -> BatchEntry {
    let credentials = match (passport, surname, encrypted) {
        (Some(passport_number), Some(surname), _) => QueryCredentials::Plain(Credentials {
            passport_number,
            surname,
        }),
        (_, _, Some(blob)) => QueryCredentials::Encrypted(blob),
        _ => QueryCredentials::None,
    };
    BatchEntry {
        location,
        case_number,
        credentials,
    }
}

fn build_solver(config: &AppConfig, manual: bool) -> anyhow::Result<CliSolver> {
    if manual {
        let image_path = std::env::temp_dir().join("ceac-captcha.png");
        return Ok(CliSolver::Manual(ManualCaptchaSolver::from_stdin(image_path)));
    }
    let url = config
        .require_captcha_solver_url()
        .context("pass --manual-captcha to solve captchas by hand")?;
    Ok(CliSolver::Remote(RemoteCaptchaSolver::new(
        url,
        config.request_timeout_secs,
    )?))
}

fn load_decryptor(config: &AppConfig) -> anyhow::Result<Option<Arc<RsaOaepDecryptor>>> {
    config
        .private_key_path
        .as_deref()
        .map(|path| {
            RsaOaepDecryptor::from_pem_file(path)
                .map(Arc::new)
                .with_context(|| format!("loading private key from {}", path.display()))
        })
        .transpose()
}

async fn read_entries(file: &Path) -> anyhow::Result<Vec<BatchEntry>> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing batch file {}", file.display()))
}

/// Runs one query and prints its JSON result.
pub(crate) async fn run_query(
    config: &AppConfig,
    entry: BatchEntry,
    manual_captcha: bool,
) -> anyhow::Result<()> {
    let request = entry.to_request()?;
    let solver = build_solver(config, manual_captcha)?;
    let decryptor = load_decryptor(config)?;
    let client = PortalClient::new(&PortalSettings::from_app_config(config))?;

    let outcome = query_status(
        &client,
        &solver,
        decryptor
            .as_deref()
            .map(|d| d as &dyn CredentialDecryptor),
        &RetryPolicy::from_app_config(config),
        &request,
        None,
    )
    .await;

    tracing::info!(attempts = outcome.attempts, "query finished");
    println!("{}", serde_json::to_string_pretty(&outcome.result)?);
    Ok(())
}

/// Runs a batch file through the local engine. Ctrl-C stops new queries from
/// starting; the partial result map is still printed.
pub(crate) async fn run_batch(
    config: &AppConfig,
    file: &Path,
    manual_captcha: bool,
) -> anyhow::Result<()> {
    let entries = read_entries(file).await?;
    let solver = build_solver(config, manual_captcha)?;
    // One prompt at a time when a human is solving.
    let max_concurrent = if manual_captcha {
        1
    } else {
        config.batch_max_concurrent
    };

    let mut dispatcher = BatchDispatcher::new(
        PortalSettings::from_app_config(config),
        solver,
        RetryPolicy::from_app_config(config),
    )
    .with_max_concurrent(max_concurrent)
    .with_debug_probe(config.debug_probe);
    if let Some(decryptor) = load_decryptor(config)? {
        dispatcher = dispatcher.with_decryptor(decryptor);
    }

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; letting in-flight queries finish");
            on_ctrl_c.cancel();
        }
    });

    let results = dispatcher.run_with_cancel(entries, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Sends a batch file to a deployed server in chunks.
pub(crate) async fn run_remote(
    config: &AppConfig,
    url: &str,
    file: &Path,
    chunk_size: usize,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let entries = read_entries(file).await?;
    // A remote batch runs every query of a chunk before answering.
    let timeout_secs = config
        .request_timeout_secs
        .saturating_mul(u64::from(config.max_attempts))
        .saturating_mul(u64::try_from(chunk_size.max(1)).unwrap_or(u64::MAX));
    let mut client = RemoteTrackerClient::new(url, timeout_secs)?;
    if let Some(key) = api_key {
        client = client.with_api_key(key);
    }

    let results = client.query_chunked(&entries, chunk_size).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

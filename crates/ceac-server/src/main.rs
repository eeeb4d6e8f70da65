mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context as _;
use ceac_portal::{
    BatchDispatcher, PortalSettings, RemoteCaptchaSolver, RetryPolicy, RsaOaepDecryptor,
};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ceac_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let solver_url = config.require_captcha_solver_url()?;
    let solver = RemoteCaptchaSolver::new(solver_url, config.request_timeout_secs)?;

    let mut dispatcher = BatchDispatcher::new(
        PortalSettings::from_app_config(&config),
        solver,
        RetryPolicy::from_app_config(&config),
    )
    .with_max_concurrent(config.batch_max_concurrent)
    .with_debug_probe(config.debug_probe);
    if let Some(path) = &config.private_key_path {
        let decryptor = RsaOaepDecryptor::from_pem_file(path)
            .with_context(|| format!("loading private key from {}", path.display()))?;
        dispatcher = dispatcher.with_decryptor(Arc::new(decryptor));
    }

    let auth = AuthState::from_env(matches!(config.env, ceac_core::Environment::Development))?;
    let app = build_app(
        AppState {
            dispatcher: Arc::new(dispatcher),
            max_batch_size: config.max_batch_size,
        },
        auth,
    );

    tracing::info!(
        bind_addr = %config.bind_addr,
        env = %config.env,
        portal_url = %config.portal_url,
        "ceac-server listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}

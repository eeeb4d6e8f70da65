mod captcha;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ceac-cli")]
#[command(about = "Query CEAC visa application status")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Query a single case against the portal
    Query {
        /// Three-letter consular location code, e.g. BEJ
        #[arg(long)]
        location: String,
        /// Application ID or case number
        #[arg(long = "case")]
        case_number: String,
        #[arg(long, requires = "surname", conflicts_with = "encrypted")]
        passport: Option<String>,
        #[arg(long, requires = "passport")]
        surname: Option<String>,
        /// Base64 RSA-OAEP blob holding "passport,surname"
        #[arg(long)]
        encrypted: Option<String>,
        /// Solve captchas by hand instead of calling CEAC_CAPTCHA_SOLVER_URL
        #[arg(long)]
        manual_captcha: bool,
    },
    /// Run a JSON batch file through the local engine
    Batch {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        manual_captcha: bool,
    },
    /// Send a JSON batch file to a running ceac-server
    Remote {
        #[arg(long)]
        url: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = ceac_portal::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        #[arg(long, env = "CEAC_REMOTE_API_KEY")]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ceac_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Query {
            location,
            case_number,
            passport,
            surname,
            encrypted,
            manual_captcha,
        } => {
            let entry = commands::single_entry(location, case_number, passport, surname, encrypted);
            commands::run_query(&config, entry, manual_captcha).await
        }
        Commands::Batch {
            file,
            manual_captcha,
        } => commands::run_batch(&config, &file, manual_captcha).await,
        Commands::Remote {
            url,
            file,
            chunk_size,
            api_key,
        } => commands::run_remote(&config, &url, &file, chunk_size, api_key).await,
    }
}

#[cfg(test)]
mod tests;

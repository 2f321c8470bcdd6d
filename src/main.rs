//! gphotos-dl: mirror a Google Photos library into a local `YYYY/MM` tree.
//!
//! A background task pages through the Library API while the main task
//! downloads each item, skipping files already on disk. Transient API errors
//! are retried; filename clashes within a month get the item id appended.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod download;
mod photos;
pub mod retry;
mod shutdown;
#[cfg(test)]
mod test_support;
mod types;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Timeout for establishing any HTTP connection.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Upper bound on the wait between listing retries.
const MAX_RETRY_DELAY_SECS: u64 = 60;

async fn run(config: config::Config) -> anyhow::Result<download::DownloadSummary> {
    tracing::info!(directory = %config.directory.display(), "Starting gphotos-dl");
    tracing::debug!("{:?}", config);

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()?;

    let auth_options = auth::AuthOptions {
        client_secret: config.client_secret.clone(),
        credentials: config.credentials.clone(),
        cache_token: config.cache_token,
    };
    let authenticator = auth::authenticate(&http, &auth_options).await?;
    let tokens: Arc<dyn auth::TokenSource> = Arc::new(authenticator);
    let library: Arc<dyn photos::MediaLibrary> =
        Arc::new(photos::PhotosLibraryClient::new(http.clone(), tokens));

    let download_config = download::DownloadConfig {
        directory: config.directory,
        collision_policy: config.collision_policy,
        retry: retry::RetryConfig {
            max_retries: config.max_retries,
            base_delay_secs: config.retry_delay_secs,
            max_delay_secs: MAX_RETRY_DELAY_SECS,
        },
        dry_run: config.dry_run,
        no_progress_bar: config.no_progress_bar,
    };

    let shutdown_token = shutdown::install_signal_handler()?;

    // Content URLs are pre-signed; the plain client fetches them.
    let summary =
        download::download_library(library, &http, &download_config, shutdown_token).await?;
    Ok(summary)
}

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let result = match config::Config::from_cli(cli) {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) if summary.interrupted => {
            tracing::info!("Shutdown requested, exiting...");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

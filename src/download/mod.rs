//! Download engine. A background lister pages through the library and feeds
//! a bounded channel while this task downloads items one at a time, so the
//! first file starts transferring as soon as the first page returns.

pub mod collision;
pub mod error;
pub mod file;
pub mod lister;
pub mod paths;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::photos::{LibraryError, MediaItem, MediaLibrary};
use crate::retry::RetryConfig;
use crate::types::CollisionPolicy;

use collision::PathCollisionMap;
use error::DownloadError;
use file::MediaFetcher;

/// Subset of application config consumed by the download engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug)]
pub struct DownloadConfig {
    pub(crate) directory: PathBuf,
    pub(crate) collision_policy: CollisionPolicy,
    pub(crate) retry: RetryConfig,
    pub(crate) dry_run: bool,
    pub(crate) no_progress_bar: bool,
}

/// What a run did, item by item.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Files written (or, in a dry run, files that would have been).
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The run stopped early on a shutdown signal.
    pub interrupted: bool,
}

/// Failures that end the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Listing media items failed: {0}")]
    Listing(#[from] LibraryError),

    #[error("Lister task failed: {0}")]
    Lister(#[from] tokio::task::JoinError),
}

/// Where the consume loop is.
enum PipelineState {
    /// Lister still producing.
    Listing,
    /// Lister finished cleanly; consuming what is left in the channel.
    Draining,
    Done,
    Failed(LibraryError),
}

/// Result of handling one item.
#[derive(Debug, PartialEq, Eq)]
enum ItemOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    Skipped(PathBuf),
    WouldDownload(PathBuf),
}

/// Per-run consumer state: resolves paths, decides skip vs fetch, transfers.
struct Downloader<'a> {
    fetcher: &'a dyn MediaFetcher,
    config: &'a DownloadConfig,
    collisions: PathCollisionMap,
    pb: ProgressBar,
}

impl<'a> Downloader<'a> {
    fn new(fetcher: &'a dyn MediaFetcher, config: &'a DownloadConfig, pb: ProgressBar) -> Self {
        Self {
            fetcher,
            config,
            collisions: PathCollisionMap::new(),
            pb,
        }
    }

    async fn handle(&mut self, item: &MediaItem) -> Result<ItemOutcome, DownloadError> {
        let creation_time = &item.media_metadata.creation_time;
        let captured = paths::parse_capture_time(creation_time).map_err(|source| {
            DownloadError::InvalidTimestamp {
                id: item.id.clone(),
                value: creation_time.clone(),
                source,
            }
        })?;

        let filename = paths::clean_filename(&item.filename);
        if !paths::is_usable_filename(&filename) {
            return Err(DownloadError::MissingFilename(item.id.clone()));
        }

        let dir = paths::month_dir(&self.config.directory, &captured);
        if !self.config.dry_run {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| DownloadError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
        }

        let path = match self.config.collision_policy {
            CollisionPolicy::SuffixId => self.collisions.resolve(&dir, &filename, &item.id),
            CollisionPolicy::Skip => dir.join(&filename),
        };

        if tokio::fs::symlink_metadata(&path).await.is_ok() {
            self.record(&path, item);
            return Ok(ItemOutcome::Skipped(path));
        }

        if self.config.dry_run {
            self.record(&path, item);
            return Ok(ItemOutcome::WouldDownload(path));
        }

        self.pb.suspend(|| {
            tracing::info!("Downloading {}", path.display());
        });
        let url = item.download_url();
        let bytes = file::download_to(self.fetcher, &url, &path).await?;

        let mtime_path = path.clone();
        let ts = captured.timestamp();
        match tokio::task::spawn_blocking(move || file::set_file_mtime(&mtime_path, ts)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Could not set mtime on {}: {}", path.display(), e),
            Err(e) => tracing::warn!("mtime task failed for {}: {}", path.display(), e),
        }

        self.record(&path, item);
        Ok(ItemOutcome::Downloaded { path, bytes })
    }

    fn record(&mut self, path: &std::path::Path, item: &MediaItem) {
        if self.config.collision_policy == CollisionPolicy::SuffixId {
            self.collisions.record(path.to_path_buf(), item.id.clone());
        }
    }

    /// Handle one item and fold the outcome into `summary`. Per-item errors
    /// are logged and counted, never propagated.
    async fn process(&mut self, item: MediaItem, summary: &mut DownloadSummary) {
        self.pb.set_message(item.filename.clone());
        match self.handle(&item).await {
            Ok(ItemOutcome::Downloaded { path, bytes }) => {
                tracing::debug!(
                    bytes,
                    mime_type = item.mime_type.as_deref().unwrap_or("unknown"),
                    "Downloaded {}",
                    path.display()
                );
                summary.downloaded += 1;
            }
            Ok(ItemOutcome::Skipped(path)) => {
                self.pb.suspend(|| {
                    tracing::info!("{} already exists", path.display());
                });
                summary.skipped += 1;
            }
            Ok(ItemOutcome::WouldDownload(path)) => {
                self.pb.suspend(|| {
                    tracing::info!("[DRY RUN] Would download {}", path.display());
                });
                summary.downloaded += 1;
            }
            Err(e) => {
                self.pb.suspend(|| {
                    tracing::error!("Failed to download {} ({}): {}", item.filename, item.id, e);
                });
                summary.failed += 1;
            }
        }
        self.pb.inc(1);
    }
}

/// Spinner for a run of unknown length.
///
/// Hidden when the user passed `--no-progress-bar` or stdout is not a TTY.
fn create_progress_bar(no_progress_bar: bool) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {pos} items {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Entry point for the download engine.
///
/// Runs until the library is exhausted, listing fails, or `shutdown` fires.
/// Per-item failures are counted in the summary; only a listing failure (or
/// a crashed lister task) returns `Err`.
pub async fn download_library(
    library: Arc<dyn MediaLibrary>,
    fetcher: &dyn MediaFetcher,
    config: &DownloadConfig,
    shutdown: CancellationToken,
) -> Result<DownloadSummary, PipelineError> {
    let started = Instant::now();
    let lister_cancel = shutdown.child_token();
    let mut lister = lister::spawn_lister(library, config.retry, lister_cancel.clone());

    let pb = create_progress_bar(config.no_progress_bar);
    let mut downloader = Downloader::new(fetcher, config, pb.clone());
    let mut summary = DownloadSummary::default();
    let mut state = PipelineState::Listing;

    loop {
        state = match state {
            PipelineState::Listing => tokio::select! {
                biased;
                signal = &mut lister.error => match signal {
                    Ok(e) => PipelineState::Failed(e),
                    // Sender dropped unsent: listing finished cleanly.
                    Err(_) => PipelineState::Draining,
                },
                _ = shutdown.cancelled() => {
                    summary.interrupted = true;
                    PipelineState::Done
                }
                item = lister.items.recv() => match item {
                    Some(item) => {
                        downloader.process(item, &mut summary).await;
                        PipelineState::Listing
                    }
                    // The error (if any) is sent before the channel closes.
                    None => match (&mut lister.error).await {
                        Ok(e) => PipelineState::Failed(e),
                        Err(_) => PipelineState::Done,
                    },
                },
            },
            PipelineState::Draining => tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    summary.interrupted = true;
                    PipelineState::Done
                }
                item = lister.items.recv() => match item {
                    Some(item) => {
                        downloader.process(item, &mut summary).await;
                        PipelineState::Draining
                    }
                    None => PipelineState::Done,
                },
            },
            PipelineState::Done => break,
            PipelineState::Failed(e) => {
                lister_cancel.cancel();
                pb.finish_and_clear();
                tracing::error!(
                    "Stopping after {} downloaded, {} skipped, {} failed",
                    summary.downloaded,
                    summary.skipped,
                    summary.failed
                );
                return Err(PipelineError::Listing(e));
            }
        };
    }

    lister_cancel.cancel();
    pb.finish_and_clear();
    lister.task.await?;

    log_summary(&summary, config, started.elapsed());
    Ok(summary)
}

fn log_summary(summary: &DownloadSummary, config: &DownloadConfig, elapsed: Duration) {
    if config.dry_run {
        tracing::info!("── Dry Run Summary ──");
        tracing::info!(
            "  {} files would be downloaded, {} already present, {} failed",
            summary.downloaded,
            summary.skipped,
            summary.failed
        );
    } else {
        tracing::info!("── Summary ──");
        tracing::info!(
            "  {} downloaded, {} skipped, {} failed",
            summary.downloaded,
            summary.skipped,
            summary.failed
        );
    }
    if summary.interrupted {
        tracing::info!("  Interrupted by shutdown signal");
    }
    tracing::info!("  destination: {}", config.directory.display());
    tracing::info!("  elapsed: {}", format_duration(elapsed));
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

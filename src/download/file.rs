use std::fs::FileTimes;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;

/// Response body as a stream of chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DownloadError>> + Send>>;

/// Plain GET of an item's content URL.
#[async_trait::async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ByteStream, DownloadError>;
}

#[async_trait::async_trait]
impl MediaFetcher for Client {
    async fn fetch(&self, url: &str) -> Result<ByteStream, DownloadError> {
        let response = self.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(DownloadError::from)),
        ))
    }
}

/// Fetch `url` and stream the body into a new file at `path`.
///
/// Returns the number of bytes written. Whatever was written before a failure
/// stays on disk.
pub async fn download_to(
    fetcher: &dyn MediaFetcher,
    url: &str,
    path: &Path,
) -> Result<u64, DownloadError> {
    let mut stream = fetcher.fetch(url).await?;
    let mut file = File::create(path).await?;

    let mut bytes_written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(bytes_written)
}

/// Set the modification and access times of a file to the given Unix
/// timestamp. Dates before 1970 are clamped to the epoch when the platform
/// cannot represent them.
pub fn set_file_mtime(path: &Path, timestamp: i64) -> std::io::Result<()> {
    let time = if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(timestamp.unsigned_abs()))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    let times = FileTimes::new().set_modified(time).set_accessed(time);
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_times(times)
}

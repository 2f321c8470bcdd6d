use super::error::LibraryError;
use super::types::MediaPage;

/// The listing capability the downloader depends on.
/// The production implementation is [`super::PhotosLibraryClient`].
#[async_trait::async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Fetch one page. An empty `page_token` requests the first page.
    async fn search(&self, page_size: u32, page_token: &str) -> Result<MediaPage, LibraryError>;
}

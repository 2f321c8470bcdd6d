//! Background producer: pages through the library and feeds the item channel.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::photos::{LibraryError, MediaItem, MediaLibrary};
use crate::retry::{self, RetryAction, RetryConfig};

/// Items requested per listing call.
pub const PAGE_SIZE: u32 = 100;

/// Items the lister may run ahead of the downloader.
pub const ITEM_BUFFER: usize = 100;

/// Why the lister stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListingEnd {
    /// The remote returned an empty continuation token.
    Exhausted { pages: u64, items: u64 },
    Cancelled,
    /// The downloader dropped its end of the channel.
    ReceiverGone,
}

/// Handles to a running lister task.
pub(crate) struct Lister {
    pub items: mpsc::Receiver<MediaItem>,
    pub error: oneshot::Receiver<LibraryError>,
    pub task: JoinHandle<()>,
}

/// Start listing in the background.
///
/// The item channel closes when listing ends for any reason. A terminal error
/// is sent on `error` before that happens; on success `error` is dropped
/// unsent.
pub(crate) fn spawn_lister(
    library: Arc<dyn MediaLibrary>,
    retry: RetryConfig,
    cancel: CancellationToken,
) -> Lister {
    let (item_tx, item_rx) = mpsc::channel(ITEM_BUFFER);
    let (error_tx, error_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        match list_items(library.as_ref(), &retry, &item_tx, &cancel).await {
            Ok(ListingEnd::Exhausted { pages, items }) => {
                tracing::debug!(pages, items, "Listing complete");
            }
            Ok(end) => tracing::debug!("Listing stopped early: {:?}", end),
            Err(e) => {
                let _ = error_tx.send(e);
            }
        }
        drop(item_tx);
    });

    Lister {
        items: item_rx,
        error: error_rx,
        task,
    }
}

fn classify(e: &LibraryError) -> RetryAction {
    if e.is_transient() {
        RetryAction::Retry
    } else {
        RetryAction::Abort
    }
}

/// Page through the library, sending every item in the order the remote
/// returns it.
pub(crate) async fn list_items(
    library: &dyn MediaLibrary,
    retry: &RetryConfig,
    items: &mpsc::Sender<MediaItem>,
    cancel: &CancellationToken,
) -> Result<ListingEnd, LibraryError> {
    let mut page_token = String::new();
    let mut pages: u64 = 0;
    let mut sent: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Ok(ListingEnd::Cancelled);
        }

        let cursor = page_token.as_str();
        let page = tokio::select! {
            _ = cancel.cancelled() => return Ok(ListingEnd::Cancelled),
            page = retry::retry_with_backoff(retry, classify, || library.search(PAGE_SIZE, cursor)) => page?,
        };
        pages += 1;
        tracing::debug!(
            page = pages,
            count = page.media_items.len(),
            "Received page of media items"
        );

        for item in page.media_items {
            if cancel.is_cancelled() {
                return Ok(ListingEnd::Cancelled);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(ListingEnd::Cancelled),
                result = items.send(item) => {
                    if result.is_err() {
                        return Ok(ListingEnd::ReceiverGone);
                    }
                }
            }
            sent += 1;
        }

        page_token = page.next_page_token;
        if page_token.is_empty() {
            return Ok(ListingEnd::Exhausted {
                pages,
                items: sent,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{api_error, ScriptedLibrary};

    fn page(ids: &[&str], next: &str) -> Result<crate::photos::MediaPage, LibraryError> {
        crate::test_support::page(
            ids.iter()
                .map(|id| MediaItem::photo(id, &format!("{id}.jpg"), "2021-03-05T10:00:00Z"))
                .collect(),
            next,
        )
    }

    async fn drain(mut rx: mpsc::Receiver<MediaItem>) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(item) = rx.recv().await {
            ids.push(item.id);
        }
        ids
    }

    async fn run(
        library: &ScriptedLibrary,
        retry: RetryConfig,
    ) -> (Result<ListingEnd, LibraryError>, Vec<String>) {
        let (tx, rx) = mpsc::channel(ITEM_BUFFER);
        let cancel = CancellationToken::new();
        let collector = tokio::spawn(drain(rx));
        let result = list_items(library, &retry, &tx, &cancel).await;
        drop(tx);
        (result, collector.await.unwrap())
    }

    #[tokio::test]
    async fn test_delivers_all_pages_in_order() {
        let library = ScriptedLibrary::new(vec![
            page(&["a", "b", "c"], "t1"),
            page(&["d"], "t2"),
            page(&["e", "f"], ""),
        ]);
        let (result, ids) = run(&library, RetryConfig::default()).await;

        assert_eq!(
            result.unwrap(),
            ListingEnd::Exhausted { pages: 3, items: 6 }
        );
        assert_eq!(ids, ["a", "b", "c", "d", "e", "f"]);
        assert_eq!(
            library.calls(),
            vec![
                (PAGE_SIZE, String::new()),
                (PAGE_SIZE, "t1".to_string()),
                (PAGE_SIZE, "t2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_library() {
        let library = ScriptedLibrary::new(vec![page(&[], "")]);
        let (result, ids) = run(&library, RetryConfig::default()).await;
        assert_eq!(
            result.unwrap(),
            ListingEnd::Exhausted { pages: 1, items: 0 }
        );
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_transient_errors_retry_same_cursor() {
        let library = ScriptedLibrary::new(vec![
            page(&["a"], "t1"),
            api_error(429),
            api_error(500),
            api_error(502),
            api_error(503),
            page(&["b", "c"], ""),
        ]);
        let (result, ids) = run(&library, RetryConfig::default()).await;

        assert!(result.is_ok());
        assert_eq!(ids, ["a", "b", "c"]);
        let calls = library.calls();
        // 1 first page + 4 failures + 1 success on the same cursor
        assert_eq!(calls.len(), 6);
        assert!(calls[1..]
            .iter()
            .all(|call| *call == (PAGE_SIZE, "t1".to_string())));
    }

    #[tokio::test]
    async fn test_terminal_error_stops_listing() {
        let library = ScriptedLibrary::new(vec![page(&["a"], "t1"), api_error(403), page(&["b"], "")]);
        let (result, ids) = run(&library, RetryConfig::default()).await;

        assert_eq!(result.unwrap_err().status_code(), Some(403));
        assert_eq!(ids, ["a"]);
        assert_eq!(library.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_bounded_retry_gives_up() {
        let library = ScriptedLibrary::new(vec![api_error(503), api_error(503), api_error(503), page(&["a"], "")]);
        let retry = RetryConfig {
            max_retries: Some(2),
            ..RetryConfig::default()
        };
        let (result, ids) = run(&library, retry).await;

        assert_eq!(result.unwrap_err().status_code(), Some(503));
        assert!(ids.is_empty());
        assert_eq!(library.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let library = ScriptedLibrary::new(vec![page(&["a"], "")]);
        let (tx, mut rx) = mpsc::channel(ITEM_BUFFER);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let end = list_items(&library, &RetryConfig::default(), &tx, &cancel)
            .await
            .unwrap();
        assert_eq!(end, ListingEnd::Cancelled);
        assert!(library.calls().is_empty());
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_unblocks_full_channel() {
        let library = ScriptedLibrary::new(vec![page(&["a", "b", "c"], "")]);
        // Room for one item; nobody reads, so the second send blocks.
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                cancel.cancel();
            })
        };
        let end = list_items(&library, &RetryConfig::default(), &tx, &cancel)
            .await
            .unwrap();
        canceller.await.unwrap();

        assert_eq!(end, ListingEnd::Cancelled);
        drop(tx);
        assert_eq!(rx.recv().await.unwrap().id, "a");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_dropped() {
        let library = ScriptedLibrary::new(vec![page(&["a", "b"], "")]);
        let (tx, rx) = mpsc::channel(ITEM_BUFFER);
        drop(rx);
        let end = list_items(&library, &RetryConfig::default(), &tx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(end, ListingEnd::ReceiverGone);
    }

    #[tokio::test]
    async fn test_spawned_lister_reports_error_then_closes() {
        let library = Arc::new(ScriptedLibrary::new(vec![page(&["a"], "t1"), api_error(401)]));
        let mut lister = spawn_lister(library, RetryConfig::default(), CancellationToken::new());

        assert_eq!(lister.items.recv().await.unwrap().id, "a");
        assert!(lister.items.recv().await.is_none());
        assert_eq!(lister.error.await.unwrap().status_code(), Some(401));
        lister.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_spawned_lister_success_drops_error_sender() {
        let library = Arc::new(ScriptedLibrary::new(vec![page(&["a"], "")]));
        let mut lister = spawn_lister(library, RetryConfig::default(), CancellationToken::new());

        assert_eq!(lister.items.recv().await.unwrap().id, "a");
        assert!(lister.items.recv().await.is_none());
        assert!(lister.error.await.is_err());
    }
}

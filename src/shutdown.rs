//! Signal handling for a graceful stop.
//!
//! The first SIGINT / SIGTERM / SIGHUP cancels a [`CancellationToken`]; the
//! download loop finishes the item it is writing, the lister stops paging,
//! and the run ends with a summary. A second signal exits immediately.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Exit status used when the user insists on stopping (128 + SIGINT).
const FORCE_EXIT_CODE: i32 = 130;

/// Register signal listeners and return the token they cancel.
pub(crate) fn install_signal_handler() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let signals_seen = Arc::new(AtomicU32::new(0));

    #[cfg(unix)]
    let (mut sigterm, mut sighup) = {
        use tokio::signal::unix::{signal, SignalKind};
        (
            signal(SignalKind::terminate())?,
            signal(SignalKind::hangup())?,
        )
    };

    let handler_token = token.clone();
    tokio::spawn(async move {
        loop {
            #[cfg(unix)]
            {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                    _ = sighup.recv() => {}
                }
            }

            #[cfg(not(unix))]
            {
                if tokio::signal::ctrl_c().await.is_err() {
                    tracing::warn!("Could not listen for Ctrl+C; graceful stop disabled");
                    return;
                }
            }

            if signals_seen.fetch_add(1, Ordering::SeqCst) == 0 {
                tracing::info!("Stop requested, finishing the current item...");
                tracing::info!("Press Ctrl+C again to exit immediately");
                handler_token.cancel();
            } else {
                tracing::warn!("Exiting immediately");
                std::process::exit(FORCE_EXIT_CODE);
            }
        }
    });

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_returns_live_token() {
        let token = install_signal_handler().unwrap();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn child_token_follows_parent() {
        let parent = CancellationToken::new();
        let lister = parent.child_token();
        parent.cancel();
        assert!(lister.is_cancelled());
    }
}

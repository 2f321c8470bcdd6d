//! Shared test fixtures: a one-shot HTTP responder for exercising the real
//! `reqwest` code paths, and a scripted in-memory media library.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::photos::{LibraryError, MediaItem, MediaLibrary, MediaPage};

/// Each queued response answers exactly one connection and closes it, so the
/// client never reuses a socket between requests.
pub(crate) struct CannedServer {
    pub base_url: String,
    requests: mpsc::UnboundedReceiver<String>,
}

impl CannedServer {
    pub async fn start(responses: Vec<(u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let responses: Vec<(u16, String)> = responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                let _ = tx.send(request);
                let reason = if status < 400 { "OK" } else { "Error" };
                let reply = format!(
                    "HTTP/1.1 {status} {reason}\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests: rx,
        }
    }

    /// Raw text (head and body) of the next request the server answered.
    pub async fn next_request(&mut self) -> String {
        self.requests.recv().await.expect("server saw no request")
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// In-memory `MediaLibrary` that replays scripted pages and records every
/// `(page_size, page_token)` it was asked for.
pub(crate) struct ScriptedLibrary {
    responses: Mutex<VecDeque<Result<MediaPage, LibraryError>>>,
    calls: Mutex<Vec<(u32, String)>>,
}

impl ScriptedLibrary {
    pub fn new(responses: Vec<Result<MediaPage, LibraryError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(u32, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MediaLibrary for ScriptedLibrary {
    async fn search(&self, page_size: u32, page_token: &str) -> Result<MediaPage, LibraryError> {
        self.calls
            .lock()
            .unwrap()
            .push((page_size, page_token.to_string()));
        // Running off the end of the script behaves like an empty library.
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(MediaPage::default()))
    }
}

pub(crate) fn page(items: Vec<MediaItem>, next: &str) -> Result<MediaPage, LibraryError> {
    Ok(MediaPage {
        media_items: items,
        next_page_token: next.to_string(),
    })
}

pub(crate) fn api_error(code: u16) -> Result<MediaPage, LibraryError> {
    Err(LibraryError::Api {
        code,
        message: "scripted failure".into(),
    })
}

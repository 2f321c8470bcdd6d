use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;

use super::error::LibraryError;
use super::library::MediaLibrary;
use super::types::{MediaPage, SearchRequest};
use crate::auth::TokenSource;

pub const DEFAULT_ENDPOINT: &str = "https://photoslibrary.googleapis.com";

/// Google's JSON error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Photos Library API client for `mediaItems:search`.
pub struct PhotosLibraryClient {
    http: Client,
    tokens: Arc<dyn TokenSource>,
    search_url: String,
}

impl std::fmt::Debug for PhotosLibraryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotosLibraryClient")
            .field("search_url", &self.search_url)
            .finish_non_exhaustive()
    }
}

impl PhotosLibraryClient {
    pub fn new(http: Client, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_endpoint(http, tokens, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(http: Client, tokens: Arc<dyn TokenSource>, endpoint: &str) -> Self {
        Self {
            http,
            tokens,
            search_url: format!("{}/v1/mediaItems:search", endpoint.trim_end_matches('/')),
        }
    }
}

#[async_trait::async_trait]
impl MediaLibrary for PhotosLibraryClient {
    async fn search(&self, page_size: u32, page_token: &str) -> Result<MediaPage, LibraryError> {
        let token = self.tokens.bearer_token().await?;
        tracing::debug!(page_size, page_token, "POST {}", self.search_url);

        let response = self
            .http
            .post(&self.search_url)
            .bearer_auth(token)
            .json(&SearchRequest {
                page_size,
                page_token,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

fn api_error(code: u16, body: &[u8]) -> LibraryError {
    let message = match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{} ({})", envelope.error.message, status),
            None => envelope.error.message,
        },
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    };
    LibraryError::Api { code, message }
}

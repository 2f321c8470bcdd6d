use thiserror::Error;

use crate::auth::error::AuthError;

/// Status codes the listing endpoint returns for conditions that clear up on
/// their own: rate limiting, internal error, bad gateway, unavailable.
const TRANSIENT_STATUS_CODES: [u16; 4] = [429, 500, 502, 503];

/// Errors from the Photos Library listing API.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("API error (HTTP {code}): {message}")]
    Api { code: u16, message: String },

    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Malformed listing response: {0}")]
    Json(#[from] serde_json::Error),
}

impl LibraryError {
    /// HTTP status reported by the remote, if the failure came from one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LibraryError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether re-sending the same request is expected to succeed eventually.
    pub fn is_transient(&self) -> bool {
        self.status_code()
            .is_some_and(|code| TRANSIENT_STATUS_CODES.contains(&code))
    }
}

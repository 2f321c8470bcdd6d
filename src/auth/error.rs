use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while obtaining or refreshing an OAuth token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unable to read client secret file {path}: {source}")]
    SecretRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to parse client secret file into config: {0}")]
    SecretParse(String),

    #[error("Unable to read authorization code: {0}")]
    Prompt(std::io::Error),

    #[error("Token endpoint error (HTTP {code}): {message}")]
    TokenEndpoint { code: u16, message: String },

    #[error("Access token expired and no refresh token is available")]
    MissingRefreshToken,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

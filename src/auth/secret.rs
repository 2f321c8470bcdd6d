use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::error::AuthError;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Loopback redirect used when the secret lists none.
const FALLBACK_REDIRECT_URI: &str = "http://localhost";

/// The `client_secret.json` file offered by the Google Cloud console wraps the
/// credentials in either an `installed` or a `web` object.
#[derive(Deserialize)]
struct SecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

/// OAuth client registration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecret {
    pub fn from_json(contents: &str) -> Result<Self, AuthError> {
        let file: SecretFile =
            serde_json::from_str(contents).map_err(|e| AuthError::SecretParse(e.to_string()))?;
        file.installed
            .or(file.web)
            .ok_or_else(|| AuthError::SecretParse("missing \"installed\" or \"web\" section".into()))
    }

    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| AuthError::SecretRead {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_json(&contents)
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(FALLBACK_REDIRECT_URI)
    }

    /// Consent page URL requesting offline access (so a refresh token is issued).
    pub fn auth_code_url(&self, scope: &str, state: &str) -> Result<Url, AuthError> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri()),
                ("response_type", "code"),
                ("scope", scope),
                ("access_type", "offline"),
                ("state", state),
            ],
        )
        .map_err(|e| AuthError::SecretParse(format!("invalid auth_uri: {e}")))
    }
}

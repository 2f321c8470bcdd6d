//! Google OAuth 2.0 for installed applications.
//!
//! Flow: cached token from disk (when caching is on) → refresh if it is about
//! to expire → otherwise ask the user to visit the consent page and paste the
//! authorization code back, then exchange it.

pub mod error;
pub mod secret;
pub mod token;

use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{Duration, Utc};
use reqwest::Client;
use tokio::sync::RwLock;
use url::Url;

use self::error::AuthError;
use self::secret::ClientSecret;
use self::token::{Token, TokenErrorResponse, TokenResponse};

/// Read-only access to the user's library.
pub const PHOTOS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary.readonly";

const AUTH_STATE: &str = "state-token";

/// Refresh this long before the server-side expiry so an in-flight request
/// never carries a stale token.
const EXPIRY_BUFFER_SECS: i64 = 60;

fn expiry_buffer() -> Duration {
    Duration::seconds(EXPIRY_BUFFER_SECS)
}

/// Something that can attach a valid bearer token to a request.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<String, AuthError>;
}

#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub client_secret: PathBuf,
    pub credentials: PathBuf,
    pub cache_token: bool,
}

/// Holds the current token and refreshes it transparently.
pub struct Authenticator {
    http: Client,
    secret: ClientSecret,
    token: RwLock<Token>,
    cache_path: Option<PathBuf>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("client_id", &self.secret.client_id)
            .field("token", &"<redacted>")
            .field("cache_path", &self.cache_path)
            .finish()
    }
}

/// Obtain a working token, prompting on the terminal only when neither the
/// cache nor a refresh can provide one.
pub async fn authenticate(http: &Client, options: &AuthOptions) -> Result<Authenticator, AuthError> {
    let secret = ClientSecret::load(&options.client_secret).await?;
    let cache_path = options.cache_token.then(|| options.credentials.clone());

    let cached = match &cache_path {
        Some(path) => match Token::load(path).await {
            Ok(token) => {
                tracing::debug!("Loaded cached token from {}", path.display());
                Some(token)
            }
            Err(e) => {
                tracing::debug!("No usable cached token at {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    let (token, obtained) = match cached {
        Some(token) if !token.expires_within(Utc::now(), expiry_buffer()) => (token, false),
        Some(token) => match refresh_token(http, &secret, &token).await {
            Ok(fresh) => {
                tracing::info!("Refreshed cached access token");
                (fresh, true)
            }
            Err(e) => {
                tracing::warn!("Unable to refresh cached token: {}", e);
                (token_from_web(http, &secret).await?, true)
            }
        },
        None => (token_from_web(http, &secret).await?, true),
    };

    let auth = Authenticator::new(http.clone(), secret, token, cache_path);
    if obtained {
        let token = auth.token.read().await;
        auth.persist(&token).await;
    }
    Ok(auth)
}

impl Authenticator {
    fn new(http: Client, secret: ClientSecret, token: Token, cache_path: Option<PathBuf>) -> Self {
        Self {
            http,
            secret,
            token: RwLock::new(token),
            cache_path,
        }
    }

    /// Write the token to the cache. Failure only costs a prompt next run.
    async fn persist(&self, token: &Token) {
        let Some(path) = &self.cache_path else {
            return;
        };
        match token.save(path).await {
            Ok(()) => tracing::debug!("Cached OAuth token at {}", path.display()),
            Err(e) => tracing::warn!("Failed to cache OAuth token at {}: {}", path.display(), e),
        }
    }
}

#[async_trait::async_trait]
impl TokenSource for Authenticator {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        {
            let token = self.token.read().await;
            if !token.expires_within(Utc::now(), expiry_buffer()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut token = self.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if token.expires_within(Utc::now(), expiry_buffer()) {
            let fresh = refresh_token(&self.http, &self.secret, &token).await?;
            self.persist(&fresh).await;
            *token = fresh;
            tracing::debug!("Access token refreshed");
        }
        Ok(token.access_token.clone())
    }
}

async fn refresh_token(http: &Client, secret: &ClientSecret, token: &Token) -> Result<Token, AuthError> {
    let refresh = token
        .refresh_token
        .as_deref()
        .ok_or(AuthError::MissingRefreshToken)?;
    let response = post_token_form(
        http,
        &secret.token_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("refresh_token", refresh),
            ("grant_type", "refresh_token"),
        ],
    )
    .await?;
    Ok(response.into_token(Utc::now(), Some(refresh.to_string())))
}

async fn exchange_code(http: &Client, secret: &ClientSecret, code: &str) -> Result<Token, AuthError> {
    let response = post_token_form(
        http,
        &secret.token_uri,
        &[
            ("code", code),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("redirect_uri", secret.redirect_uri()),
            ("grant_type", "authorization_code"),
        ],
    )
    .await?;
    Ok(response.into_token(Utc::now(), None))
}

async fn post_token_form(
    http: &Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let response = http.post(url).form(params).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<TokenErrorResponse>(&body)
            .map(|e| e.to_string())
            .unwrap_or(body);
        return Err(AuthError::TokenEndpoint {
            code: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Interactive consent: print the URL, read the code from stdin.
async fn token_from_web(http: &Client, secret: &ClientSecret) -> Result<Token, AuthError> {
    let auth_url = secret.auth_code_url(PHOTOS_READONLY_SCOPE, AUTH_STATE)?;
    let input = tokio::task::spawn_blocking(move || {
        println!("Retrieve your authorization code using: {auth_url}");
        print!("Code: ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok::<String, io::Error>(input)
    })
    .await
    .map_err(|e| AuthError::Prompt(io::Error::other(e)))?
    .map_err(AuthError::Prompt)?;

    let code = extract_code(&input).ok_or_else(|| {
        AuthError::Prompt(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no authorization code entered",
        ))
    })?;
    exchange_code(http, secret, &code).await
}

/// Accept either the bare code or the whole redirect URL copied from the
/// browser's address bar.
fn extract_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(input) {
        if let Some((_, code)) = url.query_pairs().find(|(k, _)| k == "code") {
            return Some(code.into_owned());
        }
    }
    Some(input.to_string())
}

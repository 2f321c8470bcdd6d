use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// An OAuth access token as persisted in the credentials cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `None` means the server gave no lifetime; such a token is never
    /// considered expired locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// True if the token has expired or will within `buffer`.
    pub fn expires_within(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        match self.expiry {
            Some(expiry) => now + buffer >= expiry,
            None => false,
        }
    }

    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub async fn save(&self, path: &Path) -> Result<(), AuthError> {
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        Ok(())
    }
}

/// Successful body of the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Refresh responses usually omit `refresh_token`; the previous one stays valid.
    pub fn into_token(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(default_token_type),
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: self.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// Error body of the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl std::fmt::Display for TokenErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn token(expiry: Option<DateTime<Utc>>) -> Token {
        Token {
            access_token: "ya29.abc".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("1//refresh".into()),
            expiry,
        }
    }

    #[test]
    fn test_expires_within_buffer() {
        let t = token(Some(at(1_000_600)));
        assert!(!t.expires_within(at(1_000_000), Duration::seconds(60)));
        assert!(t.expires_within(at(1_000_000), Duration::seconds(600)));
        assert!(t.expires_within(at(1_000_700), Duration::zero()));
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        assert!(!token(None).expires_within(at(i32::MAX as i64), Duration::seconds(60)));
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token": "new", "expires_in": 3599, "token_type": "Bearer"}"#,
        )
        .unwrap();
        let t = resp.into_token(at(0), Some("1//old".into()));
        assert_eq!(t.access_token, "new");
        assert_eq!(t.refresh_token.as_deref(), Some("1//old"));
        assert_eq!(t.expiry, Some(at(3599)));
    }

    #[test]
    fn test_exchange_response_sets_refresh_token() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token": "a", "refresh_token": "1//r", "expires_in": 10}"#,
        )
        .unwrap();
        let t = resp.into_token(at(0), None);
        assert_eq!(t.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(t.token_type, "Bearer");
    }

    #[test]
    fn test_error_response_display() {
        let e: TokenErrorResponse = serde_json::from_str(
            r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#,
        )
        .unwrap();
        assert_eq!(e.to_string(), "invalid_grant: Bad Request");
    }

    #[tokio::test]
    async fn test_cache_file_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        let t = token(Some(at(1_700_000_000)));
        t.save(&path).await.unwrap();
        assert_eq!(Token::load(&path).await.unwrap(), t);
    }
}

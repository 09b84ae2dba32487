// Authentication types

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default Google OAuth2 endpoints, used when a file omits them
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Persisted OAuth2 credential ("authorized user" file layout)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Current access token
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub scopes: Vec<String>,

    /// Access token expiration; absent means the token never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Expired when an expiry is set and falls within `threshold` of now
    pub fn is_expired(&self, threshold: Duration) -> bool {
        match self.expiry {
            None => false,
            Some(exp) => Utc::now() + threshold >= exp,
        }
    }

    /// Usable as-is: has an access token that has not expired
    pub fn is_valid(&self, threshold: Duration) -> bool {
        self.token.is_some() && !self.is_expired(threshold)
    }

    /// Access token for a bearer header
    pub fn access_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .context("Credential does not contain an access token")
    }

    /// Fold a token endpoint response into this credential.
    /// The existing refresh token is kept when the endpoint omits one.
    pub fn apply_token_response(&mut self, response: TokenResponse) {
        self.token = Some(response.access_token);

        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }

        self.expiry = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));

        if let Some(scope) = response.scope {
            let granted: Vec<String> = scope.split_whitespace().map(str::to_string).collect();
            if !granted.is_empty() {
                self.scopes = granted;
            }
        }
    }
}

/// OAuth client registration read from the client-secret file
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Client-secret file; Google issues either an `installed` or a `web` section
#[derive(Debug, Deserialize)]
pub struct ClientSecretsFile {
    pub installed: Option<ClientSecrets>,
    pub web: Option<ClientSecrets>,
}

/// Token endpoint response (authorization code exchange or refresh)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(token: Option<&str>, expiry: Option<DateTime<Utc>>) -> Credential {
        Credential {
            token: token.map(str::to_string),
            refresh_token: Some("refresh".to_string()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            scopes: vec![],
            expiry,
        }
    }

    #[test]
    fn test_expiry_checks() {
        let threshold = Duration::seconds(60);

        let fresh = credential(Some("tok"), Some(Utc::now() + Duration::hours(1)));
        assert!(!fresh.is_expired(threshold));
        assert!(fresh.is_valid(threshold));

        // Inside the threshold counts as expired
        let expiring = credential(Some("tok"), Some(Utc::now() + Duration::seconds(30)));
        assert!(expiring.is_expired(threshold));
        assert!(!expiring.is_valid(threshold));

        let stale = credential(Some("tok"), Some(Utc::now() - Duration::hours(1)));
        assert!(stale.is_expired(threshold));
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let cred = credential(Some("tok"), None);
        assert!(!cred.is_expired(Duration::seconds(60)));
        assert!(cred.is_valid(Duration::seconds(60)));
    }

    #[test]
    fn test_missing_token_is_invalid_but_not_expired() {
        let cred = credential(None, None);
        assert!(!cred.is_expired(Duration::zero()));
        assert!(!cred.is_valid(Duration::zero()));
        assert!(cred.access_token().is_err());
    }

    #[test]
    fn test_parse_authorized_user_file() {
        let json = r#"{
            "token": "ya29.abc",
            "refresh_token": "1//refresh",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "shh",
            "scopes": ["https://www.googleapis.com/auth/classroom.courses.readonly"],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2025-01-12T10:30:00.123456Z"
        }"#;

        let cred: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(cred.token.as_deref(), Some("ya29.abc"));
        assert_eq!(cred.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(cred.scopes.len(), 1);
        assert_eq!(
            cred.expiry.unwrap().to_rfc3339(),
            "2025-01-12T10:30:00.123456+00:00"
        );
    }

    #[test]
    fn test_parse_minimal_file_uses_defaults() {
        let cred: Credential = serde_json::from_str(r#"{"refresh_token": "r"}"#).unwrap();
        assert_eq!(cred.token, None);
        assert_eq!(cred.token_uri, DEFAULT_TOKEN_URI);
        assert!(cred.expiry.is_none());
    }

    #[test]
    fn test_apply_token_response_keeps_refresh_token() {
        let mut cred = credential(Some("old"), None);
        cred.apply_token_response(TokenResponse {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: Some(3599),
            scope: None,
        });

        assert_eq!(cred.token.as_deref(), Some("new"));
        assert_eq!(cred.refresh_token.as_deref(), Some("refresh"));
        assert!(cred.is_valid(Duration::seconds(60)));
    }

    #[test]
    fn test_apply_token_response_replaces_scopes() {
        let mut cred = credential(None, None);
        cred.apply_token_response(TokenResponse {
            access_token: "new".to_string(),
            refresh_token: Some("rotated".to_string()),
            expires_in: None,
            scope: Some("a b".to_string()),
        });

        assert_eq!(cred.refresh_token.as_deref(), Some("rotated"));
        assert_eq!(cred.scopes, vec!["a".to_string(), "b".to_string()]);
        assert!(cred.expiry.is_none());
    }
}

// Token refresh logic

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::types::{Credential, TokenResponse};

/// Exchanges a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, credential: &Credential) -> Result<Credential>;
}

/// Refreshes against the credential's own `token_uri`
pub struct OAuthRefresher {
    client: Client,
}

impl OAuthRefresher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        tracing::info!("Refreshing access token via {}", credential.token_uri);

        let refresh_token = credential
            .refresh_token
            .as_deref()
            .context("Refresh token is required to refresh credentials")?;
        let client_id = credential
            .client_id
            .as_deref()
            .context("Client ID is required to refresh credentials")?;
        let client_secret = credential
            .client_secret
            .as_deref()
            .context("Client secret is required to refresh credentials")?;

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
        ];

        let response = request_token(&self.client, &credential.token_uri, &form).await?;

        let mut refreshed = credential.clone();
        refreshed.apply_token_response(response);

        match refreshed.expiry {
            Some(expiry) => tracing::info!("Token refreshed, expires: {}", expiry.to_rfc3339()),
            None => tracing::info!("Token refreshed"),
        }

        Ok(refreshed)
    }
}

/// POST a form to an OAuth token endpoint and decode the token response
pub(super) async fn request_token(
    client: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = client
        .post(token_uri)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .form(form)
        .send()
        .await
        .context("Failed to send token request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();

        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&error_text) {
            if let Some(error_code) = error_json.get("error").and_then(|v| v.as_str()) {
                tracing::error!(
                    "Token endpoint error details: error={}, description={}",
                    error_code,
                    error_json
                        .get("error_description")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                );
            }
        }

        anyhow::bail!("Token request failed: {} - {}", status, error_text);
    }

    let data: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    if data.access_token.is_empty() {
        anyhow::bail!("Token response does not contain access_token");
    }

    Ok(data)
}

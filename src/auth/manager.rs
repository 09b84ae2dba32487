use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::flow::Authorizer;
use super::refresh::TokenRefresher;
use super::store::CredentialStore;
use super::types::Credential;

/// Credential manager
/// Produces a usable credential for each request: load, then refresh or
/// reauthorize when needed, then persist.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    authorizer: Arc<dyn Authorizer>,

    /// Scopes requested during interactive authorization
    scopes: Vec<String>,

    /// Tokens expiring within this window are treated as expired
    refresh_threshold: Duration,

    /// Serializes refresh/reauthorization across concurrent requests
    acquire_lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        authorizer: Arc<dyn Authorizer>,
        scopes: Vec<String>,
        refresh_threshold: u64,
    ) -> Self {
        Self {
            store,
            refresher,
            authorizer,
            scopes,
            refresh_threshold: Duration::seconds(refresh_threshold as i64),
            acquire_lock: Mutex::new(()),
        }
    }

    /// Return a valid credential, refreshing or reauthorizing if necessary.
    /// Any newly obtained credential is written back to the store.
    pub async fn ensure_credential(&self) -> Result<Credential> {
        let _guard = self.acquire_lock.lock().await;

        let existing = self.store.load().await?;

        if let Some(ref credential) = existing {
            if credential.is_valid(self.refresh_threshold) {
                tracing::debug!("Stored credential is valid");
                return Ok(credential.clone());
            }
        }

        let credential = match existing {
            Some(credential)
                if credential.is_expired(self.refresh_threshold)
                    && credential.refresh_token.is_some() =>
            {
                tracing::debug!("Refreshing token");
                match self.refresher.refresh(&credential).await {
                    Ok(refreshed) => refreshed,
                    Err(e) => {
                        tracing::warn!("Error refreshing token: {:#}. Re-authenticating.", e);
                        self.authorizer.authorize(&self.scopes).await?
                    }
                }
            }
            _ => {
                tracing::info!("No valid credentials, starting OAuth flow");
                self.authorizer.authorize(&self.scopes).await?
            }
        };

        self.store.save(&credential).await?;

        Ok(credential)
    }
}

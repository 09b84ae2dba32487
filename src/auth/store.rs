// Credential persistence

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::types::Credential;

/// Where credentials live between requests
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential. `Ok(None)` means there is nothing usable.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Replace the stored credential
    async fn save(&self, credential: &Credential) -> Result<()>;
}

/// JSON file on disk, re-read on every load
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            tracing::debug!("No credential file at {}", self.path.display());
            return Ok(None);
        }

        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read credential file: {}", self.path.display()))?;

        match serde_json::from_str::<Credential>(&raw) {
            Ok(credential) => {
                tracing::debug!("Loaded credential from {}", self.path.display());
                Ok(Some(credential))
            }
            Err(e) => {
                // An unreadable file is treated like a missing one
                tracing::warn!(
                    "Ignoring unparseable credential file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_string(credential).context("Failed to serialize credential")?;

        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write credential file: {}", self.path.display()))?;

        tracing::info!("Credentials saved to {}", self.path.display());
        Ok(())
    }
}

/// Process-local store, used in tests and for embedding
#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            credential: RwLock::new(credential),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.credential.read().await.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        *self.credential.write().await = Some(credential.clone());
        Ok(())
    }
}

// Client-secret loading from the OAuth client JSON file

use anyhow::{Context, Result};
use std::path::Path;

use super::types::{ClientSecrets, ClientSecretsFile};

/// Load the OAuth client registration (installed or web application)
pub fn load_client_secrets(path: &Path) -> Result<ClientSecrets> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read client secrets file: {}", path.display()))?;

    parse_client_secrets(&raw)
        .with_context(|| format!("Invalid client secrets file: {}", path.display()))
}

fn parse_client_secrets(raw: &str) -> Result<ClientSecrets> {
    let file: ClientSecretsFile =
        serde_json::from_str(raw).context("Failed to parse client secrets JSON")?;

    match (file.installed, file.web) {
        (Some(installed), _) => {
            tracing::debug!("Using installed-application client secrets");
            Ok(installed)
        }
        (None, Some(web)) => {
            tracing::debug!("Using web-application client secrets");
            Ok(web)
        }
        (None, None) => {
            anyhow::bail!("Client secrets must contain an \"installed\" or \"web\" section")
        }
    }
}

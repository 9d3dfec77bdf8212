use anyhow::{Context, Result};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use log::info;
use std::sync::Arc;

use crate::config::Config;

/// The export download needs Drive read access on top of the Sheets scope.
pub const SHEETS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// Service-identity credential provider for all Google API calls. Supports
/// the two headless modes: inline JSON (hosted) or a key file on disk.
#[derive(Clone)]
pub struct SheetsAuth {
    provider: Arc<CustomServiceAccount>,
}

impl SheetsAuth {
    pub fn from_config(config: &Config) -> Result<Self> {
        let account = if let Some(json) = &config.service_account_json {
            info!("Using Google credentials from environment variable");
            CustomServiceAccount::from_json(json)
                .context("Failed to parse GOOGLE_SERVICE_ACCOUNT as a service account key")?
        } else if let Some(path) = &config.service_account_file {
            info!("Using Google credentials from key file: {}", path);
            CustomServiceAccount::from_file(path)
                .with_context(|| format!("Failed to load service account key file {}", path))?
        } else {
            anyhow::bail!("No Google service account credentials configured");
        };

        Ok(Self {
            provider: Arc::new(account),
        })
    }

    /// Bearer token for the Sheets and Drive scopes. The provider caches
    /// tokens internally and refreshes them shortly before expiry.
    pub async fn bearer(&self) -> Result<String, gcp_auth::Error> {
        let token = self.provider.token(SHEETS_SCOPES).await?;
        Ok(token.as_str().to_string())
    }
}

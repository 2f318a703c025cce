//! Configuration types and loading.
//!
//! Everything has a default, so the config file is optional. Its path is `youtube-transfer.json`
//! in the working directory unless `YT_TRANSFER_CONFIG` points elsewhere.

use crate::transfer::TransferPolicy;
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the config file path.
pub const CONFIG_ENV: &str = "YT_TRANSFER_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "youtube-transfer.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth client credentials as downloaded from the Google Cloud console.
    pub client_secrets: PathBuf,
    /// Where the source account's token is kept between runs.
    pub source_token: PathBuf,
    /// Where the destination account's token is kept between runs.
    pub target_token: PathBuf,
    /// If set, every run's summary is also written here as JSON.
    pub report_path: Option<PathBuf>,
    pub transfer: TransferPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_secrets: PathBuf::from("client_secrets.json"),
            source_token: PathBuf::from("source_token.json"),
            target_token: PathBuf::from("target_token.json"),
            report_path: None,
            transfer: TransferPolicy::default(),
        }
    }
}

impl Config {
    /// The config file path: `YT_TRANSFER_CONFIG` if set, otherwise the default.
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Loads the config file, falling back to defaults if it does not exist.
    pub async fn load(path: &Path) -> eyre::Result<Self> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read config file {}", path.display()));
            }
        };
        Self::from_json(&contents).with_context(|| format!("load config file {}", path.display()))
    }

    pub fn from_json(contents: &str) -> eyre::Result<Self> {
        let config: Config = serde_json::from_str(contents).context("parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        let policy = &self.transfer;
        if !(1..=crate::enumerate::MAX_PAGE_SIZE).contains(&policy.page_size) {
            eyre::bail!(
                "transfer.page_size must be between 1 and {}, got {}",
                crate::enumerate::MAX_PAGE_SIZE,
                policy.page_size
            );
        }
        if policy.max_attempts == 0 {
            eyre::bail!("transfer.max_attempts must be at least 1");
        }
        Ok(())
    }
}

/// The OAuth client of an installed application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

/// The layout of a `client_secrets.json` file.
///
/// See: <https://github.com/googleapis/google-api-python-client/blob/main/docs/client-secrets.md>
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ClientSecretsFile {
    Installed(ClientSecrets),
    Web(ClientSecrets),
}

impl ClientSecrets {
    pub async fn load(path: &Path) -> eyre::Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.with_context(|| {
            format!(
                "read OAuth client secrets from {} (download them from the Google Cloud console)",
                path.display()
            )
        })?;
        Self::from_json(&contents).with_context(|| format!("load {}", path.display()))
    }

    pub fn from_json(contents: &str) -> eyre::Result<Self> {
        let file: ClientSecretsFile =
            serde_json::from_str(contents).context("parse client secrets")?;
        match file {
            ClientSecretsFile::Installed(secrets) => Ok(secrets),
            ClientSecretsFile::Web(secrets) => {
                tracing::warn!(
                    "client secrets are for a web application, the localhost redirect may be rejected"
                );
                Ok(secrets)
            }
        }
    }
}

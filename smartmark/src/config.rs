// smartmark/src/config.rs
use crate::domain::session_provider::AuthProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

pub const ENV_DB_URL: &str = "SMARTMARK_DB_URL";
pub const ENV_FEED_POLL_MS: &str = "SMARTMARK_FEED_POLL_MS";
pub const ENV_PENDING_TIMEOUT_SECS: &str = "SMARTMARK_PENDING_TIMEOUT_SECS";
pub const ENV_ACCOUNT_EMAIL: &str = "SMARTMARK_ACCOUNT_EMAIL";
pub const ENV_ACCOUNT_NAME: &str = "SMARTMARK_ACCOUNT_NAME";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Identity the local providers sign in for a given identity provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountSettings {
    pub provider: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_url: String,

    /// Identity provider used by `login` when none is given
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// How often the change log is polled for new events (milliseconds)
    #[serde(default = "default_feed_poll_ms")]
    pub feed_poll_ms: u64,

    /// How long an unconfirmed bookmark stays visible (seconds)
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,

    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config/smartmark")
}

fn default_db_path() -> String {
    config_dir().join("smartmark.db").to_string_lossy().to_string()
}

fn default_provider() -> String {
    AuthProvider::google().to_string()
}

fn default_feed_poll_ms() -> u64 {
    250
}

fn default_pending_timeout_secs() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_url: default_db_path(),
            default_provider: default_provider(),
            feed_poll_ms: default_feed_poll_ms(),
            pending_timeout_secs: default_pending_timeout_secs(),
            accounts: Vec::new(),
        }
    }
}

impl Settings {
    pub fn feed_poll_interval(&self) -> Duration {
        Duration::from_millis(self.feed_poll_ms.max(1))
    }

    pub fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }

    pub fn default_auth_provider(&self) -> AuthProvider {
        AuthProvider::new(&self.default_provider)
    }

    /// Insert or replace the account of `account.provider`
    pub fn upsert_account(&mut self, account: AccountSettings) {
        let provider = AuthProvider::new(&account.provider);
        self.accounts
            .retain(|a| AuthProvider::new(&a.provider) != provider);
        self.accounts.push(account);
    }

    fn apply_env(&mut self) {
        if let Ok(db_url) = std::env::var(ENV_DB_URL) {
            trace!("Using {} from environment: {}", ENV_DB_URL, db_url);
            self.db_url = db_url;
        }

        if let Some(ms) = env_number(ENV_FEED_POLL_MS) {
            self.feed_poll_ms = ms;
        }

        if let Some(secs) = env_number(ENV_PENDING_TIMEOUT_SECS) {
            self.pending_timeout_secs = secs;
        }

        if let Ok(email) = std::env::var(ENV_ACCOUNT_EMAIL) {
            trace!("Using {} from environment: {}", ENV_ACCOUNT_EMAIL, email);
            let provider = self.default_auth_provider();
            let existing = self
                .accounts
                .iter()
                .find(|a| AuthProvider::new(&a.provider) == provider)
                .cloned();
            let full_name = std::env::var(ENV_ACCOUNT_NAME)
                .ok()
                .or_else(|| existing.as_ref().and_then(|a| a.full_name.clone()));
            self.upsert_account(AccountSettings {
                provider: provider.to_string(),
                email,
                full_name,
                avatar_url: existing.and_then(|a| a.avatar_url),
            });
        }
    }
}

fn env_number(name: &str) -> Option<u64> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring {}={}: not a number", name, value);
            None
        }
    }
}

fn read_settings_file(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<Settings>(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load settings: explicit file or `~/.config/smartmark/config.toml`, then
/// environment overrides. An unreadable explicit file is an error; a broken
/// default file only produces a warning.
#[instrument(level = "debug")]
pub fn load_settings(config_file: Option<&Path>) -> Result<Settings, ConfigError> {
    trace!("Loading settings");

    let mut settings = match config_file {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = config_dir().join("config.toml");
            if default_path.exists() {
                read_settings_file(&default_path).unwrap_or_else(|e| {
                    warn!("{}. Using defaults.", e);
                    Settings::default()
                })
            } else {
                Settings::default()
            }
        }
    };

    settings.apply_env();
    debug!("Settings loaded: {:?}", settings);
    Ok(settings)
}

pub fn generate_default_config() -> String {
    let mut settings = Settings::default();
    settings.accounts.push(AccountSettings {
        provider: default_provider(),
        email: "you@example.com".to_string(),
        full_name: Some("Your Name".to_string()),
        avatar_url: None,
    });
    toml::to_string_pretty(&settings)
        .unwrap_or_else(|_| "# Error generating default configuration".to_string())
}

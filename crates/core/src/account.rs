//! Account management
//!
//! An account is a named storage login: the auth endpoint, user and key,
//! plus the optional container key used for signed links.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// Auth endpoint of the public Selectel cloud
pub const DEFAULT_AUTH_URL: &str = "https://api.selcdn.ru/auth/v1.0";

/// Timeout configuration for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    60000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            read_ms: default_read_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }
}

/// A named storage account
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique name for this account
    pub name: String,

    /// v1 auth endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    pub user: String,

    pub key: String,

    /// Container key for signed download links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_url_key: Option<String>,

    /// Base URL of public container content, e.g. a CDN domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Allow insecure TLS connections
    #[serde(default)]
    pub insecure: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

impl Account {
    pub fn new(
        name: impl Into<String>,
        auth_url: impl Into<String>,
        user: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            auth_url: auth_url.into(),
            user: user.into(),
            key: key.into(),
            temp_url_key: None,
            public_url: None,
            insecure: false,
            timeout: None,
        }
    }

    /// Get the effective timeout configuration
    pub fn timeout_config(&self) -> TimeoutConfig {
        self.timeout.clone().unwrap_or_default()
    }
}

// Keys stay out of logs and debug output
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("auth_url", &self.auth_url)
            .field("user", &self.user)
            .field("key", &"<redacted>")
            .field("temp_url_key", &self.temp_url_key.as_ref().map(|_| "<redacted>"))
            .field("public_url", &self.public_url)
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Manager for account operations
pub struct AccountManager {
    config_manager: ConfigManager,
}

impl AccountManager {
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// AccountManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// List all configured accounts
    pub fn list(&self) -> Result<Vec<Account>> {
        let config = self.config_manager.load()?;
        Ok(config.accounts)
    }

    /// Get an account by name
    pub fn get(&self, name: &str) -> Result<Account> {
        let config = self.config_manager.load()?;
        config
            .accounts
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::AccountNotFound(name.to_string()))
    }

    /// Add or replace an account
    pub fn set(&self, account: Account) -> Result<()> {
        let mut config = self.config_manager.load()?;

        config.accounts.retain(|a| a.name != account.name);
        config.accounts.push(account);

        self.config_manager.save(&config)
    }

    /// Add an account, failing if the name is taken
    pub fn add(&self, account: Account) -> Result<()> {
        if self.exists(&account.name)? {
            return Err(Error::AccountExists(account.name));
        }
        self.set(account)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.accounts.len();

        config.accounts.retain(|a| a.name != name);

        if config.accounts.len() == original_len {
            return Err(Error::AccountNotFound(name.to_string()));
        }

        self.config_manager.save(&config)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.accounts.iter().any(|a| a.name == name))
    }
}

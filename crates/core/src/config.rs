//! Configuration management
//!
//! Loads, saves and migrates the selstore configuration file. The file is
//! TOML, stored at `$SELSTORE_CONFIG_DIR/config.toml` when the variable is
//! set and at `~/.config/selstore/config.toml` otherwise.
//!
//! Changes to `schema_version` require migration support.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::batch::DEFAULT_CONCURRENCY;
use crate::error::{Error, Result};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Overrides the directory holding `config.toml`
pub const CONFIG_DIR_ENV: &str = "SELSTORE_CONFIG_DIR";

const DEFAULT_OUTPUT: &str = "human";
const DEFAULT_COLOR: &str = "auto";
/// One day
const DEFAULT_LINK_TTL_SECS: u64 = 86_400;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    /// Configured storage accounts
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always", or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Show progress bars
    #[serde(default = "default_true")]
    pub progress: bool,

    /// Worker count for batch operations
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Lifetime of signed download links when none is given
    #[serde(default = "default_link_ttl")]
    pub link_ttl_secs: u64,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_link_ttl() -> u64 {
    DEFAULT_LINK_TTL_SECS
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            progress: true,
            concurrency: default_concurrency(),
            link_ttl_secs: default_link_ttl(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            accounts: Vec::new(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// ConfigManager for the default location, honoring `SELSTORE_CONFIG_DIR`
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("selstore"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the default configuration. Older schema
    /// versions are migrated in memory.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade selstore.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk with owner-only permissions
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        // Account keys live in this file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    fn migrate(&self, mut config: Config) -> Result<Config> {
        tracing::debug!(from = config.schema_version, to = SCHEMA_VERSION, "migrating config");
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}

//! # Ledger Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BIASHARA_DB_PATH=/var/lib/biashara/ledger.db                       │
//! │     BIASHARA_TENANT_ID=duka-la-mama                                    │
//! │     BIASHARA_LOG=biashara_ledger=debug                                 │
//! │     BIASHARA_VERIFY_ON_OPEN=true                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/biashara/ledger.toml (Linux)                             │
//! │     ~/Library/Application Support/com.biashara.ledger/ledger.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ledger.toml
//! [database]
//! path = "/var/lib/biashara/ledger.db"
//! max_connections = 5
//!
//! [ledger]
//! tenant_id = "00000000-0000-0000-0000-000000000001"
//! verify_on_open = false
//!
//! [logging]
//! filter = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use biashara_core::DEFAULT_TENANT_ID;
use biashara_db::DbConfig;

use crate::error::{LedgerError, LedgerResult};

// =============================================================================
// Sections
// =============================================================================

/// Where the event store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created on first open.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "biashara", "ledger")
        .map(|dirs| dirs.data_dir().join("biashara.db"))
        .unwrap_or_else(|| PathBuf::from("./biashara.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Which tenant to open, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,

    /// Replay the stored log on open and compare with the live projection.
    #[serde(default)]
    pub verify_on_open: bool,
}

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            tenant_id: default_tenant_id(),
            verify_on_open: false,
        }
    }
}

/// `tracing-subscriber` filter directive used when `RUST_LOG` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Main Ledger Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ledger.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> LedgerResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| LedgerError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.ledger.tenant_id.trim().is_empty() {
            return Err(LedgerError::Config("tenant_id must not be empty".into()));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(LedgerError::Config("database path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(LedgerError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(LedgerError::Config("logging filter must not be empty".into()));
        }

        Ok(())
    }

    /// Applies `BIASHARA_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BIASHARA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(tenant) = lookup("BIASHARA_TENANT_ID") {
            debug!(tenant_id = %tenant, "Overriding tenant from environment");
            self.ledger.tenant_id = tenant;
        }

        if let Some(filter) = lookup("BIASHARA_LOG") {
            self.logging.filter = filter;
        }

        if let Some(verify) = lookup("BIASHARA_VERIFY_ON_OPEN") {
            match verify.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.ledger.verify_on_open = true,
                "0" | "false" | "no" | "off" => self.ledger.verify_on_open = false,
                _ => warn!(value = %verify, "Unknown BIASHARA_VERIFY_ON_OPEN value"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "biashara", "ledger")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tenant_id(&self) -> &str {
        &self.ledger.tenant_id
    }

    /// Pool settings for [`biashara_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

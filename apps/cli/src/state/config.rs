//! # Configuration State
//!
//! Application configuration loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--data-dir`)
//! 2. Environment variables (`STOCKBOOK_*`)
//! 3. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

use stock_core::Money;
use stock_db::SnapshotSlot;

/// Development credential used when none is configured.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@stockbook.local";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Directory holding the snapshot and session slots
    pub data_dir: PathBuf,

    /// Fixed application identifier; names both slot files
    pub app_id: String,

    /// Bootstrap administrator, seeded when the store has no users
    pub admin_email: String,

    #[serde(skip_serializing, default)]
    pub admin_password: String,

    /// Store name (printed on invoices)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u32,
}

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine the application data directory")]
    NoDataDir,
}

impl ConfigState {
    /// Defaults rooted at an explicit data directory.
    ///
    /// ## Default Values
    /// - App id: "stockbook"
    /// - Admin: admin@stockbook.local / admin123
    /// - Currency: FCFA, no decimals
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        ConfigState {
            data_dir: data_dir.into(),
            app_id: "stockbook".to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            store_name: "Stockbook".to_string(),
            currency_symbol: "FCFA".to_string(),
            currency_decimals: 0,
        }
    }

    /// Loads configuration from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `STOCKBOOK_DATA_DIR`: Override the platform data directory
    /// - `STOCKBOOK_APP_ID`: Slot file name stem
    /// - `STOCKBOOK_ADMIN_EMAIL`, `STOCKBOOK_ADMIN_PASSWORD`: Bootstrap admin
    /// - `STOCKBOOK_STORE_NAME`: Name printed on invoices
    /// - `STOCKBOOK_CURRENCY_SYMBOL`, `STOCKBOOK_CURRENCY_DECIMALS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = match env::var("STOCKBOOK_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_data_dir()?,
        };

        let mut config = ConfigState::with_data_dir(data_dir);

        if let Ok(app_id) = env::var("STOCKBOOK_APP_ID") {
            config.app_id = app_id;
        }

        if let Ok(email) = env::var("STOCKBOOK_ADMIN_EMAIL") {
            config.admin_email = email;
        }

        if let Ok(password) = env::var("STOCKBOOK_ADMIN_PASSWORD") {
            config.admin_password = password;
        }

        if let Ok(store_name) = env::var("STOCKBOOK_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Ok(symbol) = env::var("STOCKBOOK_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Ok(decimals) = env::var("STOCKBOOK_CURRENCY_DECIMALS") {
            config.currency_decimals = decimals
                .parse()
                .ok()
                .filter(|d| *d <= 4)
                .ok_or_else(|| ConfigError::InvalidValue("STOCKBOOK_CURRENCY_DECIMALS".to_string()))?;
        }

        Ok(config)
    }

    /// True when the bootstrap credential is the built-in development one.
    pub fn uses_default_admin(&self) -> bool {
        self.admin_email == DEFAULT_ADMIN_EMAIL && self.admin_password == DEFAULT_ADMIN_PASSWORD
    }

    /// `<data_dir>/<app_id>.snapshot`
    pub fn snapshot_slot(&self) -> SnapshotSlot {
        SnapshotSlot::new(&self.data_dir, &self.app_id)
    }

    /// `<data_dir>/<app_id>.session.json`
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.session.json", self.app_id))
    }

    /// Formats a minor-unit amount for display.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::with_data_dir("/tmp");
    /// assert_eq!(config.format_currency(1_250_000), "1 250 000 FCFA");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        Money::from_cents(cents).format(self.currency_decimals, &self.currency_symbol)
    }
}

/// Platform data directory.
///
/// - **Linux**: `~/.local/share/stockbook`
/// - **macOS**: `~/Library/Application Support/com.stockbook.stockbook`
/// - **Windows**: `%APPDATA%\stockbook\stockbook\data`
fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let proj_dirs = ProjectDirs::from("com", "stockbook", "stockbook").ok_or(ConfigError::NoDataDir)?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

//! Configuration loading and data folder resolution
//!
//! Every setting resolves in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the data folder
pub const ENV_DATA_FOLDER: &str = "CAFE_DATA_FOLDER";
/// Environment variable naming the listen port
pub const ENV_PORT: &str = "CAFE_PORT";
/// Environment variable naming the listen address
pub const ENV_BIND_ADDR: &str = "CAFE_BIND_ADDR";

/// Default listen port
pub const DEFAULT_PORT: u16 = 5780;

/// Fully resolved service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CafeConfig {
    /// Folder holding the database file
    pub data_folder: PathBuf,
    /// Database file name inside `data_folder`
    pub database_file: String,
    pub bind_addr: String,
    pub port: u16,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_level: String,
    pub auth: AuthConfig,
    pub pricing: PricingConfig,
    pub ledger: LedgerConfig,
}

/// Login credentials and cookie lifetime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    pub session_max_age_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingConfig {
    /// Margin applied by the product editor when neither price nor margin is given
    pub default_margin_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Record an income transaction when an order is completed
    pub record_sales_income: bool,
}

impl Default for CafeConfig {
    fn default() -> Self {
        Self {
            data_folder: default_data_folder(),
            database_file: "cafe.db".to_string(),
            bind_addr: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            auth: AuthConfig::default(),
            pricing: PricingConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "marcelo".to_string(),
            password: "marcelo".to_string(),
            session_max_age_secs: 86_400,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_margin_percent: 30.0,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            record_sales_income: true,
        }
    }
}

impl CafeConfig {
    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_folder.join(&self.database_file)
    }

    /// Socket address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Parse a TOML document; keys it omits keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub data_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
}

/// Resolve the configuration from all sources
///
/// A missing file at the default location falls back to defaults with a
/// warning. A missing explicit `--config` file, or one that does not parse,
/// is an error.
pub fn load_config(overrides: &ConfigOverrides) -> Result<CafeConfig> {
    let toml_path = overrides
        .config_file
        .clone()
        .or_else(default_config_file);

    let mut config = match toml_path {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            read_config_file(&path)?
        }
        Some(path) => {
            if overrides.config_file.is_some() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            warn!("No config file at {}, using defaults", path.display());
            CafeConfig::default()
        }
        None => {
            warn!("Could not determine config directory, using defaults");
            CafeConfig::default()
        }
    };

    apply_env(&mut config)?;

    if let Some(folder) = &overrides.data_folder {
        config.data_folder = folder.clone();
    }
    if let Some(addr) = &overrides.bind_addr {
        config.bind_addr = addr.clone();
    }
    if let Some(port) = overrides.port {
        config.port = port;
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<CafeConfig> {
    let content = std::fs::read_to_string(path)?;
    CafeConfig::from_toml_str(&content)
}

fn apply_env(config: &mut CafeConfig) -> Result<()> {
    if let Ok(folder) = std::env::var(ENV_DATA_FOLDER) {
        config.data_folder = PathBuf::from(folder);
    }
    if let Ok(addr) = std::env::var(ENV_BIND_ADDR) {
        config.bind_addr = addr;
    }
    if let Ok(port) = std::env::var(ENV_PORT) {
        config.port = port
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid port: {}", ENV_PORT, port)))?;
    }
    Ok(())
}

/// `<config_dir>/cafe-dash/config.toml` for the current platform
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cafe-dash").join("config.toml"))
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cafe-dash"))
        .unwrap_or_else(|| PathBuf::from("./cafe_data"))
}

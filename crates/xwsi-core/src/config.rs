use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "XWSI_CONFIG";

/// Top-level driver configuration, loaded from xwsi.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub native: NativeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Native graphics library names, tried in order
    #[serde(default = "default_library_candidates")]
    pub library_candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// tracing-subscriber filter used when XWSI_LOG is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            library_candidates: default_library_candidates(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl DriverConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, DriverError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("{}: {}", path, e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, DriverError> {
        toml::from_str(content).map_err(|e| DriverError::Config(e.to_string()))
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("using default configuration: {}", e);
                Self::default()
            }
        }
    }
}

/// Returns the config file path.
/// Search order:
/// 1. `$XWSI_CONFIG`
/// 2. System-wide config: `/etc/xwsi/xwsi.toml`
/// 3. Local fallback: `./xwsi.toml`
pub fn default_config_path() -> String {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return path;
        }
    }
    let system_path = "/etc/xwsi/xwsi.toml";
    if std::path::Path::new(system_path).exists() {
        return system_path.to_string();
    }
    "xwsi.toml".to_string()
}

fn default_library_candidates() -> Vec<String> {
    xwsi_common::platform::default_native_library_names()
}

fn default_filter() -> String {
    "warn".to_string()
}

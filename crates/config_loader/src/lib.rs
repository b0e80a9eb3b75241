//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `HarvestConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("Episodes: {}", config.run.episode_count);
//! ```

mod parser;
mod validator;

pub use contracts::HarvestConfig;
pub use parser::ConfigFormat;

use contracts::HarvestError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<HarvestConfig, HarvestError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<HarvestConfig, HarvestError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Serialize HarvestConfig to TOML string
    pub fn to_toml(config: &HarvestConfig) -> Result<String, HarvestError> {
        toml::to_string_pretty(config)
            .map_err(|e| HarvestError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize HarvestConfig to JSON string
    pub fn to_json(config: &HarvestConfig) -> Result<String, HarvestError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| HarvestError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, HarvestError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            HarvestError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            HarvestError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, HarvestError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

use std::{ffi::OsString, fmt, fs};

use serde::{Deserialize, Serialize};

pub const ROW_POSITION: &str = "__rownum";
pub const RAW_FIELD_PREFIX: &str = "_{";

/// Resolver and cache configuration.
///
/// - `row_position_name` is the column name that reads the cursor position
///   instead of a stored field.
/// - `raw_field_prefix` marks names that bypass the expression catalog.
/// - `legacy_mode` makes `RowValueCache::value_of` read fields by position
///   without evaluating any binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub row_position_name: String,
    pub raw_field_prefix: String,
    pub legacy_mode: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            row_position_name: ROW_POSITION.to_string(),
            raw_field_prefix: RAW_FIELD_PREFIX.to_string(),
            legacy_mode: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, source: std::io::Error },
    Parse { path: String, source: serde_json::Error },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => write!(f, "Could not read config file {}: {}", path, source),
            ConfigError::Parse { path, source } => write!(f, "Config file {} is not valid: {}", path, source),
            ConfigError::Invalid(message) => write!(f, "Invalid config: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(row_position_name: &str, raw_field_prefix: &str) -> Self {
        Self {
            row_position_name: row_position_name.to_string(),
            raw_field_prefix: raw_field_prefix.to_string(),
            legacy_mode: false,
        }
    }

    pub fn legacy() -> Self {
        Self { legacy_mode: true, ..Self::default() }
    }

    pub fn is_raw_field(&self, name: &str) -> bool {
        !self.raw_field_prefix.is_empty() && name.starts_with(&self.raw_field_prefix)
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.row_position_name.is_empty() {
            return Err(ConfigError::Invalid("row_position_name must not be empty".to_string()));
        }
        Ok(self)
    }

    /// Load a JSON config file. Missing keys fall back to their defaults.
    pub fn load_from_file(file_path: &OsString) -> Result<Self, ConfigError> {
        let path = file_path.to_string_lossy().to_string();

        let content = fs::read_to_string(file_path)
            .map_err(|source| ConfigError::Read { path: path.clone(), source })?;

        let config = serde_json::from_str::<ResolverConfig>(&content)
            .map_err(|source| ConfigError::Parse { path, source })?;

        config.validate()
    }
}

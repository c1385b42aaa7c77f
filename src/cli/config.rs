//! Configuration file
//!
//! ```json
//! { "database_path": "./employees.db", "default_per_page": 10, "log_level": "info" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::Severity;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file (required)
    pub database_path: String,

    /// Page size when none is given (optional, default 10)
    #[serde(default = "default_per_page")]
    pub default_per_page: u64,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_per_page() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.database_path.trim().is_empty() {
            return Err(CliError::config_error("database_path must not be empty"));
        }

        if self.default_per_page == 0 {
            return Err(CliError::config_error("default_per_page must be > 0"));
        }

        self.severity()?;

        Ok(())
    }

    /// Get database path as Path
    pub fn database_path(&self) -> &Path {
        Path::new(&self.database_path)
    }

    /// Configured minimum log severity
    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level.parse().map_err(CliError::config_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json(r#"{"database_path": "./t.db"}"#).unwrap();
        assert_eq!(config.default_per_page, 10);
        assert_eq!(config.severity().unwrap(), Severity::Info);
        assert_eq!(config.database_path(), Path::new("./t.db"));
    }

    #[test]
    fn test_missing_database_path() {
        let err = Config::from_json(r#"{"default_per_page": 5}"#).unwrap_err();
        assert!(err.message().contains("Invalid config JSON"));
    }

    #[test]
    fn test_zero_per_page_rejected() {
        let err = Config::from_json(r#"{"database_path": "a.db", "default_per_page": 0}"#)
            .unwrap_err();
        assert_eq!(err.message(), "default_per_page must be > 0");
    }

    #[test]
    fn test_bad_log_level_rejected() {
        assert!(Config::from_json(r#"{"database_path": "a.db", "log_level": "loud"}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tablewright.json");
        fs::write(&path, r#"{"database_path": "x.db", "log_level": "warn"}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.severity().unwrap(), Severity::Warn);

        assert!(Config::load(&dir.path().join("missing.json")).is_err());
    }
}

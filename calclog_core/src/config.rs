//! Configuration file support for calclog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/calclog/config.toml`.

use crate::{Error, Result, DEFAULT_MAX_ENTRIES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub statistics: StatisticsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_history_file")]
    pub history_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            history_file: default_history_file(),
        }
    }
}

/// Retention policy
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Export and backup destinations. Unset means a directory under `data_dir`.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatisticsConfig {
    #[serde(default = "default_daily_activity_days")]
    pub daily_activity_days: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            daily_activity_days: default_daily_activity_days(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("calclog")
}

fn default_history_file() -> String {
    "calculator_history.json".into()
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_daily_activity_days() -> usize {
    7
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("calclog").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention.max_entries == 0 {
            return Err(Error::Config(
                "retention.max_entries must be at least 1".into(),
            ));
        }
        if self.statistics.daily_activity_days == 0 {
            return Err(Error::Config(
                "statistics.daily_activity_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Replace the data directory (used by the `--data-dir` override)
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data.data_dir = data_dir;
        self
    }

    pub fn history_path(&self) -> PathBuf {
        self.data.data_dir.join(&self.data.history_file)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export
            .export_dir
            .clone()
            .unwrap_or_else(|| self.data.data_dir.join("exports"))
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.export
            .backup_dir
            .clone()
            .unwrap_or_else(|| self.data.data_dir.join("backups"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.retention.max_entries, 1000);
        assert_eq!(config.statistics.daily_activity_days, 7);
        assert_eq!(config.data.history_file, "calculator_history.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.retention.max_entries, parsed.retention.max_entries);
        assert_eq!(config.data.data_dir, parsed.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[retention]
max_entries = 50
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.retention.max_entries, 50);
        assert_eq!(config.statistics.daily_activity_days, 7); // default
    }

    #[test]
    fn test_save_and_load_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default().with_data_dir(temp_dir.path().to_path_buf());
        config.retention.max_entries = 250;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.retention.max_entries, 250);
        assert_eq!(loaded.data.data_dir, temp_dir.path());
        assert!(loaded.export.backup_dir.is_none());
    }

    #[test]
    fn test_zero_retention_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[retention]\nmax_entries = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_derived_paths_follow_data_dir() {
        let config = Config::default().with_data_dir(PathBuf::from("/tmp/calc"));
        assert_eq!(
            config.history_path(),
            PathBuf::from("/tmp/calc/calculator_history.json")
        );
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/calc/exports"));
        assert_eq!(config.backup_dir(), PathBuf::from("/tmp/calc/backups"));
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::image::SaveFormat;

/// Default configuration written on first run
pub const DEFAULT_CONFIG: &str = include_str!("../../termpaste.toml.example");

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// General configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Format images are saved in
    #[serde(default)]
    pub save_format: SaveFormat,

    /// Folder created inside the workspace for pasted images
    #[serde(default = "default_folder_name")]
    pub folder_name: String,

    /// Images kept per folder, 0 keeps everything
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Send a newline after the inserted path
    #[serde(default)]
    pub send_newline: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            save_format: SaveFormat::default(),
            folder_name: default_folder_name(),
            max_images: default_max_images(),
            send_newline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Use the rotating log file instead of plain stderr logging
    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default = "default_file_level")]
    pub file_level: String,

    #[serde(default = "default_stderr_level")]
    pub stderr_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_to_file: false,
            file_level: default_file_level(),
            stderr_level: default_stderr_level(),
        }
    }
}

// Default value functions for serde
fn default_folder_name() -> String {
    ".termpaste-images".to_string()
}

fn default_max_images() -> usize {
    20
}

fn default_file_level() -> String {
    "info".to_string()
}

fn default_stderr_level() -> String {
    "warn".to_string()
}

/// Trait for configuration storage
pub trait ConfigStorage: Send + Sync {
    /// Load configuration, creating the default file when missing
    fn load(&self) -> Result<Config>;

    fn save(&self, config: &Config) -> Result<()>;

    fn path(&self) -> &PathBuf;

    /// Write the default configuration file
    fn create_default(&self) -> Result<()>;
}

/// TOML-based implementation of ConfigStorage
pub struct TomlConfigStorage {
    path: PathBuf,
}

impl TomlConfigStorage {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigStorage { path }
    }
}

impl ConfigStorage for TomlConfigStorage {
    fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            log::info!(
                "Config file not found at {:?}, creating default configuration",
                self.path
            );
            self.create_default()?;
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {:?}", self.path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", self.path))?;

        log::info!("Loaded configuration from {:?}", self.path);
        log::debug!(
            "Config: save_format={}, folder={}, max_images={}",
            config.general.save_format,
            config.general.folder_name,
            config.general.max_images
        );

        Ok(config)
    }

    fn save(&self, config: &Config) -> Result<()> {
        let toml_str =
            toml::to_string_pretty(config).context("Failed to serialize configuration")?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        fs::write(&self.path, toml_str)
            .with_context(|| format!("Failed to write config to {:?}", self.path))?;

        log::debug!("Saved configuration to {:?}", self.path);
        Ok(())
    }

    fn path(&self) -> &PathBuf {
        &self.path
    }

    fn create_default(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        fs::write(&self.path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to create default config at {:?}", self.path))?;

        log::info!("Created default configuration at {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GeneralConfig::default();
        assert_eq!(config.save_format, SaveFormat::Auto);
        assert_eq!(config.folder_name, ".termpaste-images");
        assert_eq!(config.max_images, 20);
        assert!(!config.send_newline);
    }

    #[test]
    fn test_embedded_example_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
        [general]
        save_format = "jpeg"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.save_format, SaveFormat::Jpeg);
        assert_eq!(config.general.max_images, 20);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TomlConfigStorage::new(dir.path().join("nested/termpaste.toml"));

        let config = storage.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(fs::read_to_string(storage.path()).unwrap(), DEFAULT_CONFIG);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TomlConfigStorage::new(dir.path().join("termpaste.toml"));

        let mut config = Config::default();
        config.general.save_format = SaveFormat::Png;
        config.general.send_newline = true;
        config.logging.log_to_file = true;
        storage.save(&config).unwrap();

        assert_eq!(storage.load().unwrap(), config);
    }

    #[test]
    fn test_invalid_save_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("termpaste.toml");
        fs::write(&path, "[general]\nsave_format = \"gif\"\n").unwrap();

        let err = TomlConfigStorage::new(path).load().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }
}

pub mod config;
pub mod images;

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

pub use config::{Config, ConfigStorage, GeneralConfig, LoggingConfig, TomlConfigStorage};
pub use images::{FolderImageStore, ImageStore};

const APP_DIR: &str = "termpaste";

/// Work out the data and config directories from environment lookups
/// Returns (data_dir, config_dir)
///
/// XDG variables win everywhere. Otherwise Windows uses
/// `%LOCALAPPDATA%` / `%APPDATA%` and other systems use
/// `~/.local/share` / `~/.config`. The home directory is `HOME`, falling back
/// to `USERPROFILE`.
pub fn resolve_directories<F>(lookup: F, windows: bool) -> Result<(PathBuf, PathBuf)>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);
    let home = || {
        var("HOME")
            .or_else(|| var("USERPROFILE"))
            .context("Neither HOME nor USERPROFILE is set")
    };

    let data_dir = match var("XDG_DATA_HOME") {
        Some(dir) => dir,
        None if windows => match var("LOCALAPPDATA").or_else(|| var("APPDATA")) {
            Some(dir) => dir,
            None => home()?.join("AppData").join("Local"),
        },
        None => home()?.join(".local").join("share"),
    };

    let config_dir = match var("XDG_CONFIG_HOME") {
        Some(dir) => dir,
        None if windows => match var("APPDATA") {
            Some(dir) => dir,
            None => home()?.join("AppData").join("Roaming"),
        },
        None => home()?.join(".config"),
    };

    Ok((data_dir.join(APP_DIR), config_dir.join(APP_DIR)))
}

/// Ensure the data and config directories exist
/// Returns (data_dir, config_dir)
pub fn ensure_directories() -> Result<(PathBuf, PathBuf)> {
    let (data_dir, config_dir) = resolve_directories(|name| env::var(name).ok(), cfg!(windows))?;

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

    log::debug!("Data directory: {:?}", data_dir);
    log::debug!("Config directory: {:?}", config_dir);

    Ok((data_dir, config_dir))
}

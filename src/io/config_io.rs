use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::AppConfig;

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine a data directory: set PROMPTLIST_DIR or pass --data-dir")]
    NoDataDir,
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{0} already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),
}

/// Resolve the data directory from the process environment.
pub fn resolve_data_dir(override_dir: Option<&str>) -> Result<PathBuf, ConfigError> {
    resolve_data_dir_with(override_dir, |key| std::env::var(key).ok())
}

/// Resolve the data directory: explicit override, then `PROMPTLIST_DIR`,
/// then `$XDG_DATA_HOME/promptlist`, then `$HOME/.local/share/promptlist`.
pub fn resolve_data_dir_with(
    override_dir: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());
    if let Some(dir) = override_dir {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = non_empty("PROMPTLIST_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join("promptlist"));
    }
    non_empty("HOME")
        .map(|home| PathBuf::from(home).join(".local/share/promptlist"))
        .ok_or(ConfigError::NoDataDir)
}

/// Read `config.toml` from the data directory. A missing file yields defaults.
pub fn read_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    toml::from_str(&text).map_err(|e| ConfigError::ParseError { path, source: e })
}

/// Write a config document into the data directory, creating it if needed.
pub fn write_config_text(data_dir: &Path, text: &str, force: bool) -> Result<PathBuf, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path));
    }
    fs::create_dir_all(data_dir).map_err(|e| ConfigError::WriteError {
        path: data_dir.to_path_buf(),
        source: e,
    })?;
    fs::write(&path, text).map_err(|e| ConfigError::WriteError {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

use std::path::{Path, PathBuf};

use navigator::NavigatorConfig;
use thiserror::Error;

/// Looked up next to the document when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "cardmark.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Load a config file. `Ok(None)` when the file does not exist.
pub fn load_from_path<P: AsRef<Path>>(
    config_path: P,
) -> Result<Option<NavigatorConfig>, ConfigError> {
    let config_path = config_path.as_ref();
    if !config_path.exists() {
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(config_path).map_err(|source| ConfigError::ConfigReadError {
            config_path: config_path.to_path_buf(),
            source,
        })?;

    let config: NavigatorConfig =
        toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
            config_path: config_path.to_path_buf(),
            source,
        })?;

    Ok(Some(config))
}

/// The configuration for `document`: an explicit path must exist; otherwise
/// a `cardmark.toml` beside the document is used if present, then defaults.
pub fn resolve(explicit: Option<&Path>, document: &Path) -> Result<NavigatorConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path)?.ok_or_else(|| ConfigError::ConfigReadError {
            config_path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }

    let beside = document
        .parent()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = load_from_path(&beside)?;
    if config.is_some() {
        log::info!("using config {}", beside.display());
    }
    Ok(config.unwrap_or_default())
}

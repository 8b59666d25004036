use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::storage::StorageKind;
use crate::{Error, Result};

/// Environment variable selecting the storage backend
pub const STORAGE_ENV: &str = "AIM_STORAGE_TYPE";

/// Default text-format file when nothing is configured
pub const DEFAULT_MEMORY_PATH: &str = "memory.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AimConfig {
    pub memory_path: Option<String>,
    pub storage: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub memory_path: PathBuf,
    pub storage: StorageKind,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("aim-memory.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<AimConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AimConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &AimConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Combine every configuration source.
///
/// Precedence per setting: command line, then environment, then config
/// file, then built-in default.
pub fn resolve(
    cli_path: Option<&Path>,
    cli_storage: Option<&str>,
    env_storage: Option<&str>,
    file: Option<&AimConfig>,
) -> Settings {
    let memory_path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| file.and_then(|c| c.memory_path.as_ref()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MEMORY_PATH));

    let storage = cli_storage
        .or(env_storage)
        .or_else(|| file.and_then(|c| c.storage.as_deref()))
        .map(StorageKind::from_setting)
        .unwrap_or_default();

    Settings { memory_path, storage }
}

/// Read the storage setting from the process environment
pub fn storage_from_env() -> Option<String> {
    std::env::var(STORAGE_ENV).ok()
}

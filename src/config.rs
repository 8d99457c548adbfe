use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::safe_io::atomic_write;

/// Environment variable that relocates the agentctl state directory.
pub const APP_HOME_ENV: &str = "AGENTCTL_HOME";

/// User home directory.
pub fn home_dir() -> Result<PathBuf, AppError> {
    dirs::home_dir().ok_or_else(|| AppError::Config("cannot resolve the user home directory".into()))
}

/// agentctl state directory: `$AGENTCTL_HOME`, else `~/.agentctl`.
pub fn get_app_config_dir() -> Result<PathBuf, AppError> {
    if let Some(custom) = std::env::var_os(APP_HOME_ENV) {
        let custom = PathBuf::from(custom);
        if !custom.as_os_str().is_empty() {
            return Ok(custom);
        }
    }
    Ok(home_dir()?.join(".agentctl"))
}

/// Settings file inside the state directory.
pub fn settings_path_in(app_dir: &Path) -> PathBuf {
    app_dir.join("settings.json")
}

/// Ownership ledger for targets that cannot carry inline markers.
pub fn ledger_path_in(app_dir: &Path) -> PathBuf {
    app_dir.join("ledger.json")
}

/// Claude keeps its MCP file beside the config directory: `~/.claude` -> `~/.claude.json`.
/// With an overridden directory the same sibling rule applies.
pub fn derive_mcp_path_from_override(dir: &Path) -> Option<PathBuf> {
    let file_name = dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())?
        .trim()
        .to_string();
    if file_name.is_empty() {
        return None;
    }
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    Some(parent.join(format!("{file_name}.json")))
}

/// Read and deserialize a JSON file.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    if !path.exists() {
        return Err(AppError::Config(format!("file not found: {}", path.display())));
    }

    let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;

    serde_json::from_str(&content).map_err(|e| AppError::json(path, e))
}

/// Pretty-print `data` and write it atomically.
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), AppError> {
    let mut json =
        serde_json::to_string_pretty(data).map_err(|e| AppError::JsonSerialize { source: e })?;
    json.push('\n');
    atomic_write(path, json.as_bytes(), None)
}

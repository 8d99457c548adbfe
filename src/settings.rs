use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{settings_path_in, write_json_file};
use crate::error::AppError;

pub const DEFAULT_BACKUP_RETAIN: usize = 5;

/// How a write cycle acquires the per-target lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LockMode {
    /// Block until the other writer is done.
    #[default]
    Wait,
    /// Give up on that target immediately.
    FailFast,
}

/// agentctl settings (`<app dir>/settings.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_backup_retain")]
    pub backup_retain: usize,
    #[serde(default)]
    pub lock_mode: LockMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_config_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex_config_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_config_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_config_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windsurf_config_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opencode_config_dir: Option<String>,
}

fn default_backup_retain() -> usize {
    DEFAULT_BACKUP_RETAIN
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            backup_retain: DEFAULT_BACKUP_RETAIN,
            lock_mode: LockMode::Wait,
            claude_config_dir: None,
            codex_config_dir: None,
            gemini_config_dir: None,
            cursor_config_dir: None,
            windsurf_config_dir: None,
            opencode_config_dir: None,
        }
    }
}

fn normalize_dir(value: &mut Option<String>) {
    *value = value
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
}

impl AppSettings {
    fn normalize_paths(&mut self) {
        normalize_dir(&mut self.claude_config_dir);
        normalize_dir(&mut self.codex_config_dir);
        normalize_dir(&mut self.gemini_config_dir);
        normalize_dir(&mut self.cursor_config_dir);
        normalize_dir(&mut self.windsurf_config_dir);
        normalize_dir(&mut self.opencode_config_dir);
    }

    /// Directory override for a tool, by adapter name.
    pub fn config_dir_override(&self, tool: &str) -> Option<PathBuf> {
        let raw = match tool {
            "claude" => self.claude_config_dir.as_ref(),
            "codex" => self.codex_config_dir.as_ref(),
            "gemini" => self.gemini_config_dir.as_ref(),
            "cursor" => self.cursor_config_dir.as_ref(),
            "windsurf" => self.windsurf_config_dir.as_ref(),
            "opencode" => self.opencode_config_dir.as_ref(),
            _ => None,
        }?;
        Some(PathBuf::from(raw))
    }

    /// Load settings from the state directory. A missing file yields the
    /// defaults; an unreadable one is logged and also yields the defaults.
    pub fn load(app_dir: &Path) -> Self {
        let path = settings_path_in(app_dir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<AppSettings>(&content) {
            Ok(mut settings) => {
                settings.normalize_paths();
                settings
            }
            Err(err) => {
                log::warn!(
                    "failed to parse settings, falling back to defaults. path: {}, error: {}",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, app_dir: &Path) -> Result<(), AppError> {
        let mut normalized = self.clone();
        normalized.normalize_paths();
        write_json_file(&settings_path_in(app_dir), &normalized)
    }
}

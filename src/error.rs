use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    IoContext {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize JSON: {source}")]
    JsonSerialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse TOML {}: {reason}", path.display())]
    Toml { path: PathBuf, reason: String },
    #[error("invalid MCP server: {0}")]
    McpValidation(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid resource name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("refusing to overwrite malformed document {}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },
    #[error("lock on {} is held by another process", path.display())]
    LockContended { path: PathBuf },
    #[error("no backup found for {}", path.display())]
    BackupNotFound { path: PathBuf },
    #[error("ownership ledger: {reason}")]
    Ledger { reason: String },
    #[error("unknown adapter '{0}'")]
    UnknownAdapter(String),
    #[error("adapter '{0}' is already registered")]
    DuplicateAdapter(String),
    #[error("{0}")]
    Message(String),
}

impl AppError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn toml(path: impl AsRef<Path>, reason: impl std::fmt::Display) -> Self {
        Self::Toml {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(path: impl AsRef<Path>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedDocument {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

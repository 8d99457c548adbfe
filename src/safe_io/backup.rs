use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::AppError;

use super::atomic::atomic_write;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%6f";

const TIMESTAMP_PATTERN: &str = r"^\d{8}-\d{6}-\d{6}(-\d+)?$";

fn timestamp_re() -> Result<Regex, AppError> {
    Regex::new(TIMESTAMP_PATTERN)
        .map_err(|e| AppError::Config(format!("invalid backup timestamp pattern: {e}")))
}

/// Single-slot backup name: `<original>.bak`.
pub fn simple_backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

struct BackupName {
    base: String,
    ext: Option<String>,
}

impl BackupName {
    fn for_target(path: &Path) -> Result<Self, AppError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| AppError::Config(format!("invalid file name: {}", path.display())))?
            .to_string_lossy()
            .to_string();
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string());
        let ext = path.extension().map(|s| s.to_string_lossy().to_string());
        Ok(match (stem, ext) {
            (Some(base), Some(ext)) => Self {
                base,
                ext: Some(ext),
            },
            _ => Self {
                base: file_name,
                ext: None,
            },
        })
    }

    fn render(&self, stamp: &str) -> String {
        match &self.ext {
            Some(ext) => format!("{}.bak.{stamp}.{ext}", self.base),
            None => format!("{}.bak.{stamp}", self.base),
        }
    }

    /// Returns the timestamp part when `file_name` is one of our rotating backups.
    fn parse<'a>(&self, stamp_re: &Regex, file_name: &'a str) -> Option<&'a str> {
        let rest = file_name.strip_prefix(&self.base)?.strip_prefix(".bak.")?;
        let stamp = match &self.ext {
            Some(ext) => rest.strip_suffix(ext.as_str())?.strip_suffix('.')?,
            None => rest,
        };
        stamp_re.is_match(stamp).then_some(stamp)
    }
}

/// Copy the current bytes of `path` to a timestamped sibling
/// (`<base>.bak.<timestamp>.<ext>`). A missing source is not an error.
pub fn create_backup(path: &Path) -> Result<Option<PathBuf>, AppError> {
    if !path.exists() {
        return Ok(None);
    }
    let name = BackupName::for_target(path)?;
    let dir = parent_dir(path);
    let stamp = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();

    let mut backup_path = dir.join(name.render(&stamp));
    let mut seq = 1u32;
    while backup_path.exists() {
        backup_path = dir.join(name.render(&format!("{stamp}-{seq}")));
        seq += 1;
    }

    fs::copy(path, &backup_path).map_err(|e| AppError::IoContext {
        context: format!(
            "failed to back up {} -> {}",
            path.display(),
            backup_path.display()
        ),
        source: e,
    })?;
    log::debug!("backed up {} to {}", path.display(), backup_path.display());
    Ok(Some(backup_path))
}

/// Copy the current bytes of `path` to `<path>.bak`, replacing the previous slot.
pub fn create_simple_backup(path: &Path) -> Result<Option<PathBuf>, AppError> {
    if !path.exists() {
        return Ok(None);
    }
    let backup_path = simple_backup_path(path);
    fs::copy(path, &backup_path).map_err(|e| AppError::IoContext {
        context: format!(
            "failed to back up {} -> {}",
            path.display(),
            backup_path.display()
        ),
        source: e,
    })?;
    Ok(Some(backup_path))
}

/// Timestamped backups of `path`, oldest first.
pub fn list_backups(path: &Path) -> Result<Vec<PathBuf>, AppError> {
    let name = BackupName::for_target(path)?;
    let stamp_re = timestamp_re()?;
    let dir = parent_dir(path);
    let entries = match fs::read_dir(&dir) {
        Ok(iter) => iter,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AppError::io(&dir, e)),
    };

    let mut found: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_string_lossy().to_string();
            name.parse(&stamp_re, &file_name)
                .map(|stamp| (stamp.to_string(), entry.path()))
        })
        .collect();
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// Delete all but the newest `keep` timestamped backups. Returns how many were removed.
pub fn rotate_backups(path: &Path, keep: usize) -> Result<usize, AppError> {
    let backups = list_backups(path)?;
    if backups.len() <= keep {
        return Ok(0);
    }
    let remove_count = backups.len() - keep;
    for old in backups.iter().take(remove_count) {
        fs::remove_file(old).map_err(|e| AppError::io(old, e))?;
    }
    Ok(remove_count)
}

/// Most recent backup of `path`: the single-slot `.bak` when present,
/// otherwise the newest timestamped one.
pub fn latest_backup(path: &Path) -> Result<Option<PathBuf>, AppError> {
    let simple = simple_backup_path(path);
    if simple.is_file() {
        return Ok(Some(simple));
    }
    Ok(list_backups(path)?.pop())
}

/// Copy the most recent backup back over `path`. Returns the backup used.
pub fn restore_latest(path: &Path) -> Result<PathBuf, AppError> {
    let backup = latest_backup(path)?.ok_or_else(|| AppError::BackupNotFound {
        path: path.to_path_buf(),
    })?;
    let bytes = fs::read(&backup).map_err(|e| AppError::io(&backup, e))?;
    atomic_write(path, &bytes, None)?;
    log::info!("restored {} from {}", path.display(), backup.display());
    Ok(backup)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// ============================================================================
// Safe file I/O - atomic writes, advisory locks, backup rotation
// ============================================================================

mod atomic;
mod backup;
mod lock;

use std::path::Path;

use crate::error::AppError;

pub use atomic::{atomic_write, stage_write, StagedWrite, DEFAULT_FILE_MODE};
pub use backup::{
    create_backup, create_simple_backup, latest_backup, list_backups, restore_latest,
    rotate_backups, simple_backup_path,
};
pub use lock::{lock, lock_path_for, try_lock, FileLock};

/// Backup, atomic write, then rotate, in that order.
///
/// A rotation failure after the write has landed is logged and swallowed;
/// the new content stays in place.
pub fn safe_write(path: &Path, data: &[u8], perm: Option<u32>, keep: usize) -> Result<(), AppError> {
    create_backup(path)?;
    atomic_write(path, data, perm)?;
    if let Err(err) = rotate_backups(path, keep) {
        log::warn!("backup rotation failed for {}: {err}", path.display());
    }
    Ok(())
}

/// [`safe_write`] wrapped in a blocking lock on `path`.
pub fn safe_write_with_lock(
    path: &Path,
    data: &[u8],
    perm: Option<u32>,
    keep: usize,
) -> Result<(), AppError> {
    let mut guard = lock(path)?;
    let result = safe_write(path, data, perm, keep);
    guard.unlock()?;
    result
}

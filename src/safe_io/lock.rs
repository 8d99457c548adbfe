use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::AppError;

/// Sidecar lock path for a target: `<target>.lock`.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive advisory lock keyed by a target path.
///
/// Backed by `flock` on Unix and `LockFileEx` on Windows, so two processes
/// (or two handles in one process) serialize on the same target. The lock is
/// released on [`FileLock::unlock`] or on drop.
pub struct FileLock {
    file: File,
    path: PathBuf,
    held: bool,
}

impl FileLock {
    /// Open (creating if needed) the sidecar lock file for `target`.
    pub fn open(target: &Path) -> Result<Self, AppError> {
        let path = lock_path_for(target);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| AppError::io(&path, e))?;
        Ok(Self {
            file,
            path,
            held: false,
        })
    }

    /// Block until the lock is ours.
    pub fn lock(&mut self) -> Result<(), AppError> {
        if self.held {
            return Ok(());
        }
        self.file.lock_exclusive().map_err(|e| AppError::IoContext {
            context: format!("failed to acquire lock {}", self.path.display()),
            source: e,
        })?;
        self.held = true;
        Ok(())
    }

    /// Try once; `Ok(false)` means another holder has it.
    pub fn try_lock(&mut self) -> Result<bool, AppError> {
        if self.held {
            return Ok(true);
        }
        match self.file.try_lock_exclusive() {
            Ok(()) => {
                self.held = true;
                Ok(true)
            }
            Err(e) if is_contended(&e) => Ok(false),
            Err(e) => Err(AppError::IoContext {
                context: format!("failed to try lock {}", self.path.display()),
                source: e,
            }),
        }
    }

    /// Release the lock. Calling it on an unlocked handle does nothing.
    pub fn unlock(&mut self) -> Result<(), AppError> {
        if !self.held {
            return Ok(());
        }
        FileExt::unlock(&self.file).map_err(|e| AppError::IoContext {
            context: format!("failed to release lock {}", self.path.display()),
            source: e,
        })?;
        self.held = false;
        Ok(())
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if self.held {
            let _ = FileExt::unlock(&self.file);
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Acquire a blocking lock on `target` and return the held guard.
pub fn lock(target: &Path) -> Result<FileLock, AppError> {
    let mut guard = FileLock::open(target)?;
    guard.lock()?;
    Ok(guard)
}

/// Non-blocking variant: `Ok(None)` when the lock is held elsewhere.
pub fn try_lock(target: &Path) -> Result<Option<FileLock>, AppError> {
    let mut guard = FileLock::open(target)?;
    if guard.try_lock()? {
        Ok(Some(guard))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sidecar_name_appends_lock_suffix() {
        assert_eq!(
            lock_path_for(Path::new("/home/u/.claude.json")),
            PathBuf::from("/home/u/.claude.json.lock")
        );
    }

    #[test]
    fn try_lock_reports_contention_as_false() {
        let dir = TempDir::new().expect("tempdir");
        let target = dir.path().join("mcp.json");

        let first = lock(&target).expect("first lock");
        assert!(first.is_held());

        let mut second = FileLock::open(&target).expect("open second handle");
        assert!(!second.try_lock().expect("try lock should not error"));
        assert!(try_lock(&target).expect("try lock").is_none());

        drop(first);
        assert!(second.try_lock().expect("try lock after release"));
    }

    #[test]
    fn unlock_is_idempotent() {
        let dir = TempDir::new().expect("tempdir");
        let target = dir.path().join("settings.json");

        let mut guard = FileLock::open(&target).expect("open");
        guard.unlock().expect("unlock before lock is a no-op");
        guard.lock().expect("lock");
        guard.unlock().expect("unlock");
        guard.unlock().expect("second unlock is a no-op");
        assert!(!guard.is_held());
    }
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AppError;

/// Mode used for files that did not exist before the write.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// A fully written temp file waiting to be renamed over its target.
///
/// Dropping it without calling [`StagedWrite::commit`] removes the temp
/// file and leaves the target untouched.
pub struct StagedWrite {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temp file over the target.
    pub fn commit(self) -> Result<(), AppError> {
        let StagedWrite { tmp, target } = self;
        tmp.persist(&target).map_err(|e| AppError::IoContext {
            context: format!(
                "atomic replace failed: {} -> {}",
                e.file.path().display(),
                target.display()
            ),
            source: e.error,
        })?;
        Ok(())
    }
}

/// Write `data` into a temp file beside `path` without touching `path` itself.
///
/// The temp file has to live in the target's directory so the final rename
/// stays on one filesystem.
pub fn stage_write(path: &Path, data: &[u8], perm: Option<u32>) -> Result<StagedWrite, AppError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => return Err(AppError::Config(format!("invalid path: {}", path.display()))),
    };
    fs::create_dir_all(&parent).map_err(|e| AppError::io(&parent, e))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::Config(format!("invalid file name: {}", path.display())))?
        .to_string_lossy()
        .to_string();

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(&parent)
        .map_err(|e| AppError::io(&parent, e))?;

    tmp.write_all(data).map_err(|e| AppError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| AppError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| AppError::io(tmp.path(), e))?;

    apply_permissions(tmp.path(), path, perm)?;

    Ok(StagedWrite {
        tmp,
        target: path.to_path_buf(),
    })
}

/// Atomic write: temp file in the same directory, then rename over `path`.
///
/// `perm` is a Unix mode; `None` keeps the mode of the existing file (or
/// [`DEFAULT_FILE_MODE`] for a new one). Ignored on other platforms.
pub fn atomic_write(path: &Path, data: &[u8], perm: Option<u32>) -> Result<(), AppError> {
    stage_write(path, data, perm)?.commit()
}

#[cfg(unix)]
fn apply_permissions(tmp: &Path, target: &Path, perm: Option<u32>) -> Result<(), AppError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match perm {
        Some(mode) => mode,
        None => fs::metadata(target)
            .map(|meta| meta.permissions().mode() & 0o7777)
            .unwrap_or(DEFAULT_FILE_MODE),
    };
    fs::set_permissions(tmp, fs::Permissions::from_mode(mode)).map_err(|e| AppError::io(tmp, e))
}

#[cfg(not(unix))]
fn apply_permissions(_tmp: &Path, _target: &Path, _perm: Option<u32>) -> Result<(), AppError> {
    Ok(())
}

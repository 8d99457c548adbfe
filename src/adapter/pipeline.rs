//! The read-modify-write cycle every adapter goes through:
//! lock, load, strip prior ownership, insert, render, persist, record.

use std::fs;
use std::path::Path;

use super::{SyncContext, WriteReport};
use crate::document::instructions::{section_names, InstructionsFile};
use crate::document::ConfigDocument;
use crate::error::AppError;
use crate::ownership::{reconcile, EntryFormat, FileLayout, FileSet, ManagedTable, Ownership};
use crate::resource::ResourceKind;
use crate::safe_io::{self, FileLock};
use crate::settings::LockMode;

/// Which adapter/kind a write belongs to, where it goes and who owns what.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub adapter: &'a str,
    pub kind: ResourceKind,
    pub path: &'a Path,
    pub ownership: Ownership,
}

type SectionEntry<D> = <<D as ConfigDocument>::Section as ManagedTable>::Entry;

/// Write `entries` into the `key` section of a structured document.
pub(crate) fn write_section<D>(
    ctx: &SyncContext,
    target: Target<'_>,
    key: &str,
    entries: Vec<(String, SectionEntry<D>)>,
) -> Result<WriteReport, AppError>
where
    D: ConfigDocument,
    D::Section: ManagedTable,
{
    with_lock(ctx, target.path, || {
        let previous = previous_names(ctx, target)?;
        let original = read_existing(target.path)?;
        let mut doc = D::load(target.path)?;

        let had_section = doc.has_section(key);
        let (outcome, now_empty) = {
            let section = doc.section_mut(key)?;
            let outcome = reconcile(section, target.ownership, &previous, entries);
            let now_empty = section.entry_names().is_empty();
            (outcome, now_empty)
        };
        if now_empty && !had_section {
            doc.remove_section(key);
        }

        // Nothing owned before or now: leave the user's formatting alone.
        let changed = if outcome.inserted.is_empty() && outcome.removed.is_empty() {
            false
        } else {
            let rendered = doc.render()?;
            persist(ctx, target.path, original.as_deref(), &rendered, outcome.inserted.is_empty())?
        };
        record(ctx, target, &outcome.inserted)?;
        Ok(report(target, outcome.inserted.len(), outcome.removed.len(), changed))
    })
}

/// Write `entries` as one file (or directory) each under `root`.
///
/// No sibling backups here: the tool would load a backup as another entry.
pub(crate) fn write_file_set(
    ctx: &SyncContext,
    target: Target<'_>,
    layout: FileLayout,
    format: EntryFormat,
    entries: Vec<(String, String)>,
) -> Result<WriteReport, AppError> {
    with_lock(ctx, target.path, || {
        let previous = previous_names(ctx, target)?;
        let mut set = FileSet::load(target.path, layout, format)?;
        let incoming: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        set.check_claimed(target.ownership, &previous, &incoming)?;
        let outcome = reconcile(&mut set, target.ownership, &previous, entries);
        let changed = set.commit()?;
        if changed {
            log::info!(
                "{}: synced {} {} into {}",
                target.adapter,
                outcome.inserted.len(),
                target.kind.plural(),
                target.path.display()
            );
        }
        record(ctx, target, &outcome.inserted)?;
        Ok(report(target, outcome.inserted.len(), outcome.removed.len(), changed))
    })
}

/// Replace the managed block of a single instructions file.
pub(crate) fn write_block(
    ctx: &SyncContext,
    target: Target<'_>,
    block: Option<String>,
) -> Result<WriteReport, AppError> {
    with_lock(ctx, target.path, || {
        let original = read_existing(target.path)?;
        let mut file = InstructionsFile::parse(target.path, original.as_deref().unwrap_or(""))?;

        let before = file.managed().map(section_names).unwrap_or_default();
        let after = block.as_deref().map(section_names).unwrap_or_default();
        let removed = before.iter().filter(|name| !after.contains(name)).count();

        let had_block = file.managed().is_some();
        file.set_managed(block);
        let changed = if !had_block && file.managed().is_none() {
            false
        } else {
            let rendered = file.render();
            persist(ctx, target.path, original.as_deref(), &rendered, after.is_empty())?
        };
        Ok(report(target, after.len(), removed, changed))
    })
}

/// Every entry of a file set as `(name, content)`, in name order.
pub(crate) fn read_file_set(
    root: &Path,
    layout: FileLayout,
    format: EntryFormat,
) -> Result<Vec<(String, String)>, AppError> {
    let set = FileSet::load(root, layout, format)?;
    let mut out = Vec::new();
    for name in set.entry_names() {
        if let Some(content) = set.read(&name)? {
            out.push((name, content));
        }
    }
    Ok(out)
}

/// Managed block of an instructions file, if the file and block exist.
pub(crate) fn read_block(path: &Path) -> Result<Option<String>, AppError> {
    let Some(text) = read_existing(path)? else {
        return Ok(None);
    };
    let file = InstructionsFile::parse(path, &text)?;
    Ok(file.managed().map(str::to_string))
}

fn with_lock<T>(
    ctx: &SyncContext,
    path: &Path,
    body: impl FnOnce() -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut guard = acquire(ctx, path)?;
    let result = body();
    guard.unlock()?;
    result
}

fn acquire(ctx: &SyncContext, path: &Path) -> Result<FileLock, AppError> {
    match ctx.settings.lock_mode {
        LockMode::Wait => safe_io::lock(path),
        LockMode::FailFast => safe_io::try_lock(path)?.ok_or_else(|| AppError::LockContended {
            path: safe_io::lock_path_for(path),
        }),
    }
}

fn previous_names(ctx: &SyncContext, target: Target<'_>) -> Result<Vec<String>, AppError> {
    match target.ownership {
        Ownership::Ledger => ctx.ledger.owned(target.adapter, target.kind),
        Ownership::InlineMarker => Ok(Vec::new()),
    }
}

fn record(ctx: &SyncContext, target: Target<'_>, inserted: &[String]) -> Result<(), AppError> {
    if target.ownership == Ownership::Ledger {
        ctx.ledger.record(target.adapter, target.kind, inserted)?;
    }
    Ok(())
}

fn read_existing(path: &Path) -> Result<Option<String>, AppError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::io(path, e)),
    }
}

/// Write `rendered` unless it matches what is already on disk. An absent
/// target is not created just to hold nothing.
fn persist(
    ctx: &SyncContext,
    path: &Path,
    original: Option<&str>,
    rendered: &str,
    nothing_managed: bool,
) -> Result<bool, AppError> {
    if original == Some(rendered) {
        return Ok(false);
    }
    let absent = original.map_or(true, |text| text.trim().is_empty());
    if absent && nothing_managed {
        return Ok(false);
    }
    safe_io::safe_write(path, rendered.as_bytes(), None, ctx.settings.backup_retain)?;
    log::info!("updated {}", path.display());
    Ok(true)
}

fn report(target: Target<'_>, written: usize, removed: usize, changed: bool) -> WriteReport {
    WriteReport {
        target: target.path.to_path_buf(),
        written,
        removed,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::JsonDocument;
    use crate::ownership::{mark_json, Ledger};
    use crate::settings::AppSettings;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn ctx(dir: &Path) -> SyncContext {
        SyncContext::new(AppSettings::default(), Ledger::in_app_dir(&dir.join("state")))
    }

    fn entry(command: &str, marked: bool) -> Value {
        let mut obj = json!({"command": command}).as_object().cloned().unwrap_or_default();
        if marked {
            mark_json(&mut obj);
        }
        Value::Object(obj)
    }

    #[test]
    fn absent_target_with_nothing_to_write_is_not_created() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mcp.json");
        let target = Target {
            adapter: "test",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::InlineMarker,
        };
        let report =
            write_section::<JsonDocument>(&ctx(dir.path()), target, "mcpServers", Vec::new())
                .expect("write");
        assert!(!report.changed);
        assert!(!path.exists());
    }

    #[test]
    fn second_identical_write_is_a_no_op() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mcp.json");
        fs::write(&path, "{\"theme\": \"dark\"}").expect("seed");
        let ctx = ctx(dir.path());
        let target = Target {
            adapter: "test",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::InlineMarker,
        };

        let first = write_section::<JsonDocument>(
            &ctx,
            target,
            "mcpServers",
            vec![("x".into(), entry("echo", true))],
        )
        .expect("first");
        let bytes = fs::read(&path).expect("read");
        let second = write_section::<JsonDocument>(
            &ctx,
            target,
            "mcpServers",
            vec![("x".into(), entry("echo", true))],
        )
        .expect("second");

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(fs::read(&path).expect("read"), bytes);
        assert_eq!(safe_io::list_backups(&path).expect("backups").len(), 1);
    }

    #[test]
    fn nothing_managed_keeps_user_formatting() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mcp.json");
        let original = "{\"mcpServers\": {\"mine\": {\"command\": \"x\"}}}";
        fs::write(&path, original).expect("seed");
        let target = Target {
            adapter: "test",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::InlineMarker,
        };
        let report =
            write_section::<JsonDocument>(&ctx(dir.path()), target, "mcpServers", Vec::new())
                .expect("write");
        assert!(!report.changed);
        assert_eq!(fs::read_to_string(&path).expect("read"), original);
    }

    #[test]
    fn ledger_ownership_is_recorded_and_used() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("opencode.json");
        let ctx = ctx(dir.path());
        let target = Target {
            adapter: "strict",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::Ledger,
        };

        write_section::<JsonDocument>(
            &ctx,
            target,
            "mcp",
            vec![("a".into(), entry("a", false)), ("b".into(), entry("b", false))],
        )
        .expect("first");
        assert_eq!(
            ctx.ledger.owned("strict", ResourceKind::Server).expect("owned"),
            vec!["a", "b"]
        );

        let report = write_section::<JsonDocument>(
            &ctx,
            target,
            "mcp",
            vec![("a".into(), entry("a", false))],
        )
        .expect("second");
        assert_eq!(report.removed, 1);
        let root: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert!(root["mcp"].get("b").is_none());
    }

    #[test]
    fn fail_fast_reports_contention() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mcp.json");
        let mut ctx = ctx(dir.path());
        ctx.settings.lock_mode = LockMode::FailFast;
        let _held = safe_io::lock(&path).expect("hold lock");

        let target = Target {
            adapter: "test",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::InlineMarker,
        };
        let err = write_section::<JsonDocument>(&ctx, target, "mcpServers", Vec::new())
            .expect_err("contended");
        assert!(matches!(err, AppError::LockContended { .. }));
    }

    #[test]
    fn malformed_target_is_left_untouched() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mcp.json");
        fs::write(&path, "{ not json").expect("seed");
        let target = Target {
            adapter: "test",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::InlineMarker,
        };
        let err = write_section::<JsonDocument>(
            &ctx(dir.path()),
            target,
            "mcpServers",
            vec![("x".into(), entry("echo", true))],
        )
        .expect_err("malformed");
        assert!(matches!(err, AppError::MalformedDocument { .. }));
        assert_eq!(fs::read_to_string(&path).expect("read"), "{ not json");
    }
}

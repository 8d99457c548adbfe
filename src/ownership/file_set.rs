use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use super::{is_marked_frontmatter, ManagedTable, Ownership, MARKER_KEY, MARKER_VALUE};
use crate::document::frontmatter::MarkdownDoc;
use crate::error::AppError;
use crate::safe_io::atomic_write;

/// How resources map onto the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileLayout {
    /// `<root>/<name>.<ext>`
    Flat { ext: &'static str },
    /// `<root>/<name>/<file>`, e.g. `skills/<name>/SKILL.md`
    Nested { file: &'static str },
}

/// Where the inline marker lives inside one entry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFormat {
    Markdown,
    Toml,
}

/// A directory of per-resource files treated as one managed table.
///
/// Mutations are queued and applied by [`FileSet::commit`].
#[derive(Debug)]
pub struct FileSet {
    root: PathBuf,
    layout: FileLayout,
    format: EntryFormat,
    on_disk: BTreeSet<String>,
    present: BTreeSet<String>,
    pending_remove: Vec<String>,
    pending_write: IndexMap<String, String>,
}

impl FileSet {
    pub fn load(root: &Path, layout: FileLayout, format: EntryFormat) -> Result<Self, AppError> {
        let mut on_disk = BTreeSet::new();
        let entries = match fs::read_dir(root) {
            Ok(entries) => Some(entries),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(AppError::io(root, e)),
        };
        for entry in entries.into_iter().flatten() {
            let entry = entry.map_err(|e| AppError::io(root, e))?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.') {
                continue;
            }
            let name = match layout {
                FileLayout::Flat { ext } => {
                    let suffix = format!(".{ext}");
                    match file_name.strip_suffix(&suffix) {
                        Some(stem) if !stem.is_empty() && entry.path().is_file() => {
                            stem.to_string()
                        }
                        _ => continue,
                    }
                }
                FileLayout::Nested { file } => {
                    if !entry.path().join(file).is_file() {
                        continue;
                    }
                    file_name
                }
            };
            on_disk.insert(name);
        }

        Ok(Self {
            root: root.to_path_buf(),
            layout,
            format,
            present: on_disk.clone(),
            on_disk,
            pending_remove: Vec::new(),
            pending_write: IndexMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        match self.layout {
            FileLayout::Flat { ext } => self.root.join(format!("{name}.{ext}")),
            FileLayout::Nested { file } => self.root.join(name).join(file),
        }
    }

    /// Current content of an entry: the queued write if any, else the file.
    pub fn read(&self, name: &str) -> Result<Option<String>, AppError> {
        if let Some(content) = self.pending_write.get(name) {
            return Ok(Some(content.clone()));
        }
        if !self.present.contains(name) {
            return Ok(None);
        }
        let path = self.path_for(name);
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| AppError::io(&path, e))
    }

    /// Apply queued removals and writes. Returns whether anything on disk changed.
    pub fn commit(self) -> Result<bool, AppError> {
        let mut changed = false;

        for name in &self.pending_remove {
            if self.pending_write.contains_key(name) {
                continue;
            }
            match self.layout {
                FileLayout::Flat { .. } => {
                    let path = self.path_for(name);
                    fs::remove_file(&path).map_err(|e| AppError::io(&path, e))?;
                }
                FileLayout::Nested { .. } => {
                    let dir = self.root.join(name);
                    fs::remove_dir_all(&dir).map_err(|e| AppError::io(&dir, e))?;
                }
            }
            log::info!("removed {}", self.path_for(name).display());
            changed = true;
        }

        for (name, content) in &self.pending_write {
            let path = self.path_for(name);
            let unchanged = self.on_disk.contains(name)
                && fs::read(&path).map(|bytes| bytes == content.as_bytes()).unwrap_or(false);
            if unchanged {
                continue;
            }
            atomic_write(&path, content.as_bytes(), None)?;
            log::debug!("wrote {}", path.display());
            changed = true;
        }

        Ok(changed)
    }

    /// Fail with `MalformedDocument` if an entry this sync would replace or
    /// delete does not parse. An entry counts as claimed when an incoming
    /// resource has its name, when the ledger lists it, or (inline markers)
    /// when its text mentions the marker key. Unparsable entries nobody
    /// claims stay user-owned and untouched.
    pub fn check_claimed(
        &self,
        ownership: Ownership,
        previous: &[String],
        incoming: &[&str],
    ) -> Result<(), AppError> {
        for name in &self.on_disk {
            let path = self.path_for(name);
            let content = fs::read_to_string(&path).map_err(|e| AppError::io(&path, e))?;
            let claimed = incoming.contains(&name.as_str())
                || match ownership {
                    Ownership::Ledger => previous.contains(name),
                    Ownership::InlineMarker => content.contains(MARKER_KEY),
                };
            if !claimed {
                continue;
            }
            let parsed = match self.format {
                EntryFormat::Markdown => MarkdownDoc::parse(&content)
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                EntryFormat::Toml => content
                    .parse::<toml_edit::DocumentMut>()
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
            };
            if let Err(reason) = parsed {
                return Err(AppError::malformed(&path, reason));
            }
        }
        Ok(())
    }

    fn content_is_marked(&self, content: &str) -> bool {
        match self.format {
            EntryFormat::Markdown => MarkdownDoc::parse(content)
                .map(|doc| is_marked_frontmatter(&doc))
                .unwrap_or(false),
            EntryFormat::Toml => content
                .parse::<toml_edit::DocumentMut>()
                .ok()
                .and_then(|doc| doc.get(MARKER_KEY).and_then(|v| v.as_str()).map(str::to_string))
                .is_some_and(|v| v == MARKER_VALUE),
        }
    }
}

impl ManagedTable for FileSet {
    type Entry = String;

    fn entry_names(&self) -> Vec<String> {
        self.present.iter().cloned().collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.present.contains(name)
    }

    fn is_managed(&self, name: &str) -> bool {
        match self.read(name) {
            Ok(Some(content)) => self.content_is_marked(&content),
            Ok(None) => false,
            Err(err) => {
                log::warn!("treating unreadable entry '{name}' as user-owned: {err}");
                false
            }
        }
    }

    fn remove_entry(&mut self, name: &str) -> bool {
        if !self.present.remove(name) {
            return false;
        }
        self.pending_write.shift_remove(name);
        if self.on_disk.contains(name) {
            self.pending_remove.push(name.to_string());
        }
        true
    }

    fn insert_entry(&mut self, name: &str, entry: String) {
        self.present.insert(name.to_string());
        self.pending_write.insert(name.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::{reconcile, Ownership};
    use tempfile::TempDir;

    const MANAGED: &str = "---\n_agentctl: managed\n---\n\nmanaged body\n";

    #[test]
    fn lists_only_matching_files() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("review.md"), "x").expect("seed");
        fs::write(dir.path().join("notes.txt"), "x").expect("seed");
        fs::write(dir.path().join(".review.md.123.tmp"), "x").expect("seed");
        fs::write(dir.path().join("review.md.lock"), "").expect("seed");

        let set = FileSet::load(dir.path(), FileLayout::Flat { ext: "md" }, EntryFormat::Markdown)
            .expect("load");
        assert_eq!(set.entry_names(), vec!["review"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let set = FileSet::load(
            &dir.path().join("nope"),
            FileLayout::Nested { file: "SKILL.md" },
            EntryFormat::Markdown,
        )
        .expect("load");
        assert!(set.entry_names().is_empty());
    }

    #[test]
    fn reconcile_removes_managed_files_and_keeps_user_files() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("old.md"), MANAGED).expect("seed");
        fs::write(dir.path().join("mine.md"), "my own command\n").expect("seed");

        let mut set =
            FileSet::load(dir.path(), FileLayout::Flat { ext: "md" }, EntryFormat::Markdown)
                .expect("load");
        let result = reconcile(
            &mut set,
            Ownership::InlineMarker,
            &[],
            vec![("new".into(), MANAGED.to_string())],
        );
        assert_eq!(result.removed, vec!["old"]);
        assert!(set.commit().expect("commit"));

        assert!(!dir.path().join("old.md").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("mine.md")).expect("read"),
            "my own command\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("new.md")).expect("read"),
            MANAGED
        );
    }

    #[test]
    fn identical_rewrite_is_not_a_change() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("same.md"), MANAGED).expect("seed");
        let mut set =
            FileSet::load(dir.path(), FileLayout::Flat { ext: "md" }, EntryFormat::Markdown)
                .expect("load");
        reconcile(
            &mut set,
            Ownership::InlineMarker,
            &[],
            vec![("same".into(), MANAGED.to_string())],
        );
        assert!(!set.commit().expect("commit"));
        assert!(dir.path().join("same.md").exists());
    }

    #[test]
    fn nested_layout_removes_whole_directory() {
        let dir = TempDir::new().expect("tempdir");
        let skill = dir.path().join("lint");
        fs::create_dir_all(&skill).expect("mkdir");
        fs::write(skill.join("SKILL.md"), MANAGED).expect("seed");
        fs::write(skill.join("helper.py"), "print()").expect("seed");

        let mut set = FileSet::load(
            dir.path(),
            FileLayout::Nested { file: "SKILL.md" },
            EntryFormat::Markdown,
        )
        .expect("load");
        reconcile(&mut set, Ownership::InlineMarker, &[], Vec::new());
        assert!(set.commit().expect("commit"));
        assert!(!skill.exists());
    }

    #[test]
    fn unparsable_claimed_entry_is_malformed() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("old.md"),
            "---\n_agentctl: managed\ndescription: [oops\n---\nbody\n",
        )
        .expect("seed");
        fs::write(dir.path().join("mine.md"), "---\ntitle: [broken\n---\nmine\n").expect("seed");
        let set = FileSet::load(dir.path(), FileLayout::Flat { ext: "md" }, EntryFormat::Markdown)
            .expect("load");

        let err = set
            .check_claimed(Ownership::InlineMarker, &[], &[])
            .expect_err("marked entry is broken");
        assert!(matches!(
            err,
            AppError::MalformedDocument { ref path, .. } if path.ends_with("old.md")
        ));

        // Without the marker, a broken file is only claimed by name.
        fs::remove_file(dir.path().join("old.md")).expect("remove");
        let set = FileSet::load(dir.path(), FileLayout::Flat { ext: "md" }, EntryFormat::Markdown)
            .expect("load");
        assert!(set.check_claimed(Ownership::InlineMarker, &[], &["other"]).is_ok());
        assert!(set.check_claimed(Ownership::InlineMarker, &[], &["mine"]).is_err());
        assert!(set
            .check_claimed(Ownership::Ledger, &["mine".to_string()], &[])
            .is_err());
    }

    #[test]
    fn toml_marker_is_detected() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("a.toml"), "_agentctl = \"managed\"\nprompt = \"x\"\n")
            .expect("seed");
        fs::write(dir.path().join("b.toml"), "prompt = \"y\"\n").expect("seed");
        let set = FileSet::load(dir.path(), FileLayout::Flat { ext: "toml" }, EntryFormat::Toml)
            .expect("load");
        assert!(set.is_managed("a"));
        assert!(!set.is_managed("b"));
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ledger_path_in, write_json_file};
use crate::error::AppError;
use crate::resource::ResourceKind;
use crate::safe_io::lock;

pub const LEDGER_VERSION: u32 = 1;

fn default_version() -> u32 {
    LEDGER_VERSION
}

/// On-disk shape:
///
/// ```json
/// { "version": 1, "adapters": { "codex": { "servers": ["fs", "git"] } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct LedgerData {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    adapters: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// Side file recording which names agentctl owns in targets that cannot
/// carry an inline marker.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_app_dir(app_dir: &Path) -> Self {
        Self::new(ledger_path_in(app_dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names recorded for `adapter`/`kind` by the last successful write.
    pub fn owned(&self, adapter: &str, kind: ResourceKind) -> Result<Vec<String>, AppError> {
        let data = self.read()?;
        Ok(data
            .adapters
            .get(adapter)
            .and_then(|kinds| kinds.get(kind.plural()))
            .cloned()
            .unwrap_or_default())
    }

    /// Replace the recorded names for `adapter`/`kind`.
    pub fn record(
        &self,
        adapter: &str,
        kind: ResourceKind,
        names: &[String],
    ) -> Result<(), AppError> {
        let mut guard = lock(&self.path)?;
        let result = self.record_locked(adapter, kind, names);
        guard.unlock()?;
        result
    }

    fn record_locked(
        &self,
        adapter: &str,
        kind: ResourceKind,
        names: &[String],
    ) -> Result<(), AppError> {
        let mut data = self.read()?;
        let before = data.clone();
        data.version = LEDGER_VERSION;

        let kinds = data.adapters.entry(adapter.to_string()).or_default();
        if names.is_empty() {
            kinds.remove(kind.plural());
        } else {
            kinds.insert(kind.plural().to_string(), names.to_vec());
        }
        if kinds.is_empty() {
            data.adapters.remove(adapter);
        }

        if data == before && self.path.exists() {
            return Ok(());
        }
        if data.adapters.is_empty() && !self.path.exists() {
            return Ok(());
        }
        write_json_file(&self.path, &data)?;
        log::debug!(
            "ledger updated: {adapter}/{} = {:?}",
            kind.plural(),
            names
        );
        Ok(())
    }

    fn read(&self) -> Result<LedgerData, AppError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LedgerData::default_current())
            }
            Err(e) => return Err(AppError::io(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(LedgerData::default_current());
        }
        let data: LedgerData = serde_json::from_str(&text).map_err(|e| AppError::Ledger {
            reason: format!("cannot parse {}: {e}", self.path.display()),
        })?;
        if data.version > LEDGER_VERSION {
            return Err(AppError::Ledger {
                reason: format!(
                    "{} has version {}, newest supported is {LEDGER_VERSION}",
                    self.path.display(),
                    data.version
                ),
            });
        }
        Ok(data)
    }
}

impl LedgerData {
    fn default_current() -> Self {
        Self {
            version: LEDGER_VERSION,
            adapters: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_ledger_owns_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = Ledger::in_app_dir(dir.path());
        assert!(ledger.owned("codex", ResourceKind::Server).expect("owned").is_empty());
    }

    #[test]
    fn record_then_read_per_adapter_and_kind() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = Ledger::in_app_dir(dir.path());
        ledger
            .record("codex", ResourceKind::Server, &names(&["fs", "git"]))
            .expect("record");
        ledger
            .record("gemini", ResourceKind::Command, &names(&["review"]))
            .expect("record");

        assert_eq!(
            ledger.owned("codex", ResourceKind::Server).expect("owned"),
            names(&["fs", "git"])
        );
        assert!(ledger.owned("codex", ResourceKind::Command).expect("owned").is_empty());

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(ledger.path()).expect("read")).expect("json");
        assert_eq!(raw["version"], serde_json::json!(1));
        assert_eq!(raw["adapters"]["gemini"]["commands"], serde_json::json!(["review"]));
    }

    #[test]
    fn recording_empty_list_drops_the_entry() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = Ledger::in_app_dir(dir.path());
        ledger
            .record("opencode", ResourceKind::Server, &names(&["a"]))
            .expect("record");
        ledger
            .record("opencode", ResourceKind::Server, &[])
            .expect("record");
        let raw = fs::read_to_string(ledger.path()).expect("read");
        assert!(!raw.contains("opencode"));
    }

    #[test]
    fn newer_version_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = Ledger::in_app_dir(dir.path());
        fs::write(ledger.path(), r#"{"version": 9, "adapters": {}}"#).expect("seed");
        assert!(matches!(
            ledger.owned("codex", ResourceKind::Server),
            Err(AppError::Ledger { .. })
        ));
    }

    #[test]
    fn corrupt_ledger_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = Ledger::in_app_dir(dir.path());
        fs::write(ledger.path(), "{oops").expect("seed");
        assert!(ledger.owned("codex", ResourceKind::Server).is_err());
    }
}

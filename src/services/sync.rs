use serde::Serialize;
use std::path::PathBuf;

use crate::adapter::{filter_transports, Adapter, AdapterRegistry, SyncContext, WriteReport};
use crate::error::AppError;
use crate::resource::{validate_names, ResourceKind, ResourceSet};

/// Result of one (adapter, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindOutcome {
    pub kind: ResourceKind,
    pub target: Option<PathBuf>,
    pub written: usize,
    pub removed: usize,
    /// Servers left out because the tool cannot use their transport.
    pub filtered: usize,
    pub changed: bool,
    pub error: Option<String>,
}

impl KindOutcome {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            target: None,
            written: 0,
            removed: 0,
            filtered: 0,
            changed: false,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterOutcome {
    pub adapter: String,
    /// Tool not installed; nothing was touched.
    pub skipped: bool,
    pub kinds: Vec<KindOutcome>,
}

impl AdapterOutcome {
    pub fn kind(&self, kind: ResourceKind) -> Option<&KindOutcome> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    pub fn has_errors(&self) -> bool {
        self.kinds.iter().any(|k| !k.is_ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub adapters: Vec<AdapterOutcome>,
}

impl SyncReport {
    pub fn adapter(&self, name: &str) -> Option<&AdapterOutcome> {
        self.adapters.iter().find(|a| a.adapter == name)
    }

    /// `(adapter, kind, message)` for every failed pair.
    pub fn failures(&self) -> Vec<(&str, ResourceKind, &str)> {
        self.adapters
            .iter()
            .flat_map(|a| {
                a.kinds.iter().filter_map(move |k| {
                    k.error
                        .as_deref()
                        .map(|msg| (a.adapter.as_str(), k.kind, msg))
                })
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.adapters.iter().all(|a| !a.has_errors())
    }
}

/// Projects a canonical set onto every detected tool.
///
/// Adapters run one after another, and kinds within an adapter likewise. A
/// failing pair is recorded in its own outcome and the run moves on.
pub struct SyncService<'a> {
    registry: &'a AdapterRegistry,
    ctx: SyncContext,
}

impl<'a> SyncService<'a> {
    pub fn new(registry: &'a AdapterRegistry, ctx: SyncContext) -> Self {
        Self { registry, ctx }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn sync(&self, set: &ResourceSet) -> SyncReport {
        let adapters = self
            .registry
            .all()
            .map(|adapter| self.run_adapter(adapter, set))
            .collect();
        let report = SyncReport { adapters };
        let failures = report.failures();
        if failures.is_empty() {
            log::info!("sync finished for {} adapters", report.adapters.len());
        } else {
            log::warn!("sync finished with {} failed targets", failures.len());
        }
        report
    }

    pub fn sync_adapter(&self, name: &str, set: &ResourceSet) -> Result<AdapterOutcome, AppError> {
        let adapter = self.registry.get(name)?;
        Ok(self.run_adapter(adapter, set))
    }

    /// Read every supported kind back from one tool.
    pub fn import(&self, name: &str) -> Result<ResourceSet, AppError> {
        let adapter = self.registry.get(name)?;
        let caps = adapter.capabilities();
        let mut set = ResourceSet::default();
        if caps.supports(ResourceKind::Server) {
            set.servers = adapter.read_servers()?;
        }
        if caps.supports(ResourceKind::Command) {
            set.commands = adapter.read_commands()?;
        }
        if caps.supports(ResourceKind::Rule) {
            set.rules = adapter.read_rules()?;
        }
        if caps.supports(ResourceKind::Skill) {
            set.skills = adapter.read_skills()?;
        }
        log::info!(
            "imported from {}: {} servers, {} commands, {} rules, {} skills",
            adapter.display_name(),
            set.servers.len(),
            set.commands.len(),
            set.rules.len(),
            set.skills.len()
        );
        Ok(set)
    }

    fn run_adapter(&self, adapter: &dyn Adapter, set: &ResourceSet) -> AdapterOutcome {
        let name = adapter.name();
        if !adapter.detect() {
            log::debug!("{} not detected, skipping", adapter.display_name());
            return AdapterOutcome {
                adapter: name.to_string(),
                skipped: true,
                kinds: Vec::new(),
            };
        }

        let caps = adapter.capabilities();
        let kinds = ResourceKind::ALL
            .into_iter()
            .filter(|kind| caps.supports(*kind))
            .map(|kind| self.run_kind(adapter, kind, set))
            .collect();
        AdapterOutcome {
            adapter: name.to_string(),
            skipped: false,
            kinds,
        }
    }

    fn run_kind(&self, adapter: &dyn Adapter, kind: ResourceKind, set: &ResourceSet) -> KindOutcome {
        let mut outcome = KindOutcome::new(kind);
        let result = validate_names(set.effective_names(kind)).and_then(|_| match kind {
            ResourceKind::Server => {
                let (kept, filtered) = filter_transports(&set.servers, adapter.capabilities());
                if filtered > 0 {
                    log::info!(
                        "{}: {filtered} remote servers left out, tool supports stdio only",
                        adapter.name()
                    );
                }
                outcome.filtered = filtered;
                adapter.write_servers(&self.ctx, &kept)
            }
            ResourceKind::Command => adapter.write_commands(&self.ctx, &set.commands),
            ResourceKind::Rule => adapter.write_rules(&self.ctx, &set.rules),
            ResourceKind::Skill => adapter.write_skills(&self.ctx, &set.skills),
        });

        match result {
            Ok(WriteReport {
                target,
                written,
                removed,
                changed,
            }) => {
                outcome.target = Some(target);
                outcome.written = written;
                outcome.removed = removed;
                outcome.changed = changed;
            }
            Err(err) => {
                log::error!("{} {} sync failed: {err}", adapter.name(), kind.plural());
                outcome.error = Some(err.to_string());
            }
        }
        outcome
    }
}

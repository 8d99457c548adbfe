//! Per-tool adapters and the registry the orchestrator queries.
//!
//! An adapter knows one tool's file locations and dialect. The write path
//! shared by every adapter lives in `pipeline`; the per-tool files only
//! build entries and parse them back.

mod claude;
mod codex;
mod cursor;
mod gemini;
mod markdown;
mod opencode;
mod pipeline;
mod registry;
mod servers;
mod windsurf;

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::ownership::Ledger;
use crate::resource::{Command, ResourceKind, Rule, Server, Skill};
use crate::settings::AppSettings;

pub use claude::ClaudeAdapter;
pub use codex::{CodexAdapter, CodexServerFormat};
pub use cursor::CursorAdapter;
pub use gemini::GeminiAdapter;
pub use opencode::OpenCodeAdapter;
pub use registry::AdapterRegistry;
pub use windsurf::WindsurfAdapter;

/// Resource kinds an adapter handles, and whether it accepts remote servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub kinds: &'static [ResourceKind],
    pub remote_servers: bool,
}

impl Capabilities {
    pub fn supports(&self, kind: ResourceKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Outcome of one write cycle against one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReport {
    pub target: PathBuf,
    pub written: usize,
    pub removed: usize,
    pub changed: bool,
}

impl WriteReport {
    pub fn unchanged(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            written: 0,
            removed: 0,
            changed: false,
        }
    }
}

/// Per-run state handed to every write: settings plus the ownership ledger.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub settings: AppSettings,
    pub ledger: Ledger,
}

impl SyncContext {
    pub fn new(settings: AppSettings, ledger: Ledger) -> Self {
        Self { settings, ledger }
    }

    /// Settings and ledger from the agentctl state directory.
    pub fn from_app_dir(app_dir: &Path) -> Self {
        Self::new(AppSettings::load(app_dir), Ledger::in_app_dir(app_dir))
    }
}

/// One target tool.
///
/// Kinds outside [`Adapter::capabilities`] keep the default bodies, which
/// read nothing and write nothing.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    /// Whether the tool is installed for this user.
    fn detect(&self) -> bool;

    /// Primary config artifact (the server file).
    fn config_path(&self) -> PathBuf;

    fn capabilities(&self) -> Capabilities;

    fn read_servers(&self) -> Result<Vec<Server>, AppError> {
        Ok(Vec::new())
    }

    fn write_servers(&self, _ctx: &SyncContext, _servers: &[Server]) -> Result<WriteReport, AppError> {
        Ok(WriteReport::unchanged(self.config_path()))
    }

    fn read_commands(&self) -> Result<Vec<Command>, AppError> {
        Ok(Vec::new())
    }

    fn write_commands(
        &self,
        _ctx: &SyncContext,
        _commands: &[Command],
    ) -> Result<WriteReport, AppError> {
        Ok(WriteReport::unchanged(self.config_path()))
    }

    fn read_rules(&self) -> Result<Vec<Rule>, AppError> {
        Ok(Vec::new())
    }

    fn write_rules(&self, _ctx: &SyncContext, _rules: &[Rule]) -> Result<WriteReport, AppError> {
        Ok(WriteReport::unchanged(self.config_path()))
    }

    fn read_skills(&self) -> Result<Vec<Skill>, AppError> {
        Ok(Vec::new())
    }

    fn write_skills(&self, _ctx: &SyncContext, _skills: &[Skill]) -> Result<WriteReport, AppError> {
        Ok(WriteReport::unchanged(self.config_path()))
    }
}

/// Split servers into those the adapter accepts and the count filtered out.
pub fn filter_transports(servers: &[Server], caps: Capabilities) -> (Vec<Server>, usize) {
    let kept: Vec<Server> = servers
        .iter()
        .filter(|s| caps.remote_servers || !s.transport.is_remote())
        .cloned()
        .collect();
    let filtered = servers.len() - kept.len();
    (kept, filtered)
}

/// Root directory for a tool: the settings override, else `<home>/<default>`.
pub(crate) fn tool_dir(home: &Path, settings: &AppSettings, tool: &str, default: &str) -> PathBuf {
    settings
        .config_dir_override(tool)
        .unwrap_or_else(|| home.join(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_drops_remote_only_when_unsupported() {
        let servers = vec![
            Server::stdio("local", "echo", &[]),
            Server::http("api", "https://example.com/mcp"),
            Server::sse("events", "https://example.com/sse"),
        ];
        let stdio_only = Capabilities {
            kinds: &[ResourceKind::Server],
            remote_servers: false,
        };
        let (kept, filtered) = filter_transports(&servers, stdio_only);
        assert_eq!(kept.len(), 1);
        assert_eq!(filtered, 2);

        let full = Capabilities {
            remote_servers: true,
            ..stdio_only
        };
        let (kept, filtered) = filter_transports(&servers, full);
        assert_eq!(kept.len(), 3);
        assert_eq!(filtered, 0);
    }

    #[test]
    fn tool_dir_prefers_override() {
        let home = Path::new("/home/u");
        let mut settings = AppSettings::default();
        assert_eq!(
            tool_dir(home, &settings, "cursor", ".cursor"),
            PathBuf::from("/home/u/.cursor")
        );
        settings.cursor_config_dir = Some("/opt/cursor".into());
        assert_eq!(
            tool_dir(home, &settings, "cursor", ".cursor"),
            PathBuf::from("/opt/cursor")
        );
    }
}

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::markdown::{parse_each, parse_rule, render_rule};
use super::pipeline::{self, Target};
use super::servers::{infer_type, marked_entries, read_json_servers};
use super::{tool_dir, Adapter, Capabilities, SyncContext, WriteReport};
use crate::document::JsonDocument;
use crate::error::AppError;
use crate::mcp::{server_to_spec, string_map_to_json};
use crate::ownership::{EntryFormat, FileLayout, Ownership};
use crate::resource::{Resource, ResourceKind, Rule, Server, Transport};
use crate::settings::AppSettings;

const SERVERS_KEY: &str = "mcpServers";
const RULES: FileLayout = FileLayout::Flat { ext: "mdc" };

/// Cursor: `~/.cursor/mcp.json` and `~/.cursor/rules/*.mdc`.
#[derive(Debug, Clone)]
pub struct CursorAdapter {
    dir: PathBuf,
}

impl CursorAdapter {
    pub fn new(home: &Path, settings: &AppSettings) -> Self {
        Self {
            dir: tool_dir(home, settings, "cursor", ".cursor"),
        }
    }

    fn target<'a>(&self, kind: ResourceKind, path: &'a Path) -> Target<'a> {
        Target {
            adapter: "cursor",
            kind,
            path,
            ownership: Ownership::InlineMarker,
        }
    }

    fn rules_dir(&self) -> PathBuf {
        self.dir.join("rules")
    }
}

/// Cursor has no `type`; remote servers are just a `url`.
fn cursor_entry(server: &Server) -> Map<String, Value> {
    match &server.transport {
        Transport::Stdio { .. } => {
            let mut spec = server_to_spec(server);
            spec.shift_remove("type");
            spec
        }
        Transport::Http { url, headers } | Transport::Sse { url, headers } => {
            let mut entry = Map::new();
            entry.insert("url".into(), Value::String(url.clone()));
            if !headers.is_empty() {
                entry.insert("headers".into(), string_map_to_json(headers));
            }
            if !server.env.is_empty() {
                entry.insert("env".into(), string_map_to_json(&server.env));
            }
            entry
        }
    }
}

impl Adapter for CursorAdapter {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn display_name(&self) -> &'static str {
        "Cursor"
    }

    fn detect(&self) -> bool {
        self.dir.is_dir()
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join("mcp.json")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            kinds: &[ResourceKind::Server, ResourceKind::Rule],
            remote_servers: true,
        }
    }

    fn read_servers(&self) -> Result<Vec<Server>, AppError> {
        read_json_servers(&self.config_path(), SERVERS_KEY, |entry| {
            infer_type(entry, "url", "http")
        })
    }

    fn write_servers(&self, ctx: &SyncContext, servers: &[Server]) -> Result<WriteReport, AppError> {
        let path = self.config_path();
        pipeline::write_section::<JsonDocument>(
            ctx,
            self.target(ResourceKind::Server, &path),
            SERVERS_KEY,
            marked_entries(servers, cursor_entry),
        )
    }

    fn read_rules(&self) -> Result<Vec<Rule>, AppError> {
        let files = pipeline::read_file_set(&self.rules_dir(), RULES, EntryFormat::Markdown)?;
        Ok(parse_each(files, "rule", parse_rule))
    }

    fn write_rules(&self, ctx: &SyncContext, rules: &[Rule]) -> Result<WriteReport, AppError> {
        let entries = rules
            .iter()
            .map(|rule| Ok((rule.effective_name().to_string(), render_rule(rule)?)))
            .collect::<Result<Vec<_>, AppError>>()?;
        let dir = self.rules_dir();
        pipeline::write_file_set(
            ctx,
            self.target(ResourceKind::Rule, &dir),
            RULES,
            EntryFormat::Markdown,
            entries,
        )
    }
}

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

use super::markdown::{
    block_as_rule, parse_command, parse_each, render_command, rules_block, CommandFields,
};
use super::pipeline::{self, Target};
use super::servers::read_json_servers;
use super::{tool_dir, Adapter, Capabilities, SyncContext, WriteReport};
use crate::document::JsonDocument;
use crate::error::AppError;
use crate::mcp::{json_to_string_map, string_map_to_json};
use crate::ownership::{EntryFormat, FileLayout, Ownership};
use crate::resource::{Command, Resource, ResourceKind, Rule, Server, Transport};
use crate::settings::AppSettings;

const SERVERS_KEY: &str = "mcp";
const COMMANDS: FileLayout = FileLayout::Flat { ext: "md" };
const COMMAND_FIELDS: CommandFields = CommandFields {
    argument_hint: false,
    allowed_tools: false,
    model: true,
};

/// OpenCode: `~/.config/opencode/opencode.json`, `command/*.md`, `AGENTS.md`.
///
/// `opencode.json` is validated against a closed schema, so server entries
/// carry no marker and ownership goes through the ledger.
#[derive(Debug, Clone)]
pub struct OpenCodeAdapter {
    dir: PathBuf,
}

impl OpenCodeAdapter {
    pub fn new(home: &Path, settings: &AppSettings) -> Self {
        Self {
            dir: tool_dir(home, settings, "opencode", ".config/opencode"),
        }
    }

    fn commands_dir(&self) -> PathBuf {
        self.dir.join("command")
    }

    fn rules_path(&self) -> PathBuf {
        self.dir.join("AGENTS.md")
    }
}

/// Only `type`, `command` (array), `url`, `environment` and `enabled` are
/// allowed; anything else the server carries is dropped.
fn opencode_entry(server: &Server) -> Map<String, Value> {
    let mut entry = Map::new();
    match &server.transport {
        Transport::Stdio { command, args, cwd } => {
            entry.insert("type".into(), json!("local"));
            let mut argv = vec![command.clone()];
            argv.extend(args.iter().cloned());
            entry.insert("command".into(), json!(argv));
            if cwd.is_some() {
                log::debug!("opencode has no cwd field; dropped for '{}'", server.effective_name());
            }
        }
        Transport::Http { url, headers } | Transport::Sse { url, headers } => {
            entry.insert("type".into(), json!("remote"));
            entry.insert("url".into(), json!(url));
            if !headers.is_empty() {
                log::debug!("opencode has no headers field; dropped for '{}'", server.effective_name());
            }
        }
    }
    if !server.env.is_empty() {
        entry.insert("environment".into(), string_map_to_json(&server.env));
    }
    entry.insert("enabled".into(), json!(server.enabled));
    entry
}

fn opencode_to_spec(entry: &Value) -> Value {
    let mut spec = Map::new();
    match entry.get("type").and_then(|v| v.as_str()) {
        Some("local") => {
            let argv: Vec<&str> = entry
                .get("command")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|a| a.as_str()).collect())
                .unwrap_or_default();
            spec.insert("type".into(), json!("stdio"));
            if let Some((command, args)) = argv.split_first() {
                spec.insert("command".into(), json!(command));
                if !args.is_empty() {
                    spec.insert("args".into(), json!(args));
                }
            }
        }
        Some("remote") => {
            spec.insert("type".into(), json!("http"));
            if let Some(url) = entry.get("url") {
                spec.insert("url".into(), url.clone());
            }
        }
        other => {
            spec.insert("type".into(), json!(other.unwrap_or("unknown")));
        }
    }
    let env = json_to_string_map(entry.get("environment"));
    if !env.is_empty() {
        spec.insert("env".into(), string_map_to_json(&env));
    }
    if let Some(enabled) = entry.get("enabled") {
        spec.insert("enabled".into(), enabled.clone());
    }
    Value::Object(spec)
}

impl Adapter for OpenCodeAdapter {
    fn name(&self) -> &'static str {
        "opencode"
    }

    fn display_name(&self) -> &'static str {
        "OpenCode"
    }

    fn detect(&self) -> bool {
        self.dir.is_dir()
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join("opencode.json")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            kinds: &[ResourceKind::Server, ResourceKind::Command, ResourceKind::Rule],
            remote_servers: true,
        }
    }

    fn read_servers(&self) -> Result<Vec<Server>, AppError> {
        read_json_servers(&self.config_path(), SERVERS_KEY, opencode_to_spec)
    }

    fn write_servers(&self, ctx: &SyncContext, servers: &[Server]) -> Result<WriteReport, AppError> {
        let entries = servers
            .iter()
            .map(|server| {
                (
                    server.effective_name().to_string(),
                    Value::Object(opencode_entry(server)),
                )
            })
            .collect();
        let path = self.config_path();
        let target = Target {
            adapter: "opencode",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::Ledger,
        };
        pipeline::write_section::<JsonDocument>(ctx, target, SERVERS_KEY, entries)
    }

    fn read_commands(&self) -> Result<Vec<Command>, AppError> {
        let files = pipeline::read_file_set(&self.commands_dir(), COMMANDS, EntryFormat::Markdown)?;
        Ok(parse_each(files, "command", parse_command))
    }

    fn write_commands(&self, ctx: &SyncContext, commands: &[Command]) -> Result<WriteReport, AppError> {
        let entries = commands
            .iter()
            .map(|cmd| Ok((cmd.effective_name().to_string(), render_command(cmd, COMMAND_FIELDS)?)))
            .collect::<Result<Vec<_>, AppError>>()?;
        let dir = self.commands_dir();
        let target = Target {
            adapter: "opencode",
            kind: ResourceKind::Command,
            path: &dir,
            ownership: Ownership::InlineMarker,
        };
        pipeline::write_file_set(ctx, target, COMMANDS, EntryFormat::Markdown, entries)
    }

    fn read_rules(&self) -> Result<Vec<Rule>, AppError> {
        let block = pipeline::read_block(&self.rules_path())?;
        Ok(block_as_rule("opencode-rules", block.as_deref()))
    }

    fn write_rules(&self, ctx: &SyncContext, rules: &[Rule]) -> Result<WriteReport, AppError> {
        let path = self.rules_path();
        let target = Target {
            adapter: "opencode",
            kind: ResourceKind::Rule,
            path: &path,
            ownership: Ownership::InlineMarker,
        };
        pipeline::write_block(ctx, target, rules_block(rules)?)
    }
}

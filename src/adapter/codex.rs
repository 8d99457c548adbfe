use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::markdown::{
    block_as_rule, parse_command, parse_each, render_command, rules_block, CommandFields,
};
use super::pipeline::{self, Target};
use super::servers::read_json_servers;
use super::{tool_dir, Adapter, Capabilities, SyncContext, WriteReport};
use crate::document::{JsonDocument, TomlDocument};
use crate::error::AppError;
use crate::mcp::{server_from_spec, server_to_spec, server_to_toml_table, toml_entry_to_json_spec};
use crate::ownership::{EntryFormat, FileLayout, Ownership};
use crate::resource::{validate_name, Command, Resource, ResourceKind, Rule, Server};
use crate::settings::AppSettings;

const TOML_SERVERS_KEY: &str = "mcp_servers";
const LEGACY_SERVERS_KEY: &str = "mcpServers";
const PROMPTS: FileLayout = FileLayout::Flat { ext: "md" };
const PROMPT_FIELDS: CommandFields = CommandFields {
    argument_hint: true,
    allowed_tools: false,
    model: false,
};

/// Which serialization the Codex server config uses on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodexServerFormat {
    /// `config.toml`, `[mcp_servers.<name>]`
    Toml,
    /// `config.json`, `mcpServers`; only when it is the sole config present
    LegacyJson,
}

/// Codex CLI: `~/.codex/config.toml`, `prompts/*.md`, `AGENTS.md`.
///
/// Codex rejects unknown keys in server tables, so servers are owned through
/// the ledger.
#[derive(Debug, Clone)]
pub struct CodexAdapter {
    dir: PathBuf,
}

impl CodexAdapter {
    pub fn new(home: &Path, settings: &AppSettings) -> Self {
        Self {
            dir: tool_dir(home, settings, "codex", ".codex"),
        }
    }

    fn toml_path(&self) -> PathBuf {
        self.dir.join("config.toml")
    }

    fn legacy_path(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    /// Probe for `config.toml`, else fall back to a lone `config.json`.
    pub fn server_format(&self) -> CodexServerFormat {
        if !self.toml_path().exists() && self.legacy_path().is_file() {
            CodexServerFormat::LegacyJson
        } else {
            CodexServerFormat::Toml
        }
    }

    fn prompts_dir(&self) -> PathBuf {
        self.dir.join("prompts")
    }

    fn rules_path(&self) -> PathBuf {
        self.dir.join("AGENTS.md")
    }

    fn read_toml_servers(&self) -> Result<Vec<Server>, AppError> {
        let path = self.toml_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::io(&path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let root: toml::Table =
            toml::from_str(&text).map_err(|e| AppError::malformed(&path, e))?;

        let mut servers = Vec::new();
        let mut import_tbl = |tbl: &toml::value::Table| {
            for (id, entry) in tbl.iter() {
                let Some(entry_tbl) = entry.as_table() else {
                    continue;
                };
                if let Err(e) = validate_name(id) {
                    log::warn!("skipping Codex MCP entry '{id}': {e}");
                    continue;
                }
                let Some(spec) = toml_entry_to_json_spec(id, entry_tbl) else {
                    continue;
                };
                match server_from_spec(id, &spec) {
                    Ok(server) => servers.push(server),
                    Err(e) => log::warn!("skipping invalid Codex MCP entry '{id}': {e}"),
                }
            }
        };

        // Misplaced [mcp.servers] is still read so it can be migrated by hand
        if let Some(tbl) = misplaced_servers(&root) {
            log::warn!("{} uses [mcp.servers]; Codex expects [mcp_servers]", path.display());
            import_tbl(tbl);
        }
        if let Some(tbl) = root.get(TOML_SERVERS_KEY).and_then(|v| v.as_table()) {
            import_tbl(tbl);
        }
        Ok(servers)
    }

    fn warn_misplaced(&self) {
        let path = self.toml_path();
        let Ok(text) = fs::read_to_string(&path) else {
            return;
        };
        if let Ok(root) = toml::from_str::<toml::Table>(&text) {
            if misplaced_servers(&root).is_some() {
                log::warn!(
                    "{} has servers under [mcp.servers]; they are left as is and ignored by Codex",
                    path.display()
                );
            }
        }
    }
}

fn misplaced_servers(root: &toml::Table) -> Option<&toml::value::Table> {
    root.get("mcp")
        .and_then(|v| v.as_table())
        .and_then(|mcp| mcp.get("servers"))
        .and_then(|v| v.as_table())
}

impl Adapter for CodexAdapter {
    fn name(&self) -> &'static str {
        "codex"
    }

    fn display_name(&self) -> &'static str {
        "Codex CLI"
    }

    fn detect(&self) -> bool {
        self.dir.is_dir()
    }

    fn config_path(&self) -> PathBuf {
        match self.server_format() {
            CodexServerFormat::Toml => self.toml_path(),
            CodexServerFormat::LegacyJson => self.legacy_path(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            kinds: &[ResourceKind::Server, ResourceKind::Command, ResourceKind::Rule],
            remote_servers: false,
        }
    }

    fn read_servers(&self) -> Result<Vec<Server>, AppError> {
        match self.server_format() {
            CodexServerFormat::Toml => self.read_toml_servers(),
            CodexServerFormat::LegacyJson => {
                read_json_servers(&self.legacy_path(), LEGACY_SERVERS_KEY, Value::clone)
            }
        }
    }

    fn write_servers(&self, ctx: &SyncContext, servers: &[Server]) -> Result<WriteReport, AppError> {
        let enabled = servers.iter().filter(|s| s.enabled);
        let path = self.config_path();
        let target = Target {
            adapter: "codex",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::Ledger,
        };

        match self.server_format() {
            CodexServerFormat::Toml => {
                self.warn_misplaced();
                let entries = enabled
                    .map(|server| {
                        let table = server_to_toml_table(server)?;
                        Ok((server.effective_name().to_string(), toml_edit::Item::Table(table)))
                    })
                    .collect::<Result<Vec<_>, AppError>>()?;
                pipeline::write_section::<TomlDocument>(ctx, target, TOML_SERVERS_KEY, entries)
            }
            CodexServerFormat::LegacyJson => {
                let entries = enabled
                    .map(|server| {
                        (
                            server.effective_name().to_string(),
                            Value::Object(server_to_spec(server)),
                        )
                    })
                    .collect();
                pipeline::write_section::<JsonDocument>(ctx, target, LEGACY_SERVERS_KEY, entries)
            }
        }
    }

    fn read_commands(&self) -> Result<Vec<Command>, AppError> {
        let files = pipeline::read_file_set(&self.prompts_dir(), PROMPTS, EntryFormat::Markdown)?;
        Ok(parse_each(files, "prompt", parse_command))
    }

    fn write_commands(&self, ctx: &SyncContext, commands: &[Command]) -> Result<WriteReport, AppError> {
        let entries = commands
            .iter()
            .map(|cmd| Ok((cmd.effective_name().to_string(), render_command(cmd, PROMPT_FIELDS)?)))
            .collect::<Result<Vec<_>, AppError>>()?;
        let dir = self.prompts_dir();
        let target = Target {
            adapter: "codex",
            kind: ResourceKind::Command,
            path: &dir,
            ownership: Ownership::InlineMarker,
        };
        pipeline::write_file_set(ctx, target, PROMPTS, EntryFormat::Markdown, entries)
    }

    fn read_rules(&self) -> Result<Vec<Rule>, AppError> {
        let block = pipeline::read_block(&self.rules_path())?;
        Ok(block_as_rule("codex-rules", block.as_deref()))
    }

    fn write_rules(&self, ctx: &SyncContext, rules: &[Rule]) -> Result<WriteReport, AppError> {
        let path = self.rules_path();
        let target = Target {
            adapter: "codex",
            kind: ResourceKind::Rule,
            path: &path,
            ownership: Ownership::InlineMarker,
        };
        pipeline::write_block(ctx, target, rules_block(rules)?)
    }
}

use serde_json::Value;
use std::path::{Path, PathBuf};

use super::markdown::{
    block_as_rule, parse_command, parse_each, parse_skill, render_command, render_skill,
    rules_block, CommandFields,
};
use super::pipeline::{self, Target};
use super::servers::{marked_entries, read_json_servers};
use super::{tool_dir, Adapter, Capabilities, SyncContext, WriteReport};
use crate::config::derive_mcp_path_from_override;
use crate::document::JsonDocument;
use crate::error::AppError;
use crate::mcp::server_to_spec;
use crate::ownership::{EntryFormat, FileLayout, Ownership};
use crate::resource::{Command, Resource, ResourceKind, Rule, Server, Skill};
use crate::settings::AppSettings;

const SERVERS_KEY: &str = "mcpServers";
const COMMANDS: FileLayout = FileLayout::Flat { ext: "md" };
const SKILLS: FileLayout = FileLayout::Nested { file: "SKILL.md" };

/// Claude Code: `~/.claude.json` for servers, `~/.claude/` for the rest.
#[derive(Debug, Clone)]
pub struct ClaudeAdapter {
    dir: PathBuf,
    mcp_path: PathBuf,
}

impl ClaudeAdapter {
    pub fn new(home: &Path, settings: &AppSettings) -> Self {
        let dir = tool_dir(home, settings, "claude", ".claude");
        // An overridden directory keeps its MCP file as a sibling: <dir>.json
        let mcp_path = settings
            .config_dir_override("claude")
            .and_then(|d| derive_mcp_path_from_override(&d))
            .unwrap_or_else(|| home.join(".claude.json"));
        Self { dir, mcp_path }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target<'a>(&self, kind: ResourceKind, path: &'a Path) -> Target<'a> {
        Target {
            adapter: "claude",
            kind,
            path,
            ownership: Ownership::InlineMarker,
        }
    }

    fn commands_dir(&self) -> PathBuf {
        self.dir.join("commands")
    }

    fn skills_dir(&self) -> PathBuf {
        self.dir.join("skills")
    }

    fn rules_path(&self) -> PathBuf {
        self.dir.join("CLAUDE.md")
    }
}

impl Adapter for ClaudeAdapter {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude Code"
    }

    fn detect(&self) -> bool {
        self.mcp_path.is_file() || self.dir.is_dir()
    }

    fn config_path(&self) -> PathBuf {
        self.mcp_path.clone()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            kinds: &ResourceKind::ALL,
            remote_servers: true,
        }
    }

    fn read_servers(&self) -> Result<Vec<Server>, AppError> {
        read_json_servers(&self.mcp_path, SERVERS_KEY, Value::clone)
    }

    fn write_servers(&self, ctx: &SyncContext, servers: &[Server]) -> Result<WriteReport, AppError> {
        let entries = marked_entries(servers, server_to_spec);
        pipeline::write_section::<JsonDocument>(
            ctx,
            self.target(ResourceKind::Server, &self.mcp_path),
            SERVERS_KEY,
            entries,
        )
    }

    fn read_commands(&self) -> Result<Vec<Command>, AppError> {
        let files = pipeline::read_file_set(&self.commands_dir(), COMMANDS, EntryFormat::Markdown)?;
        Ok(parse_each(files, "command", parse_command))
    }

    fn write_commands(&self, ctx: &SyncContext, commands: &[Command]) -> Result<WriteReport, AppError> {
        let entries = commands
            .iter()
            .map(|cmd| Ok((cmd.effective_name().to_string(), render_command(cmd, CommandFields::ALL)?)))
            .collect::<Result<Vec<_>, AppError>>()?;
        let dir = self.commands_dir();
        pipeline::write_file_set(
            ctx,
            self.target(ResourceKind::Command, &dir),
            COMMANDS,
            EntryFormat::Markdown,
            entries,
        )
    }

    fn read_rules(&self) -> Result<Vec<Rule>, AppError> {
        let block = pipeline::read_block(&self.rules_path())?;
        Ok(block_as_rule("claude-rules", block.as_deref()))
    }

    fn write_rules(&self, ctx: &SyncContext, rules: &[Rule]) -> Result<WriteReport, AppError> {
        let path = self.rules_path();
        pipeline::write_block(ctx, self.target(ResourceKind::Rule, &path), rules_block(rules)?)
    }

    fn read_skills(&self) -> Result<Vec<Skill>, AppError> {
        let files = pipeline::read_file_set(&self.skills_dir(), SKILLS, EntryFormat::Markdown)?;
        Ok(parse_each(files, "skill", parse_skill))
    }

    fn write_skills(&self, ctx: &SyncContext, skills: &[Skill]) -> Result<WriteReport, AppError> {
        let entries = skills
            .iter()
            .map(|skill| Ok((skill.effective_name().to_string(), render_skill(skill)?)))
            .collect::<Result<Vec<_>, AppError>>()?;
        let dir = self.skills_dir();
        pipeline::write_file_set(
            ctx,
            self.target(ResourceKind::Skill, &dir),
            SKILLS,
            EntryFormat::Markdown,
            entries,
        )
    }
}

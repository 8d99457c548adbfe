use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::markdown::{block_as_rule, parse_each, rules_block};
use super::pipeline::{self, Target};
use super::servers::{marked_entries, read_json_servers};
use super::{tool_dir, Adapter, Capabilities, SyncContext, WriteReport};
use crate::document::JsonDocument;
use crate::error::AppError;
use crate::mcp::server_to_spec;
use crate::ownership::{EntryFormat, FileLayout, Ownership};
use crate::resource::{Command, Resource, ResourceKind, Rule, Server};
use crate::settings::AppSettings;

const SERVERS_KEY: &str = "mcpServers";
const COMMANDS: FileLayout = FileLayout::Flat { ext: "toml" };

/// Gemini CLI: `~/.gemini/settings.json`, `commands/*.toml`, `GEMINI.md`.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    dir: PathBuf,
}

impl GeminiAdapter {
    pub fn new(home: &Path, settings: &AppSettings) -> Self {
        Self {
            dir: tool_dir(home, settings, "gemini", ".gemini"),
        }
    }

    fn commands_dir(&self) -> PathBuf {
        self.dir.join("commands")
    }

    fn rules_path(&self) -> PathBuf {
        self.dir.join("GEMINI.md")
    }
}

/// Gemini infers the transport from the field name:
/// - no `type` field
/// - http uses `httpUrl`, sse keeps `url`
fn gemini_entry(server: &Server) -> Map<String, Value> {
    let mut obj = server_to_spec(server);
    let transport_type = obj.shift_remove("type");
    if transport_type.as_ref().and_then(|v| v.as_str()) == Some("http") {
        let mut out = Map::new();
        for (key, value) in obj {
            let key = if key == "url" { "httpUrl".to_string() } else { key };
            out.insert(key, value);
        }
        return out;
    }
    obj
}

fn gemini_to_spec(entry: &Value) -> Value {
    let Some(obj) = entry.as_object() else {
        return entry.clone();
    };
    let mut spec = Map::new();
    if obj.contains_key("command") {
        spec.insert("type".into(), Value::String("stdio".into()));
    } else if obj.contains_key("httpUrl") {
        spec.insert("type".into(), Value::String("http".into()));
    } else if obj.contains_key("url") {
        spec.insert("type".into(), Value::String("sse".into()));
    }
    for (key, value) in obj {
        let key = if key == "httpUrl" { "url".to_string() } else { key.clone() };
        spec.insert(key, value.clone());
    }
    Value::Object(spec)
}

/// Custom command file: `description` plus `prompt`.
fn render_command(cmd: &Command) -> String {
    let mut doc = toml_edit::DocumentMut::new();
    if let Some(desc) = cmd.description.as_deref().filter(|d| !d.trim().is_empty()) {
        doc["description"] = toml_edit::value(desc);
    }
    doc["prompt"] = toml_edit::value(cmd.body.trim());
    doc.to_string()
}

fn parse_command(name: &str, content: &str) -> Result<Command, AppError> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| AppError::InvalidInput(format!("invalid command file: {e}")))?;
    let prompt = table
        .get("prompt")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::InvalidInput("command file has no 'prompt'".into()))?;
    let mut cmd = Command::new(name, prompt.trim());
    cmd.description = table
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    Ok(cmd)
}

impl Adapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Gemini CLI"
    }

    fn detect(&self) -> bool {
        self.dir.is_dir()
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join("settings.json")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            kinds: &[ResourceKind::Server, ResourceKind::Command, ResourceKind::Rule],
            remote_servers: true,
        }
    }

    fn read_servers(&self) -> Result<Vec<Server>, AppError> {
        read_json_servers(&self.config_path(), SERVERS_KEY, gemini_to_spec)
    }

    fn write_servers(&self, ctx: &SyncContext, servers: &[Server]) -> Result<WriteReport, AppError> {
        let path = self.config_path();
        let target = Target {
            adapter: "gemini",
            kind: ResourceKind::Server,
            path: &path,
            ownership: Ownership::InlineMarker,
        };
        pipeline::write_section::<JsonDocument>(
            ctx,
            target,
            SERVERS_KEY,
            marked_entries(servers, gemini_entry),
        )
    }

    fn read_commands(&self) -> Result<Vec<Command>, AppError> {
        let files = pipeline::read_file_set(&self.commands_dir(), COMMANDS, EntryFormat::Toml)?;
        Ok(parse_each(files, "command", parse_command))
    }

    /// Command files are TOML the CLI validates, so ownership is tracked in the ledger.
    fn write_commands(&self, ctx: &SyncContext, commands: &[Command]) -> Result<WriteReport, AppError> {
        let entries = commands
            .iter()
            .map(|cmd| (cmd.effective_name().to_string(), render_command(cmd)))
            .collect();
        let dir = self.commands_dir();
        let target = Target {
            adapter: "gemini",
            kind: ResourceKind::Command,
            path: &dir,
            ownership: Ownership::Ledger,
        };
        pipeline::write_file_set(ctx, target, COMMANDS, EntryFormat::Toml, entries)
    }

    fn read_rules(&self) -> Result<Vec<Rule>, AppError> {
        let block = pipeline::read_block(&self.rules_path())?;
        Ok(block_as_rule("gemini-rules", block.as_deref()))
    }

    fn write_rules(&self, ctx: &SyncContext, rules: &[Rule]) -> Result<WriteReport, AppError> {
        let path = self.rules_path();
        let target = Target {
            adapter: "gemini",
            kind: ResourceKind::Rule,
            path: &path,
            ownership: Ownership::InlineMarker,
        };
        pipeline::write_block(ctx, target, rules_block(rules)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn http_uses_http_url_and_drops_type() {
        let entry = gemini_entry(&Server::http("api", "https://example.com/mcp"));
        assert_eq!(Value::Object(entry), json!({"httpUrl": "https://example.com/mcp"}));

        let entry = gemini_entry(&Server::sse("events", "https://example.com/sse"));
        assert_eq!(Value::Object(entry), json!({"url": "https://example.com/sse"}));
    }

    #[test]
    fn dialect_reads_back_to_spec() {
        assert_eq!(
            gemini_to_spec(&json!({"httpUrl": "https://x"})),
            json!({"type": "http", "url": "https://x"})
        );
        assert_eq!(
            gemini_to_spec(&json!({"url": "https://x"}))["type"],
            json!("sse")
        );
    }

    #[test]
    fn command_toml_round_trip() {
        let mut cmd = Command::new("review", "Review the diff.\nBe brief.");
        cmd.description = Some("Code review".into());
        let text = render_command(&cmd);
        assert_eq!(parse_command("review", &text).expect("parse"), cmd);
    }
}

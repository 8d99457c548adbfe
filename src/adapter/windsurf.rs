use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::markdown::{block_as_rule, rules_block};
use super::pipeline::{self, Target};
use super::servers::{infer_type, marked_entries, read_json_servers};
use super::{tool_dir, Adapter, Capabilities, SyncContext, WriteReport};
use crate::document::JsonDocument;
use crate::error::AppError;
use crate::mcp::server_to_spec;
use crate::ownership::Ownership;
use crate::resource::{ResourceKind, Rule, Server};
use crate::settings::AppSettings;

const SERVERS_KEY: &str = "mcpServers";

/// Windsurf: `~/.codeium/windsurf/mcp_config.json` and `memories/global_rules.md`.
#[derive(Debug, Clone)]
pub struct WindsurfAdapter {
    dir: PathBuf,
}

impl WindsurfAdapter {
    pub fn new(home: &Path, settings: &AppSettings) -> Self {
        Self {
            dir: tool_dir(home, settings, "windsurf", ".codeium/windsurf"),
        }
    }

    fn target<'a>(&self, kind: ResourceKind, path: &'a Path) -> Target<'a> {
        Target {
            adapter: "windsurf",
            kind,
            path,
            ownership: Ownership::InlineMarker,
        }
    }

    fn rules_path(&self) -> PathBuf {
        self.dir.join("memories").join("global_rules.md")
    }
}

/// Windsurf spells the remote endpoint `serverUrl`.
fn windsurf_entry(server: &Server) -> Map<String, Value> {
    let mut spec = server_to_spec(server);
    spec.shift_remove("type");
    if server.transport.is_remote() {
        let mut entry = Map::new();
        for (key, value) in spec {
            let key = if key == "url" { "serverUrl".to_string() } else { key };
            entry.insert(key, value);
        }
        return entry;
    }
    spec
}

impl Adapter for WindsurfAdapter {
    fn name(&self) -> &'static str {
        "windsurf"
    }

    fn display_name(&self) -> &'static str {
        "Windsurf"
    }

    fn detect(&self) -> bool {
        self.dir.is_dir()
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join("mcp_config.json")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            kinds: &[ResourceKind::Server, ResourceKind::Rule],
            remote_servers: true,
        }
    }

    fn read_servers(&self) -> Result<Vec<Server>, AppError> {
        read_json_servers(&self.config_path(), SERVERS_KEY, |entry| {
            infer_type(entry, "serverUrl", "http")
        })
    }

    fn write_servers(&self, ctx: &SyncContext, servers: &[Server]) -> Result<WriteReport, AppError> {
        let path = self.config_path();
        pipeline::write_section::<JsonDocument>(
            ctx,
            self.target(ResourceKind::Server, &path),
            SERVERS_KEY,
            marked_entries(servers, windsurf_entry),
        )
    }

    fn read_rules(&self) -> Result<Vec<Rule>, AppError> {
        let block = pipeline::read_block(&self.rules_path())?;
        Ok(block_as_rule("windsurf-rules", block.as_deref()))
    }

    fn write_rules(&self, ctx: &SyncContext, rules: &[Rule]) -> Result<WriteReport, AppError> {
        let path = self.rules_path();
        pipeline::write_block(ctx, self.target(ResourceKind::Rule, &path), rules_block(rules)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_entries_use_server_url() {
        let entry = windsurf_entry(&Server::http("api", "https://example.com/mcp"));
        assert_eq!(Value::Object(entry), json!({"serverUrl": "https://example.com/mcp"}));
    }
}

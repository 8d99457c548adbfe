//! Server entries for the JSON dialects.

use serde_json::{Map, Value};
use std::path::Path;

use crate::document::{ConfigDocument, JsonDocument};
use crate::error::AppError;
use crate::mcp::server_from_spec;
use crate::ownership::mark_json;
use crate::resource::{validate_name, Resource, Server};

/// Marked entries for a permissive target. Disabled servers are left out.
pub(crate) fn marked_entries(
    servers: &[Server],
    to_entry: impl Fn(&Server) -> Map<String, Value>,
) -> Vec<(String, Value)> {
    servers
        .iter()
        .filter(|server| {
            if !server.enabled {
                log::debug!("not projecting disabled server '{}'", server.effective_name());
            }
            server.enabled
        })
        .map(|server| {
            let mut entry = to_entry(server);
            mark_json(&mut entry);
            (server.effective_name().to_string(), Value::Object(entry))
        })
        .collect()
}

/// Read servers under `key`, mapping each entry to a generic spec first.
/// Invalid entries are skipped with a warning, as on import.
pub(crate) fn read_json_servers(
    path: &Path,
    key: &str,
    to_spec: impl Fn(&Value) -> Value,
) -> Result<Vec<Server>, AppError> {
    let doc = JsonDocument::load(path)?;
    let Some(map) = doc.section(key) else {
        return Ok(Vec::new());
    };

    let mut servers = Vec::new();
    let mut errors = Vec::new();
    for (id, entry) in map.iter() {
        if let Err(e) = validate_name(id) {
            log::warn!("skipping MCP server '{id}': {e}");
            errors.push(format!("{id}: {e}"));
            continue;
        }
        match server_from_spec(id, &to_spec(entry)) {
            Ok(server) => servers.push(server),
            Err(e) => {
                log::warn!("skipping invalid MCP server '{id}': {e}");
                errors.push(format!("{id}: {e}"));
            }
        }
    }
    if !errors.is_empty() {
        log::warn!(
            "read {} servers from {}, {} skipped: {:?}",
            servers.len(),
            path.display(),
            errors.len(),
            errors
        );
    }
    Ok(servers)
}

/// Entry objects without a `type` field: infer stdio from `command`, else
/// treat `url_key` as `remote_type`.
pub(crate) fn infer_type(entry: &Value, url_key: &str, remote_type: &str) -> Value {
    let Some(obj) = entry.as_object() else {
        return entry.clone();
    };
    let mut spec = obj.clone();
    if spec.contains_key("type") {
        return Value::Object(spec);
    }
    if spec.contains_key("command") {
        spec.insert("type".into(), Value::String("stdio".into()));
    } else if let Some(url) = spec.shift_remove(url_key) {
        spec.insert("type".into(), Value::String(remote_type.into()));
        spec.insert("url".into(), url);
    }
    Value::Object(spec)
}

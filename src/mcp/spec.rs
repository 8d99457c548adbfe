//! The generic server spec: the JSON shape shared by `servers.json` and the
//! permissive tool dialects.
//!
//! ```json
//! { "type": "stdio", "command": "npx", "args": ["-y", "pkg"], "env": { "K": "V" } }
//! { "type": "http", "url": "https://host/mcp", "headers": { "Authorization": "..." } }
//! ```

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::validation::validate_server_spec;
use crate::error::AppError;
use crate::resource::{Server, Transport};

/// Render a server as a generic spec. `enabled` only appears when false.
pub fn server_to_spec(server: &Server) -> Map<String, Value> {
    let mut spec = Map::new();
    spec.insert("type".into(), json!(server.transport.type_name()));
    match &server.transport {
        Transport::Stdio { command, args, cwd } => {
            spec.insert("command".into(), json!(command));
            if !args.is_empty() {
                spec.insert("args".into(), json!(args));
            }
            if let Some(cwd) = cwd.as_deref().filter(|c| !c.trim().is_empty()) {
                spec.insert("cwd".into(), json!(cwd));
            }
        }
        Transport::Http { url, headers } | Transport::Sse { url, headers } => {
            spec.insert("url".into(), json!(url));
            if !headers.is_empty() {
                spec.insert("headers".into(), string_map_to_json(headers));
            }
        }
    }
    if !server.env.is_empty() {
        spec.insert("env".into(), string_map_to_json(&server.env));
    }
    if !server.enabled {
        spec.insert("enabled".into(), json!(false));
    }
    spec
}

/// Parse a generic spec. Unknown fields are ignored.
pub fn server_from_spec(name: &str, spec: &Value) -> Result<Server, AppError> {
    validate_server_spec(spec)?;

    let str_field = |key: &str| spec.get(key).and_then(|v| v.as_str()).map(str::to_string);
    let transport = match spec.get("type").and_then(|v| v.as_str()).unwrap_or("stdio") {
        "http" => Transport::Http {
            url: str_field("url").unwrap_or_default(),
            headers: json_to_string_map(spec.get("headers")),
        },
        "sse" => Transport::Sse {
            url: str_field("url").unwrap_or_default(),
            headers: json_to_string_map(spec.get("headers")),
        },
        _ => Transport::Stdio {
            command: str_field("command").unwrap_or_default(),
            args: spec
                .get("args")
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|a| a.as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            cwd: str_field("cwd").filter(|c| !c.trim().is_empty()),
        },
    };

    let mut server = Server::with_transport(name, transport);
    server.env = json_to_string_map(spec.get("env"));
    server.enabled = spec.get("enabled").and_then(|v| v.as_bool()).unwrap_or(true);
    Ok(server)
}

pub(crate) fn string_map_to_json(map: &IndexMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// String-valued entries of a JSON object; anything else is dropped.
pub(crate) fn json_to_string_map(value: Option<&Value>) -> IndexMap<String, String> {
    let Some(obj) = value.and_then(|v| v.as_object()) else {
        return IndexMap::new();
    };
    obj.iter()
        .filter_map(|(k, v)| match v.as_str() {
            Some(s) => Some((k.clone(), s.to_string())),
            None => {
                log::debug!("dropping non-string value for '{k}'");
                None
            }
        })
        .collect()
}

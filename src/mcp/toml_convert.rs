use serde_json::{json, Map, Value};

use super::spec::server_to_spec;
use crate::error::AppError;
use crate::resource::Server;

/// Convert a generic JSON server spec to a Codex `[mcp_servers.<id>]` table.
///
/// - stdio: `command`, `args`, `cwd`, `env` (sub-table)
/// - http/sse: `url`, `http_headers` (sub-table)
///
/// `env` is written for remote servers too when present.
pub fn json_server_to_toml_table(spec: &Map<String, Value>) -> Result<toml_edit::Table, AppError> {
    use toml_edit::{Array, Item, Table};

    let mut t = Table::new();
    let typ = spec.get("type").and_then(|v| v.as_str()).unwrap_or("stdio");
    t["type"] = toml_edit::value(typ);

    match typ {
        "stdio" => {
            let cmd = spec.get("command").and_then(|v| v.as_str()).unwrap_or("");
            if cmd.trim().is_empty() {
                return Err(AppError::McpValidation("stdio server is missing 'command'".into()));
            }
            t["command"] = toml_edit::value(cmd);

            if let Some(args) = spec.get("args").and_then(|v| v.as_array()) {
                let mut arr_v = Array::default();
                for a in args.iter().filter_map(|x| x.as_str()) {
                    arr_v.push(a);
                }
                if !arr_v.is_empty() {
                    t["args"] = Item::Value(toml_edit::Value::Array(arr_v));
                }
            }

            if let Some(cwd) = spec.get("cwd").and_then(|v| v.as_str()) {
                if !cwd.trim().is_empty() {
                    t["cwd"] = toml_edit::value(cwd);
                }
            }
        }
        "http" | "sse" => {
            let url = spec.get("url").and_then(|v| v.as_str()).unwrap_or("");
            t["url"] = toml_edit::value(url);
            if let Some(headers) = string_table(spec.get("headers")) {
                t["http_headers"] = Item::Table(headers);
            }
        }
        other => {
            return Err(AppError::McpValidation(format!("unsupported server type '{other}'")));
        }
    }

    if let Some(env) = string_table(spec.get("env")) {
        t["env"] = Item::Table(env);
    }
    if let Some(enabled) = spec.get("enabled").and_then(|v| v.as_bool()) {
        t["enabled"] = toml_edit::value(enabled);
    }

    Ok(t)
}

pub fn server_to_toml_table(server: &Server) -> Result<toml_edit::Table, AppError> {
    json_server_to_toml_table(&server_to_spec(server))
}

fn string_table(value: Option<&Value>) -> Option<toml_edit::Table> {
    let obj = value?.as_object()?;
    let mut tbl = toml_edit::Table::new();
    for (k, v) in obj.iter() {
        if let Some(s) = v.as_str() {
            tbl[&k[..]] = toml_edit::value(s);
        }
    }
    if tbl.is_empty() {
        None
    } else {
        Some(tbl)
    }
}

/// Convert one Codex server table back to a generic JSON spec.
///
/// Reads `http_headers` (Codex) or `headers` (older files), preferring the former.
/// Returns `None` for an unknown `type`.
pub fn toml_entry_to_json_spec(id: &str, entry_tbl: &toml::value::Table) -> Option<Value> {
    let typ = entry_tbl
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("stdio");

    let mut spec = Map::new();
    spec.insert("type".into(), json!(typ));

    match typ {
        "stdio" => {
            if let Some(cmd) = entry_tbl.get("command").and_then(|v| v.as_str()) {
                spec.insert("command".into(), json!(cmd));
            }
            if let Some(args) = entry_tbl.get("args").and_then(|v| v.as_array()) {
                let arr = args
                    .iter()
                    .filter_map(|x| x.as_str())
                    .map(|s| json!(s))
                    .collect::<Vec<_>>();
                if !arr.is_empty() {
                    spec.insert("args".into(), Value::Array(arr));
                }
            }
            if let Some(cwd) = entry_tbl.get("cwd").and_then(|v| v.as_str()) {
                if !cwd.trim().is_empty() {
                    spec.insert("cwd".into(), json!(cwd));
                }
            }
        }
        "http" | "sse" => {
            if let Some(url) = entry_tbl.get("url").and_then(|v| v.as_str()) {
                spec.insert("url".into(), json!(url));
            }
            let headers_tbl = entry_tbl
                .get("http_headers")
                .and_then(|v| v.as_table())
                .or_else(|| entry_tbl.get("headers").and_then(|v| v.as_table()));
            if let Some(headers) = headers_tbl.and_then(toml_string_table_to_json) {
                spec.insert("headers".into(), headers);
            }
        }
        _ => {
            log::warn!("skipping Codex MCP entry '{id}' of unknown type '{typ}'");
            return None;
        }
    }

    if let Some(env) = entry_tbl
        .get("env")
        .and_then(|v| v.as_table())
        .and_then(toml_string_table_to_json)
    {
        spec.insert("env".into(), env);
    }
    if let Some(enabled) = entry_tbl.get("enabled").and_then(|v| v.as_bool()) {
        spec.insert("enabled".into(), json!(enabled));
    }

    Some(Value::Object(spec))
}

fn toml_string_table_to_json(tbl: &toml::value::Table) -> Option<Value> {
    let mut json_obj = Map::new();
    for (k, v) in tbl.iter() {
        if let Some(s) = v.as_str() {
            json_obj.insert(k.clone(), json!(s));
        } else {
            log::debug!("skipping non-string TOML value for '{k}'");
        }
    }
    if json_obj.is_empty() {
        None
    } else {
        Some(Value::Object(json_obj))
    }
}

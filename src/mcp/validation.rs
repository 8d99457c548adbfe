use serde_json::Value;

use crate::error::AppError;

/// Basic validation: `type` is stdio/http/sse, or omitted (treated as stdio),
/// and the field that type requires is present.
pub fn validate_server_spec(spec: &Value) -> Result<(), AppError> {
    if !spec.is_object() {
        return Err(AppError::McpValidation(
            "server definition must be a JSON object".into(),
        ));
    }
    let t_opt = spec.get("type").and_then(|x| x.as_str());
    // A missing type means stdio, matching the community .mcp.json convention
    let is_stdio = t_opt.map(|t| t == "stdio").unwrap_or(true);
    let is_http = t_opt.map(|t| t == "http").unwrap_or(false);
    let is_sse = t_opt.map(|t| t == "sse").unwrap_or(false);

    if !(is_stdio || is_http || is_sse) {
        return Err(AppError::McpValidation(
            "server type must be 'stdio', 'http' or 'sse' (or omitted for stdio)".into(),
        ));
    }

    if is_stdio {
        let cmd = spec.get("command").and_then(|x| x.as_str()).unwrap_or("");
        if cmd.trim().is_empty() {
            return Err(AppError::McpValidation(
                "stdio server is missing 'command'".into(),
            ));
        }
    }
    if is_http || is_sse {
        let url = spec.get("url").and_then(|x| x.as_str()).unwrap_or("");
        if url.trim().is_empty() {
            return Err(AppError::McpValidation(format!(
                "{} server is missing 'url'",
                t_opt.unwrap_or("remote")
            )));
        }
    }
    if let Some(enabled) = spec.get("enabled") {
        if !enabled.is_boolean() {
            return Err(AppError::McpValidation("'enabled' must be a boolean".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_defaults_to_stdio() {
        assert!(validate_server_spec(&json!({"command": "npx"})).is_ok());
        assert!(validate_server_spec(&json!({"args": ["x"]})).is_err());
    }

    #[test]
    fn remote_types_need_url() {
        assert!(validate_server_spec(&json!({"type": "http", "url": "https://x"})).is_ok());
        assert!(validate_server_spec(&json!({"type": "sse", "url": " "})).is_err());
    }

    #[test]
    fn rejects_unknown_type_and_non_objects() {
        assert!(validate_server_spec(&json!({"type": "ws", "url": "wss://x"})).is_err());
        assert!(validate_server_spec(&json!("npx")).is_err());
        assert!(validate_server_spec(&json!({"command": "x", "enabled": "yes"})).is_err());
    }
}

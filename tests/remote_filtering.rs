use serde_json::json;

use agentctl_lib::{ResourceKind, SyncService};

#[path = "support.rs"]
mod support;
use support::{sample_set, TestHome};

#[test]
fn stdio_only_tool_drops_remote_servers_and_counts_them() {
    let home = TestHome::new();
    home.install(".claude").install(".codex");

    let registry = home.registry();
    let report = SyncService::new(&registry, home.context()).sync(&sample_set());
    assert!(report.is_success(), "{:?}", report.failures());

    let codex = report
        .adapter("codex")
        .and_then(|a| a.kind(ResourceKind::Server))
        .expect("codex servers");
    assert_eq!(codex.filtered, 1);
    assert_eq!(codex.written, 1);
    let text = home.read(".codex/config.toml");
    assert!(text.contains("[mcp_servers.filesystem]"));
    assert!(!text.contains("docs"));

    let claude = report
        .adapter("claude")
        .and_then(|a| a.kind(ResourceKind::Server))
        .expect("claude servers");
    assert_eq!(claude.filtered, 0);
    assert_eq!(claude.written, 2);
    let root = home.read_json(".claude.json");
    assert_eq!(root["mcpServers"]["docs"]["type"], json!("http"));
}

#[test]
fn only_remote_servers_leave_stdio_tool_config_uncreated() {
    let home = TestHome::new();
    home.install(".codex");

    let mut set = sample_set();
    set.servers.retain(|s| s.transport.is_remote());

    let registry = home.registry();
    let outcome = SyncService::new(&registry, home.context())
        .sync_adapter("codex", &set)
        .expect("codex outcome");
    let servers = outcome.kind(ResourceKind::Server).expect("servers");
    assert_eq!(servers.filtered, 1);
    assert!(!servers.changed);
    assert!(!home.join(".codex/config.toml").exists());
}

#[test]
fn dialects_spell_remote_urls_their_own_way() {
    let home = TestHome::new();
    home.install(".gemini")
        .install(".codeium/windsurf")
        .install(".config/opencode");

    let registry = home.registry();
    let report = SyncService::new(&registry, home.context()).sync(&sample_set());
    assert!(report.is_success(), "{:?}", report.failures());

    let gemini = home.read_json(".gemini/settings.json");
    assert_eq!(gemini["mcpServers"]["docs"]["httpUrl"], json!("https://docs.example.com/mcp"));

    let windsurf = home.read_json(".codeium/windsurf/mcp_config.json");
    assert_eq!(
        windsurf["mcpServers"]["docs"]["serverUrl"],
        json!("https://docs.example.com/mcp")
    );

    let opencode = home.read_json(".config/opencode/opencode.json");
    assert_eq!(opencode["mcp"]["docs"]["type"], json!("remote"));
    assert_eq!(opencode["mcp"]["filesystem"]["type"], json!("local"));
    assert!(opencode["mcp"]["filesystem"].get("_agentctl").is_none());
}

use agentctl_lib::{ResourceKind, ResourceSet, Rule, SyncService};

#[path = "support.rs"]
mod support;
use support::{sample_set, TestHome};

#[test]
fn malformed_json_fails_one_pair_and_is_never_overwritten() {
    let home = TestHome::new();
    home.install(".claude").install(".cursor");
    home.write(".claude.json", "{ \"mcpServers\": ");

    let registry = home.registry();
    let report = SyncService::new(&registry, home.context()).sync(&sample_set());

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{failures:?}");
    let (adapter, kind, message) = failures[0];
    assert_eq!((adapter, kind), ("claude", ResourceKind::Server));
    assert!(message.contains("malformed"), "{message}");

    assert_eq!(home.read(".claude.json"), "{ \"mcpServers\": ");
    assert_eq!(home.backups(".claude.json"), 0);

    // The rest of Claude and every other adapter still ran.
    assert!(home.join(".claude/commands/review.md").is_file());
    assert!(home.join(".cursor/mcp.json").is_file());
}

#[test]
fn wrong_section_type_is_an_error() {
    let home = TestHome::new();
    home.install(".cursor");
    home.write(".cursor/mcp.json", r#"{"mcpServers": ["not", "a", "map"]}"#);

    let registry = home.registry();
    let outcome = SyncService::new(&registry, home.context())
        .sync_adapter("cursor", &sample_set())
        .expect("cursor");
    assert!(outcome.kind(ResourceKind::Server).expect("servers").error.is_some());
    assert_eq!(
        home.read(".cursor/mcp.json"),
        r#"{"mcpServers": ["not", "a", "map"]}"#
    );
}

#[test]
fn malformed_toml_and_broken_block_are_left_alone() {
    let home = TestHome::new();
    home.install(".codex").install(".gemini");
    home.write(".codex/config.toml", "model = \n[mcp_servers\n");
    let gemini_md = "notes\n<!-- agentctl:begin -->\n## style\nno end marker\n";
    home.write(".gemini/GEMINI.md", gemini_md);

    let registry = home.registry();
    let report = SyncService::new(&registry, home.context()).sync(&sample_set());

    let codex = report.adapter("codex").expect("codex");
    assert!(codex.kind(ResourceKind::Server).expect("servers").error.is_some());
    assert!(codex.kind(ResourceKind::Rule).expect("rules").is_ok());
    assert_eq!(home.read(".codex/config.toml"), "model = \n[mcp_servers\n");

    let gemini = report.adapter("gemini").expect("gemini");
    assert!(gemini.kind(ResourceKind::Rule).expect("rules").error.is_some());
    assert!(gemini.kind(ResourceKind::Server).expect("servers").is_ok());
    assert_eq!(home.read(".gemini/GEMINI.md"), gemini_md);
}

#[test]
fn corrupt_ledger_blocks_only_ledger_targets() {
    let home = TestHome::new();
    home.install(".config/opencode");
    home.write(".agentctl/ledger.json", "not json");

    let registry = home.registry();
    let outcome = SyncService::new(&registry, home.context())
        .sync_adapter("opencode", &sample_set())
        .expect("opencode");

    let servers = outcome.kind(ResourceKind::Server).expect("servers");
    assert!(servers.error.as_deref().is_some_and(|e| e.contains("ledger")));
    assert!(!home.join(".config/opencode/opencode.json").exists());
    // Commands use inline markers and do not consult the ledger.
    assert!(outcome.kind(ResourceKind::Command).expect("commands").is_ok());
}

#[test]
fn corrupted_managed_command_fails_the_pair() {
    let home = TestHome::new();
    home.install(".claude");
    let broken = "---\n_agentctl: managed\ndescription: [oops\n---\nbody\n";
    home.write(".claude/commands/old.md", broken);

    let registry = home.registry();
    let outcome = SyncService::new(&registry, home.context())
        .sync_adapter("claude", &sample_set())
        .expect("claude");

    let commands = outcome.kind(ResourceKind::Command).expect("commands");
    let error = commands.error.as_deref().expect("malformed entry");
    assert!(error.contains("old.md"), "{error}");
    assert!(!commands.changed);
    assert_eq!(home.read(".claude/commands/old.md"), broken);
    assert!(!home.join(".claude/commands/review.md").exists());

    // Skills live in their own file set and still sync.
    assert!(outcome.kind(ResourceKind::Skill).expect("skills").is_ok());
}

#[test]
fn block_marker_inside_a_rule_body_is_rejected() {
    let home = TestHome::new();
    home.install(".claude");
    home.write(".claude/CLAUDE.md", "# Mine\n");

    let mut set = ResourceSet::default();
    set.rules.push(Rule::new("sneaky", "before\n<!-- agentctl:end -->\nafter"));
    let registry = home.registry();
    let service = SyncService::new(&registry, home.context());

    for _ in 0..3 {
        let outcome = service.sync_adapter("claude", &set).expect("claude");
        let rules = outcome.kind(ResourceKind::Rule).expect("rules");
        let error = rules.error.as_deref().expect("rejected");
        assert!(error.contains("sneaky"), "{error}");
    }
    assert_eq!(home.read(".claude/CLAUDE.md"), "# Mine\n");
}

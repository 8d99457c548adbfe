use std::thread;

use agentctl_lib::{safe_io, AppSettings, LockMode, ResourceKind, ResourceSet, Server, SyncService};

#[path = "support.rs"]
mod support;
use support::TestHome;

const WRITERS: usize = 8;
const ROUNDS: usize = 5;

#[test]
fn concurrent_writers_leave_one_complete_version() {
    let home = TestHome::new();
    home.install(".cursor");
    home.write(
        ".cursor/mcp.json",
        r#"{"mcpServers": {"mine": {"command": "my-tool"}}}"#,
    );

    thread::scope(|scope| {
        for writer in 0..WRITERS {
            let home = &home;
            scope.spawn(move || {
                let registry = home.registry();
                let service = SyncService::new(&registry, home.context());
                let mut set = ResourceSet::default();
                set.servers.push(Server::stdio(format!("srv-{writer}"), "echo", &[]));
                for _ in 0..ROUNDS {
                    let outcome = service.sync_adapter("cursor", &set).expect("cursor");
                    let servers = outcome.kind(ResourceKind::Server).expect("servers");
                    assert!(servers.is_ok(), "writer {writer}: {:?}", servers.error);
                }
            });
        }
    });

    let root = home.read_json(".cursor/mcp.json");
    let servers = root["mcpServers"].as_object().expect("servers object");
    assert!(servers.contains_key("mine"));
    let managed: Vec<_> = servers
        .keys()
        .filter(|name| name.starts_with("srv-"))
        .collect();
    assert_eq!(managed.len(), 1, "expected exactly one writer's set, got {managed:?}");
    assert!(home.backups(".cursor/mcp.json") <= AppSettings::default().backup_retain);
}

#[test]
fn fail_fast_mode_reports_a_held_target() {
    let home = TestHome::new();
    home.install(".cursor");
    let target = home.join(".cursor/mcp.json");
    let _held = safe_io::lock(&target).expect("hold lock");

    let settings = AppSettings {
        lock_mode: LockMode::FailFast,
        ..AppSettings::default()
    };
    let registry = home.registry();
    let service = SyncService::new(&registry, home.context_with(settings));

    let mut set = ResourceSet::default();
    set.servers.push(Server::stdio("srv", "echo", &[]));
    set.rules.push(agentctl_lib::Rule::new("style", "tabs"));
    let outcome = service.sync_adapter("cursor", &set).expect("cursor");

    let servers = outcome.kind(ResourceKind::Server).expect("servers");
    let error = servers.error.as_deref().expect("contended");
    assert!(error.contains("held by another process"), "{error}");
    assert!(!target.exists());

    // Other targets of the same adapter are unaffected.
    assert!(outcome.kind(ResourceKind::Rule).expect("rules").is_ok());
}

#[test]
fn lock_serializes_read_increment_write() {
    let home = TestHome::new();
    let counter = home.join("counter.txt");
    std::fs::write(&counter, "0").expect("seed");

    thread::scope(|scope| {
        for _ in 0..WRITERS {
            let counter = &counter;
            scope.spawn(move || {
                for _ in 0..ROUNDS {
                    let mut guard = safe_io::lock(counter).expect("lock");
                    let current: usize = std::fs::read_to_string(counter)
                        .expect("read")
                        .trim()
                        .parse()
                        .expect("number");
                    safe_io::atomic_write(counter, (current + 1).to_string().as_bytes(), None)
                        .expect("write");
                    guard.unlock().expect("unlock");
                }
            });
        }
    });

    let total: usize = home.read("counter.txt").trim().parse().expect("number");
    assert_eq!(total, WRITERS * ROUNDS);
}

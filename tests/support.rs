#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use agentctl_lib::{
    logging, AdapterRegistry, AppSettings, Command, Ledger, ResourceSet, Rule, Server, Skill,
    SyncContext,
};
use tempfile::TempDir;

/// Isolated HOME for one test. Every test gets its own, so no test mutex is
/// needed around filesystem state.
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        logging::init_for_tests();
        Self {
            dir: TempDir::new().expect("create temp home"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn app_dir(&self) -> PathBuf {
        self.path().join(".agentctl")
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.path().join(rel)
    }

    /// Make a tool look installed by creating its config directory.
    pub fn install(&self, rel_dir: &str) -> &Self {
        fs::create_dir_all(self.join(rel_dir)).expect("create tool dir");
        self
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write fixture");
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.join(rel)).expect("read file")
    }

    pub fn read_json(&self, rel: &str) -> serde_json::Value {
        serde_json::from_str(&self.read(rel)).expect("parse json")
    }

    pub fn settings(&self) -> AppSettings {
        AppSettings::default()
    }

    pub fn registry(&self) -> AdapterRegistry {
        AdapterRegistry::with_builtin(self.path(), &self.settings()).expect("build registry")
    }

    pub fn context(&self) -> SyncContext {
        self.context_with(self.settings())
    }

    pub fn context_with(&self, settings: AppSettings) -> SyncContext {
        SyncContext::new(settings, Ledger::in_app_dir(&self.app_dir()))
    }

    pub fn backups(&self, rel: &str) -> usize {
        agentctl_lib::safe_io::list_backups(&self.join(rel))
            .expect("list backups")
            .len()
    }
}

/// A canonical set touching every kind, with one remote server.
pub fn sample_set() -> ResourceSet {
    let mut fs_server = Server::stdio("filesystem", "npx", &["-y", "@mcp/fs", "/tmp"]);
    fs_server.env.insert("LOG_LEVEL".into(), "warn".into());

    let mut review = Command::new("review", "Review the staged diff.");
    review.description = Some("Code review".into());

    let mut style = Rule::new("style", "Prefer small functions.");
    style.description = Some("House style".into());

    let mut skill = Skill::new("changelog", "Summarise merged PRs.");
    skill.description = Some("Write a changelog".into());

    ResourceSet {
        servers: vec![fs_server, Server::http("docs", "https://docs.example.com/mcp")],
        commands: vec![review],
        rules: vec![style, Rule::new("testing", "Every fix gets a test.")],
        skills: vec![skill],
    }
}

/// Every file under `root` with its bytes, keyed by relative path.
pub fn snapshot(root: &Path) -> std::collections::BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut std::collections::BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).expect("read dir") {
            let path = entry.expect("dir entry").path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).expect("relative").to_path_buf();
                out.insert(rel, fs::read(&path).expect("read file"));
            }
        }
    }
    let mut out = std::collections::BTreeMap::new();
    walk(root, root, &mut out);
    out
}

/// Install every built-in tool under `home`.
pub fn install_all(home: &TestHome) {
    for dir in [
        ".claude",
        ".codex",
        ".gemini",
        ".cursor",
        ".codeium/windsurf",
        ".config/opencode",
    ] {
        home.install(dir);
    }
}

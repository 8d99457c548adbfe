//! Loading a canonical resource directory:
//!
//! ```text
//! <dir>/servers.json            { "name": {spec} } or { "mcpServers": { ... } }
//! <dir>/commands/<name>.md
//! <dir>/rules/<name>.md
//! <dir>/skills/<name>/SKILL.md
//! ```

use serde_json::Value;
use std::fs;
use std::path::Path;

use super::{validate_name, Command, ResourceSet, Rule, Scope, Server, Skill};
use crate::config::read_json_file;
use crate::document::frontmatter::MarkdownDoc;
use crate::error::AppError;
use crate::mcp::server_from_spec;

impl ResourceSet {
    /// Read a canonical directory. Missing pieces are empty; invalid entries
    /// are skipped with a warning.
    pub fn load_dir(dir: &Path, scope: Scope) -> Result<Self, AppError> {
        let mut set = ResourceSet {
            servers: load_servers(&dir.join("servers.json"))?,
            commands: load_markdown(&dir.join("commands"), "command", |name, doc| {
                Command {
                    name: name.to_string(),
                    namespace: doc.get_str("namespace").map(str::to_string),
                    description: doc.get_str("description").map(str::to_string),
                    argument_hint: doc.get_str("argument-hint").map(str::to_string),
                    allowed_tools: doc.get_list("allowed-tools"),
                    model: doc.get_str("model").map(str::to_string),
                    body: doc.body.clone(),
                    ..Command::default()
                }
            })?,
            rules: load_markdown(&dir.join("rules"), "rule", |name, doc| Rule {
                name: name.to_string(),
                namespace: doc.get_str("namespace").map(str::to_string),
                description: doc.get_str("description").map(str::to_string),
                globs: doc.get_list("globs"),
                always_apply: doc.get_bool("alwaysApply").unwrap_or(false),
                body: doc.body.clone(),
                ..Rule::default()
            })?,
            skills: load_skills(&dir.join("skills"))?,
        };
        set.set_scope(scope);
        log::info!(
            "loaded {} servers, {} commands, {} rules, {} skills from {}",
            set.servers.len(),
            set.commands.len(),
            set.rules.len(),
            set.skills.len(),
            dir.display()
        );
        Ok(set)
    }

    /// Global definitions followed by local ones, so local wins on an
    /// effective-name collision.
    pub fn merge(global: ResourceSet, local: ResourceSet) -> ResourceSet {
        let mut merged = global;
        merged.servers.extend(local.servers);
        merged.commands.extend(local.commands);
        merged.rules.extend(local.rules);
        merged.skills.extend(local.skills);
        merged
    }
}

fn load_servers(path: &Path) -> Result<Vec<Server>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let root: Value = read_json_file(path)?;
    let map = root
        .get("mcpServers")
        .and_then(|v| v.as_object())
        .or_else(|| root.as_object())
        .ok_or_else(|| AppError::malformed(path, "servers.json must be an object"))?;

    let mut servers = Vec::new();
    for (name, spec) in map.iter() {
        let parsed = validate_name(name).and_then(|_| server_from_spec(name, spec));
        let mut server = match parsed {
            Ok(server) => server,
            Err(e) => {
                log::warn!("skipping server '{name}' in {}: {e}", path.display());
                continue;
            }
        };
        server.namespace = spec
            .get("namespace")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        servers.push(server);
    }
    Ok(servers)
}

fn load_markdown<T>(
    dir: &Path,
    what: &str,
    build: impl Fn(&str, &MarkdownDoc) -> T,
) -> Result<Vec<T>, AppError> {
    let mut out = Vec::new();
    for (name, path) in list_dir(dir, |p| {
        p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("md")
    })? {
        let name = name.trim_end_matches(".md").to_string();
        match read_markdown(&name, &path) {
            Ok(doc) => out.push(build(&name, &doc)),
            Err(e) => log::warn!("skipping {what} '{name}': {e}"),
        }
    }
    Ok(out)
}

fn load_skills(dir: &Path) -> Result<Vec<Skill>, AppError> {
    let mut out = Vec::new();
    for (name, path) in list_dir(dir, |p| p.join("SKILL.md").is_file())? {
        match read_markdown(&name, &path.join("SKILL.md")) {
            Ok(doc) => out.push(Skill {
                name: name.clone(),
                namespace: doc.get_str("namespace").map(str::to_string),
                description: doc.get_str("description").map(str::to_string),
                body: doc.body,
                ..Skill::default()
            }),
            Err(e) => log::warn!("skipping skill '{name}': {e}"),
        }
    }
    Ok(out)
}

fn read_markdown(name: &str, path: &Path) -> Result<MarkdownDoc, AppError> {
    validate_name(name)?;
    let text = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    MarkdownDoc::parse(&text)
}

/// Entries of `dir` accepted by `keep`, sorted by file name.
fn list_dir(
    dir: &Path,
    keep: impl Fn(&Path) -> bool,
) -> Result<Vec<(String, std::path::PathBuf)>, AppError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AppError::io(dir, e)),
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::io(dir, e))?;
        let path = entry.path();
        if keep(&path) {
            out.push((entry.file_name().to_string_lossy().to_string(), path));
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resource, Transport};
    use tempfile::TempDir;

    fn seed(dir: &Path) {
        fs::create_dir_all(dir.join("commands")).expect("mkdir");
        fs::create_dir_all(dir.join("rules")).expect("mkdir");
        fs::create_dir_all(dir.join("skills").join("lint")).expect("mkdir");
        fs::write(
            dir.join("servers.json"),
            r#"{"mcpServers": {
                "fs": {"command": "npx", "args": ["fs"]},
                "api": {"type": "http", "url": "https://x"},
                "broken": {"type": "sse"},
                "../evil": {"command": "rm"}
            }}"#,
        )
        .expect("seed");
        fs::write(
            dir.join("commands").join("review.md"),
            "---\ndescription: Review\nnamespace: team-review\n---\n\nLook closely.\n",
        )
        .expect("seed");
        fs::write(dir.join("commands").join("notes.txt"), "ignored").expect("seed");
        fs::write(dir.join("rules").join("style.md"), "Use rustfmt.\n").expect("seed");
        fs::write(
            dir.join("skills").join("lint").join("SKILL.md"),
            "---\ndescription: Lint things\n---\nRun clippy.\n",
        )
        .expect("seed");
    }

    #[test]
    fn loads_every_kind_and_skips_invalid_servers() {
        let dir = TempDir::new().expect("tempdir");
        seed(dir.path());
        let set = ResourceSet::load_dir(dir.path(), Scope::Local).expect("load");

        let names: Vec<_> = set.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["fs", "api"]);
        assert!(matches!(set.servers[1].transport, Transport::Http { .. }));

        assert_eq!(set.commands.len(), 1);
        assert_eq!(set.commands[0].effective_name(), "team-review");
        assert_eq!(set.commands[0].scope, Scope::Local);
        assert_eq!(set.rules[0].body, "Use rustfmt.");
        assert_eq!(set.skills[0].description.as_deref(), Some("Lint things"));
    }

    #[test]
    fn bare_server_map_and_empty_dir() {
        let dir = TempDir::new().expect("tempdir");
        assert!(ResourceSet::load_dir(dir.path(), Scope::Global)
            .expect("load")
            .is_empty());

        fs::write(dir.path().join("servers.json"), r#"{"git": {"command": "git-mcp"}}"#)
            .expect("seed");
        let set = ResourceSet::load_dir(dir.path(), Scope::Global).expect("load");
        assert_eq!(set.servers[0].name, "git");
    }

    #[test]
    fn merge_puts_local_last() {
        let mut global = ResourceSet::default();
        global.rules.push(Rule::new("style", "global"));
        let mut local = ResourceSet::default();
        local.rules.push(Rule::new("style", "local"));
        let merged = ResourceSet::merge(global, local);
        assert_eq!(merged.rules.len(), 2);
        assert_eq!(merged.rules[1].body, "local");
    }
}

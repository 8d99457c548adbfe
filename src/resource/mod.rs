//! Canonical resource model: servers, commands, rules and skills.

mod loader;
mod validation;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use validation::{validate_name, validate_names};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Server,
    Command,
    Rule,
    Skill,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Server,
        ResourceKind::Command,
        ResourceKind::Rule,
        ResourceKind::Skill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Server => "server",
            ResourceKind::Command => "command",
            ResourceKind::Rule => "rule",
            ResourceKind::Skill => "skill",
        }
    }

    /// Key used in the ownership ledger and in reports.
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Server => "servers",
            ResourceKind::Command => "commands",
            ResourceKind::Rule => "rules",
            ResourceKind::Skill => "skills",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a resource was defined. Provenance only; it does not pick a destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    #[default]
    Global,
}

/// Shared identity of every resource kind.
pub trait Resource {
    fn name(&self) -> &str;
    fn namespace(&self) -> Option<&str>;

    /// On-disk name: the namespace when set, else the name.
    fn effective_name(&self) -> &str {
        self.namespace()
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| self.name())
    }
}

macro_rules! impl_resource {
    ($($ty:ty),*) => {$(
        impl Resource for $ty {
            fn name(&self) -> &str {
                &self.name
            }
            fn namespace(&self) -> Option<&str> {
                self.namespace.as_deref()
            }
        }
    )*};
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
    Stdio {
        command: String,
        args: Vec<String>,
        cwd: Option<String>,
    },
    Http {
        url: String,
        headers: IndexMap<String, String>,
    },
    Sse {
        url: String,
        headers: IndexMap<String, String>,
    },
}

impl Transport {
    pub fn is_remote(&self) -> bool {
        !matches!(self, Transport::Stdio { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Transport::Stdio { .. } => "stdio",
            Transport::Http { .. } => "http",
            Transport::Sse { .. } => "sse",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    pub name: String,
    pub namespace: Option<String>,
    pub scope: Scope,
    pub transport: Transport,
    pub env: IndexMap<String, String>,
    pub enabled: bool,
}

impl Server {
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: &[&str]) -> Self {
        Self::with_transport(
            name,
            Transport::Stdio {
                command: command.into(),
                args: args.iter().map(|a| a.to_string()).collect(),
                cwd: None,
            },
        )
    }

    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            Transport::Http {
                url: url.into(),
                headers: IndexMap::new(),
            },
        )
    }

    pub fn sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            Transport::Sse {
                url: url.into(),
                headers: IndexMap::new(),
            },
        )
    }

    pub fn with_transport(name: impl Into<String>, transport: Transport) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            scope: Scope::Global,
            transport,
            env: IndexMap::new(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub name: String,
    pub namespace: Option<String>,
    pub scope: Scope,
    pub description: Option<String>,
    pub argument_hint: Option<String>,
    pub allowed_tools: Vec<String>,
    pub model: Option<String>,
    pub body: String,
}

impl Command {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    pub name: String,
    pub namespace: Option<String>,
    pub scope: Scope,
    pub description: Option<String>,
    pub globs: Vec<String>,
    pub always_apply: bool,
    pub body: String,
}

impl Rule {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skill {
    pub name: String,
    pub namespace: Option<String>,
    pub scope: Scope,
    pub description: Option<String>,
    pub body: String,
}

impl Skill {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            ..Self::default()
        }
    }
}

impl_resource!(Server, Command, Rule, Skill);

/// The canonical set projected onto every tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    pub servers: Vec<Server>,
    pub commands: Vec<Command>,
    pub rules: Vec<Rule>,
    pub skills: Vec<Skill>,
}

impl ResourceSet {
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
            && self.commands.is_empty()
            && self.rules.is_empty()
            && self.skills.is_empty()
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Server => self.servers.len(),
            ResourceKind::Command => self.commands.len(),
            ResourceKind::Rule => self.rules.len(),
            ResourceKind::Skill => self.skills.len(),
        }
    }

    /// Effective names of one kind, in set order.
    pub fn effective_names(&self, kind: ResourceKind) -> Vec<&str> {
        fn names<R: Resource>(items: &[R]) -> Vec<&str> {
            items.iter().map(|r| r.effective_name()).collect()
        }
        match kind {
            ResourceKind::Server => names(&self.servers),
            ResourceKind::Command => names(&self.commands),
            ResourceKind::Rule => names(&self.rules),
            ResourceKind::Skill => names(&self.skills),
        }
    }

    pub fn set_scope(&mut self, scope: Scope) {
        self.servers.iter_mut().for_each(|r| r.scope = scope);
        self.commands.iter_mut().for_each(|r| r.scope = scope);
        self.rules.iter_mut().for_each(|r| r.scope = scope);
        self.skills.iter_mut().for_each(|r| r.scope = scope);
    }
}

//! Coexistence of agentctl-managed and hand-written entries in one target.
//!
//! Two strategies decide which entries agentctl may delete:
//!
//! - [`Ownership::InlineMarker`]: entries carry `_agentctl = "managed"`.
//! - [`Ownership::Ledger`]: the names recorded in the side ledger on the
//!   previous run, for targets whose schema rejects unknown fields.
//!
//! Either way a write strips what agentctl owned last time and inserts the
//! current set. Anything else in the table is never read or modified, unless
//! a new managed entry takes its name.

mod file_set;
mod ledger;

use serde_json::{Map, Value};
use std::collections::HashSet;

pub use file_set::{EntryFormat, FileLayout, FileSet};
pub use ledger::{Ledger, LEDGER_VERSION};

use crate::document::frontmatter::MarkdownDoc;

pub const MARKER_KEY: &str = "_agentctl";
pub const MARKER_VALUE: &str = "managed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    InlineMarker,
    Ledger,
}

/// A name-keyed collection of entries some of which agentctl may own.
pub trait ManagedTable {
    type Entry;

    fn entry_names(&self) -> Vec<String>;
    fn contains(&self, name: &str) -> bool;
    /// Whether the entry carries the inline marker.
    fn is_managed(&self, name: &str) -> bool;
    fn remove_entry(&mut self, name: &str) -> bool;
    fn insert_entry(&mut self, name: &str, entry: Self::Entry);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Previously owned names that are gone after this run.
    pub removed: Vec<String>,
    pub inserted: Vec<String>,
    /// Hand-written entries replaced because a managed entry took the name.
    pub overwritten: Vec<String>,
}

/// Strip prior ownership from `table`, then insert `entries`.
///
/// `previous` is only consulted for [`Ownership::Ledger`].
pub fn reconcile<T: ManagedTable>(
    table: &mut T,
    ownership: Ownership,
    previous: &[String],
    entries: Vec<(String, T::Entry)>,
) -> Reconciled {
    let stripped = strip_owned(table, ownership, previous);
    let incoming: HashSet<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();

    let mut out = Reconciled {
        removed: stripped
            .iter()
            .filter(|name| !incoming.contains(name.as_str()))
            .cloned()
            .collect(),
        ..Reconciled::default()
    };

    for (name, entry) in entries {
        if table.contains(&name) && !out.inserted.contains(&name) {
            log::warn!("managed entry '{name}' replaces an entry agentctl did not own");
            out.overwritten.push(name.clone());
        }
        table.insert_entry(&name, entry);
        if !out.inserted.contains(&name) {
            out.inserted.push(name);
        }
    }
    out
}

/// Remove every entry owned under `ownership`; returns the removed names.
pub fn strip_owned<T: ManagedTable>(
    table: &mut T,
    ownership: Ownership,
    previous: &[String],
) -> Vec<String> {
    let owned: Vec<String> = match ownership {
        Ownership::InlineMarker => table
            .entry_names()
            .into_iter()
            .filter(|name| table.is_managed(name))
            .collect(),
        Ownership::Ledger => previous
            .iter()
            .filter(|name| table.contains(name))
            .cloned()
            .collect(),
    };
    owned
        .into_iter()
        .filter(|name| table.remove_entry(name))
        .collect()
}

pub fn mark_json(entry: &mut Map<String, Value>) {
    entry.insert(MARKER_KEY.into(), Value::String(MARKER_VALUE.into()));
}

pub fn is_marked_json(entry: &Value) -> bool {
    entry.get(MARKER_KEY).and_then(|v| v.as_str()) == Some(MARKER_VALUE)
}

pub fn mark_toml(entry: &mut toml_edit::Table) {
    entry.insert(MARKER_KEY, toml_edit::value(MARKER_VALUE));
}

pub fn is_marked_toml(entry: &toml_edit::Item) -> bool {
    entry
        .as_table_like()
        .and_then(|t| t.get(MARKER_KEY))
        .and_then(|v| v.as_str())
        == Some(MARKER_VALUE)
}

pub fn mark_frontmatter(doc: &mut MarkdownDoc) {
    doc.set(MARKER_KEY, MARKER_VALUE);
}

pub fn is_marked_frontmatter(doc: &MarkdownDoc) -> bool {
    doc.get_str(MARKER_KEY) == Some(MARKER_VALUE)
}

impl ManagedTable for Map<String, Value> {
    type Entry = Value;

    fn entry_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn is_managed(&self, name: &str) -> bool {
        self.get(name).is_some_and(is_marked_json)
    }

    fn remove_entry(&mut self, name: &str) -> bool {
        self.shift_remove(name).is_some()
    }

    fn insert_entry(&mut self, name: &str, entry: Value) {
        self.insert(name.to_string(), entry);
    }
}

impl ManagedTable for toml_edit::Table {
    type Entry = toml_edit::Item;

    fn entry_names(&self) -> Vec<String> {
        self.iter().map(|(k, _)| k.to_string()).collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn is_managed(&self, name: &str) -> bool {
        self.get(name).is_some_and(is_marked_toml)
    }

    fn remove_entry(&mut self, name: &str) -> bool {
        self.remove(name).is_some()
    }

    fn insert_entry(&mut self, name: &str, entry: toml_edit::Item) {
        self.insert(name, entry);
    }
}

//! Untyped, order-preserving views of tool config files.
//!
//! Every write re-serializes the whole tree, so keys this crate never looks
//! at come back out unchanged. JSON goes through `serde_json` with
//! `preserve_order`; TOML goes through `toml_edit`, which also keeps
//! comments and whitespace in untouched regions.

pub mod frontmatter;
pub mod instructions;

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::AppError;

/// A config file loaded as an untyped tree.
pub trait ConfigDocument: Sized {
    type Section;

    /// Empty document when the file is absent or blank; a parse failure is an error.
    fn load(path: &Path) -> Result<Self, AppError>;

    fn render(&self) -> Result<String, AppError>;

    fn has_section(&self, key: &str) -> bool;

    /// Get-or-create the named top-level section as a mapping.
    fn section_mut(&mut self, key: &str) -> Result<&mut Self::Section, AppError>;

    fn section(&self, key: &str) -> Option<&Self::Section>;

    fn remove_section(&mut self, key: &str);
}

fn read_optional(path: &Path) -> Result<Option<String>, AppError> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(None),
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::io(path, e)),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonDocument {
    root: Map<String, Value>,
}

impl JsonDocument {
    pub fn from_value(path: &Path, value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(AppError::malformed(
                path,
                format!("root must be a JSON object, found {}", json_type_name(&other)),
            )),
        }
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }
}

impl ConfigDocument for JsonDocument {
    type Section = Map<String, Value>;

    fn load(path: &Path) -> Result<Self, AppError> {
        let Some(text) = read_optional(path)? else {
            return Ok(Self::default());
        };
        let value: Value =
            serde_json::from_str(&text).map_err(|e| AppError::malformed(path, e))?;
        Self::from_value(path, value)
    }

    fn render(&self) -> Result<String, AppError> {
        let mut out = serde_json::to_string_pretty(&self.root)
            .map_err(|e| AppError::JsonSerialize { source: e })?;
        out.push('\n');
        Ok(out)
    }

    fn has_section(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    fn section_mut(&mut self, key: &str) -> Result<&mut Map<String, Value>, AppError> {
        let slot = self
            .root
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let found = json_type_name(slot);
        slot.as_object_mut().ok_or_else(|| {
            AppError::Config(format!("'{key}' must be a JSON object, found {found}"))
        })
    }

    fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.root.get(key).and_then(|v| v.as_object())
    }

    fn remove_section(&mut self, key: &str) {
        self.root.shift_remove(key);
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Default)]
pub struct TomlDocument {
    doc: toml_edit::DocumentMut,
}

impl TomlDocument {
    pub fn as_document(&self) -> &toml_edit::DocumentMut {
        &self.doc
    }

    pub fn as_document_mut(&mut self) -> &mut toml_edit::DocumentMut {
        &mut self.doc
    }
}

impl ConfigDocument for TomlDocument {
    type Section = toml_edit::Table;

    fn load(path: &Path) -> Result<Self, AppError> {
        let Some(text) = read_optional(path)? else {
            return Ok(Self::default());
        };
        let doc = text
            .parse::<toml_edit::DocumentMut>()
            .map_err(|e| AppError::malformed(path, e))?;
        Ok(Self { doc })
    }

    fn render(&self) -> Result<String, AppError> {
        Ok(self.doc.to_string())
    }

    fn has_section(&self, key: &str) -> bool {
        self.doc.contains_key(key)
    }

    fn section_mut(&mut self, key: &str) -> Result<&mut toml_edit::Table, AppError> {
        if !self.doc.contains_key(key) {
            let mut table = toml_edit::Table::new();
            // Only the child tables get headers.
            table.set_implicit(true);
            self.doc.insert(key, toml_edit::Item::Table(table));
        }
        self.doc
            .get_mut(key)
            .and_then(|item| item.as_table_mut())
            .ok_or_else(|| AppError::Config(format!("'{key}' must be a TOML table")))
    }

    fn section(&self, key: &str) -> Option<&toml_edit::Table> {
        self.doc.get(key).and_then(|item| item.as_table())
    }

    fn remove_section(&mut self, key: &str) {
        self.doc.remove(key);
    }
}

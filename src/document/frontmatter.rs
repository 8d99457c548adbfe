//! Markdown files with a YAML frontmatter block.
//!
//! ```text
//! ---
//! description: Review the staged diff
//! ---
//!
//! Body text...
//! ```

use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::AppError;

const DELIMITER: &str = "---";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkdownDoc {
    pub frontmatter: Mapping,
    pub body: String,
}

impl MarkdownDoc {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            frontmatter: Mapping::new(),
            body: normalize_body(&body.into()),
        }
    }

    /// Parse a Markdown document. Content without a leading `---` line has
    /// an empty frontmatter and is all body.
    pub fn parse(content: &str) -> Result<Self, AppError> {
        let mut lines = content.split_inclusive('\n');
        let Some(first) = lines.next() else {
            return Ok(Self::default());
        };
        if first.trim_end() != DELIMITER {
            return Ok(Self::new(content));
        }

        let mut yaml = String::new();
        let mut closed = false;
        let mut consumed = first.len();
        for line in lines.by_ref() {
            consumed += line.len();
            if line.trim_end() == DELIMITER {
                closed = true;
                break;
            }
            yaml.push_str(line);
        }
        if !closed {
            return Err(AppError::InvalidInput(
                "frontmatter is missing its closing '---' line".into(),
            ));
        }

        let frontmatter = if yaml.trim().is_empty() {
            Mapping::new()
        } else {
            match serde_yaml::from_str::<YamlValue>(&yaml) {
                Ok(YamlValue::Mapping(map)) => map,
                Ok(YamlValue::Null) => Mapping::new(),
                Ok(_) => {
                    return Err(AppError::InvalidInput(
                        "frontmatter must be a key/value mapping".into(),
                    ))
                }
                Err(e) => {
                    return Err(AppError::InvalidInput(format!(
                        "failed to parse frontmatter: {e}"
                    )))
                }
            }
        };

        Ok(Self {
            frontmatter,
            body: normalize_body(&content[consumed..]),
        })
    }

    pub fn render(&self) -> Result<String, AppError> {
        if self.frontmatter.is_empty() {
            return Ok(if self.body.is_empty() {
                String::new()
            } else {
                format!("{}\n", self.body)
            });
        }
        let yaml = serde_yaml::to_string(&self.frontmatter)
            .map_err(|e| AppError::Message(format!("failed to render frontmatter: {e}")))?;
        let mut out = format!("{DELIMITER}\n{yaml}{DELIMITER}\n");
        if !self.body.is_empty() {
            out.push('\n');
            out.push_str(&self.body);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.frontmatter.get(key).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.frontmatter.get(key).and_then(|v| v.as_bool())
    }

    /// A list field given either as a YAML sequence or a comma-separated string.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.frontmatter.get(key) {
            Some(YamlValue::Sequence(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(YamlValue::String(s)) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<YamlValue>) {
        self.frontmatter
            .insert(YamlValue::String(key.to_string()), value.into());
    }

    pub fn set_opt_str(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.set(key, value);
        }
    }

    pub fn set_list(&mut self, key: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        let seq = values
            .iter()
            .map(|v| YamlValue::String(v.clone()))
            .collect::<Vec<_>>();
        self.set(key, YamlValue::Sequence(seq));
    }

    pub fn remove(&mut self, key: &str) -> Option<YamlValue> {
        self.frontmatter.remove(key)
    }
}

fn normalize_body(raw: &str) -> String {
    raw.trim_start_matches(['\n', '\r']).trim_end().to_string()
}

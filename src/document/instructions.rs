//! Single-file instruction documents (`CLAUDE.md`, `AGENTS.md`, ...).
//!
//! agentctl owns only the region between [`BLOCK_BEGIN`] and [`BLOCK_END`];
//! everything outside it belongs to the user and is kept byte-for-byte.

use std::path::Path;

use crate::error::AppError;

pub const BLOCK_BEGIN: &str = "<!-- agentctl:begin -->";
pub const BLOCK_END: &str = "<!-- agentctl:end -->";

/// Separator placed between rule sections inside the managed block.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionsFile {
    before: String,
    managed: Option<String>,
    after: String,
}

impl InstructionsFile {
    pub fn parse(path: &Path, content: &str) -> Result<Self, AppError> {
        let Some(begin) = find_marker_line(content, BLOCK_BEGIN, 0) else {
            if find_marker_line(content, BLOCK_END, 0).is_some() {
                return Err(AppError::malformed(path, "managed block end without begin"));
            }
            return Ok(Self {
                before: content.to_string(),
                managed: None,
                after: String::new(),
            });
        };

        let inner_start = skip_line(content, begin + BLOCK_BEGIN.len());
        let Some(end) = find_marker_line(content, BLOCK_END, inner_start) else {
            return Err(AppError::malformed(path, "managed block is not closed"));
        };
        if find_marker_line(content, BLOCK_BEGIN, inner_start).is_some_and(|b| b < end) {
            return Err(AppError::malformed(path, "nested managed block"));
        }

        let inner = content[inner_start..end].trim_end_matches(['\n', '\r']);
        Ok(Self {
            before: content[..begin].to_string(),
            managed: Some(inner.to_string()),
            after: content[skip_line(content, end + BLOCK_END.len())..].to_string(),
        })
    }

    pub fn managed(&self) -> Option<&str> {
        self.managed.as_deref()
    }

    /// Replace (or with `None`, drop) the managed region.
    pub fn set_managed(&mut self, text: Option<String>) {
        self.managed = text.filter(|t| !t.trim().is_empty());
    }

    pub fn render(&self) -> String {
        let Some(managed) = &self.managed else {
            let mut out = self.before.clone();
            if self.after.is_empty() {
                let kept = out.trim_end().len();
                out.truncate(kept);
                if !out.is_empty() {
                    out.push('\n');
                }
            }
            out.push_str(&self.after);
            return out;
        };

        let mut out = self.before.clone();
        if !out.is_empty() && !out.ends_with("\n\n") {
            out.push_str(if out.ends_with('\n') { "\n" } else { "\n\n" });
        }
        out.push_str(BLOCK_BEGIN);
        out.push('\n');
        out.push_str(managed);
        out.push('\n');
        out.push_str(BLOCK_END);
        out.push('\n');
        out.push_str(&self.after);
        out
    }
}

/// Render named sections as `## <name>` headings joined by a `---` rule.
pub fn render_sections<'a, I>(sections: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let parts = sections
        .into_iter()
        .map(|(name, body)| {
            let body = body.trim();
            if body.is_empty() {
                format!("## {name}")
            } else {
                format!("## {name}\n\n{body}")
            }
        })
        .collect::<Vec<_>>();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(SECTION_SEPARATOR))
    }
}

/// Best-effort section names of a rendered block. Bodies that themselves
/// contain the separator make this inexact.
pub fn section_names(managed: &str) -> Vec<String> {
    managed
        .split(SECTION_SEPARATOR)
        .filter_map(|chunk| chunk.lines().next())
        .filter_map(|line| line.strip_prefix("## "))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Whether `text` has a begin or end marker on a line of its own.
pub fn contains_marker_line(text: &str) -> bool {
    find_marker_line(text, BLOCK_BEGIN, 0).is_some()
        || find_marker_line(text, BLOCK_END, 0).is_some()
}

fn find_marker_line(content: &str, marker: &str, from: usize) -> Option<usize> {
    let mut offset = from;
    while let Some(rel) = content[offset..].find(marker) {
        let at = offset + rel;
        let line_start = at == 0 || content.as_bytes()[at - 1] == b'\n';
        let rest = &content[at + marker.len()..];
        let line_end = rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n");
        if line_start && line_end {
            return Some(at);
        }
        offset = at + marker.len();
    }
    None
}

fn skip_line(content: &str, at: usize) -> usize {
    let rest = &content[at..];
    if rest.starts_with("\r\n") {
        at + 2
    } else if rest.starts_with('\n') {
        at + 1
    } else {
        at
    }
}

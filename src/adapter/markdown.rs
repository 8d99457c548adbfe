//! Markdown + frontmatter codecs shared by the tools that store commands,
//! rules and skills as `.md` files.

use indexmap::IndexMap;

use crate::document::frontmatter::MarkdownDoc;
use crate::document::instructions::{contains_marker_line, render_sections};
use crate::error::AppError;
use crate::ownership::mark_frontmatter;
use crate::resource::{validate_name, Command, Resource, Rule, Skill};

/// Frontmatter fields a tool understands for commands.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommandFields {
    pub argument_hint: bool,
    pub allowed_tools: bool,
    pub model: bool,
}

impl CommandFields {
    pub const ALL: CommandFields = CommandFields {
        argument_hint: true,
        allowed_tools: true,
        model: true,
    };
}

pub(crate) fn render_command(cmd: &Command, fields: CommandFields) -> Result<String, AppError> {
    let mut doc = MarkdownDoc::new(cmd.body.as_str());
    doc.set_opt_str("description", cmd.description.as_deref());
    if fields.argument_hint {
        doc.set_opt_str("argument-hint", cmd.argument_hint.as_deref());
    }
    if fields.allowed_tools && !cmd.allowed_tools.is_empty() {
        doc.set("allowed-tools", cmd.allowed_tools.join(", "));
    }
    if fields.model {
        doc.set_opt_str("model", cmd.model.as_deref());
    }
    mark_frontmatter(&mut doc);
    doc.render()
}

pub(crate) fn parse_command(name: &str, content: &str) -> Result<Command, AppError> {
    let doc = MarkdownDoc::parse(content)?;
    Ok(Command {
        name: name.to_string(),
        description: doc.get_str("description").map(str::to_string),
        argument_hint: doc.get_str("argument-hint").map(str::to_string),
        allowed_tools: doc.get_list("allowed-tools"),
        model: doc.get_str("model").map(str::to_string),
        body: doc.body,
        ..Command::default()
    })
}

/// Cursor-style rule file (`.mdc`).
pub(crate) fn render_rule(rule: &Rule) -> Result<String, AppError> {
    let mut doc = MarkdownDoc::new(rule.body.as_str());
    doc.set_opt_str("description", rule.description.as_deref());
    if !rule.globs.is_empty() {
        doc.set("globs", rule.globs.join(","));
    }
    doc.set("alwaysApply", rule.always_apply);
    mark_frontmatter(&mut doc);
    doc.render()
}

pub(crate) fn parse_rule(name: &str, content: &str) -> Result<Rule, AppError> {
    let doc = MarkdownDoc::parse(content)?;
    Ok(Rule {
        name: name.to_string(),
        description: doc.get_str("description").map(str::to_string),
        globs: doc.get_list("globs"),
        always_apply: doc.get_bool("alwaysApply").unwrap_or(false),
        body: doc.body,
        ..Rule::default()
    })
}

pub(crate) fn render_skill(skill: &Skill) -> Result<String, AppError> {
    let mut doc = MarkdownDoc::new(skill.body.as_str());
    doc.set("name", skill.effective_name());
    doc.set_opt_str("description", skill.description.as_deref());
    mark_frontmatter(&mut doc);
    doc.render()
}

pub(crate) fn parse_skill(name: &str, content: &str) -> Result<Skill, AppError> {
    let doc = MarkdownDoc::parse(content)?;
    Ok(Skill {
        name: name.to_string(),
        description: doc.get_str("description").map(str::to_string),
        body: doc.body,
        ..Skill::default()
    })
}

/// Body of the managed block for single-file rule targets.
///
/// Rules sharing an effective name collapse to the last one. A body that
/// carries a block marker line is rejected.
pub(crate) fn rules_block(rules: &[Rule]) -> Result<Option<String>, AppError> {
    let mut by_name: IndexMap<&str, &str> = IndexMap::new();
    for rule in rules {
        if contains_marker_line(&rule.body) {
            return Err(AppError::InvalidInput(format!(
                "rule '{}' contains an agentctl block marker line",
                rule.effective_name()
            )));
        }
        if by_name.insert(rule.effective_name(), rule.body.as_str()).is_some() {
            log::debug!("rule '{}' overrides an earlier definition", rule.effective_name());
        }
    }
    Ok(render_sections(by_name))
}

/// Read-back of a managed block: the whole region as one rule named `name`.
pub(crate) fn block_as_rule(name: &str, managed: Option<&str>) -> Vec<Rule> {
    match managed {
        Some(text) if !text.trim().is_empty() => vec![Rule::new(name, text)],
        _ => Vec::new(),
    }
}

/// Run `parse` over named files, skipping invalid names and unparsable files.
pub(crate) fn parse_each<T>(
    entries: Vec<(String, String)>,
    what: &str,
    parse: impl Fn(&str, &str) -> Result<T, AppError>,
) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|(name, content)| {
            if let Err(err) = validate_name(&name) {
                log::warn!("skipping {what} '{name}': {err}");
                return None;
            }
            match parse(&name, &content) {
                Ok(item) => Some(item),
                Err(err) => {
                    log::warn!("skipping {what} '{name}': {err}");
                    None
                }
            }
        })
        .collect()
}

//! Placeholder forms found in leaf templates

use crate::error::{GenerateError, Result};

use super::scan::find_input;

/// Reference carried by an `[INPUT...]` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRef {
    /// `[INPUT]`: the first positional input
    First,
    /// `[INPUT:<index>]`
    Index(usize),
    /// `[INPUT:<name>]`
    Name(String),
}

impl InputRef {
    /// Parse a matched `[INPUT]`/`[INPUT:<ref>]` placeholder
    pub fn parse(placeholder: &str) -> Option<Self> {
        let inner = placeholder.strip_prefix("[INPUT")?.strip_suffix(']')?;
        if inner.is_empty() {
            return Some(InputRef::First);
        }
        let reference = inner.strip_prefix(':')?;
        if reference.is_empty() {
            return None;
        }
        if !reference.bytes().all(|b| b.is_ascii_digit()) {
            return Some(InputRef::Name(reference.to_string()));
        }
        // an index too large for usize can never be in range
        Some(InputRef::Index(reference.parse().unwrap_or(usize::MAX)))
    }
}

/// A `[NAME]` or `[NAME:default]` placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable<'a> {
    pub name: &'a str,
    pub default: Option<&'a str>,
}

impl<'a> Variable<'a> {
    /// Parse a matched placeholder, splitting at the first `:`
    pub fn parse(placeholder: &'a str) -> Option<Self> {
        let inner = placeholder.strip_prefix('[')?.strip_suffix(']')?;
        match inner.split_once(':') {
            Some((name, default)) => Some(Self {
                name,
                default: Some(default),
            }),
            None => Some(Self {
                name: inner,
                default: None,
            }),
        }
    }
}

/// One entry of a trailing output declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEntry {
    /// Input placeholder forwarded as an output
    Input(String),
    /// `key:value`, a positional output also published under `key`
    Named { key: String, value: String },
    /// Any other identifier
    Plain(String),
}

impl OutputEntry {
    /// Positional value of the entry before input resolution
    pub fn value(&self) -> &str {
        match self {
            OutputEntry::Input(v) | OutputEntry::Plain(v) => v,
            OutputEntry::Named { value, .. } => value,
        }
    }

    /// Whether the positional value is an input placeholder
    pub fn is_input(&self) -> bool {
        find_input(self.value(), 0).is_some()
    }
}

/// Split the content of an output declaration into entries
///
/// Spaces are dropped and entries are separated by commas.
pub fn parse_output_entries(content: &str) -> Result<Vec<OutputEntry>> {
    let compact: String = content.chars().filter(|c| *c != ' ').collect();
    compact.split(',').map(parse_entry).collect()
}

fn parse_entry(entry: &str) -> Result<OutputEntry> {
    let invalid = || GenerateError::InvalidOutputSpec {
        block: String::new(),
        entry: entry.to_string(),
    };
    if entry.is_empty() {
        return Err(invalid());
    }
    if entry.starts_with("[INPUT") {
        return Ok(OutputEntry::Input(entry.to_string()));
    }

    let bracketed = entry
        .strip_prefix('[')
        .and_then(|e| e.strip_suffix(']'));
    let Some((key, value)) = bracketed.unwrap_or(entry).split_once(':') else {
        return Ok(OutputEntry::Plain(entry.to_string()));
    };
    if key.is_empty() || value.is_empty() {
        return Err(invalid());
    }
    if key == "INPUT" {
        return Ok(OutputEntry::Input(format!("[INPUT:{}]", value)));
    }
    Ok(OutputEntry::Named {
        key: key.to_string(),
        value: value.to_string(),
    })
}

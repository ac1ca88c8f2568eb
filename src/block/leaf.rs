//! Leaf blocks: prototxt templates rewritten in place

use std::path::Path;

use tracing::debug;

use crate::error::{GenerateError, Result};
use crate::expr;
use crate::params::ParameterSet;
use crate::template::{
    find_expression, find_input, find_prefix_key, find_variable, last_layer_top,
    parse_output_entries, rewrite_all, split_output_declaration, InputRef, OutputEntry, Resume,
    Variable,
};

use super::cursor::Cursor;
use super::read_source;

/// A terminal block holding rewritten prototxt text
#[derive(Debug, Clone)]
pub struct LeafBlock {
    name: String,
    params: ParameterSet,
    text: String,
    outputs: Vec<String>,
    named: indexmap::IndexMap<String, String>,
}

impl LeafBlock {
    pub fn new(name: impl Into<String>, params: ParameterSet) -> Self {
        Self {
            name: name.into(),
            params,
            text: String::new(),
            outputs: Vec::new(),
            named: indexmap::IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    /// Rewritten template text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Load the template at `file` and rewrite it
    pub fn load(&mut self, file: &Path, input: Cursor, prefix: &str) -> Result<Cursor> {
        let source = read_source(file)?;
        debug!(block = %self.name, file = %file.display(), prefix, "loading leaf block");
        self.load_source(&source, input, prefix)
    }

    /// Rewrite template `source` with `input` as the upstream cursor
    ///
    /// Stages run in a fixed order: prefix qualification, output
    /// declaration, input placeholders, inline expressions, then parameter
    /// placeholders.
    pub fn load_source(&mut self, source: &str, input: Cursor, prefix: &str) -> Result<Cursor> {
        self.rewrite(source, input, prefix)
            .map_err(|err| err.within(&self.name))
    }

    /// The rewritten text
    pub fn generate(&self) -> String {
        self.text.clone()
    }

    fn rewrite(&mut self, source: &str, input: Cursor, prefix: &str) -> Result<Cursor> {
        let mut named = input.named.clone();

        let mut text = if prefix.is_empty() {
            source.to_string()
        } else {
            qualify_names(source, prefix)?
        };

        let outputs = match split_output_declaration(&text) {
            Some((start, content)) => {
                let entries = parse_output_entries(content)?;
                text.truncate(start);
                for entry in &entries {
                    if let OutputEntry::Named { key, value } = entry {
                        let value = if entry.is_input() {
                            resolve_inputs(value, &input)?
                        } else {
                            qualify(prefix, value)
                        };
                        named.insert(key.clone(), value);
                    }
                }
                entries
                    .iter()
                    .map(|entry| match entry.is_input() {
                        true => entry.value().to_string(),
                        false => qualify(prefix, entry.value()),
                    })
                    .collect()
            }
            // already qualified by the prefix pass
            None => last_layer_top(&text)
                .map(|top| vec![top.to_string()])
                .unwrap_or_default(),
        };

        self.outputs = outputs
            .iter()
            .map(|output| resolve_inputs(output, &input))
            .collect::<Result<_>>()?;
        let text = resolve_inputs(&text, &input)?;

        let params = &self.params;
        let text = rewrite_all(&text, Resume::AtMatch, find_expression, |matched| {
            let inner = &matched[2..matched.len() - 2];
            let source = substitute_variables(inner, params)?;
            expr::evaluate_source(&source)
                .map(|value| value.to_string())
                .map_err(|err| GenerateError::expression(source, err))
        })?;
        self.text = substitute_variables(&text, params)?;
        self.named = named;

        Ok(Cursor {
            outputs: self.outputs.clone(),
            named: self.named.clone(),
        })
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Prefix the quoted values of `bottom:`, `top:` and `name:` keys
fn qualify_names(text: &str, prefix: &str) -> Result<String> {
    rewrite_all(text, Resume::AfterReplacement, find_prefix_key, |matched| {
        if find_input(matched, 0).is_some() {
            return Ok(matched.to_string());
        }
        Ok(match matched.find('"') {
            Some(quote) => format!(
                "{}\"{}/{}\"",
                &matched[..quote],
                prefix,
                &matched[quote + 1..matched.len() - 1]
            ),
            None => matched.to_string(),
        })
    })
}

fn resolve_inputs(text: &str, input: &Cursor) -> Result<String> {
    rewrite_all(text, Resume::AtMatch, find_input, |matched| {
        match InputRef::parse(matched) {
            Some(reference) => input.input(&reference),
            None => Ok(matched.to_string()),
        }
    })
}

/// Replace `[NAME]`/`[NAME:default]` placeholders; parameters win over defaults
fn substitute_variables(text: &str, params: &ParameterSet) -> Result<String> {
    rewrite_all(text, Resume::AtMatch, find_variable, |matched| {
        let Some(var) = Variable::parse(matched) else {
            return Ok(matched.to_string());
        };
        match (params.get(var.name), var.default) {
            (Some(value), _) => Ok(value.to_string()),
            (None, Some(default)) => Ok(default.to_string()),
            (None, None) => Err(GenerateError::unresolved(var.name)),
        }
    })
}

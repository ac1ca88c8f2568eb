//! Composite blocks: YAML nodes that expand into child blocks

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{GenerateError, Result};
use crate::expr::{self, Value};
use crate::params::ParameterSet;

use super::cursor::Cursor;
use super::leaf::LeafBlock;
use super::spec::{BlockSpec, CompositeConfig, Scalar};
use super::{child_path, read_source, Block, BlockKind, LoadContext};

/// A tree node whose text is the concatenation of its children
#[derive(Debug, Clone, Default)]
pub struct CompositeBlock {
    name: Option<String>,
    description: String,
    params: ParameterSet,
    children: Vec<Block>,
}

impl CompositeBlock {
    /// Create an unloaded composite with the given parameters
    pub fn new(params: ParameterSet) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Set the name; a name in the file does not replace it
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description; a description in the file does not replace it
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameters after merging the file's declared defaults
    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    pub fn children(&self) -> &[Block] {
        &self.children
    }

    /// Load the YAML node at `file` and all of its children
    ///
    /// Returns the cursor left by the last child, or `input` unchanged when
    /// no child contributed.
    pub fn load(
        &mut self,
        file: &Path,
        input: Cursor,
        prefix: &str,
        ctx: &mut LoadContext,
    ) -> Result<Cursor> {
        ctx.enter(file)?;
        let result = self.load_children(file, input, prefix, ctx);
        ctx.leave();
        result
    }

    /// Text of the children joined by newlines, under a banner when named
    pub fn generate(&self) -> String {
        let body = self
            .children
            .iter()
            .map(Block::generate)
            .collect::<Vec<_>>()
            .join("\n");
        match &self.name {
            Some(name) => format!("\n# --- {} ---\n# {}\n\n{}", name, self.description, body),
            None => body,
        }
    }

    fn load_children(
        &mut self,
        file: &Path,
        input: Cursor,
        prefix: &str,
        ctx: &mut LoadContext,
    ) -> Result<Cursor> {
        let source = read_source(file)?;
        let config = CompositeConfig::from_str(&source, file)?;

        if self.name.is_none() {
            self.name = config.name;
        }
        if self.description.is_empty() {
            if let Some(description) = config.description {
                self.description = description;
            }
        }
        for (key, value) in config.params {
            self.params.insert_default(key, value.0);
        }

        debug!(
            block = self.name.as_deref().unwrap_or_default(),
            file = %file.display(),
            depth = ctx.depth(),
            children = config.blocks.len(),
            "loading composite block"
        );

        let base = file.parent().unwrap_or_else(|| Path::new(""));
        let mut cursor = input;
        for spec in &config.blocks {
            cursor = self
                .load_child(spec, base, cursor, prefix, ctx)
                .map_err(|err| err.within(spec.display_name()))?;
            debug!(block = spec.display_name(), "cursor {}", cursor);
        }
        Ok(cursor)
    }

    fn load_child(
        &mut self,
        spec: &BlockSpec,
        base: &Path,
        cursor: Cursor,
        prefix: &str,
        ctx: &mut LoadContext,
    ) -> Result<Cursor> {
        let repeat = spec
            .repeat
            .as_ref()
            .map(|repeat| repeat_count(repeat, &self.params))
            .transpose()?;

        if let Some(hide) = &spec.hide {
            if is_hidden(&expr::evaluate_item(hide.as_str(), &self.params)?) {
                debug!(block = spec.display_name(), "hidden, skipping");
                return Ok(cursor);
            }
        }

        let prefix = join_prefix(prefix, &spec.prefix);
        let params = self
            .params
            .with_overrides(spec.params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .resolved_against(&self.params)?;

        let kind = match BlockKind::parse(&spec.kind) {
            Some(BlockKind::Predefined) => {
                warn!(block = spec.display_name(), "predefined blocks are not supported, skipping");
                return Ok(cursor);
            }
            Some(kind) => kind,
            None => {
                let err = GenerateError::UnknownBlockKind {
                    block: spec.display_name().to_string(),
                    kind: spec.kind.clone(),
                };
                warn!("{}, skipping", err);
                return Ok(cursor);
            }
        };
        let path = child_path(base, &spec.file, kind.extension());

        let mut cursor = cursor;
        match repeat {
            Some(count) => {
                for iteration in 1..=count {
                    let iteration_prefix = if prefix.is_empty() {
                        format!("iter_{}", iteration)
                    } else {
                        format!("{}_i{}", prefix, iteration)
                    };
                    let params = params.for_iteration(iteration)?;
                    cursor = self.instantiate(kind, spec, &path, params, cursor, &iteration_prefix, ctx)?;
                    cursor.apply_rules(&spec.output)?;
                }
            }
            None => {
                let params = params.for_iteration(1)?;
                cursor = self.instantiate(kind, spec, &path, params, cursor, &prefix, ctx)?;
                cursor.apply_rules(&spec.output)?;
            }
        }
        Ok(cursor)
    }

    #[allow(clippy::too_many_arguments)]
    fn instantiate(
        &mut self,
        kind: BlockKind,
        spec: &BlockSpec,
        path: &Path,
        params: ParameterSet,
        cursor: Cursor,
        prefix: &str,
        ctx: &mut LoadContext,
    ) -> Result<Cursor> {
        match kind {
            BlockKind::Composite => {
                let mut child = CompositeBlock::new(params).with_description(spec.description.as_str());
                if let Some(name) = &spec.name {
                    child = child.with_name(name.as_str());
                }
                let cursor = child.load(path, cursor, prefix, ctx)?;
                self.children.push(Block::Composite(child));
                Ok(cursor)
            }
            BlockKind::Leaf => {
                let mut child = LeafBlock::new(spec.display_name(), params);
                let cursor = child.load(path, cursor, prefix)?;
                self.children.push(Block::Leaf(child));
                Ok(cursor)
            }
            BlockKind::Predefined => Ok(cursor),
        }
    }
}

fn join_prefix(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}/{}", parent, child),
    }
}

/// Evaluate a `repeat` field to a non-negative count
fn repeat_count(repeat: &Scalar, params: &ParameterSet) -> Result<usize> {
    let value = expr::evaluate_item(repeat.as_str(), params)?;
    let invalid = || GenerateError::InvalidRepeat {
        block: String::new(),
        value: value.to_string(),
    };
    match &value {
        Value::Int(n) => usize::try_from(*n).map_err(|_| invalid()),
        Value::Float(x) if x.is_finite() && *x >= 0.0 => Ok(x.trunc() as usize),
        Value::Str(s) => s.trim().parse::<usize>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// `1`, `true` and `yes` (any case) hide a block
fn is_hidden(value: &Value) -> bool {
    matches!(
        value.to_string().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

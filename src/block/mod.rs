//! Composite and leaf blocks
//!
//! A model is a tree of blocks. Composite blocks are YAML files listing
//! child descriptors; leaf blocks are prototxt templates. Loading walks the
//! tree depth-first and threads a [`Cursor`] from each block to the next
//! sibling.

mod composite;
mod cursor;
mod leaf;
mod spec;

pub use composite::CompositeBlock;
pub use cursor::Cursor;
pub use leaf::LeafBlock;
pub use spec::{BlockSpec, CompositeConfig, OutputRule, Scalar, Slot};

use std::path::{Path, PathBuf};

use crate::error::{GenerateError, Result};

/// Default limit on composite nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A loaded block of either kind
#[derive(Debug, Clone)]
pub enum Block {
    Composite(CompositeBlock),
    Leaf(LeafBlock),
}

impl Block {
    /// Render the block's text
    pub fn generate(&self) -> String {
        match self {
            Block::Composite(block) => block.generate(),
            Block::Leaf(block) => block.generate(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Block::Composite(block) => block.name(),
            Block::Leaf(block) => Some(block.name()),
        }
    }
}

/// Kind named by a descriptor's `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Composite,
    Leaf,
    /// Recognised but never instantiated
    Predefined,
}

impl BlockKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "yaml" | "composite" => Some(BlockKind::Composite),
            "proto" | "leaf" => Some(BlockKind::Leaf),
            "predef" | "predefined" => Some(BlockKind::Predefined),
            _ => None,
        }
    }

    /// File extension appended to descriptor paths
    pub fn extension(self) -> &'static str {
        match self {
            BlockKind::Composite => "yaml",
            BlockKind::Leaf | BlockKind::Predefined => "prototxt",
        }
    }
}

/// Nesting state of one model load
#[derive(Debug, Clone)]
pub struct LoadContext {
    max_depth: usize,
    stack: Vec<PathBuf>,
}

impl Default for LoadContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl LoadContext {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            stack: Vec::new(),
        }
    }

    /// Current composite nesting depth
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn enter(&mut self, file: &Path) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            let chain = self
                .stack
                .iter()
                .chain(std::iter::once(&file.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect();
            return Err(GenerateError::RecursionLimit {
                limit: self.max_depth,
                chain,
            });
        }
        self.stack.push(file.to_path_buf());
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.stack.pop();
    }
}

/// Read a block file
pub(crate) fn read_source(path: &Path) -> Result<String> {
    if path.is_dir() {
        return Err(GenerateError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|err| GenerateError::io(path, err))
}

/// Path of a child file relative to `base`, with `extension` appended
/// unless already present
pub(crate) fn child_path(base: &Path, file: &str, extension: &str) -> PathBuf {
    let path = base.join(file);
    if path.extension().is_some_and(|ext| ext == extension) {
        return path;
    }
    let mut name = path.into_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

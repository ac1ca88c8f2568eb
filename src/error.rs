//! Error types for model generation

use std::path::PathBuf;

use thiserror::Error;

use crate::expr::ExpressionError;

/// Result alias used throughout the generator
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Errors that can occur while loading and rendering a model
#[derive(Debug, Error)]
pub enum GenerateError {
    /// A configuration or template file does not exist
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Reading or writing a file failed
    #[error("i/o error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// Malformed YAML configuration or template
    #[error("could not parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A parameter or named input that is not defined
    #[error("could not find referenced parameter '{name}' in block '{block}'")]
    UnresolvedReference { name: String, block: String },

    /// Positional input or output index past the end of the list
    #[error("index {index} is out of range ({len} values available) in block '{block}'")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        block: String,
    },

    /// `[INPUT]` used while no positional input is available
    #[error("no input found in block '{block}'")]
    NoInputFound { block: String },

    /// A parameter whose value refers back to itself
    #[error("cyclic parameter reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    /// Inline or parameter expression failed to parse or evaluate
    #[error("invalid expression '{expr}' in block '{block}': {source}")]
    Expression {
        block: String,
        expr: String,
        #[source]
        source: ExpressionError,
    },

    /// Malformed entry in a leaf's output declaration
    #[error("invalid output declaration entry '{entry}' in block '{block}'")]
    InvalidOutputSpec { block: String, entry: String },

    /// Repeat count that is not a non-negative integer
    #[error("invalid repeat count '{value}' for block '{block}'")]
    InvalidRepeat { block: String, value: String },

    /// Composite nesting deeper than the configured limit
    #[error("composite nesting exceeds {limit} levels: {}", chain.join(" -> "))]
    RecursionLimit { limit: usize, chain: Vec<String> },

    /// Placeholder substitution that keeps producing new placeholders
    #[error("substituting '{placeholder}' did not terminate in block '{block}'")]
    RewriteLimit { block: String, placeholder: String },

    /// Descriptor with a kind the generator does not know (skipped, never fatal)
    #[error("unknown block type '{kind}' for block '{block}'")]
    UnknownBlockKind { block: String, kind: String },
}

impl GenerateError {
    /// Create an unresolved reference error
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            name: name.into(),
            block: String::new(),
        }
    }

    /// Create an expression error for the given source
    pub fn expression(expr: impl Into<String>, source: ExpressionError) -> Self {
        Self::Expression {
            block: String::new(),
            expr: expr.into(),
            source,
        }
    }

    /// Map an i/o error on `path`, keeping "not found" distinct
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound { path },
            _ => Self::Io {
                path,
                message: err.to_string(),
            },
        }
    }

    /// Attach the name of the block being loaded if none is set yet
    pub fn within(mut self, name: &str) -> Self {
        match &mut self {
            Self::UnresolvedReference { block, .. }
            | Self::IndexOutOfRange { block, .. }
            | Self::NoInputFound { block }
            | Self::Expression { block, .. }
            | Self::InvalidOutputSpec { block, .. }
            | Self::InvalidRepeat { block, .. }
            | Self::RewriteLimit { block, .. }
            | Self::UnknownBlockKind { block, .. } => {
                if block.is_empty() {
                    *block = name.to_string();
                }
            }
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_sets_block_once() {
        let err = GenerateError::unresolved("NUM").within("conv1").within("root");
        assert_eq!(
            err.to_string(),
            "could not find referenced parameter 'NUM' in block 'conv1'"
        );
    }

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let err = GenerateError::io(
            "missing.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, GenerateError::FileNotFound { .. }));
    }

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = GenerateError::CyclicReference {
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "cyclic parameter reference: A -> B -> A");
    }
}

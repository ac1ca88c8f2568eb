//! Restricted inline expressions
//!
//! Expressions appear in three places: `!!`-marked parameter values,
//! `repeat`/`hide` descriptor fields, and `[[...]]` spans inside leaf
//! templates. They support literals, arithmetic, string concatenation,
//! comparisons, `and`/`or`/`not` and a handful of pure functions
//! (`int`, `float`, `str`, `abs`, `min`, `max`, `round`). Nothing else is
//! reachable: bare names and unknown functions are errors.
//!
//! ```
//! use protogen::expr::{evaluate_source, Value};
//!
//! assert_eq!(evaluate_source("64 * 2 + 1").unwrap(), Value::Int(129));
//! ```

mod ast;
mod error;
mod eval;
mod grammar;
mod lexer;

pub use ast::{BinaryOp, Expr, ExprKind, UnaryOp, Value};
pub use error::{ExpressionError, Span};
pub use grammar::parse;

use crate::error::{GenerateError, Result};
use crate::params::{resolve_references, ParameterSet, EXPRESSION_MARKER};

/// Parse and evaluate an expression that contains no parameter references
pub fn evaluate_source(source: &str) -> std::result::Result<Value, ExpressionError> {
    eval::eval(&parse(source)?)
}

/// Substitute `::NAME` references from `params`, then evaluate
pub fn evaluate(expr: &str, params: &ParameterSet) -> Result<Value> {
    let resolved = resolve_references(expr, params, false)?;
    evaluate_source(&resolved).map_err(|source| GenerateError::expression(resolved, source))
}

/// Fully evaluate a descriptor item such as `repeat` or `hide`
///
/// References are always resolved (the loop variable included). The result
/// is evaluated only when it carries the `!!` marker; otherwise it is
/// returned as a string.
pub fn evaluate_item(item: &str, params: &ParameterSet) -> Result<Value> {
    let resolved = resolve_references(item, params, false)?;
    match resolved.strip_prefix(EXPRESSION_MARKER) {
        Some(expr) => {
            evaluate_source(expr).map_err(|source| GenerateError::expression(expr, source))
        }
        None => Ok(Value::Str(resolved)),
    }
}

//! Error types for expression parsing and evaluation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use super::lexer::Token;

/// Byte range in the expression source
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character at {span:?}")]
    InvalidToken { span: Span },

    #[error("syntax error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    #[error("unknown name '{name}'")]
    UnknownName { name: String, span: Span },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, span: Span },

    #[error("{name}() takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
        span: Span,
    },

    #[error("unsupported operand type(s) for '{op}': {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
        span: Span,
    },

    #[error("cannot convert '{value}' with {name}()")]
    InvalidConversion {
        name: String,
        value: String,
        span: Span,
    },

    #[error("division by zero")]
    DivisionByZero { span: Span },

    #[error("integer overflow")]
    Overflow { span: Span },
}

impl ExpressionError {
    /// Source range the error points at, if any
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Empty => None,
            Self::InvalidToken { span }
            | Self::Syntax { span, .. }
            | Self::UnknownName { span, .. }
            | Self::UnknownFunction { span, .. }
            | Self::Arity { span, .. }
            | Self::TypeMismatch { span, .. }
            | Self::InvalidConversion { span, .. }
            | Self::DivisionByZero { span }
            | Self::Overflow { span } => Some(span.clone()),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.span().unwrap_or(0..source.len());
        let expected = match self {
            Self::Syntax { expected, .. } if !expected.is_empty() => {
                format!("\nExpected: {}", expected.join(", "))
            }
            _ => String::new(),
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_message(format!("{}{}", self, expected))
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ExpressionError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichPattern;

        let message = match err.found() {
            Some(tok) => format!("unexpected {}", format_token(tok)),
            None => "unexpected end of expression".to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|pattern| match pattern {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of input".to_string()),
                _ => None,
            })
            .collect();

        ExpressionError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("name '{}'", s),
        Token::Str(s) => format!("string '{}'", s),
        Token::Int(n) => format!("number {}", n),
        Token::Float(n) => format!("number {}", n),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::DoubleSlash => "'//'".to_string(),
        Token::Percent => "'%'".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_points_at_span() {
        let err = ExpressionError::UnknownName {
            name: "os".to_string(),
            span: 4..6,
        };
        let report = err.format("1 + os", "expression");
        assert!(report.contains("unknown name 'os'"));
    }

    #[test]
    fn test_empty_has_no_span() {
        assert_eq!(ExpressionError::Empty.span(), None);
    }
}

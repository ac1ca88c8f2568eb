//! Expression parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use super::ast::{BinaryOp, Expr, ExprKind, UnaryOp, Value};
use super::error::ExpressionError;
use super::lexer::{lex, Token};

/// Parse an expression source into a tree
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let len = input.len();
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            errs.into_iter()
                .next()
                .map(ExpressionError::from)
                .unwrap_or(ExpressionError::Empty)
        })
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn binary(left: Expr, (op, right): (BinaryOp, Expr)) -> Expr {
    let span = left.span.start..right.span.end;
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn unary((op, op_span): (UnaryOp, std::ops::Range<usize>), operand: Expr) -> Expr {
    let span = op_span.start..operand.span.end;
    Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        span,
    )
}

fn expression_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let literal = select! {
            Token::Int(n) => ExprKind::Literal(Value::Int(n)),
            Token::Float(x) => ExprKind::Literal(Value::Float(x)),
            Token::Str(s) => ExprKind::Literal(Value::Str(s)),
            Token::True => ExprKind::Literal(Value::Bool(true)),
            Token::False => ExprKind::Literal(Value::Bool(false)),
        }
        .map_with(|kind, e| Expr::new(kind, span_range(&e.span())));

        let name = select! {
            Token::Ident(s) => s,
        };

        // Function call: name(arg, ...)
        let call = name
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .allow_trailing()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .map_with(|(name, args), e| {
                Expr::new(ExprKind::Call { name, args }, span_range(&e.span()))
            });

        let variable = name.map_with(|name, e| Expr::new(ExprKind::Name(name), span_range(&e.span())));

        // Note: call must come before variable, both start with an identifier
        let atom = choice((
            literal,
            call,
            variable,
            expr.clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ))
        .boxed();

        let sign = choice((
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Plus).to(UnaryOp::Pos),
        ))
        .map_with(|op, e| (op, span_range(&e.span())));

        let signed = sign.repeated().foldr(atom, unary).boxed();

        let product = signed
            .clone()
            .foldl(
                choice((
                    just(Token::Star).to(BinaryOp::Mul),
                    just(Token::DoubleSlash).to(BinaryOp::FloorDiv),
                    just(Token::Slash).to(BinaryOp::Div),
                    just(Token::Percent).to(BinaryOp::Mod),
                ))
                .then(signed)
                .repeated(),
                binary,
            )
            .boxed();

        let sum = product
            .clone()
            .foldl(
                choice((
                    just(Token::Plus).to(BinaryOp::Add),
                    just(Token::Minus).to(BinaryOp::Sub),
                ))
                .then(product)
                .repeated(),
                binary,
            )
            .boxed();

        let comparison = sum
            .clone()
            .foldl(
                choice((
                    just(Token::Equal).to(BinaryOp::Equal),
                    just(Token::NotEqual).to(BinaryOp::NotEqual),
                    just(Token::LessOrEqual).to(BinaryOp::LessOrEqual),
                    just(Token::GreaterOrEqual).to(BinaryOp::GreaterOrEqual),
                    just(Token::Less).to(BinaryOp::Less),
                    just(Token::Greater).to(BinaryOp::Greater),
                ))
                .then(sum)
                .repeated(),
                binary,
            )
            .boxed();

        let negation = just(Token::Not)
            .to(UnaryOp::Not)
            .map_with(|op, e| (op, span_range(&e.span())))
            .repeated()
            .foldr(comparison, unary)
            .boxed();

        let conjunction = negation
            .clone()
            .foldl(
                just(Token::And).to(BinaryOp::And).then(negation).repeated(),
                binary,
            )
            .boxed();

        conjunction
            .clone()
            .foldl(
                just(Token::Or).to(BinaryOp::Or).then(conjunction).repeated(),
                binary,
            )
            .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op_of(expr: &Expr) -> Option<BinaryOp> {
        match &expr.kind {
            ExprKind::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    #[test]
    fn test_parse_literal() {
        let expr = parse("42").expect("Should parse");
        assert_eq!(expr.kind, ExprKind::Literal(Value::Int(42)));
        assert_eq!(expr.span, 0..2);
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let expr = parse("1 + 2 * 3").expect("Should parse");
        assert_eq!(op_of(&expr), Some(BinaryOp::Add));
        match &expr.kind {
            ExprKind::Binary { right, .. } => assert_eq!(op_of(right), Some(BinaryOp::Mul)),
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parentheses_group() {
        let expr = parse("(1 + 2) * 3").expect("Should parse");
        assert_eq!(op_of(&expr), Some(BinaryOp::Mul));
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse("10 - 4 - 3").expect("Should parse");
        match &expr.kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(*op, BinaryOp::Sub);
                assert_eq!(op_of(left), Some(BinaryOp::Sub));
            }
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_precedence() {
        let expr = parse("not 1 < 2 or 3 == 3 and false").expect("Should parse");
        assert_eq!(op_of(&expr), Some(BinaryOp::Or));
    }

    #[test]
    fn test_parse_call() {
        let expr = parse("max(1, 2,)").expect("Should parse");
        match expr.kind {
            ExprKind::Call { name, args } => {
                assert_eq!(name, "max");
                assert_eq!(args.len(), 2);
            }
            other => panic!("Expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_name_parses_as_name() {
        let expr = parse("ITER").expect("Should parse");
        assert_eq!(expr.kind, ExprKind::Name("ITER".to_string()));
    }

    #[test]
    fn test_trailing_operator_is_syntax_error() {
        let err = parse("1 +").unwrap_err();
        assert!(matches!(err, ExpressionError::Syntax { .. }));
    }

    #[test]
    fn test_unbalanced_parenthesis_is_syntax_error() {
        assert!(matches!(
            parse("(1 + 2"),
            Err(ExpressionError::Syntax { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse("   "), Err(ExpressionError::Empty));
    }
}

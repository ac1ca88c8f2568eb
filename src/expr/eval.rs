//! Tree-walking evaluator for parsed expressions
//!
//! The evaluator has no environment: every value comes from a literal in the
//! expression itself or from one of the whitelisted pure functions.

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, ExprKind, UnaryOp, Value};
use super::error::{ExpressionError, Span};

/// Evaluate an expression tree
pub fn eval(expr: &Expr) -> Result<Value, ExpressionError> {
    match &expr.kind {
        ExprKind::Literal(value) => Ok(value.clone()),
        ExprKind::Name(name) => Err(ExpressionError::UnknownName {
            name: name.clone(),
            span: expr.span.clone(),
        }),
        ExprKind::Call { name, args } => {
            let values = args.iter().map(eval).collect::<Result<Vec<_>, _>>()?;
            call(name, &values, &expr.span)
        }
        ExprKind::Unary { op, operand } => eval_unary(*op, eval(operand)?, &expr.span),
        ExprKind::Binary { op, left, right } => {
            let left = eval(left)?;
            // and/or short-circuit and yield one of their operands
            match op {
                BinaryOp::And if !left.is_truthy() => Ok(left),
                BinaryOp::Or if left.is_truthy() => Ok(left),
                BinaryOp::And | BinaryOp::Or => eval(right),
                _ => eval_binary(*op, left, eval(right)?, &expr.span),
            }
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value, span: &Span) -> Result<Value, ExpressionError> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(ExpressionError::Overflow { span: span.clone() }),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Pos, value @ (Value::Int(_) | Value::Float(_))) => Ok(value),
        (op, value) => Err(ExpressionError::TypeMismatch {
            op: if op == UnaryOp::Neg { "unary -" } else { "unary +" },
            left: value.type_name(),
            right: value.type_name(),
            span: span.clone(),
        }),
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value, span: &Span) -> Result<Value, ExpressionError> {
    let mismatch = |left: &Value, right: &Value| ExpressionError::TypeMismatch {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
        span: span.clone(),
    };
    let overflow = || ExpressionError::Overflow { span: span.clone() };
    let zero = || ExpressionError::DivisionByZero { span: span.clone() };

    match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int).ok_or_else(overflow),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            _ => float_op(&left, &right, |a, b| a + b).ok_or_else(|| mismatch(&left, &right)),
        },
        BinaryOp::Sub => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int).ok_or_else(overflow),
            _ => float_op(&left, &right, |a, b| a - b).ok_or_else(|| mismatch(&left, &right)),
        },
        BinaryOp::Mul => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int).ok_or_else(overflow),
            _ => float_op(&left, &right, |a, b| a * b).ok_or_else(|| mismatch(&left, &right)),
        },
        BinaryOp::Div => {
            let (a, b) = numeric_pair(&left, &right).ok_or_else(|| mismatch(&left, &right))?;
            if b == 0.0 {
                return Err(zero());
            }
            Ok(Value::Float(a / b))
        }
        BinaryOp::FloorDiv => match (&left, &right) {
            (Value::Int(_), Value::Int(0)) => Err(zero()),
            (Value::Int(a), Value::Int(b)) => floor_div(*a, *b).map(Value::Int).ok_or_else(overflow),
            _ => {
                let (a, b) = numeric_pair(&left, &right).ok_or_else(|| mismatch(&left, &right))?;
                if b == 0.0 {
                    return Err(zero());
                }
                Ok(Value::Float((a / b).floor()))
            }
        },
        BinaryOp::Mod => match (&left, &right) {
            (Value::Int(_), Value::Int(0)) => Err(zero()),
            // result takes the sign of the divisor
            (Value::Int(a), Value::Int(b)) => a
                .checked_rem(*b)
                .map(|r| if r != 0 && ((r < 0) != (*b < 0)) { r + b } else { r })
                .map(Value::Int)
                .ok_or_else(overflow),
            _ => {
                let (a, b) = numeric_pair(&left, &right).ok_or_else(|| mismatch(&left, &right))?;
                if b == 0.0 {
                    return Err(zero());
                }
                Ok(Value::Float(a - b * (a / b).floor()))
            }
        },
        BinaryOp::Equal => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
            let ordering = compare(&left, &right).ok_or_else(|| mismatch(&left, &right))?;
            let result = match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessOrEqual => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        // the left operand did not decide the result
        BinaryOp::And | BinaryOp::Or => Ok(right),
    }
}

fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    Some((left.as_f64()?, right.as_f64()?))
}

fn float_op(left: &Value, right: &Value, f: impl Fn(f64, f64) -> f64) -> Option<Value> {
    numeric_pair(left, right).map(|(a, b)| Value::Float(f(a, b)))
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => match numeric_pair(left, right) {
            Some((a, b)) => a == b,
            None => false,
        },
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            let (a, b) = numeric_pair(left, right)?;
            a.partial_cmp(&b)
        }
    }
}

/// Dispatch one of the whitelisted functions
fn call(name: &str, args: &[Value], span: &Span) -> Result<Value, ExpressionError> {
    let arity = |expected: &'static str| ExpressionError::Arity {
        name: name.to_string(),
        expected,
        found: args.len(),
        span: span.clone(),
    };
    let conversion = |value: &Value| ExpressionError::InvalidConversion {
        name: name.to_string(),
        value: value.to_string(),
        span: span.clone(),
    };

    match name {
        "int" => {
            let [value] = args else { return Err(arity("1")) };
            match value {
                Value::Int(n) => Ok(Value::Int(*n)),
                Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| conversion(value)),
                Value::Float(_) => Err(conversion(value)),
            }
        }
        "float" => {
            let [value] = args else { return Err(arity("1")) };
            match value {
                Value::Int(n) => Ok(Value::Float(*n as f64)),
                Value::Float(x) => Ok(Value::Float(*x)),
                Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
                Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| conversion(value)),
            }
        }
        "str" => {
            let [value] = args else { return Err(arity("1")) };
            Ok(Value::Str(value.to_string()))
        }
        "abs" => {
            let [value] = args else { return Err(arity("1")) };
            match value {
                Value::Int(n) => n
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or(ExpressionError::Overflow { span: span.clone() }),
                Value::Float(x) => Ok(Value::Float(x.abs())),
                other => Err(conversion(other)),
            }
        }
        "min" | "max" => {
            let (first, rest) = args.split_first().ok_or_else(|| arity("at least 1"))?;
            let wanted = if name == "min" { Ordering::Less } else { Ordering::Greater };
            let mut best = first;
            for candidate in rest {
                let ordering = compare(candidate, best).ok_or_else(|| ExpressionError::TypeMismatch {
                    op: if name == "min" { "min" } else { "max" },
                    left: best.type_name(),
                    right: candidate.type_name(),
                    span: span.clone(),
                })?;
                if ordering == wanted {
                    best = candidate;
                }
            }
            Ok(best.clone())
        }
        "round" => match args {
            [Value::Int(n)] => Ok(Value::Int(*n)),
            [Value::Float(x)] if x.is_finite() => Ok(Value::Int(x.round_ties_even() as i64)),
            [value, Value::Int(digits)] => {
                let x = value.as_f64().ok_or_else(|| conversion(value))?;
                let scale = 10f64.powi(i32::try_from(*digits).map_err(|_| conversion(value))?);
                Ok(Value::Float((x * scale).round_ties_even() / scale))
            }
            [value] | [value, _] => Err(conversion(value)),
            _ => Err(arity("1 or 2")),
        },
        _ => Err(ExpressionError::UnknownFunction {
            name: name.to_string(),
            span: span.clone(),
        }),
    }
}

//! Compile-time evaluation of expressions.
//!
//! Only integer arithmetic is folded. Identifiers, string literals and
//! sprite-group references are already in normal form and come back as they
//! went in.

use nml::expression::{BinaryOperator, Expression, ExpressionType, UnaryOperator};

use crate::error::{CompileError, CompileErrorKind};

/// Fold constant sub-expressions. The result is in normal form.
pub fn reduce(expr: &Expression) -> Result<Expression, CompileError> {
    match expr {
        Expression::ConstantNumeric(..)
        | Expression::StringLiteral(..)
        | Expression::Identifier(_)
        | Expression::SpriteGroupRef(_) => Ok(expr.clone()),

        Expression::UnaryOperation {
            operator,
            operand,
            span,
        } => {
            let value = match reduce(operand)? {
                Expression::ConstantNumeric(value, _) => value,
                operand => {
                    check_integer_operand(&operand)?;
                    return Ok(Expression::UnaryOperation {
                        operator: *operator,
                        operand: Box::new(operand),
                        span: span.clone(),
                    });
                }
            };
            let result = match operator {
                UnaryOperator::Negation => value
                    .checked_neg()
                    .ok_or_else(|| overflow(span.clone()))?,
                UnaryOperator::BitwiseNot => !value,
            };
            Ok(Expression::ConstantNumeric(result, span.clone()))
        }

        Expression::BinaryOperation {
            operator,
            left,
            right,
            span,
        } => {
            let left = reduce(left)?;
            let right = reduce(right)?;
            match (&left, &right) {
                (Expression::ConstantNumeric(l, _), Expression::ConstantNumeric(r, _)) => {
                    let value = fold_binary(*operator, *l, *r, span)?;
                    Ok(Expression::ConstantNumeric(value, span.clone()))
                }
                _ => {
                    check_integer_operand(&left)?;
                    check_integer_operand(&right)?;
                    Ok(Expression::BinaryOperation {
                        operator: *operator,
                        left: Box::new(left),
                        right: Box::new(right),
                        span: span.clone(),
                    })
                }
            }
        }
    }
}

/// Reduce `expr` and require a compile-time integer.
pub fn reduce_constant(expr: &Expression) -> Result<i64, CompileError> {
    match reduce(expr)? {
        Expression::ConstantNumeric(value, _) => Ok(value),
        Expression::Identifier(ident) => Err(CompileError::new(
            CompileErrorKind::Type {
                what: "expression".into(),
                expected: "a compile-time integer constant".into(),
                found: format!("unknown identifier '{}'", ident.value),
            },
            ident.span,
        )),
        other => Err(CompileError::new(
            CompileErrorKind::Type {
                what: "expression".into(),
                expected: "a compile-time integer constant".into(),
                found: other.type_tag().to_string(),
            },
            other.span().clone(),
        )),
    }
}

/// Operands of arithmetic must be integers (or names that may stand for one).
fn check_integer_operand(expr: &Expression) -> Result<(), CompileError> {
    match expr.type_tag() {
        ExpressionType::Integer | ExpressionType::Identifier => Ok(()),
        other => Err(CompileError::new(
            CompileErrorKind::Type {
                what: "operand".into(),
                expected: "an integer".into(),
                found: other.to_string(),
            },
            expr.span().clone(),
        )),
    }
}

fn fold_binary(
    operator: BinaryOperator,
    l: i64,
    r: i64,
    span: &std::ops::Range<usize>,
) -> Result<i64, CompileError> {
    let result = match operator {
        BinaryOperator::Addition => l.checked_add(r),
        BinaryOperator::Subtraction => l.checked_sub(r),
        BinaryOperator::Multiplication => l.checked_mul(r),
        BinaryOperator::Division | BinaryOperator::Modulo if r == 0 => {
            return Err(CompileError::new(
                CompileErrorKind::Arithmetic("division by zero".into()),
                span.clone(),
            ));
        }
        BinaryOperator::Division => l.checked_div(r),
        BinaryOperator::Modulo => l.checked_rem(r),
        BinaryOperator::BitwiseAnd => Some(l & r),
        BinaryOperator::BitwiseOr => Some(l | r),
        BinaryOperator::BitwiseXor => Some(l ^ r),
        BinaryOperator::ShiftLeft => u32::try_from(r).ok().and_then(|r| l.checked_shl(r)),
        BinaryOperator::ShiftRight => u32::try_from(r).ok().and_then(|r| l.checked_shr(r)),
    };
    result.ok_or_else(|| overflow(span.clone()))
}

fn overflow(span: std::ops::Range<usize>) -> CompileError {
    CompileError::new(
        CompileErrorKind::Arithmetic("integer overflow in constant expression".into()),
        span,
    )
}

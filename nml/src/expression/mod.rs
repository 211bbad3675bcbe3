pub mod spritegroup_ref;

use std::fmt;
use std::ops::Range;

pub use spritegroup_ref::{CB_FAILED, ReferenceKind, SpriteGroupRef};

/// Deepest expression tree accepted anywhere in the compiler.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

/// A bare name as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub value: String,
    pub span: Range<usize>,
}

impl Identifier {
    pub fn new(value: impl Into<String>, span: Range<usize>) -> Self {
        Identifier {
            value: value.into(),
            span,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Arithmetic negation: -x
    Negation,
    /// Bitwise complement: ~x
    BitwiseNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Addition => "+",
            BinaryOperator::Subtraction => "-",
            BinaryOperator::Multiplication => "*",
            BinaryOperator::Division => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        }
    }
}

/// Static kind of an expression, available without evaluating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionType {
    Integer,
    String,
    Identifier,
    SpriteGroupRef,
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpressionType::Integer => "integer",
            ExpressionType::String => "string literal",
            ExpressionType::Identifier => "identifier",
            ExpressionType::SpriteGroupRef => "sprite-group reference",
        };
        f.write_str(name)
    }
}

/// An expression AST node, as produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    ConstantNumeric(i64, Range<usize>),
    StringLiteral(String, Range<usize>),
    Identifier(Identifier),
    /// `name` or `name(args)` in a position where a sprite group is expected.
    SpriteGroupRef(SpriteGroupRef),
    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<Expression>,
        span: Range<usize>,
    },
    BinaryOperation {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Range<usize>,
    },
}

impl Expression {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Expression::ConstantNumeric(_, span) => span,
            Expression::StringLiteral(_, span) => span,
            Expression::Identifier(ident) => &ident.span,
            Expression::SpriteGroupRef(reference) => reference.span(),
            Expression::UnaryOperation { span, .. } => span,
            Expression::BinaryOperation { span, .. } => span,
        }
    }

    /// Height of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Expression::ConstantNumeric(..)
            | Expression::StringLiteral(..)
            | Expression::Identifier(_) => 1,
            Expression::SpriteGroupRef(reference) => {
                1 + reference
                    .params()
                    .iter()
                    .map(Expression::depth)
                    .max()
                    .unwrap_or(0)
            }
            Expression::UnaryOperation { operand, .. } => 1 + operand.depth(),
            Expression::BinaryOperation { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Expression::ConstantNumeric(..)
            | Expression::StringLiteral(..)
            | Expression::Identifier(_) => 1,
            Expression::SpriteGroupRef(reference) => {
                1 + reference.params().iter().map(Expression::node_count).sum::<usize>()
            }
            Expression::UnaryOperation { operand, .. } => 1 + operand.node_count(),
            Expression::BinaryOperation { left, right, .. } => {
                1 + left.node_count() + right.node_count()
            }
        }
    }

    pub fn type_tag(&self) -> ExpressionType {
        match self {
            Expression::ConstantNumeric(..) => ExpressionType::Integer,
            Expression::StringLiteral(..) => ExpressionType::String,
            Expression::Identifier(_) => ExpressionType::Identifier,
            Expression::SpriteGroupRef(_) => ExpressionType::SpriteGroupRef,
            Expression::UnaryOperation { .. } | Expression::BinaryOperation { .. } => {
                ExpressionType::Integer
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::ConstantNumeric(n, _) => write!(f, "{}", n),
            Expression::StringLiteral(s, _) => write!(f, "\"{}\"", s),
            Expression::Identifier(ident) => write!(f, "{}", ident),
            Expression::SpriteGroupRef(reference) => write!(f, "{}", reference),
            Expression::UnaryOperation {
                operator, operand, ..
            } => match operator {
                UnaryOperator::Negation => write!(f, "-{}", operand),
                UnaryOperator::BitwiseNot => write!(f, "~{}", operand),
            },
            Expression::BinaryOperation {
                operator,
                left,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
        }
    }
}

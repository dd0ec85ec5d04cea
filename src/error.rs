use thiserror::Error;

use crate::expr::{BinaryOp, Operator, UnaryOp};
use crate::token::TokenKind;

/// Any failure the one-shot [`crate::eval`] entry point can produce, tagged
/// by the stage that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// An illegal character or malformed literal found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal token {lexeme:?} at offset {offset}")]
pub struct LexError {
    pub offset: usize,
    pub lexeme: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("expected {expected}, found {found} at offset {offset}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        offset: usize,
    },
    #[error("expected an expression, found {found} at offset {offset}")]
    ExpectedExpression { found: TokenKind, offset: usize },
    #[error("invalid {kind} literal {lexeme:?}")]
    InvalidLiteral { kind: &'static str, lexeme: String },
    #[error("expression too complex: nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("undefined identifier {0}")]
    UndefinedIdentifier(String),
    #[error("unsupported value type {kind} for {name}")]
    UnsupportedValueType { name: String, kind: &'static str },
    #[error("invalid operand for unary {operator}: {kind}")]
    InvalidUnaryOperand {
        operator: UnaryOp,
        kind: &'static str,
    },
    #[error("invalid operands for {operator}: {left}, {right}")]
    InvalidBinaryOperands {
        operator: BinaryOp,
        left: &'static str,
        right: &'static str,
    },
    #[error("division by zero in {operator}")]
    DivisionByZero { operator: BinaryOp },
    #[error("integer overflow in {operator}")]
    ArithmeticOverflow { operator: Operator },
    #[error("operator {operator} cannot be evaluated")]
    UnsupportedOperator { operator: BinaryOp },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("cannot index into {kind}")]
    NotIndexable { kind: &'static str },
    #[error("index must be an integer, found {kind}")]
    InvalidIndex { kind: &'static str },
    #[error("undefined member {0}")]
    UndefinedMember(String),
    #[error("cannot access member {member} of {kind}")]
    NotARecord { member: String, kind: &'static str },
}

/// A typed accessor on [`crate::value::Value`] was called on the wrong variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} value to {expected}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: &'static str,
}

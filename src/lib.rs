//! An embeddable evaluator for small, side-effect free expressions.
//!
//! Text goes through three stages: [`Scanner`] turns it into tokens,
//! [`Parser`] builds an immutable [`Expr`] tree (literal values are decoded
//! at this point), and [`evaluate`] walks the tree against an
//! [`Environment`] of variable bindings to produce a single [`Value`].
//!
//! ```
//! use calc_lib::{Environment, Expression};
//!
//! let expr = Expression::new("a + 1 * b").unwrap();
//! let env = Environment::new().with("a", 89.5).with("b", 2);
//! assert_eq!(expr.eval(&env).unwrap().as_float().unwrap(), 91.5);
//! ```

use std::str::FromStr;

use log::{log_enabled, trace, Level};

mod ast_printer;
mod env;
mod error;
mod expr;
mod interpreter;
mod parser;
mod scanner;
mod token;
mod value;
mod visitor;

pub use ast_printer::AstPrinter;
pub use env::{Dynamic, Environment};
pub use error::{ConversionError, Error, EvalError, LexError, ParseError};
pub use expr::{BinaryOp, Expr, Literal, LiteralKind, Operator, UnaryOp};
pub use interpreter::Interpreter;
pub use parser::{ParseOptions, Parser};
pub use scanner::Scanner;
pub use token::{Token, TokenKind};
pub use value::Value;
pub use visitor::ExprVisitor;

/// Returns a lazy token stream over `source`.
pub fn scan(source: &str) -> Scanner<'_> {
    Scanner::new(source)
}

pub fn parse(source: &str) -> Result<Expr, ParseError> {
    parse_with(source, &ParseOptions::default())
}

pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Expr, ParseError> {
    Parser::new(source, options).parse()
}

/// Evaluates a parsed tree. `env` only needs bindings for the identifiers the
/// expression actually uses, and is never modified.
pub fn evaluate(expr: &Expr, env: &Environment) -> Result<Value, EvalError> {
    let value = Interpreter::new(env).evaluate(expr)?;
    if log_enabled!(Level::Trace) {
        trace!("{} => {:?}", AstPrinter.visit_expr(expr), value);
    }
    Ok(value)
}

/// Parses and evaluates in one go.
pub fn eval(source: &str, env: &Environment) -> Result<Value, Error> {
    let expr = parse(source)?;
    Ok(evaluate(&expr, env)?)
}

/// A parsed expression that can be evaluated any number of times, from any
/// number of threads, against different environments.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Self::with_options(source, &ParseOptions::default())
    }

    pub fn with_options(source: &str, options: &ParseOptions) -> Result<Self, ParseError> {
        Ok(Expression {
            source: source.to_owned(),
            ast: parse_with(source, options)?,
        })
    }

    pub fn eval(&self, env: &Environment) -> Result<Value, EvalError> {
        evaluate(&self.ast, env)
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Expression::new(source)
    }
}

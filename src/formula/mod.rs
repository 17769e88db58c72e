/// Computed-column formulas
///
/// A formula is evaluated against one JSON row:
///
/// ```text
/// ROUND({price} * {qty} * (1 - {discount.rate}), 2)
/// IF({status} = "done", "✓", UPPER({owner.name}) & " pending")
/// ```
///
/// Column references use `{...}` and dot paths into nested objects. Missing
/// columns are null, null counts as zero in arithmetic, and numeric strings
/// coerce to numbers.

mod eval;
mod lexer;
mod parser;

use serde_json::Value;
use thiserror::Error;

use parser::Expr;

/// Deepest nesting of sub-expressions a formula may use
pub const MAX_DEPTH: usize = 64;

/// Longest accepted formula, in characters
pub const MAX_LENGTH: usize = 4096;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("expression is empty")]
    Empty,

    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated column reference")]
    UnterminatedReference,

    #[error("expected {expected}, found {found}")]
    Syntax { expected: String, found: String },

    #[error("unknown function {0}")]
    UnknownFunction(String),

    #[error("{name} takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("result is not a finite number")]
    NotFinite,

    #[error("expression nests deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("expression is longer than {MAX_LENGTH} characters")]
    TooLong,
}

/// A parsed formula, reusable across rows
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = lexer::tokenize(source)?;
        let expr = parser::parse(&tokens)?;
        Ok(Self { expr })
    }

    pub fn evaluate(&self, row: &Value) -> Result<Value, FormulaError> {
        eval::evaluate(&self.expr, row)
    }
}

/// Parse and evaluate in one step
pub fn evaluate(source: &str, row: &Value) -> Result<Value, FormulaError> {
    Formula::parse(source)?.evaluate(row)
}

//! Rule engine: compiles boolean comparison rules such as
//! `age > 30 AND (department == 'Sales' OR salary >= 50000)` into a tree,
//! combines compiled rules under `AND` / `OR`, and evaluates them against
//! records of field values.

pub mod api;
pub mod combiner;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod logging;
pub mod parser;
pub mod scanner;
pub mod token_type;
pub mod wire;

pub use combiner::{combine, combine_all, try_combine};
pub use error::{CombineError, DecodeError, EvalError, LexError, ParseError, RuleError};
pub use evaluator::{Evaluation, Evaluator, Record, evaluate};
pub use expr::{Comparator, Comparison, Expr, LogicalOperator, Value};
pub use parser::parse;
pub use scanner::tokenize;
pub use wire::Node;

use tracing::debug;

/// Scans and parses `source` into a tree. Any lexical or grammatical error
/// aborts compilation; no partial tree is returned.
pub fn compile(source: &str) -> Result<Expr, RuleError> {
    let tokens = tokenize(source)?;
    let expr = parse(tokens)?;
    debug!(comparisons = expr.comparison_count(), depth = expr.depth(), "compiled rule");
    Ok(expr)
}

//! Joins already compiled rules under a logical operator without re-parsing them.

use tracing::debug;

use crate::error::CombineError;
use crate::expr::{Expr, LogicalOperator, MAX_DEPTH};

/// Puts `left` and `right` under a new operator node. Both roots move into it.
/// The result is not checked against MAX_DEPTH; `combine_all` is.
pub fn combine(left: Expr, right: Expr, operator: LogicalOperator) -> Expr {
    Expr::logical(left, operator, right)
}

/// Like `combine`, for callers whose operands may be absent.
pub fn try_combine(
    left: Option<Expr>,
    right: Option<Expr>,
    operator: LogicalOperator,
) -> Result<Expr, CombineError> {
    match (left, right) {
        (Some(left), Some(right)) => Ok(combine(left, right, operator)),
        (None, _) => Err(CombineError::MissingOperand { index: 0 }),
        (_, None) => Err(CombineError::MissingOperand { index: 1 }),
    }
}

/// Left-folds `rules` in order: [R1, R2, R3] becomes op(op(R1, R2), R3).
/// A single rule is returned as is; an empty sequence is an error, and so is
/// a fold that would nest deeper than MAX_DEPTH.
pub fn combine_all<I>(rules: I, operator: LogicalOperator) -> Result<Expr, CombineError>
where
    I: IntoIterator<Item = Expr>,
{
    let mut rules = rules.into_iter();
    let mut combined = rules.next().ok_or(CombineError::MissingOperand { index: 0 })?;
    let mut depth = combined.depth();

    let mut count = 1;
    for rule in rules {
        depth = 1 + depth.max(rule.depth());
        if depth > MAX_DEPTH {
            return Err(CombineError::TooDeep { index: count });
        }
        combined = combine(combined, rule, operator);
        count += 1;
    }

    debug!(count, depth, %operator, "combined rules");
    Ok(combined)
}

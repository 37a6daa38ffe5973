//! Request and response records for the three engine operations.
//!
//! Field names follow the JSON the rule frontend exchanges with its backend:
//! `{rule}` -> `{rule, ast}`, `{rules, operator}` -> `{combinedAST}` and
//! `{ast, data}` -> `{result}`. Transport and storage are left to the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::combiner::combine_all;
use crate::error::{CombineError, RuleError};
use crate::evaluator::{Evaluator, Record};
use crate::expr::{Expr, LogicalOperator};
use crate::wire::Node;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    pub rule: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleResponse {
    pub rule: String,
    pub ast: Node,
}

/// A rule to combine: either raw text or a tree compiled earlier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSource {
    Text(String),
    Ast(Node),
}

impl RuleSource {
    /// Compiles or decodes the rule. `index` is its position in the combine request.
    pub fn into_expr(self, index: usize) -> Result<Expr, RuleError> {
        match self {
            RuleSource::Text(text) if text.trim().is_empty() => {
                Err(CombineError::MissingOperand { index }.into())
            }
            RuleSource::Text(text) => crate::compile(&text),
            RuleSource::Ast(node) => Ok(Expr::try_from(node)?),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineRulesRequest {
    pub rules: Vec<RuleSource>,
    pub operator: LogicalOperator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineRulesResponse {
    #[serde(rename = "combinedAST")]
    pub combined_ast: Node,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRuleRequest {
    pub ast: Node,
    pub data: Record,
    /// Also return the comparisons that were evaluated.
    #[serde(default)]
    pub trace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRuleResponse {
    pub result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
}

pub fn create_rule(request: CreateRuleRequest) -> Result<CreateRuleResponse, RuleError> {
    let expr = crate::compile(&request.rule)?;
    info!(rule = %request.rule, "created rule");
    Ok(CreateRuleResponse {
        ast: Node::from(&expr),
        rule: request.rule,
    })
}

/// Compiles text entries, decodes tree entries, then left-folds them in request order.
pub fn combine_rules(request: CombineRulesRequest) -> Result<CombineRulesResponse, RuleError> {
    let rules = request
        .rules
        .into_iter()
        .enumerate()
        .map(|(index, source)| source.into_expr(index))
        .collect::<Result<Vec<_>, _>>()?;

    let combined = combine_all(rules, request.operator)?;
    info!(rule = %combined, "combined rules");
    Ok(CombineRulesResponse {
        combined_ast: Node::from(&combined),
    })
}

pub fn evaluate_rule(request: EvaluateRuleRequest) -> Result<EvaluateRuleResponse, RuleError> {
    let expr = Expr::try_from(request.ast)?;

    let evaluator = if request.trace {
        Evaluator::new().with_trace()
    } else {
        Evaluator::new()
    };
    let evaluation = evaluator.evaluate(&expr, &request.data)?;
    debug!(fields = request.data.len(), result = evaluation.matched, "evaluated request");

    Ok(EvaluateRuleResponse {
        result: evaluation.matched,
        trace: request.trace.then_some(evaluation.trace),
    })
}

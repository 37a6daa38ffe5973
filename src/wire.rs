//! Uniform JSON node shape used to hand trees to storage and to the tree view:
//!
//! `{ "type": "operator" | "operand", "value": ..., "left": Node | null, "right": Node | null, "field"?: ..., "literal"?: ... }`
//!
//! Operator nodes carry `AND` / `OR` in `value`; operand nodes carry the
//! comparator in `value` plus `field` and `literal`.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::expr::{Comparator, Comparison, Expr, LogicalOperator, MAX_DEPTH, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
    Operator,
    Operand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub left: Option<Box<Node>>,
    #[serde(default)]
    pub right: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<Value>,
}

impl Node {
    /// Display label in the tree view: `value` if present, else `type`.
    pub fn label(&self) -> String {
        match &self.value {
            Some(value) => value.clone(),
            None => self.kind.to_string(),
        }
    }

    /// The non-null subset of `left` and `right`.
    pub fn children(&self) -> Vec<&Node> {
        [&self.left, &self.right]
            .into_iter()
            .filter_map(|child| child.as_deref())
            .collect()
    }

    /// Parses a node from JSON text, validating it into a tree.
    pub fn decode(json: &str) -> Result<Expr, crate::RuleError> {
        let node: Node = serde_json::from_str(json)?;
        Ok(Expr::try_from(node)?)
    }
}

impl From<&Expr> for Node {
    fn from(expr: &Expr) -> Self {
        match expr {
            Expr::Logical { left, operator, right } => Node {
                kind: NodeKind::Operator,
                value: Some(operator.to_string()),
                left: Some(Box::new(Node::from(left.as_ref()))),
                right: Some(Box::new(Node::from(right.as_ref()))),
                field: None,
                literal: None,
            },
            Expr::Comparison(c) => Node {
                kind: NodeKind::Operand,
                value: Some(c.comparator.to_string()),
                left: None,
                right: None,
                field: Some(c.field.clone()),
                literal: Some(c.literal.clone()),
            },
        }
    }
}

impl From<Expr> for Node {
    fn from(expr: Expr) -> Self {
        Node::from(&expr)
    }
}

impl TryFrom<Node> for Expr {
    type Error = DecodeError;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        decode_node(node, 0)
    }
}

/// `level` counts the operator nodes above `node`.
fn decode_node(node: Node, level: usize) -> Result<Expr, DecodeError> {
    match node.kind {
        NodeKind::Operator if level == MAX_DEPTH => Err(DecodeError::TooDeep),
        NodeKind::Operator => decode_operator(node, level),
        NodeKind::Operand => decode_operand(node),
    }
}

fn decode_operator(node: Node, level: usize) -> Result<Expr, DecodeError> {
    let value = node.value.ok_or(DecodeError::MissingAttribute("value"))?;
    let operator = value
        .parse::<LogicalOperator>()
        .map_err(DecodeError::UnknownOperator)?;

    let left = node.left.ok_or_else(|| DecodeError::MissingChild {
        operator: value.clone(),
        side: "left",
    })?;
    let right = node.right.ok_or_else(|| DecodeError::MissingChild {
        operator: value.clone(),
        side: "right",
    })?;

    Ok(Expr::logical(
        decode_node(*left, level + 1)?,
        operator,
        decode_node(*right, level + 1)?,
    ))
}

fn decode_operand(node: Node) -> Result<Expr, DecodeError> {
    if node.left.is_some() || node.right.is_some() {
        return Err(DecodeError::UnexpectedChildren);
    }
    let value = node.value.ok_or(DecodeError::MissingAttribute("value"))?;

    // leaf stored as one opaque string, e.g. { "type": "operand", "value": "age > 30" }
    if node.field.is_none() && node.literal.is_none() && value.parse::<Comparator>().is_err() {
        return decode_operand_text(value);
    }

    let comparator = value.parse::<Comparator>().map_err(DecodeError::UnknownComparator)?;
    let field = node.field.ok_or(DecodeError::MissingAttribute("field"))?;
    let literal = node.literal.ok_or(DecodeError::MissingAttribute("literal"))?;
    if !literal.is_quotable() {
        if let Value::Str(s) = literal {
            return Err(DecodeError::UnquotableLiteral(s));
        }
    }
    Ok(Expr::Comparison(Comparison { field, comparator, literal }))
}

fn decode_operand_text(text: String) -> Result<Expr, DecodeError> {
    match crate::compile(&text) {
        Ok(expr @ Expr::Comparison(_)) => Ok(expr),
        Ok(_) => Err(DecodeError::InvalidOperandText {
            text,
            reason: "expected a single comparison".to_string(),
        }),
        Err(e) => Err(DecodeError::InvalidOperandText { reason: e.to_string(), text }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use serde_json::json;

    #[test]
    fn test_encode_shape() {
        let expr = compile("age > 30 AND department == 'Sales'").unwrap();
        let encoded = serde_json::to_value(Node::from(&expr)).unwrap();
        assert_eq!(
            encoded,
            json!({
                "type": "operator",
                "value": "AND",
                "left": {
                    "type": "operand",
                    "value": ">",
                    "left": null,
                    "right": null,
                    "field": "age",
                    "literal": 30.0
                },
                "right": {
                    "type": "operand",
                    "value": "==",
                    "left": null,
                    "right": null,
                    "field": "department",
                    "literal": "Sales"
                }
            })
        );
    }

    #[test]
    fn test_decode_roundtrip() {
        let expr = compile("(a > 1 OR b <= 'x') AND c != 2.5").unwrap();
        let json = serde_json::to_string(&Node::from(&expr)).unwrap();
        assert_eq!(Node::decode(&json).unwrap(), expr);
    }

    #[test]
    fn test_label_and_children() {
        let node = Node::from(compile("a > 1 OR b > 2").unwrap());
        assert_eq!(node.label(), "OR");
        let children = node.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].label(), ">");
        assert!(children[0].children().is_empty());

        let bare: Node = serde_json::from_value(json!({"type": "operator"})).unwrap();
        assert_eq!(bare.label(), "operator");
    }

    #[test]
    fn test_decode_opaque_leaf() {
        let node: Node = serde_json::from_value(json!({
            "type": "operator",
            "value": "or",
            "left": {"type": "operand", "value": "age > 30", "left": null, "right": null},
            "right": {"type": "operand", "value": "department == 'Sales'"}
        }))
        .unwrap();
        assert_eq!(Expr::try_from(node).unwrap(), compile("age > 30 OR department == 'Sales'").unwrap());
    }

    #[test]
    fn test_decode_errors() {
        let cases = vec![
            (
                json!({"type": "operator", "value": "AND", "left": {"type": "operand", "value": ">", "field": "a", "literal": 1}}),
                DecodeError::MissingChild { operator: "AND".to_string(), side: "right" },
            ),
            (
                json!({"type": "operator", "value": "XOR", "left": null, "right": null}),
                DecodeError::UnknownOperator("XOR".to_string()),
            ),
            (
                json!({"type": "operand", "value": ">", "literal": 1}),
                DecodeError::MissingAttribute("field"),
            ),
            (
                json!({"type": "operand", "value": ">", "field": "a"}),
                DecodeError::MissingAttribute("literal"),
            ),
            (
                json!({"type": "operand", "value": "=~", "field": "a", "literal": 1}),
                DecodeError::UnknownComparator("=~".to_string()),
            ),
            (
                json!({"type": "operand", "field": "a", "literal": 1}),
                DecodeError::MissingAttribute("value"),
            ),
            (
                json!({"type": "operand", "value": ">", "field": "a", "literal": 1,
                       "left": {"type": "operand", "value": "a > 1"}}),
                DecodeError::UnexpectedChildren,
            ),
            (
                json!({"type": "operand", "value": "==", "field": "quote", "literal": "say \"it's\""}),
                DecodeError::UnquotableLiteral("say \"it's\"".to_string()),
            ),
        ];

        for (json, expected) in cases {
            let node: Node = serde_json::from_value(json.clone()).unwrap();
            assert_eq!(Expr::try_from(node), Err(expected), "Input: {}", json);
        }
    }

    #[test]
    fn test_decode_invalid_opaque_leaf() {
        let node: Node = serde_json::from_value(json!({"type": "operand", "value": "a > 1 AND b > 2"})).unwrap();
        assert!(matches!(Expr::try_from(node), Err(DecodeError::InvalidOperandText { .. })));

        let node: Node = serde_json::from_value(json!({"type": "operand", "value": "a >"})).unwrap();
        assert!(matches!(Expr::try_from(node), Err(DecodeError::InvalidOperandText { .. })));
    }

    #[test]
    fn test_large_numbers_roundtrip() {
        let expr = compile(&format!("x > 1{} OR y < 0.000001", "0".repeat(300))).unwrap();
        let json = serde_json::to_string(&Node::from(&expr)).unwrap();
        assert!(!json.contains("\"literal\":null"), "{}", json);
        assert_eq!(Node::decode(&json).unwrap(), expr);
        assert_eq!(compile(&expr.to_string()).unwrap(), expr);
    }

    fn chain(operators: usize) -> Node {
        let leaf = Node::from(Expr::comparison("a", Comparator::Gt, 1));
        (0..operators).fold(leaf.clone(), |acc, _| Node {
            kind: NodeKind::Operator,
            value: Some("AND".to_string()),
            left: Some(Box::new(acc)),
            right: Some(Box::new(leaf.clone())),
            field: None,
            literal: None,
        })
    }

    #[test]
    fn test_decode_depth_limit() {
        assert_eq!(Expr::try_from(chain(MAX_DEPTH)).unwrap().depth(), MAX_DEPTH);
        assert_eq!(Expr::try_from(chain(MAX_DEPTH + 1)), Err(DecodeError::TooDeep));
    }

    #[test]
    fn test_decode_deep_json_is_error() {
        // serde_json stops at its own nesting limit before the tree is built
        let json = format!("{}null{}", r#"{"type":"operator","value":"AND","left":"#.repeat(5_000), "}".repeat(5_000));
        assert!(matches!(Node::decode(&json), Err(crate::RuleError::Json(_))));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_value::<Node>(json!({"type": "leaf", "value": "x"})).is_err());
    }
}

//! Evaluates a compiled rule against a record of field values.
//!
//! `AND` / `OR` short-circuit: the right operand is not looked at once the
//! left one decides the result, so errors in it never surface.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::error::EvalError;
use crate::expr::{Comparator, Comparison, Expr, LogicalOperator, Value};

/// Field values a rule is evaluated against. Deserializes from a flat JSON
/// object whose values are numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Record {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Outcome of `Evaluator::evaluate`. `trace` holds one line per comparison
/// actually evaluated, and stays empty unless tracing was enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub matched: bool,
    pub trace: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    trace_enabled: bool,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every evaluated comparison in `Evaluation::trace`.
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn evaluate(&self, expr: &Expr, record: &Record) -> Result<Evaluation, EvalError> {
        let mut trace = Vec::new();
        let matched = self.evaluate_node(expr, record, &mut trace)?;
        debug!(matched, rule = %expr, "evaluated rule");
        Ok(Evaluation { matched, trace })
    }

    fn evaluate_node(&self, expr: &Expr, record: &Record, trace: &mut Vec<String>) -> Result<bool, EvalError> {
        match expr {
            Expr::Logical { left, operator, right } => {
                let left_val = self.evaluate_node(left, record, trace)?;
                match operator {
                    LogicalOperator::And if !left_val => Ok(false),
                    LogicalOperator::Or if left_val => Ok(true),
                    _ => self.evaluate_node(right, record, trace),
                }
            }
            Expr::Comparison(comparison) => {
                let matched = compare(comparison, record)?;
                trace!(%comparison, matched, "compared");
                if self.trace_enabled {
                    trace.push(format!("{} => {}", comparison, matched));
                }
                Ok(matched)
            }
        }
    }
}

/// Evaluates `expr` against `record`.
pub fn evaluate(expr: &Expr, record: &Record) -> Result<bool, EvalError> {
    Evaluator::new().evaluate(expr, record).map(|e| e.matched)
}

/// Applies a single comparison to the record's value for its field.
///
/// Numbers compare numerically and strings lexicographically. Across types,
/// `==` is always false and `!=` always true; ordering comparators fail.
/// Numeric-looking strings are not coerced.
pub fn compare(comparison: &Comparison, record: &Record) -> Result<bool, EvalError> {
    let value = record.get(&comparison.field).ok_or_else(|| EvalError::UnknownField {
        field: comparison.field.clone(),
    })?;

    let ordering = match (value, &comparison.literal) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            return match comparison.comparator {
                Comparator::Eq => Ok(false),
                Comparator::Ne => Ok(true),
                _ => Err(EvalError::TypeMismatch {
                    field: comparison.field.clone(),
                    comparator: comparison.comparator,
                    expected: comparison.literal.type_name(),
                    found: value.type_name(),
                }),
            };
        }
    };

    Ok(match (comparison.comparator, ordering) {
        // unordered numbers are unequal to everything
        (Comparator::Ne, None) => true,
        (_, None) => false,
        (Comparator::Gt, Some(o)) => o == Ordering::Greater,
        (Comparator::Gte, Some(o)) => o != Ordering::Less,
        (Comparator::Lt, Some(o)) => o == Ordering::Less,
        (Comparator::Lte, Some(o)) => o != Ordering::Greater,
        (Comparator::Eq, Some(o)) => o == Ordering::Equal,
        (Comparator::Ne, Some(o)) => o != Ordering::Equal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::combine;
    use crate::compile;

    fn employee() -> Record {
        Record::new()
            .with("age", 35)
            .with("department", "Sales")
            .with("salary", 60000)
            .with("experience", 3)
    }

    fn eval(rule: &str, record: &Record) -> Result<bool, EvalError> {
        evaluate(&compile(rule).unwrap(), record)
    }

    #[test]
    fn test_numeric_comparisons() {
        let record = employee();
        assert!(eval("age > 30", &record).unwrap());
        assert!(eval("age >= 35", &record).unwrap());
        assert!(!eval("age < 35", &record).unwrap());
        assert!(eval("age <= 35", &record).unwrap());
        assert!(eval("age == 35", &record).unwrap());
        assert!(eval("age == 35.0", &record).unwrap());
        assert!(!eval("age != 35", &record).unwrap());
        assert!(eval("40 > age", &record).unwrap());
    }

    #[test]
    fn test_string_comparisons() {
        let record = employee();
        assert!(eval("department == 'Sales'", &record).unwrap());
        assert!(!eval("department == 'sales'", &record).unwrap());
        assert!(eval("department != 'Marketing'", &record).unwrap());
        // lexicographic
        assert!(eval("department > 'Engineering'", &record).unwrap());
        assert!(!eval("department < 'Engineering'", &record).unwrap());
    }

    #[test]
    fn test_compound() {
        let record = employee();
        assert!(eval("(age > 30 AND department == 'Sales') OR (age < 25 AND department == 'Marketing')", &record).unwrap());
        assert!(!eval("age > 30 AND department == 'Marketing'", &record).unwrap());
        assert!(eval("salary > 50000 OR experience > 5", &record).unwrap());
    }

    #[test]
    fn test_unknown_field() {
        let err = eval("bonus > 10", &employee()).unwrap_err();
        assert_eq!(err, EvalError::UnknownField { field: "bonus".to_string() });
    }

    #[test]
    fn test_short_circuit_and() {
        let record = Record::new().with("age", 20);
        assert!(!eval("age > 100 AND unknownField == 1", &record).unwrap());
        // left side true: the right side is evaluated and fails
        assert!(matches!(
            eval("age > 10 AND unknownField == 1", &record),
            Err(EvalError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_short_circuit_or() {
        let record = Record::new().with("age", 20);
        assert!(eval("age < 100 OR age > 'x'", &record).unwrap());
        assert!(matches!(
            eval("age > 100 OR age > 'x'", &record),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let record = Record::new().with("age", 30);
        let err = eval("age > 'twenty'", &record).unwrap_err();
        assert_eq!(
            err,
            EvalError::TypeMismatch {
                field: "age".to_string(),
                comparator: Comparator::Gt,
                expected: "string",
                found: "number",
            }
        );
    }

    #[test]
    fn test_equality_across_types() {
        // no coercion of numeric-looking strings
        let record = Record::new().with("age", "30");
        assert!(!eval("age == 30", &record).unwrap());
        assert!(eval("age != 30", &record).unwrap());
        assert!(eval("age == '30'", &record).unwrap());
        assert!(eval("age >= 30", &record).is_err());
    }

    #[test]
    fn test_trace() {
        let record = employee();
        let expr = compile("age > 40 AND salary > 1 OR department == 'Sales'").unwrap();
        let evaluation = Evaluator::new().with_trace().evaluate(&expr, &record).unwrap();
        assert!(evaluation.matched);
        assert_eq!(evaluation.trace, vec!["age > 40 => false", "department == 'Sales' => true"]);

        let evaluation = Evaluator::new().evaluate(&expr, &record).unwrap();
        assert!(evaluation.trace.is_empty());
    }

    #[test]
    fn test_self_combine_is_idempotent() {
        let expr = compile("age > 30 AND department == 'Sales'").unwrap();
        let doubled = combine(expr.clone(), expr.clone(), LogicalOperator::Or);
        for record in [employee(), Record::new().with("age", 10).with("department", "Sales")] {
            assert_eq!(evaluate(&doubled, &record).unwrap(), evaluate(&expr, &record).unwrap());
        }
    }

    #[test]
    fn test_record_from_json() {
        let record: Record = serde_json::from_str(r#"{"age": 30, "department": "Sales"}"#).unwrap();
        assert_eq!(record.get("age"), Some(&Value::Number(30.0)));
        assert_eq!(record.len(), 2);
        assert!(serde_json::from_str::<Record>(r#"{"active": true}"#).is_err());
        assert!(serde_json::from_str::<Record>(r#"{"tags": ["a"]}"#).is_err());
    }

    #[test]
    fn test_record_from_iter() {
        let record: Record = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(record.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deepest tree the parser, the wire decoder and `combine_all` will build,
/// counted in nested `AND` / `OR` nodes. Also bounds nested parentheses.
/// serde_json refuses to read JSON nested more than 128 levels, so deeper
/// trees could not be decoded again.
pub const MAX_DEPTH: usize = 100;

/// Scalar appearing as a rule literal or as a record value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Str(String),
}

impl Value {
    /// False for strings that cannot be written as a rule literal.
    pub fn is_quotable(&self) -> bool {
        match self {
            Value::Number(_) => true,
            Value::Str(s) => !(s.contains('\'') && s.contains('"')),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }
    }
}

/// Strings are written with whichever quote they do not contain. A string
/// holding both quotes has no rule text form; the wire decoder rejects it.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            // no escapes in the rule language, so pick a quote the text does not contain
            Value::Str(s) if s.contains('\'') => write!(f, "\"{}\"", s),
            Value::Str(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }

    /// The comparator that gives the same result with its operands swapped.
    pub fn flip(self) -> Self {
        match self {
            Comparator::Gt => Comparator::Lt,
            Comparator::Gte => Comparator::Lte,
            Comparator::Lt => Comparator::Gt,
            Comparator::Lte => Comparator::Gte,
            Comparator::Eq => Comparator::Eq,
            Comparator::Ne => Comparator::Ne,
        }
    }

    /// `==` and `!=` are defined across types; the rest need matching types.
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparator::Eq | Comparator::Ne)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Comparator::Gt),
            ">=" => Ok(Comparator::Gte),
            "<" => Ok(Comparator::Lt),
            "<=" => Ok(Comparator::Lte),
            "==" => Ok(Comparator::Eq),
            "!=" => Ok(Comparator::Ne),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "AND"),
            LogicalOperator::Or => write!(f, "OR"),
        }
    }
}

/// Case-insensitive, like the keywords in rule text.
impl FromStr for LogicalOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("and") {
            Ok(LogicalOperator::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(LogicalOperator::Or)
        } else {
            Err(s.to_string())
        }
    }
}

/// Leaf of the tree: `field <comparator> literal`, always with the field on the left.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub comparator: Comparator,
    pub literal: Value,
}

impl Comparison {
    pub fn new(field: impl Into<String>, comparator: Comparator, literal: impl Into<Value>) -> Self {
        Comparison {
            field: field.into(),
            comparator,
            literal: literal.into(),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.comparator, self.literal)
    }
}

/// A compiled rule. Children are owned by their parent, so combining two
/// rules moves both roots under the new node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Logical {
        left: Box<Expr>,
        operator: LogicalOperator,
        right: Box<Expr>,
    },
    Comparison(Comparison),
}

impl Expr {
    pub fn logical(left: Expr, operator: LogicalOperator, right: Expr) -> Self {
        Expr::Logical {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub fn comparison(field: impl Into<String>, comparator: Comparator, literal: impl Into<Value>) -> Self {
        Expr::Comparison(Comparison::new(field, comparator, literal))
    }

    /// Distinct field names in order of first use.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a str>) {
        match self {
            Expr::Logical { left, right, .. } => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
            Expr::Comparison(c) => {
                if !fields.contains(&c.field.as_str()) {
                    fields.push(&c.field);
                }
            }
        }
    }

    /// Number of comparisons (leaves).
    pub fn comparison_count(&self) -> usize {
        match self {
            Expr::Logical { left, right, .. } => left.comparison_count() + right.comparison_count(),
            Expr::Comparison(_) => 1,
        }
    }

    /// A single comparison has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Logical { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expr::Comparison(_) => 0,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Logical { .. } => write!(f, "({})", self),
            Expr::Comparison(c) => write!(f, "{}", c),
        }
    }
}

/// Canonical rule text. Nested logical nodes are parenthesized, so the
/// output parses back into the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Logical { left, operator, right } => {
                left.fmt_operand(f)?;
                write!(f, " {} ", operator)?;
                right.fmt_operand(f)
            }
            Expr::Comparison(c) => write!(f, "{}", c),
        }
    }
}

use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::ops::Range;
use thiserror::Error;

use crate::expr::{Comparator, MAX_DEPTH};

/// Raised by the scanner on the first character that cannot start a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{found}' at offset {position}")]
    UnexpectedChar { position: usize, found: char },

    #[error("unterminated string starting at offset {position}")]
    UnterminatedString { position: usize },

    /// `length` is the byte length of the digit run.
    #[error("number at offset {position} is too large")]
    InvalidNumber { position: usize, length: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedChar { position, .. } => *position,
            LexError::UnterminatedString { position } => *position,
            LexError::InvalidNumber { position, .. } => *position,
        }
    }

    fn span(&self) -> Range<usize> {
        match self {
            LexError::UnexpectedChar { position, found } => *position..*position + found.len_utf8(),
            LexError::UnterminatedString { position } => *position..*position + 1,
            LexError::InvalidNumber { position, length } => *position..*position + length,
        }
    }
}

/// Raised by the parser. `width` is the byte length of the offending token,
/// zero when the parser ran into the end of input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found} at offset {position}")]
pub struct ParseError {
    pub position: usize,
    pub width: usize,
    pub expected: String,
    pub found: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombineError {
    #[error("missing operand at index {index}")]
    MissingOperand { index: usize },

    #[error("rule at index {index} would nest the combined tree more than {} levels deep", MAX_DEPTH)]
    TooDeep { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("type mismatch: cannot compare {found} field '{field}' with {expected} literal using '{comparator}'")]
    TypeMismatch {
        field: String,
        comparator: Comparator,
        expected: &'static str,
        found: &'static str,
    },
}

/// Raised when a serialized node does not describe a valid tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("operator node '{operator}' is missing its {side} child")]
    MissingChild { operator: String, side: &'static str },

    #[error("unknown logical operator '{0}'")]
    UnknownOperator(String),

    #[error("unknown comparator '{0}'")]
    UnknownComparator(String),

    #[error("operand node is missing '{0}'")]
    MissingAttribute(&'static str),

    #[error("operand node must not have children")]
    UnexpectedChildren,

    #[error("operand '{text}' is not a valid comparison: {reason}")]
    InvalidOperandText { text: String, reason: String },

    #[error("string literal {0:?} contains both quote characters")]
    UnquotableLiteral(String),

    #[error("tree is nested more than {} levels deep", MAX_DEPTH)]
    TooDeep,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl RuleError {
    /// Byte range in the rule text the error points at, if any.
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            RuleError::Lex(e) => Some(e.span()),
            RuleError::Parse(e) => Some(e.position..e.position + e.width),
            _ => None,
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            RuleError::Lex(_) => "Lexing error",
            RuleError::Parse(_) => "Parsing error",
            RuleError::Combine(_) => "Combine error",
            RuleError::Eval(_) => "Evaluation error",
            RuleError::Decode(_) | RuleError::Json(_) => "Invalid input",
        }
    }
}

/// Prints `error` to stderr, pointing into `source` when the error has a position.
pub fn print_error(source_name: &str, source: &str, error: &RuleError) {
    if error.span().is_none() {
        eprintln!("{}: {}", error.heading(), error);
        return;
    }

    let report = build_report(source_name, source, error, true);
    if let Err(e) = report.eprint((source_name, Source::from(source))) {
        tracing::warn!(error = %e, "failed to render diagnostic");
        eprintln!("{}: {}", error.heading(), error);
    }
}

/// Renders the same diagnostic as `print_error` into a string, without colors.
pub fn render_error(source_name: &str, source: &str, error: &RuleError) -> String {
    if error.span().is_none() {
        return format!("{}: {}", error.heading(), error);
    }

    let mut buf = Vec::new();
    let report = build_report(source_name, source, error, false);
    if report.write((source_name, Source::from(source)), &mut buf).is_err() {
        return format!("{}: {}", error.heading(), error);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn build_report<'a>(
    source_name: &'a str,
    source: &str,
    error: &RuleError,
    color: bool,
) -> Report<'a, (&'a str, Range<usize>)> {
    // clamp so a position at end of input still renders
    let span = error
        .span()
        .map(|s| s.start.min(source.len())..s.end.min(source.len()))
        .unwrap_or(0..0);

    Report::build(ReportKind::Error, (source_name, span.clone()))
        .with_config(
            Config::default()
                .with_index_type(IndexType::Byte)
                .with_color(color),
        )
        .with_message(error.heading())
        .with_label(Label::new((source_name, span)).with_message(error.to_string()))
        .finish()
}

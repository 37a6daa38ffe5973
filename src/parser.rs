//! A recursive descent parser for rule expressions.
//!
//! Grammar of rule syntax:
//!
//! expression -> or_expr
//! or_expr -> and_expr ( "OR" and_expr )*
//! and_expr -> term ( "AND" term )*
//! term -> "(" expression ")" | comparison
//! comparison -> operand ( ">" | ">=" | "<" | "<=" | "==" | "!=" ) operand
//! operand -> IDENTIFIER | NUMBER | STRING
//!
//! A comparison needs exactly one IDENTIFIER (the field) and one literal, in either order.
//! Chains of the same operator fold to the left: "a AND b AND c" is AND(AND(a, b), c).
//! Parentheses may nest at most MAX_DEPTH deep, and so may the resulting tree.
//!
//! Examples: "age > 30", "30 < age", "(age > 30 AND department == 'Sales') OR salary >= 50000"

use crate::error::ParseError;
use crate::expr::{Comparator, Comparison, Expr, LogicalOperator, MAX_DEPTH, Value};
use crate::scanner::Token;
use crate::token_type::TokenType::{self, *};

/// Parses a token sequence produced by `tokenize` into a single tree.
/// The whole sequence must be consumed.
pub fn parse(tokens: Vec<Token>) -> Result<Expr, ParseError> {
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    nesting: usize, // open parentheses around the current token
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // the helpers below rely on a terminating EOF
        if tokens.last().map(|t| t.variant) != Some(EOF) {
            let offset = tokens.last().map_or(0, |t| t.offset + t.lexeme.len());
            tokens.push(Token { variant: EOF, lexeme: String::new(), literal: None, offset });
        }

        Parser { tokens, current: 0, nesting: 0 }
    }

    /// Parses all tokens to return a syntax tree. Fails on the first error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.expression()?;
        if !self.at_end() {
            // Case: Missing 'AND' or 'OR'. Ex.: 'a > 1 b > 2', or an unmatched ')'
            return Err(self.error("AND, OR or end of input"));
        }
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    /// Matches production: or_expr -> and_expr ( "OR" and_expr )*
    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.check(Or) {
            let operator = self.advance();
            let right = self.and_expr()?;
            left = Self::join(left, LogicalOperator::Or, right, &operator)?;
        }
        Ok(left)
    }

    /// Matches production: and_expr -> term ( "AND" term )*
    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        while self.check(And) {
            let operator = self.advance();
            let right = self.term()?;
            left = Self::join(left, LogicalOperator::And, right, &operator)?;
        }
        Ok(left)
    }

    /// Matches production: term -> "(" expression ")" | comparison
    fn term(&mut self) -> Result<Expr, ParseError> {
        if self.check(LeftParen) {
            if self.nesting == MAX_DEPTH {
                return Err(self.error(&format!("at most {} nested groups", MAX_DEPTH)));
            }
            self.advance();
            self.nesting += 1;
            let expr = self.expression()?;
            self.nesting -= 1;
            if !self.match_token(&[RightParen]) {
                return Err(self.error("')'"));
            }
            return Ok(expr);
        }
        self.comparison()
    }

    /// Matches production: comparison -> operand comparator operand
    /// Ex.: 'age > 30' or '30 < age', both stored as age > 30
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        // Match left hand side
        if !self.check_any(&[Identifier, Number, Str]) {
            return Err(self.error("field name, literal or '('"));
        }
        let left = self.advance();

        // Match operator
        let Some(comparator) = Self::comparator(self.peek().variant) else {
            return Err(self.error("one of '>', '>=', '<', '<=', '==', '!='"));
        };
        self.advance();

        // Match right hand side. Exactly one side names the field.
        let right = if left.variant == Identifier {
            if !self.check_any(&[Number, Str]) {
                return Err(self.error("number or string literal"));
            }
            self.advance()
        } else {
            if !self.check(Identifier) {
                return Err(self.error("field name"));
            }
            self.advance()
        };

        let comparison = match (left.variant, right.variant) {
            (Identifier, _) => Comparison {
                field: left.lexeme,
                comparator,
                literal: Self::literal(right),
            },
            // literal on the left: '30 < age' -> 'age > 30'
            _ => Comparison {
                field: right.lexeme,
                comparator: comparator.flip(),
                literal: Self::literal(left),
            },
        };
        Ok(Expr::Comparison(comparison))
    }

    fn comparator(token_type: TokenType) -> Option<Comparator> {
        match token_type {
            Greater => Some(Comparator::Gt),
            GreaterEqual => Some(Comparator::Gte),
            Less => Some(Comparator::Lt),
            LessEqual => Some(Comparator::Lte),
            EqualEqual => Some(Comparator::Eq),
            BangEqual => Some(Comparator::Ne),
            _ => None,
        }
    }

    /// Builds `left <operator> right`, refusing trees deeper than MAX_DEPTH.
    /// The error points at the operator token that went too deep.
    fn join(left: Expr, operator: LogicalOperator, right: Expr, at: &Token) -> Result<Expr, ParseError> {
        let depth = 1 + left.depth().max(right.depth());
        if depth > MAX_DEPTH {
            return Err(ParseError {
                position: at.offset,
                width: at.lexeme.len(),
                expected: format!("at most {} nested operators", MAX_DEPTH),
                found: at.describe(),
            });
        }
        Ok(Expr::logical(left, operator, right))
    }

    /// Literal tokens always carry their decoded value from the scanner.
    fn literal(token: Token) -> Value {
        match token.literal {
            Some(value) => value,
            None => Value::Str(token.lexeme),
        }
    }

    fn match_token(&mut self, token_types: &[TokenType]) -> bool {
        if self.check_any(token_types) {
            self.advance();
            return true;
        }
        false
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().variant == token_type
    }

    fn check_any(&self, token_types: &[TokenType]) -> bool {
        token_types.iter().any(|t| self.check(*t))
    }

    /// Returns the current token and moves past it. Never moves past EOF.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_end() {
            self.current += 1;
        }
        token
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn at_end(&self) -> bool {
        self.peek().variant == EOF
    }

    /// Creates a ParseError pointing at the current token.
    fn error(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError {
            position: token.offset,
            width: token.lexeme.len(),
            expected: expected.to_string(),
            found: token.describe(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TokenType {
    LeftParen, RightParen, // ()
    Greater, GreaterEqual,
    Less, LessEqual,
    EqualEqual, BangEqual,
    And, Or,
    Number,
    Str,
    Identifier,
    EOF,
}

impl TokenType {
    /// One of `>`, `>=`, `<`, `<=`, `==`, `!=`.
    pub fn is_comparator(&self) -> bool {
        matches!(
            self,
            TokenType::Greater
                | TokenType::GreaterEqual
                | TokenType::Less
                | TokenType::LessEqual
                | TokenType::EqualEqual
                | TokenType::BangEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, TokenType::And | TokenType::Or)
    }

    /// Number or string literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, TokenType::Number | TokenType::Str)
    }
}

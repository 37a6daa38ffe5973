use std::fmt;

use tracing::trace;

use crate::error::LexError;
use crate::expr::Value;
use crate::token_type::TokenType::{self, *};

/// Scans a rule string into tokens, terminated by an `EOF` token.
/// Stops at the first character that cannot start a token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let tokens = Scanner::new(source).scan()?;
    trace!(count = tokens.len(), "scanned tokens");
    Ok(tokens)
}

/// The `Scanner` loops through the source code, identifying tokens and returning them as
/// Vec<Token>.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>, // iterator over chars of source
    tokens: Vec<Token>,
    start: usize,                   // byte index of first char of lexeme
    current: Option<(usize, char)>, // current char (byte index, char)
    next: Option<(usize, char)>,    // next char  (byte index, char)
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.char_indices();
        let current = chars.next();
        let next = chars.clone().next();

        Scanner {
            source,
            chars,
            tokens: Vec::new(),
            start: 0,
            current,
            next,
        }
    }

    pub fn scan(mut self) -> Result<Vec<Token>, LexError> {
        while !self.at_end() {
            self.start = self.offset();
            self.scan_token()?;
        }
        self.start = self.source.len();
        self.add_token(EOF, None);
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexError> {
        let c = match self.advance() {
            Some(ch) => ch,
            None => return Ok(()),
        };

        match c {
            '(' => self.add_token(LeftParen, None),
            ')' => self.add_token(RightParen, None),
            '!' => self.match_and_add_token('=', BangEqual, c)?,
            '=' => self.match_and_add_token('=', EqualEqual, c)?,
            '<' => {
                let token = if self.match_char('=') { LessEqual } else { Less };
                self.add_token(token, None)
            }
            '>' => {
                let token = if self.match_char('=') { GreaterEqual } else { Greater };
                self.add_token(token, None)
            }
            '\'' | '"' => self.string(c)?,
            _ if c.is_whitespace() => {} // ignore whitespace
            _ if c.is_ascii_digit() => self.number(c)?,
            _ if Self::is_alpha(c) => self.identifier(),
            _ => return Err(LexError::UnexpectedChar { position: self.start, found: c }),
        };
        Ok(())
    }

    fn identifier(&mut self) {
        // Peek and advance as long as current char is alphanumeric
        while matches!(self.peek(), Some(c) if Self::is_alphanumeric(c)) {
            self.advance();
        }

        let lexeme = self.lexeme();
        let token = if lexeme.eq_ignore_ascii_case("and") {
            And
        } else if lexeme.eq_ignore_ascii_case("or") {
            Or
        } else {
            Identifier
        };
        self.add_token(token, None)
    }

    fn number(&mut self, c_start: char) -> Result<(), LexError> {
        // Match integer part of decimal
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        // Fractional part
        if let (Some('.'), Some(c_next)) = (self.peek(), self.peek_next()) {
            if c_next.is_ascii_digit() {
                self.advance(); // consume the '.'
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let lexeme = self.lexeme();
        let value = lexeme
            .parse::<f64>()
            .map_err(|_| LexError::UnexpectedChar { position: self.start, found: c_start })?;
        // a digit run past f64::MAX parses as infinity, which has no rule text or JSON form
        if !value.is_finite() {
            return Err(LexError::InvalidNumber { position: self.start, length: lexeme.len() });
        }
        self.add_token(Number, Some(Value::Number(value)));
        Ok(())
    }

    /// Consumes everything up to the matching closing quote. No escapes.
    fn string(&mut self, quote: char) -> Result<(), LexError> {
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some(_) => {}
                None => return Err(LexError::UnterminatedString { position: self.start }),
            }
        }

        // quotes are single-byte
        let lexeme = self.lexeme();
        let text = lexeme[1..lexeme.len() - 1].to_string();
        self.add_token(Str, Some(Value::Str(text)));
        Ok(())
    }

    fn is_alpha(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }

    fn is_alphanumeric(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    /// `!` and `=` are only valid as the first half of `!=` / `==`.
    fn match_and_add_token(&mut self, expected: char, token_type: TokenType, c: char) -> Result<(), LexError> {
        if self.match_char(expected) {
            self.add_token(token_type, None);
            Ok(())
        } else {
            Err(LexError::UnexpectedChar { position: self.start, found: c })
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }
        false
    }

    fn at_end(&self) -> bool {
        self.current.is_none()
    }

    /// Byte index of the current char, or the source length at end of input.
    fn offset(&self) -> usize {
        self.current.map_or(self.source.len(), |(idx, _)| idx)
    }

    /// Return current char and advance to next.
    fn advance(&mut self) -> Option<char> {
        let c = self.current.map(|(_, c)| c);
        self.current = self.next;
        self.chars.next();
        self.next = self.chars.clone().next();
        c
    }

    /// Return current char without advancing.
    fn peek(&self) -> Option<char> {
        self.current.map(|(_, c)| c)
    }

    /// Return next char without advancing.
    fn peek_next(&self) -> Option<char> {
        self.next.map(|(_, c)| c)
    }

    /// The string slice source[self.start..self.offset()].
    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.offset()]
    }

    fn add_token(&mut self, token_type: TokenType, literal: Option<Value>) {
        let token = Token {
            variant: token_type,
            lexeme: self.lexeme().to_string(),
            literal,
            offset: self.start,
        };
        self.tokens.push(token);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub variant: TokenType,
    pub lexeme: String,
    pub literal: Option<Value>,
    pub offset: usize, // byte offset in source
}

impl Token {
    /// How the token is named in diagnostics.
    pub fn describe(&self) -> String {
        match self.variant {
            EOF => "end of input".to_string(),
            _ => format!("'{}'", self.lexeme),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} {}", self.variant, self.lexeme)?;
        if let Some(literal) = &self.literal {
            write!(f, " {}", literal)?;
        }
        Ok(())
    }
}

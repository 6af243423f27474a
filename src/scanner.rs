use std::iter::FusedIterator;

use log::{debug, info};
use phf::phf_map;

use crate::error::QuillError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"break" => TokenType::BREAK,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"for" => TokenType::FOR,
    b"fun" => TokenType::FUN,
    b"if" => TokenType::IF,
    b"null" => TokenType::NULL,
    b"or" => TokenType::OR,
    b"print" => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

/// Single forward pass over the source bytes, yielding one token (or one
/// lexical error) per `next` call and exactly one trailing EOF token.
#[derive(Debug, Clone)]
pub struct Scanner {
    source: Vec<u8>,
    start: usize,
    curr_ptr: usize,
    line: usize,
    pending_token: Option<TokenType>,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        info!("Initializing Scanner with {} bytes", source.len());
        Self {
            source: source.as_bytes().to_vec(),
            start: 0,
            curr_ptr: 0,
            line: 1,
            pending_token: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    fn scan_token(&mut self) -> Result<(), QuillError> {
        let byte: u8 = self.advance();
        debug!("Processing byte: '{}' at line {}", byte as char, self.line);

        match byte {
            b'(' => self.add_token(TokenType::LEFT_PAREN),

            b')' => self.add_token(TokenType::RIGHT_PAREN),

            b'{' => self.add_token(TokenType::LEFT_BRACE),

            b'}' => self.add_token(TokenType::RIGHT_BRACE),

            b',' => self.add_token(TokenType::COMMA),

            b'.' => self.add_token(TokenType::DOT),

            b';' => self.add_token(TokenType::SEMICOLON),

            b':' => self.add_token(TokenType::COLON),

            b'*' => self.add_token(TokenType::STAR),

            b'^' => self.add_token(TokenType::CARET),

            b'-' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::MINUS_EQUAL
                } else {
                    TokenType::MINUS
                };
                self.add_token(token_type);
            }

            b'+' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::PLUS_EQUAL
                } else {
                    TokenType::PLUS
                };
                self.add_token(token_type);
            }

            b'&' => {
                let token_type: TokenType = if self.match_byte(b'&') {
                    TokenType::AMP_AMP
                } else {
                    TokenType::AMP
                };
                self.add_token(token_type);
            }

            b'|' => {
                let token_type: TokenType = if self.match_byte(b'|') {
                    TokenType::PIPE_PIPE
                } else {
                    TokenType::PIPE
                };
                self.add_token(token_type);
            }

            b'!' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };
                self.add_token(token_type);
            }

            b'=' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };
                self.add_token(token_type);
            }

            b'<' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };
                self.add_token(token_type);
            }

            b'>' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };
                self.add_token(token_type);
            }

            b' ' | b'\r' | b'\t' => {
                debug!("Skipping whitespace");
            }

            b'\n' => {
                self.line += 1;
            }

            b'/' => {
                if self.match_byte(b'/') {
                    debug!("Found comment, skipping until newline");
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::SLASH);
                }
            }

            b'"' => {
                self.parse_string()?;
            }

            b'0'..=b'9' => {
                self.parse_number();
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            _ => {
                debug!(
                    "Unexpected character '{}' at line {}",
                    byte as char, self.line
                );

                return Err(QuillError::lex(
                    self.line,
                    format!("Unexpected token: '{}'", byte as char),
                ));
            }
        }

        Ok(())
    }

    fn parse_string(&mut self) -> Result<(), QuillError> {
        // The token reports the line of the opening quote even when the
        // literal spans several lines.
        let opening_line: usize = self.line;

        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            debug!("Unterminated string starting at line {}", opening_line);

            return Err(QuillError::lex(opening_line, "Unterminated string."));
        }

        self.advance();

        let parsed_string: String = unsafe {
            String::from_utf8_unchecked(self.source[self.start + 1..self.curr_ptr - 1].to_vec())
        };

        info!("Parsed string literal: {}", parsed_string);

        self.pending_token = Some(TokenType::STRING(parsed_string));

        Ok(())
    }

    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let parsed_number: String =
            unsafe { String::from_utf8_unchecked(self.source[self.start..self.curr_ptr].to_vec()) };

        let number: f64 = parsed_number.parse().unwrap_or(0.0);

        info!("Parsed number: {}", number);

        self.add_token(TokenType::NUMBER(number));
    }

    fn parse_identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text: &[u8] = &self.source[self.start..self.curr_ptr];

        match KEYWORDS.get(text) {
            Some(token_type) => {
                self.add_token(token_type.clone());
            }

            None => {
                self.add_token(TokenType::IDENTIFIER);
            }
        }
    }

    #[inline]
    fn add_token(&mut self, token_type: TokenType) {
        self.pending_token = Some(token_type);
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        let byte = self.source[self.curr_ptr];

        self.curr_ptr += 1;

        byte
    }

    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.curr_ptr] != expected {
            false
        } else {
            self.curr_ptr += 1;

            true
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.curr_ptr]
        }
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        if self.curr_ptr + 1 >= self.len() {
            0
        } else {
            self.source[self.curr_ptr + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.curr_ptr >= self.len()
    }
}

impl Iterator for Scanner {
    type Item = Result<Token, QuillError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_at_end() {
                if self.curr_ptr == self.len() {
                    self.curr_ptr += 1;

                    info!("Reached EOF at line {}", self.line);

                    return Some(Ok(Token::new(TokenType::EOF, "".to_string(), self.line)));
                }

                return None;
            }

            self.pending_token = None;

            self.start = self.curr_ptr;

            // Multi-line strings advance the line counter while being
            // scanned; the emitted token keeps the line it started on.
            let token_line: usize = self.line;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(token_type) = self.pending_token.take() {
                let lexeme: &str = unsafe {
                    std::str::from_utf8_unchecked(&self.source[self.start..self.curr_ptr])
                };

                return Some(Ok(Token::new(token_type, lexeme.to_string(), token_line)));
            }

            // Whitespace or comment, keep scanning.
        }
    }
}

impl FusedIterator for Scanner {}

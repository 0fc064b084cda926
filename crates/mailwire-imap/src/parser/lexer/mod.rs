//! Tokenizer for server responses.
//!
//! The lexer works on one complete response frame: the response line with
//! any literal data spliced in exactly as received.

mod token;

pub use token::Token;

use mailwire_core::{Error, Result};

/// Lexer over one response frame.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input`.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the unconsumed input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Returns true at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Returns the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Consumes and returns one byte.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Skips up to `n` bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Reads the next token.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] on malformed input.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            b'\r' => {
                if self.peek_at(1) == Some(b'\n') {
                    self.skip(2);
                    Ok(Token::Crlf)
                } else {
                    Err(self.error("expected LF after CR"))
                }
            }
            b' ' => self.single(Token::Space),
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b'[' => self.single(Token::LBracket),
            b']' => self.single(Token::RBracket),
            b'*' => self.single(Token::Asterisk),
            b'+' => self.single(Token::Plus),
            b'"' => self.read_quoted_string(),
            b'{' => self.read_literal(),
            b'0'..=b'9' => self.read_number_or_atom(),
            _ if is_atom_char(byte) => self.read_atom(),
            _ => Err(self.error(&format!("unexpected byte {byte:#04x}"))),
        }
    }

    fn single(&mut self, token: Token<'a>) -> Result<Token<'a>> {
        self.pos += 1;
        Ok(token)
    }

    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.advance();
        let mut out = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => out.push(c),
                    Some(c) => return Err(self.error(&format!("invalid escape \\{}", c as char))),
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(b'\r' | b'\n') | None => return Err(self.error("unterminated quoted string")),
                Some(c) => out.push(c),
            }
        }
        let s = String::from_utf8(out).map_err(|_| self.error("invalid UTF-8 in quoted string"))?;
        Ok(Token::QuotedString(s))
    }

    /// Reads `{n}` or `{n+}`, the CRLF, and exactly `n` bytes of data.
    ///
    /// The data is taken by length; any CRLF inside it is payload.
    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.advance();
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        if digits.is_empty() || self.advance() != Some(b'}') {
            return Err(self.error("malformed literal length"));
        }
        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("literal length out of range"))?;
        if self.advance() != Some(b'\r') || self.advance() != Some(b'\n') {
            return Err(self.error("expected CRLF after literal length"));
        }
        if self.input.len() - self.pos < size {
            return Err(self.error("incomplete literal data"));
        }
        let data = &self.input[self.pos..self.pos + size];
        self.pos += size;
        Ok(Token::Literal(data))
    }

    fn read_number_or_atom(&mut self) -> Result<Token<'a>> {
        let s = self.take_atom()?;
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let n = s.parse().map_err(|_| self.error("number too large"))?;
            Ok(Token::Number(n))
        } else {
            Ok(Token::Atom(s))
        }
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let s = self.take_atom()?;
        if s.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(s))
        }
    }

    fn take_atom(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| self.error("invalid UTF-8 in atom"))
    }

    /// Creates a protocol error at the current position.
    #[must_use]
    pub fn error(&self, message: &str) -> Error {
        Error::Protocol(format!("{message} at byte {}", self.pos))
    }

    /// Consumes a token of the same kind as `expected`.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the next token differs.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {expected:?}, got {token:?}")))
        }
    }

    /// Consumes one space.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the next byte is not a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an astring (atom, quoted string or literal).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] for any other token.
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::Nil => Ok("NIL".to_string()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => Ok(String::from_utf8_lossy(data).into_owned()),
            token => Err(self.error(&format!("expected astring, got {token:?}"))),
        }
    }

    /// Reads an nstring (`NIL`, quoted string or literal).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] for any other token.
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(String::from_utf8_lossy(data).into_owned())),
            token => Err(self.error(&format!("expected nstring, got {token:?}"))),
        }
    }

    /// Reads a 32-bit number.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the token is not a number or exceeds `u32`.
    pub fn read_number(&mut self) -> Result<u32> {
        let n = self.read_number64()?;
        u32::try_from(n).map_err(|_| self.error("number exceeds 32 bits"))
    }

    /// Reads a 64-bit number.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the token is not a number.
    pub fn read_number64(&mut self) -> Result<u64> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the next token is not an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("expected atom, got {token:?}"))),
        }
    }

    /// Skips one value (atom, number, string, literal or parenthesized
    /// list) and returns its raw bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] on malformed input or unbalanced parentheses.
    pub fn skip_value(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            match self.next_token()? {
                Token::LParen => depth += 1,
                Token::RParen if depth > 0 => depth -= 1,
                Token::RParen | Token::Crlf | Token::Eof => {
                    return Err(self.error("unbalanced value"));
                }
                _ => {}
            }
            if depth == 0 {
                return Ok(&self.input[start..self.pos]);
            }
        }
    }

    /// Returns the rest of the line as text and consumes the CRLF.
    pub fn read_text(&mut self) -> String {
        let remaining = self.remaining();
        let end = remaining
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(remaining.len());
        self.skip(end + 2);
        String::from_utf8_lossy(&remaining[..end]).into_owned()
    }
}

/// Returns true if `b` may appear in an atom.
///
/// `\` is included so that flags such as `\Seen` lex as one atom.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 | 0x23..=0x24 | 0x26..=0x27 |
        0x2B..=0x5A |
        0x5C |
        0x5E..=0x7A |
        0x7C |
        0x7E
    )
}

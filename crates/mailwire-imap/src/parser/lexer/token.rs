//! Lexer tokens.

/// Token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Atom, including flags such as `\Seen`.
    Atom(&'a str),
    /// Quoted string, unescaped.
    QuotedString(String),
    /// Literal data following `{n}`.
    Literal(&'a [u8]),
    /// Number.
    Number(u64),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// Single space.
    Space,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// `NIL`
    Nil,
    /// CRLF.
    Crlf,
    /// End of input.
    Eof,
}

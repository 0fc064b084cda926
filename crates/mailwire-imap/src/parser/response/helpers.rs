//! Parser helper functions.

use mailwire_core::{CapabilitySet, Result};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    Flag, Flags, ListResponse, Mailbox, MailboxAttribute, ResponseCode, StatusItem,
};

/// Parses `[code ...]`.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;
    let atom = lexer.read_atom_string()?;

    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "NOMODSEQ" => ResponseCode::NoModSeq,
        "UIDNEXT" => {
            lexer.expect_space()?;
            ResponseCode::UidNext(lexer.read_number()?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            ResponseCode::UidValidity(lexer.read_number()?)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            ResponseCode::Unseen(lexer.read_number()?)
        }
        "HIGHESTMODSEQ" => {
            lexer.expect_space()?;
            ResponseCode::HighestModSeq(lexer.read_number64()?)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?)
        }
        _ => ResponseCode::Other(atom.to_string()),
    };

    // Arguments of unknown codes are skipped.
    while !matches!(lexer.peek(), Some(b']' | b'\r') | None) {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;
    Ok(code)
}

/// Parses the space-separated atoms of CAPABILITY data.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<CapabilitySet> {
    let mut caps = CapabilitySet::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Atom(s) => caps.push(s),
            Token::Number(n) => caps.push(n.to_string()),
            _ => break,
        }
    }
    Ok(caps)
}

/// Parses a parenthesized flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;
    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            // `\*` lexes as a lone backslash followed by an asterisk.
            Token::Atom("\\") if lexer.peek() == Some(b'*') => {
                lexer.advance();
                flags.insert(Flag::MayCreate);
            }
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            token => return Err(lexer.error(&format!("unexpected {token:?} in flag list"))),
        }
    }
    Ok(flags)
}

/// Parses LIST data: attributes, delimiter, name.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            token => return Err(lexer.error(&format!("unexpected {token:?} in LIST attributes"))),
        }
    }
    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => return Err(lexer.error(&format!("expected delimiter, got {token:?}"))),
    };
    lexer.expect_space()?;

    let name = lexer.read_astring()?;
    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox: Mailbox::new(name),
    })
}

/// Parses SEARCH data.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut nums = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if lexer.peek() == Some(b'(') {
            // ESEARCH-style trailing (MODSEQ n)
            lexer.skip_value()?;
            continue;
        }
        nums.push(lexer.read_number()?);
    }
    Ok(nums)
}

/// Parses STATUS data: mailbox and item list.
pub fn parse_status_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<StatusItem>)> {
    let name = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(item) => {
                lexer.expect_space()?;
                let value = lexer.read_number64()?;
                let small = || u32::try_from(value).map_err(|_| lexer.error("status value exceeds 32 bits"));
                let item = match item.to_ascii_uppercase().as_str() {
                    "MESSAGES" => StatusItem::Messages(small()?),
                    "RECENT" => StatusItem::Recent(small()?),
                    "UIDNEXT" => StatusItem::UidNext(small()?),
                    "UIDVALIDITY" => StatusItem::UidValidity(small()?),
                    "UNSEEN" => StatusItem::Unseen(small()?),
                    "HIGHESTMODSEQ" => StatusItem::HighestModSeq(value),
                    _ => continue,
                };
                items.push(item);
            }
            token => return Err(lexer.error(&format!("unexpected {token:?} in STATUS data"))),
        }
    }
    Ok((Mailbox::new(name), items))
}

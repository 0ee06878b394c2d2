// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Lexer for iCalendar content lines as defined in RFC 5545.
//!
//! Folded lines (a line break followed by a single space or tab) are skipped
//! by the lexer itself, so every token slice is taken verbatim from the source
//! and concatenating the slices of a line yields the unfolded line.

use std::fmt::{self, Display};
use std::ops::Range;

use logos::Logos;

/// Tokenize iCalendar source into spanned tokens.
///
/// Characters the lexer does not accept (control characters, a bare CR) are
/// reported as [`Token::Error`] so the scanner can decide whether they are
/// tolerable in the current position.
pub fn tokenize(src: &str) -> impl Iterator<Item = SpannedToken<'_>> {
    Token::lexer(src).spanned().map(|(tok, span)| match tok {
        Ok(tok) => SpannedToken(tok, span),
        Err(()) => SpannedToken(Token::Error, span),
    })
}

/// Token emitted by the iCalendar lexer
#[derive(PartialEq, Eq, Clone, Copy, Logos)]
#[logos(skip r"\r?\n[ \t]")] // skip folding
pub enum Token<'a> {
    /// Double Quote ("), decimal codepoint 22
    #[token("\"")]
    DQuote,

    /// Comma (,), decimal codepoint 44
    #[token(",")]
    Comma,

    /// Colon (:), decimal codepoint 58
    #[token(":")]
    Colon,

    /// Semicolon (;), decimal codepoint 59
    #[token(";")]
    Semicolon,

    /// Equal sign (=), decimal codepoint 61
    #[token("=")]
    Equal,

    /// Line break, CRLF per RFC 5545, bare LF is tolerated
    #[regex(r"\r?\n")]
    Newline,

    /// ASCII word characters: 0-9, A-Z, a-z, underscore and hyphen
    #[regex("[0-9A-Za-z_-]+")]
    Word(&'a str),

    /// Any other printable run, including whitespace and non-ASCII text
    #[regex(r#"[^\x00-\x08\x0A-\x1F\x7F",:;=0-9A-Za-z_-]+"#)]
    Text(&'a str),

    /// Error token for lexing errors
    Error,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DQuote => write!(f, "DQuote"),
            Self::Comma => write!(f, "Comma"),
            Self::Colon => write!(f, "Colon"),
            Self::Semicolon => write!(f, "Semicolon"),
            Self::Equal => write!(f, "Equal"),
            Self::Newline => write!(f, "Newline"),
            Self::Word(s) => write!(f, "Word({s})"),
            Self::Text(s) => write!(f, "Text({s})"),
            Self::Error => write!(f, "Error"),
        }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A token with its byte range in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken<'src>(pub Token<'src>, pub Range<usize>);

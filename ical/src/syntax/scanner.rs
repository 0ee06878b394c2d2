// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Scanner for iCalendar content lines.
//!
//! ```text
//! Source Text → Lexer → Token Stream → Scanner → Content Lines
//! ```
//!
//! Per RFC 5545, a content line has the format:
//! ```text
//! contentline = name *(";" param) ":" value CRLF
//! ```
//!
//! Blank lines are skipped. Scanning stops at the first malformed line.

use std::iter::Peekable;
use std::ops::Range;

use crate::property::{Parameter, ParameterValue, Property};
use crate::syntax::lexer::{SpannedToken, Token};

/// A scanned content line with its byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// The property carried by the line
    pub property: Property,
    /// Span from the first byte of the name to the end of the value
    pub span: Range<usize>,
}

/// Errors that can occur when scanning a content line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentLineError {
    /// The line has no property name, e.g. `:value`
    #[error("empty property name")]
    EmptyName {
        /// Where the name was expected
        span: Range<usize>,
    },

    /// The name is followed by something other than `;` or `:`.
    ///
    /// Example: `PROPNAME value` instead of `PROPNAME:value`
    #[error("missing colon after property name")]
    MissingColon {
        /// Where the colon was expected
        span: Range<usize>,
    },

    /// Example: `;=value`
    #[error("empty parameter name")]
    EmptyParameterName {
        /// Where the name was expected
        span: Range<usize>,
    },

    /// Example: `TZID America/New_York`
    #[error("missing equals in parameter")]
    MissingEquals {
        /// Where the equals sign was expected
        span: Range<usize>,
    },

    /// Example: `PARAM="unclosed value`
    #[error("unterminated quoted string")]
    UnterminatedQuote {
        /// Span of the opening quote
        span: Range<usize>,
    },
}

impl ContentLineError {
    /// Byte range of the error in the source.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        match self {
            Self::EmptyName { span }
            | Self::MissingColon { span }
            | Self::EmptyParameterName { span }
            | Self::MissingEquals { span }
            | Self::UnterminatedQuote { span } => span.clone(),
        }
    }
}

/// Scan a token stream into content lines.
///
/// # Errors
///
/// Returns the first [`ContentLineError`] encountered.
pub fn scan_content_lines<'src>(
    src: &'src str,
    tokens: impl IntoIterator<Item = SpannedToken<'src>>,
) -> Result<Vec<ContentLine>, ContentLineError> {
    let mut tokens = tokens.into_iter().peekable();
    let mut lines = Vec::new();

    loop {
        while tokens
            .next_if(|t| matches!(t.0, Token::Newline))
            .is_some()
        {}
        if tokens.peek().is_none() {
            break;
        }
        lines.push(scan_content_line(src, &mut tokens)?);
    }

    Ok(lines)
}

fn scan_content_line<'src, I>(
    src: &'src str,
    tokens: &mut Peekable<I>,
) -> Result<ContentLine, ContentLineError>
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    let start = current_offset(tokens, src);
    let name = collect_words(src, tokens);
    if name.is_empty() {
        return Err(ContentLineError::EmptyName {
            span: next_span(tokens, src),
        });
    }

    let mut parameters = Vec::new();
    loop {
        match tokens.peek() {
            Some(SpannedToken(Token::Semicolon, _)) => {
                tokens.next();
                parameters.push(scan_parameter(src, tokens)?);
            }
            Some(SpannedToken(Token::Colon, _)) => {
                tokens.next();
                break;
            }
            _ => {
                return Err(ContentLineError::MissingColon {
                    span: next_span(tokens, src),
                });
            }
        }
    }

    let mut value = String::new();
    let mut end = current_offset(tokens, src);
    while let Some(SpannedToken(_, span)) = tokens.next_if(|t| !matches!(t.0, Token::Newline)) {
        value.push_str(slice(src, &span));
        end = span.end;
    }

    Ok(ContentLine {
        property: Property {
            name,
            parameters,
            value,
        },
        span: start..end,
    })
}

/// Format: `name=value` or `name=value1,"value 2"`
fn scan_parameter<'src, I>(
    src: &'src str,
    tokens: &mut Peekable<I>,
) -> Result<Parameter, ContentLineError>
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    let name = collect_words(src, tokens);
    if name.is_empty() {
        return Err(ContentLineError::EmptyParameterName {
            span: next_span(tokens, src),
        });
    }
    if tokens
        .next_if(|t| matches!(t.0, Token::Equal))
        .is_none()
    {
        return Err(ContentLineError::MissingEquals {
            span: next_span(tokens, src),
        });
    }

    let mut values = Vec::new();
    loop {
        values.push(scan_parameter_value(src, tokens)?);
        if tokens
            .next_if(|t| matches!(t.0, Token::Comma))
            .is_none()
        {
            break;
        }
    }

    Ok(Parameter { name, values })
}

fn scan_parameter_value<'src, I>(
    src: &'src str,
    tokens: &mut Peekable<I>,
) -> Result<ParameterValue, ContentLineError>
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    let mut value = String::new();

    if let Some(SpannedToken(_, open)) = tokens.next_if(|t| matches!(t.0, Token::DQuote)) {
        loop {
            match tokens.next() {
                Some(SpannedToken(Token::DQuote, _)) => {
                    return Ok(ParameterValue {
                        value,
                        quoted: true,
                    });
                }
                Some(SpannedToken(Token::Newline, _)) | None => {
                    return Err(ContentLineError::UnterminatedQuote { span: open });
                }
                Some(SpannedToken(_, span)) => value.push_str(slice(src, &span)),
            }
        }
    }

    while let Some(SpannedToken(_, span)) = tokens.next_if(|t| {
        !matches!(
            t.0,
            Token::Comma | Token::Semicolon | Token::Colon | Token::Newline
        )
    }) {
        value.push_str(slice(src, &span));
    }
    Ok(ParameterValue {
        value,
        quoted: false,
    })
}

fn collect_words<'src, I>(src: &'src str, tokens: &mut Peekable<I>) -> String
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    let mut word = String::new();
    while let Some(SpannedToken(_, span)) = tokens.next_if(|t| matches!(t.0, Token::Word(_))) {
        word.push_str(slice(src, &span));
    }
    word
}

fn current_offset<'src, I>(tokens: &mut Peekable<I>, src: &str) -> usize
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    tokens.peek().map_or(src.len(), |t| t.1.start)
}

fn next_span<'src, I>(tokens: &mut Peekable<I>, src: &str) -> Range<usize>
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    tokens
        .peek()
        .map_or(src.len()..src.len(), |t| t.1.clone())
}

fn slice<'src>(src: &'src str, span: &Range<usize>) -> &'src str {
    src.get(span.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::tokenize;

    fn scan(src: &str) -> Result<Vec<ContentLine>, ContentLineError> {
        scan_content_lines(src, tokenize(src))
    }

    #[test]
    fn scans_name_parameters_and_value() {
        let src = "DTSTART;TZID=America/New_York;X-LIST=a,\"b;c\":20250101T090000\r\n";
        let lines = scan(src).unwrap();
        assert_eq!(lines.len(), 1);
        let prop = &lines[0].property;
        assert_eq!(prop.name, "DTSTART");
        assert_eq!(prop.parameter_value("TZID"), Some("America/New_York"));
        let list = prop.parameter("X-LIST").unwrap();
        assert_eq!(list.values.len(), 2);
        assert_eq!(list.values[1].value, "b;c");
        assert!(list.values[1].quoted);
        assert_eq!(prop.value, "20250101T090000");
        assert_eq!(prop.to_string(), src.trim_end());
    }

    #[test]
    fn value_keeps_separators_and_unfolds() {
        let src = "DESCRIPTION:a\\, b; c: d=e\r\n  folded\r\nSUMMARY:x\r\n";
        let lines = scan(src).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].property.value, "a\\, b; c: d=e folded");
    }

    #[test]
    fn skips_blank_lines() {
        let lines = scan("\r\nA:1\r\n\r\n\nB:2").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].property.value, "2");
    }

    #[test]
    fn reports_malformed_lines() {
        assert!(matches!(
            scan("SUMMARY value\r\n"),
            Err(ContentLineError::MissingColon { .. })
        ));
        assert!(matches!(
            scan(":value\r\n"),
            Err(ContentLineError::EmptyName { .. })
        ));
        assert!(matches!(
            scan("X;=a:b\r\n"),
            Err(ContentLineError::EmptyParameterName { .. })
        ));
        assert!(matches!(
            scan("X;TZID:b\r\n"),
            Err(ContentLineError::MissingEquals { .. })
        ));
        assert!(matches!(
            scan("X;CN=\"open:b\r\n"),
            Err(ContentLineError::UnterminatedQuote { .. })
        ));
        assert!(matches!(
            scan("SUMMARY"),
            Err(ContentLineError::MissingColon { .. })
        ));
    }

    #[test]
    fn error_span_points_into_source() {
        let src = "A:1\r\nBROKEN LINE\r\n";
        let err = scan(src).unwrap_err();
        assert_eq!(&src[err.span()], " ");
    }
}

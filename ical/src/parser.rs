// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::object::CalendarObject;
use crate::syntax::{SyntaxError, syntax_analysis};

/// Parse a calendar object from source text
///
/// The text must hold exactly one `VCALENDAR`. Folded lines, bare LF line
/// endings and blank lines are accepted. Property values are not interpreted
/// here; the typed accessors on [`CalendarObject`] do that lazily.
///
/// ## Errors
///
/// Returns a [`ParseError`] if the text cannot be split into balanced
/// components, or if an event or task has no `UID`.
///
/// ## Examples
///
/// ```
/// # use calbridge_ical::parse;
/// let ical_src = "\
/// BEGIN:VCALENDAR\r\n\
/// BEGIN:VEVENT\r\n\
/// UID:1\r\n\
/// SUMMARY:Test Event\r\n\
/// END:VEVENT\r\n\
/// END:VCALENDAR\r\n\
/// ";
/// assert!(parse(ical_src).is_ok());
/// ```
///
/// ```
/// # use calbridge_ical::{ParseError, parse};
/// let invalid_ical_src = "\
/// BEGIN:VCALENDAR\r\n\
/// BEGIN:VEVENT\r\n\
/// END:VCALENDAR\r\n\
/// END:VEVENT\r\n\
/// ";
/// let err = parse(invalid_ical_src).unwrap_err();
/// assert!(matches!(err, ParseError::Syntax { line: 3, .. }));
/// ```
pub fn parse(src: &str) -> Result<CalendarObject, ParseError> {
    let src = src.trim();
    let mut roots = syntax_analysis(src).map_err(|source| ParseError::Syntax {
        line: line_of(src, source.span().start),
        source,
    })?;

    match roots.len() {
        0 => Err(ParseError::Empty),
        1 => match roots.pop() {
            Some(root) => CalendarObject::try_from(root),
            None => Err(ParseError::Empty),
        },
        count => Err(ParseError::MultipleRoots { count }),
    }
}

/// Parse a calendar object from raw bytes
///
/// Folding may split a multi-byte UTF-8 sequence across lines. Such bodies
/// are unfolded at the byte level before decoding; valid UTF-8 input is
/// parsed as is.
///
/// ## Errors
///
/// Returns [`ParseError::Encoding`] if the unfolded bytes are not UTF-8, or
/// any error of [`parse`].
pub fn parse_bytes(src: &[u8]) -> Result<CalendarObject, ParseError> {
    match std::str::from_utf8(src) {
        Ok(text) => parse(text),
        Err(_) => {
            let unfolded = unfold_bytes(src);
            let text = std::str::from_utf8(&unfolded).map_err(|e| ParseError::Encoding {
                offset: e.valid_up_to(),
            })?;
            parse(text)
        }
    }
}

/// Removes line folds (CRLF or LF followed by a space or tab).
fn unfold_bytes(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while let Some(&b) = src.get(i) {
        let fold_len = match (b, src.get(i + 1), src.get(i + 2)) {
            (b'\r', Some(b'\n'), Some(b' ' | b'\t')) => 3,
            (b'\n', Some(b' ' | b'\t'), _) => 2,
            _ => 0,
        };
        if fold_len == 0 {
            out.push(b);
            i += 1;
        } else {
            i += fold_len;
        }
    }
    out
}

/// Errors that can occur during parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Malformed content line or unbalanced components
    #[error("line {line}: {source}")]
    Syntax {
        /// 1-based line number, counted on the folded text
        line: usize,
        /// Underlying syntax error
        source: SyntaxError,
    },

    /// The bytes are not UTF-8, even after unfolding
    #[error("invalid UTF-8 at byte {offset}")]
    Encoding {
        /// Offset of the first invalid byte in the unfolded input
        offset: usize,
    },

    /// The text holds no component
    #[error("no VCALENDAR component found")]
    Empty,

    /// The text holds more than one top-level component
    #[error("expected a single VCALENDAR, found {count} top-level components")]
    MultipleRoots {
        /// Number of top-level components
        count: usize,
    },

    /// The top-level component is not a `VCALENDAR`
    #[error("expected VCALENDAR, found {name}")]
    NotACalendar {
        /// Name of the top-level component
        name: String,
    },

    /// An event or task without `UID`
    #[error("{component} without UID")]
    MissingUid {
        /// Name of the offending component
        component: String,
    },
}

fn line_of(src: &str, offset: usize) -> usize {
    src.get(..offset)
        .map_or(1, |before| before.matches('\n').count() + 1)
}

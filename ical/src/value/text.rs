// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! TEXT value escaping as defined in RFC 5545 Section 3.3.11.
//!
//! ```txt
//! ESCAPED-CHAR = ("\\" / "\;" / "\," / "\N" / "\n")
//!    ; \\ encodes \, \N or \n encodes newline
//!    ; \; encodes ;, \, encodes ,
//! ```

/// Escapes a TEXT value for the wire.
///
/// CRLF and bare CR are both encoded as a single `\n`.
#[must_use]
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str(r"\\"),
            ';' => out.push_str(r"\;"),
            ',' => out.push_str(r"\,"),
            '\n' => out.push_str(r"\n"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str(r"\n");
            }
            c => out.push(c),
        }
    }
    out
}

/// Decodes an escaped TEXT value.
///
/// Unknown escapes keep the escaped character, a trailing lone backslash is
/// kept as is.
#[must_use]
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Splits a raw value on commas that are not escaped.
#[must_use]
pub fn split_unescaped_commas(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => {
                parts.push(value.get(start..i).unwrap_or_default());
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    parts.push(value.get(start..).unwrap_or_default());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_special_characters() {
        assert_eq!(
            escape_text("a,b;c\\d\ne\r\nf"),
            r"a\,b\;c\\d\ne\nf"
        );
    }

    #[test]
    fn unescapes_special_characters() {
        assert_eq!(unescape_text(r"a\,b\;c\\d\ne\Nf"), "a,b;c\\d\ne\nf");
        assert_eq!(unescape_text(r"trailing\"), "trailing\\");
    }

    #[test]
    fn escape_then_unescape_is_identity() {
        let original = "Meeting; agenda: a, b \\ c\nsecond line";
        assert_eq!(unescape_text(&escape_text(original)), original);
    }

    #[test]
    fn splits_only_on_unescaped_commas() {
        assert_eq!(split_unescaped_commas(r"a\,b,c,\\,d"), [r"a\,b", "c", r"\\", "d"]);
        assert_eq!(split_unescaped_commas(""), [""]);
    }
}

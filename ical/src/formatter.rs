// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! iCalendar (RFC 5545) formatter module.
//!
//! Properties are written from the raw values held in the property bag, so
//! anything that was parsed is written back unchanged apart from line folding.
//!
//! # Example
//!
//! ```
//! use calbridge_ical::{format, parse};
//!
//! let src = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:1\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
//! let object = parse(src).unwrap();
//! assert_eq!(format(&object), src);
//! ```

use crate::component::Component;
use crate::keyword::{KW_BEGIN, KW_END};
use crate::object::CalendarObject;
use crate::property::Property;

/// Formats a calendar object with the default options.
#[must_use]
pub fn format(object: &CalendarObject) -> String {
    FormatOptions::default().write_to_string(object)
}

/// Formatting options for the iCalendar formatter.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Maximum line length in octets before folding.
    /// - `None`: no line folding
    /// - `Some(n)`: fold lines longer than n octets
    ///
    /// Default: `Some(75)` for RFC 5545 compliance.
    pub folding: Option<usize>,

    /// Line folding style.
    ///
    /// Default: `FoldingStyle::Space` (CRLF + SPACE).
    pub folding_style: FoldingStyle,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            folding: Some(75),
            folding_style: FoldingStyle::default(),
        }
    }
}

impl FormatOptions {
    /// Set the line folding option.
    #[must_use]
    pub const fn folding(mut self, folding: Option<usize>) -> Self {
        self.folding = folding;
        self
    }

    /// Set the line folding style.
    #[must_use]
    pub const fn folding_style(mut self, style: FoldingStyle) -> Self {
        self.folding_style = style;
        self
    }

    /// Formats a calendar object to a `String`.
    #[must_use]
    pub fn write_to_string(&self, object: &CalendarObject) -> String {
        let mut formatter = Formatter::new(*self);
        formatter.write_component(object.root());
        formatter.finish()
    }
}

/// Line folding style for RFC 5545 formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FoldingStyle {
    /// CRLF + SPACE (RFC 5545 default)
    #[default]
    Space,
    /// CRLF + TAB
    Tab,
}

impl FoldingStyle {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Space => "\r\n ",
            Self::Tab => "\r\n\t",
        }
    }
}

/// iCalendar formatter that accumulates content lines into a buffer.
#[derive(Debug)]
pub struct Formatter {
    buffer: String,
    options: FormatOptions,
}

impl Formatter {
    /// Create a new formatter with options.
    #[must_use]
    pub const fn new(options: FormatOptions) -> Self {
        Self {
            buffer: String::new(),
            options,
        }
    }

    /// Writes a component and all of its children.
    pub fn write_component(&mut self, component: &Component) {
        self.write_line(&format!("{KW_BEGIN}:{}", component.name));
        for property in &component.properties {
            self.write_property(property);
        }
        for child in &component.children {
            self.write_component(child);
        }
        self.write_line(&format!("{KW_END}:{}", component.name));
    }

    /// Writes a single property as a folded content line.
    pub fn write_property(&mut self, property: &Property) {
        self.write_line(&property.to_string());
    }

    /// Writes an unfolded line, folding it and appending CRLF.
    ///
    /// Folds never split a UTF-8 sequence; the continuation whitespace counts
    /// towards the limit of the next line.
    pub fn write_line(&mut self, line: &str) {
        match self.options.folding {
            Some(limit) if limit > 1 => {
                let mut length = 0;
                for ch in line.chars() {
                    let width = ch.len_utf8();
                    if length + width > limit {
                        self.buffer.push_str(self.options.folding_style.as_str());
                        length = 1;
                    }
                    self.buffer.push(ch);
                    length += width;
                }
            }
            _ => self.buffer.push_str(line),
        }
        self.buffer.push_str("\r\n");
    }

    /// Returns the formatted text.
    #[must_use]
    pub fn finish(self) -> String {
        self.buffer
    }
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Open property bag shared by every component.
//!
//! Properties keep the exact name casing, parameter quoting and raw (still
//! escaped) value they were parsed with, so anything the typed accessors do
//! not understand is written back byte-for-byte.

use std::fmt::{self, Display, Write as _};

use crate::value::text::{escape_text, unescape_text};

/// A single iCalendar property (content line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name, original casing preserved
    pub name: String,
    /// Property parameters in source order
    pub parameters: Vec<Parameter>,
    /// Raw property value as it appears on the wire (escaped, unfolded)
    pub value: String,
}

impl Property {
    /// Creates a property from a raw (already escaped) value.
    #[must_use]
    pub fn raw(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            value: value.into(),
        }
    }

    /// Creates a TEXT property, escaping the value.
    #[must_use]
    pub fn text(name: impl Into<String>, value: &str) -> Self {
        Self::raw(name, escape_text(value))
    }

    /// Adds a parameter, builder style.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.set_parameter(name, value);
        self
    }

    /// Whether this property has the given name (case-insensitive).
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// The value decoded as TEXT.
    #[must_use]
    pub fn text_value(&self) -> String {
        unescape_text(&self.value)
    }

    /// Finds a parameter by name (case-insensitive).
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.is(name))
    }

    /// First value of the named parameter.
    #[must_use]
    pub fn parameter_value(&self, name: &str) -> Option<&str> {
        self.parameter(name)
            .and_then(|p| p.values.first())
            .map(|v| v.value.as_str())
    }

    /// Replaces (or appends) a single-valued parameter.
    pub fn set_parameter(&mut self, name: &str, value: &str) {
        let param = Parameter::new(name, value);
        match self.parameters.iter_mut().find(|p| p.is(name)) {
            Some(existing) => *existing = param,
            None => self.parameters.push(param),
        }
    }

    /// Removes every parameter with the given name.
    pub fn remove_parameter(&mut self, name: &str) {
        self.parameters.retain(|p| !p.is(name));
    }
}

impl Display for Property {
    /// Writes the unfolded content line, without the line terminator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for param in &self.parameters {
            f.write_char(';')?;
            param.fmt(f)?;
        }
        f.write_char(':')?;
        f.write_str(&self.value)
    }
}

/// A property parameter, e.g. `TZID=Europe/Berlin` or `MEMBER="a","b"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name, original casing preserved
    pub name: String,
    /// Comma separated values
    pub values: Vec<ParameterValue>,
}

impl Parameter {
    /// Creates a single-valued parameter, quoting the value when required.
    #[must_use]
    pub fn new(name: impl Into<String>, value: &str) -> Self {
        Self {
            name: name.into(),
            values: vec![ParameterValue::new(value)],
        }
    }

    /// Whether this parameter has the given name (case-insensitive).
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        f.write_char('=')?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            if value.quoted {
                write!(f, "\"{}\"", value.value)?;
            } else {
                f.write_str(&value.value)?;
            }
        }
        Ok(())
    }
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterValue {
    /// The value without surrounding quotes
    pub value: String,
    /// Whether the value is written in double quotes
    pub quoted: bool,
}

impl ParameterValue {
    /// Creates a value, quoting it if it contains `:`, `;` or `,`.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self {
            value: value.replace('"', ""),
            quoted: value.contains([':', ';', ',']),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_content_line_verbatim() {
        let prop = Property {
            name: "X-Custom".to_string(),
            parameters: vec![Parameter {
                name: "member".to_string(),
                values: vec![
                    ParameterValue {
                        value: "mailto:a@example.com".to_string(),
                        quoted: true,
                    },
                    ParameterValue {
                        value: "plain".to_string(),
                        quoted: false,
                    },
                ],
            }],
            value: r"a\,b".to_string(),
        };
        assert_eq!(
            prop.to_string(),
            r#"X-Custom;member="mailto:a@example.com",plain:a\,b"#
        );
    }

    #[test]
    fn parameter_lookup_is_case_insensitive() {
        let mut prop = Property::raw("DTSTART", "20250101T090000").with_parameter("tzid", "A");
        assert_eq!(prop.parameter_value("TZID"), Some("A"));
        prop.set_parameter("TZID", "Europe/Berlin");
        assert_eq!(prop.parameters.len(), 1);
        assert_eq!(prop.parameter_value("tzid"), Some("Europe/Berlin"));
        prop.remove_parameter("Tzid");
        assert!(prop.parameters.is_empty());
    }

    #[test]
    fn quotes_parameter_values_with_separators() {
        assert!(ParameterValue::new("a:b").quoted);
        assert!(!ParameterValue::new("Europe/Berlin").quoted);
    }
}

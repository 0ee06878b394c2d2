// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Typed views over raw property values.
//!
//! Values stay raw in the property bag and are only interpreted on access, so
//! a value the crate cannot interpret never prevents the object from being
//! parsed or written back.

pub mod datetime;
pub mod rrule;
pub mod text;

pub use datetime::DateTimeValue;
pub use rrule::{Frequency, RecurrenceRule, WeekDay, WeekDayNum};
pub use text::{escape_text, split_unescaped_commas, unescape_text};

/// A property value that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {property} value '{value}': {reason}")]
pub struct ValueError {
    /// Property name
    pub property: String,
    /// Offending raw value
    pub value: String,
    /// What is wrong with it
    pub reason: String,
}

impl ValueError {
    /// Creates a new value error.
    pub fn new(property: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            property: property.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Parse, represent, format and expand iCalendar (RFC 5545) calendar objects.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

pub mod component;
pub mod formatter;
pub mod keyword;
pub mod object;
mod parser;
pub mod property;
pub mod recurrence;
pub mod syntax;
pub mod value;

pub use crate::component::Component;
pub use crate::formatter::{FormatOptions, FoldingStyle, format};
pub use crate::object::{CalendarObject, Event, EventDraft, EventPatch, ObjectError, Status};
pub use crate::parser::{ParseError, parse, parse_bytes};
pub use crate::property::{Parameter, ParameterValue, Property};
pub use crate::recurrence::{Occurrence, Occurrences, RecurrenceError};
pub use crate::value::{
    DateTimeValue, Frequency, RecurrenceRule, ValueError, WeekDay, WeekDayNum,
};

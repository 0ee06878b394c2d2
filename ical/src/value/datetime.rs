// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! DATE and DATE-TIME values.
//!
//! Time zones are carried as opaque `TZID` strings and never resolved; every
//! comparison is done on the wall-clock value.

use std::fmt::{self, Display};

use jiff::SignedDuration;
use jiff::civil::{Date, DateTime, Time};

use crate::keyword::{KW_DATE, KW_TZID, KW_VALUE};
use crate::property::Property;
use crate::value::ValueError;

/// A DATE or DATE-TIME property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeValue {
    /// All-day value (`VALUE=DATE`)
    Date(Date),
    /// Local time without zone
    Floating(DateTime),
    /// UTC time (trailing `Z`), stored as the UTC wall clock
    Utc(DateTime),
    /// Local time in an opaque time zone
    Zoned {
        /// Wall-clock time
        datetime: DateTime,
        /// Time zone identifier, propagated verbatim
        tzid: String,
    },
}

impl DateTimeValue {
    /// Parses a value out of a property, honouring `VALUE=DATE` and `TZID`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid DATE or DATE-TIME.
    pub fn from_property(prop: &Property) -> Result<Self, ValueError> {
        let is_date = prop
            .parameter_value(KW_VALUE)
            .is_some_and(|v| v.eq_ignore_ascii_case(KW_DATE));
        Self::parse(&prop.value, prop.parameter_value(KW_TZID), is_date).map_err(|reason| {
            ValueError::new(&prop.name, &prop.value, reason)
        })
    }

    /// Parses every comma separated value of a list property such as `EXDATE`.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the values is invalid.
    pub fn list_from_property(prop: &Property) -> Result<Vec<Self>, ValueError> {
        let is_date = prop
            .parameter_value(KW_VALUE)
            .is_some_and(|v| v.eq_ignore_ascii_case(KW_DATE));
        let tzid = prop.parameter_value(KW_TZID);
        prop.value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| {
                Self::parse(v, tzid, is_date)
                    .map_err(|reason| ValueError::new(&prop.name, v, reason))
            })
            .collect()
    }

    /// Parses a raw DATE / DATE-TIME string.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the string is malformed.
    pub fn parse(value: &str, tzid: Option<&str>, is_date: bool) -> Result<Self, String> {
        let value = value.trim();
        if is_date || value.len() == 8 {
            return parse_date(value).map(Self::Date);
        }

        let (datetime, utc) = match value.strip_suffix(['Z', 'z']) {
            Some(rest) => (parse_datetime(rest)?, true),
            None => (parse_datetime(value)?, false),
        };
        Ok(match (utc, tzid) {
            (true, _) => Self::Utc(datetime),
            (false, Some(tzid)) => Self::Zoned {
                datetime,
                tzid: tzid.to_string(),
            },
            (false, None) => Self::Floating(datetime),
        })
    }

    /// Builds a property with the given name carrying this value.
    #[must_use]
    pub fn to_property(&self, name: &str) -> Property {
        let prop = Property::raw(name, self.to_string());
        match self {
            Self::Date(_) => prop.with_parameter(KW_VALUE, KW_DATE),
            Self::Zoned { tzid, .. } => prop.with_parameter(KW_TZID, tzid),
            Self::Floating(_) | Self::Utc(_) => prop,
        }
    }

    /// Wall-clock value, dates map to midnight.
    #[must_use]
    pub fn wall_clock(&self) -> DateTime {
        match self {
            Self::Date(date) => DateTime::from_parts(*date, Time::midnight()),
            Self::Floating(dt) | Self::Utc(dt) | Self::Zoned { datetime: dt, .. } => *dt,
        }
    }

    /// Calendar date of the value.
    #[must_use]
    pub fn date(&self) -> Date {
        self.wall_clock().date()
    }

    /// Whether this is an all-day value.
    #[must_use]
    pub const fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Time zone identifier, if any.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// Returns a value of the same kind (and zone) at another wall-clock time.
    #[must_use]
    pub fn with_wall_clock(&self, datetime: DateTime) -> Self {
        match self {
            Self::Date(_) => Self::Date(datetime.date()),
            Self::Floating(_) => Self::Floating(datetime),
            Self::Utc(_) => Self::Utc(datetime),
            Self::Zoned { tzid, .. } => Self::Zoned {
                datetime,
                tzid: tzid.clone(),
            },
        }
    }

    /// Shifts the value by a duration, keeping its kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is out of the supported range.
    pub fn checked_add(&self, duration: SignedDuration) -> Result<Self, jiff::Error> {
        Ok(self.with_wall_clock(self.wall_clock().checked_add(duration)?))
    }

    /// Whether two values denote the same instance of a recurrence set.
    ///
    /// All-day values match on the date alone; otherwise the wall clocks must
    /// be equal. Zones are not compared, they are opaque.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        if self.is_all_day() || other.is_all_day() {
            self.date() == other.date()
        } else {
            self.wall_clock() == other.wall_clock()
        }
    }
}

impl Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write_date(f, *date),
            Self::Floating(dt) | Self::Zoned { datetime: dt, .. } => write_datetime(f, *dt),
            Self::Utc(dt) => {
                write_datetime(f, *dt)?;
                f.write_str("Z")
            }
        }
    }
}

fn write_date(f: &mut fmt::Formatter<'_>, date: Date) -> fmt::Result {
    write!(f, "{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

fn write_datetime(f: &mut fmt::Formatter<'_>, dt: DateTime) -> fmt::Result {
    write_date(f, dt.date())?;
    write!(f, "T{:02}{:02}{:02}", dt.hour(), dt.minute(), dt.second())
}

/// Parses `YYYYMMDD`.
fn parse_date(s: &str) -> Result<Date, String> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("expected DATE (YYYYMMDD), got '{s}'"));
    }
    let year = digits(s, 0..4)?;
    let month = digits(s, 4..6)?;
    let day = digits(s, 6..8)?;
    Date::new(
        i16::try_from(year).map_err(|e| e.to_string())?,
        i8::try_from(month).map_err(|e| e.to_string())?,
        i8::try_from(day).map_err(|e| e.to_string())?,
    )
    .map_err(|e| e.to_string())
}

/// Parses `YYYYMMDDTHHMMSS`.
fn parse_datetime(s: &str) -> Result<DateTime, String> {
    let (date, time) = s
        .split_once(['T', 't'])
        .ok_or_else(|| format!("expected DATE-TIME (YYYYMMDDTHHMMSS), got '{s}'"))?;
    if time.len() != 6 || !time.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("expected TIME (HHMMSS), got '{time}'"));
    }
    let date = parse_date(date)?;
    let hour = digits(time, 0..2)?;
    let minute = digits(time, 2..4)?;
    // Leap second 60 is clamped, civil time has no representation for it.
    let second = digits(time, 4..6)?.min(59);
    let time = Time::new(
        i8::try_from(hour).map_err(|e| e.to_string())?,
        i8::try_from(minute).map_err(|e| e.to_string())?,
        i8::try_from(second).map_err(|e| e.to_string())?,
        0,
    )
    .map_err(|e| e.to_string())?;
    Ok(DateTime::from_parts(date, time))
}

fn digits(s: &str, range: std::ops::Range<usize>) -> Result<u32, String> {
    s.get(range)
        .and_then(|d| d.parse().ok())
        .ok_or_else(|| format!("invalid digits in '{s}'"))
}

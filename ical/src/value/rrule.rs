// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Recurrence rule values as defined in RFC 5545 Section 3.3.10.
//!
//! ```txt
//! recur           = recur-rule-part *( ";" recur-rule-part )
//!                 ;
//!                 ; The FREQ rule part is REQUIRED,
//!                 ; but MUST NOT occur more than once.
//!                 ;
//!                 ; The UNTIL or COUNT rule parts are OPTIONAL,
//!                 ; but they MUST NOT occur in the same 'recur'.
//! ```

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::keyword::{
    KW_RRULE_BYDAY, KW_RRULE_BYHOUR, KW_RRULE_BYMINUTE, KW_RRULE_BYMONTH, KW_RRULE_BYMONTHDAY,
    KW_RRULE_BYSECOND, KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY, KW_RRULE_COUNT,
    KW_RRULE_FREQ, KW_RRULE_INTERVAL, KW_RRULE_UNTIL, KW_RRULE_WKST,
};
use crate::value::datetime::DateTimeValue;

/// Recurrence rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    /// Frequency of recurrence
    pub freq: Frequency,
    /// Until date for recurrence
    pub until: Option<DateTimeValue>,
    /// Number of occurrences
    pub count: Option<u32>,
    /// Interval between recurrences, at least 1
    pub interval: u32,
    /// Second specifier
    pub by_second: Vec<u8>,
    /// Minute specifier
    pub by_minute: Vec<u8>,
    /// Hour specifier
    pub by_hour: Vec<u8>,
    /// Day of week specifier
    pub by_day: Vec<WeekDayNum>,
    /// Day of month specifier
    pub by_month_day: Vec<i8>,
    /// Day of year specifier
    pub by_year_day: Vec<i16>,
    /// Week number specifier
    pub by_week_no: Vec<i8>,
    /// Month specifier
    pub by_month: Vec<u8>,
    /// Position in the set of each period
    pub by_set_pos: Vec<i16>,
    /// Start day of week
    pub wkst: WeekDay,
    /// Rule parts not understood, kept verbatim as `(name, value)`
    pub extensions: Vec<(String, String)>,
}

impl RecurrenceRule {
    /// Creates a rule with only a frequency.
    #[must_use]
    pub const fn new(freq: Frequency) -> Self {
        Self {
            freq,
            until: None,
            count: None,
            interval: 1,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
            wkst: WeekDay::Monday,
            extensions: Vec::new(),
        }
    }

    /// Whether the rule produces a finite set.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }
}

/// Recurrence frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::EnumString, strum::Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[expect(missing_docs)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Day of the week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive)]
#[expect(missing_docs)]
pub enum WeekDay {
    #[strum(serialize = "SU")]
    Sunday,
    #[strum(serialize = "MO")]
    Monday,
    #[strum(serialize = "TU")]
    Tuesday,
    #[strum(serialize = "WE")]
    Wednesday,
    #[strum(serialize = "TH")]
    Thursday,
    #[strum(serialize = "FR")]
    Friday,
    #[strum(serialize = "SA")]
    Saturday,
}

impl From<WeekDay> for jiff::civil::Weekday {
    fn from(day: WeekDay) -> Self {
        match day {
            WeekDay::Sunday => Self::Sunday,
            WeekDay::Monday => Self::Monday,
            WeekDay::Tuesday => Self::Tuesday,
            WeekDay::Wednesday => Self::Wednesday,
            WeekDay::Thursday => Self::Thursday,
            WeekDay::Friday => Self::Friday,
            WeekDay::Saturday => Self::Saturday,
        }
    }
}

impl From<jiff::civil::Weekday> for WeekDay {
    fn from(day: jiff::civil::Weekday) -> Self {
        match day {
            jiff::civil::Weekday::Sunday => Self::Sunday,
            jiff::civil::Weekday::Monday => Self::Monday,
            jiff::civil::Weekday::Tuesday => Self::Tuesday,
            jiff::civil::Weekday::Wednesday => Self::Wednesday,
            jiff::civil::Weekday::Thursday => Self::Thursday,
            jiff::civil::Weekday::Friday => Self::Friday,
            jiff::civil::Weekday::Saturday => Self::Saturday,
        }
    }
}

/// Day of week with optional occurrence, e.g. `-1FR` (last Friday)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekDayNum {
    /// Day of the week
    pub day: WeekDay,
    /// Occurrence within the month or year
    pub occurrence: Option<i8>,
}

impl FromStr for WeekDayNum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.len().saturating_sub(2);
        let (num, day) = (s.get(..split).unwrap_or_default(), s.get(split..).unwrap_or_default());
        let day = day
            .parse::<WeekDay>()
            .map_err(|_| format!("invalid weekday '{s}'"))?;
        let occurrence = if num.is_empty() {
            None
        } else {
            let n = num
                .trim_start_matches('+')
                .parse::<i8>()
                .map_err(|_| format!("invalid weekday ordinal '{s}'"))?;
            if n == 0 || !(-53..=53).contains(&n) {
                return Err(format!("weekday ordinal out of range '{s}'"));
            }
            Some(n)
        };
        Ok(Self { day, occurrence })
    }
}

impl Display for WeekDayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.occurrence {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.day)
    }
}

impl FromStr for RecurrenceRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut freq = None;
        let mut rule = Self::new(Frequency::Daily);

        for part in s.trim().split(';').filter(|p| !p.is_empty()) {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| format!("rule part without '=': '{part}'"))?;
            let name = name.to_ascii_uppercase();
            match name.as_str() {
                KW_RRULE_FREQ => {
                    if freq.is_some() {
                        return Err("FREQ given more than once".to_string());
                    }
                    freq = Some(
                        value
                            .parse::<Frequency>()
                            .map_err(|_| format!("invalid FREQ '{value}'"))?,
                    );
                }
                KW_RRULE_UNTIL => {
                    rule.until = Some(DateTimeValue::parse(value, None, false)?);
                }
                KW_RRULE_COUNT => {
                    rule.count = Some(
                        value
                            .parse()
                            .map_err(|_| format!("invalid COUNT '{value}'"))?,
                    );
                }
                KW_RRULE_INTERVAL => {
                    rule.interval = value
                        .parse()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| format!("invalid INTERVAL '{value}'"))?;
                }
                KW_RRULE_BYSECOND => rule.by_second = parse_list(&name, value, 0..=60)?,
                KW_RRULE_BYMINUTE => rule.by_minute = parse_list(&name, value, 0..=59)?,
                KW_RRULE_BYHOUR => rule.by_hour = parse_list(&name, value, 0..=23)?,
                KW_RRULE_BYDAY => {
                    rule.by_day = value
                        .split(',')
                        .map(|v| v.trim().parse())
                        .collect::<Result<_, _>>()?;
                }
                KW_RRULE_BYMONTHDAY => rule.by_month_day = parse_signed_list(&name, value, 31)?,
                KW_RRULE_BYYEARDAY => rule.by_year_day = parse_signed_list(&name, value, 366)?,
                KW_RRULE_BYWEEKNO => rule.by_week_no = parse_signed_list(&name, value, 53)?,
                KW_RRULE_BYMONTH => rule.by_month = parse_list(&name, value, 1..=12)?,
                KW_RRULE_BYSETPOS => rule.by_set_pos = parse_signed_list(&name, value, 366)?,
                KW_RRULE_WKST => {
                    rule.wkst = value
                        .parse()
                        .map_err(|_| format!("invalid WKST '{value}'"))?;
                }
                _ => rule.extensions.push((name, value.to_string())),
            }
        }

        rule.freq = freq.ok_or_else(|| "missing FREQ".to_string())?;
        if rule.count.is_some() && rule.until.is_some() {
            return Err("COUNT and UNTIL must not occur together".to_string());
        }
        Ok(rule)
    }
}

fn parse_list<T>(name: &str, value: &str, range: std::ops::RangeInclusive<T>) -> Result<Vec<T>, String>
where
    T: FromStr + PartialOrd,
{
    value
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<T>()
                .ok()
                .filter(|n| range.contains(n))
                .ok_or_else(|| format!("invalid {name} value '{v}'"))
        })
        .collect()
}

fn parse_signed_list<T>(name: &str, value: &str, max: i16) -> Result<Vec<T>, String>
where
    T: TryFrom<i16>,
{
    value
        .split(',')
        .map(|v| {
            v.trim()
                .trim_start_matches('+')
                .parse::<i16>()
                .ok()
                .filter(|n| *n != 0 && n.abs() <= max)
                .and_then(|n| T::try_from(n).ok())
                .ok_or_else(|| format!("invalid {name} value '{v}'"))
        })
        .collect()
}

impl Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: Display>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        }

        write!(f, "{KW_RRULE_FREQ}={}", self.freq)?;
        if let Some(until) = &self.until {
            write!(f, ";{KW_RRULE_UNTIL}={until}")?;
        }
        if let Some(count) = self.count {
            write!(f, ";{KW_RRULE_COUNT}={count}")?;
        }
        if self.interval != 1 {
            write!(f, ";{KW_RRULE_INTERVAL}={}", self.interval)?;
        }
        let lists = [
            (KW_RRULE_BYSECOND, join(&self.by_second)),
            (KW_RRULE_BYMINUTE, join(&self.by_minute)),
            (KW_RRULE_BYHOUR, join(&self.by_hour)),
            (KW_RRULE_BYDAY, join(&self.by_day)),
            (KW_RRULE_BYMONTHDAY, join(&self.by_month_day)),
            (KW_RRULE_BYYEARDAY, join(&self.by_year_day)),
            (KW_RRULE_BYWEEKNO, join(&self.by_week_no)),
            (KW_RRULE_BYMONTH, join(&self.by_month)),
            (KW_RRULE_BYSETPOS, join(&self.by_set_pos)),
        ];
        for (name, list) in lists {
            if !list.is_empty() {
                write!(f, ";{name}={list}")?;
            }
        }
        if self.wkst != WeekDay::Monday {
            write!(f, ";{KW_RRULE_WKST}={}", self.wkst)?;
        }
        for (name, value) in &self.extensions {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

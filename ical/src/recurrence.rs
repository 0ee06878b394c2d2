// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Occurrence expansion for recurring events (RFC 5545 Section 3.8.5).
//!
//! The recurrence set is the union of `DTSTART`, the `RRULE` instances and
//! `RDATE`, minus `EXDATE` and the instances replaced by components carrying
//! a `RECURRENCE-ID`. Every comparison is done on wall-clock values, time
//! zones are never resolved.
//!
//! Rule instances are generated period by period (a year, month, week, day,
//! hour, minute or second, depending on `FREQ`): every day of the period is
//! checked against the `BY*` filters, combined with the time-of-day parts,
//! and `BYSETPOS` then picks from the sorted candidates of the period.

use std::collections::VecDeque;
use std::iter::Peekable;
use std::sync::Arc;
use std::vec;

use jiff::civil::{Date, DateTime, Time, Weekday};
use jiff::{SignedDuration, Span};

use crate::object::CalendarObject;
use crate::value::{DateTimeValue, Frequency, RecurrenceRule, ValueError, WeekDay};

/// Consecutive periods without a single candidate after which a rule is
/// considered impossible, e.g. `FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30`.
const MAX_EMPTY_PERIODS: u32 = 10_000;

/// A single instance of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Start of the instance
    pub start: DateTimeValue,
    /// End of the instance
    pub end: DateTimeValue,
    /// Identifier of the instance within the recurrence set, `None` for
    /// non-recurring events
    pub recurrence_id: Option<DateTimeValue>,
    /// Whether the instance comes from an overriding component
    pub overridden: bool,
}

/// Errors raised while preparing an expansion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecurrenceError {
    /// A date, rule or duration value could not be interpreted
    #[error(transparent)]
    InvalidValue(#[from] ValueError),

    /// A recurring component without `DTSTART`
    #[error("recurring component '{uid}' has no DTSTART")]
    MissingStart {
        /// UID of the component
        uid: String,
    },
}

impl CalendarObject {
    /// Expands the object into the occurrences starting within
    /// `[window_start, window_end)`, in ascending order of start.
    ///
    /// The returned iterator is lazy, finite and can be cloned or restarted.
    ///
    /// # Errors
    ///
    /// Returns a [`RecurrenceError`] if the recurrence data is malformed.
    pub fn expand_occurrences(
        &self,
        window_start: DateTime,
        window_end: DateTime,
    ) -> Result<Occurrences, RecurrenceError> {
        let plan = Plan::new(self, window_start, window_end)?;
        Ok(Occurrences::new(Arc::new(plan)))
    }
}

/// Immutable inputs of an expansion.
#[derive(Debug)]
struct Plan {
    /// Master `DTSTART`; `None` when there is no master instance
    template: Option<DateTimeValue>,
    expander: Option<Arc<Expander>>,
    length: SignedDuration,
    recurring: bool,
    rdates: Vec<DateTimeValue>,
    exdates: Vec<DateTimeValue>,
    /// Recurrence ids of every override, cancelled or not
    overridden: Vec<DateTimeValue>,
    /// Non-cancelled overrides within the window, sorted by start
    overrides: Vec<Occurrence>,
    window_start: DateTime,
    window_end: DateTime,
}

impl Plan {
    fn new(
        object: &CalendarObject,
        window_start: DateTime,
        window_end: DateTime,
    ) -> Result<Self, RecurrenceError> {
        let mut plan = Self {
            template: None,
            expander: None,
            length: SignedDuration::ZERO,
            recurring: false,
            rdates: Vec::new(),
            exdates: Vec::new(),
            overridden: Vec::new(),
            overrides: Vec::new(),
            window_start,
            window_end,
        };

        if let Some(master) = object.master() {
            let rule = master.rrule()?;
            match master.start()? {
                Some(start) => {
                    plan.length = master.length()?;
                    plan.rdates = master.rdates()?;
                    plan.rdates.sort_by_key(DateTimeValue::wall_clock);
                    plan.exdates = master.exdates()?;
                    plan.recurring = rule.is_some() || !plan.rdates.is_empty();
                    plan.expander = rule.map(|r| Arc::new(Expander::new(r, start.wall_clock())));
                    plan.template = Some(start);
                }
                None if rule.is_some() => {
                    return Err(RecurrenceError::MissingStart {
                        uid: master.uid().unwrap_or_default().to_string(),
                    });
                }
                None => {}
            }
        }

        for event in object.overrides() {
            let Some(rid) = event.recurrence_id()? else {
                continue;
            };
            if !event.is_cancelled() {
                let start = event.start()?.unwrap_or_else(|| rid.clone());
                let wall = start.wall_clock();
                if window_start <= wall && wall < window_end {
                    let end = start
                        .checked_add(event.length()?)
                        .unwrap_or_else(|_| start.clone());
                    plan.overrides.push(Occurrence {
                        start,
                        end,
                        recurrence_id: Some(rid.clone()),
                        overridden: true,
                    });
                }
            }
            plan.overridden.push(rid);
        }
        plan.overrides.sort_by_key(|o| o.start.wall_clock());

        Ok(plan)
    }

    fn is_suppressed(&self, instance: &DateTimeValue) -> bool {
        self.exdates
            .iter()
            .chain(&self.overridden)
            .any(|x| x.same_instance(instance))
    }
}

/// Lazy iterator over the occurrences of a calendar object.
///
/// Cloning yields an independent iterator at the same position;
/// [`Occurrences::restart`] rewinds to the first occurrence.
#[derive(Debug, Clone)]
pub struct Occurrences {
    plan: Arc<Plan>,
    rule: Option<Peekable<RuleInstances>>,
    rdates: Peekable<vec::IntoIter<DateTimeValue>>,
    overrides: Peekable<vec::IntoIter<Occurrence>>,
    pending: Option<Occurrence>,
    base_done: bool,
}

impl Occurrences {
    fn new(plan: Arc<Plan>) -> Self {
        let rule = plan.template.as_ref().map(|start| {
            RuleInstances::new(
                plan.expander.clone(),
                start.wall_clock(),
                plan.window_start,
                plan.window_end,
            )
            .peekable()
        });
        Self {
            rule,
            rdates: plan.rdates.clone().into_iter().peekable(),
            overrides: plan.overrides.clone().into_iter().peekable(),
            pending: None,
            base_done: false,
            plan,
        }
    }

    /// Rewinds to the first occurrence.
    pub fn restart(&mut self) {
        *self = Self::new(Arc::clone(&self.plan));
    }

    /// Next instance of the rule or `RDATE` set, in ascending order.
    fn next_base_start(&mut self) -> Option<DateTimeValue> {
        let template = self.plan.template.as_ref()?;
        let rule_next = self.rule.as_mut().and_then(|r| r.peek().copied());
        let rdate_next = self.rdates.peek().map(DateTimeValue::wall_clock);
        match (rule_next, rdate_next) {
            (None, None) => None,
            (None, Some(_)) => self.rdates.next(),
            (Some(r), rdate) => {
                if let Some(d) = rdate {
                    if d < r {
                        return self.rdates.next();
                    }
                    if d == r {
                        self.rdates.next();
                    }
                }
                if let Some(rule) = self.rule.as_mut() {
                    rule.next();
                }
                Some(template.with_wall_clock(r))
            }
        }
    }

    fn next_base_occurrence(&mut self) -> Option<Occurrence> {
        if self.base_done {
            return None;
        }
        loop {
            let Some(start) = self.next_base_start() else {
                self.base_done = true;
                return None;
            };
            let wall = start.wall_clock();
            if wall >= self.plan.window_end {
                self.base_done = true;
                return None;
            }
            if wall < self.plan.window_start || self.plan.is_suppressed(&start) {
                continue;
            }
            let end = start
                .checked_add(self.plan.length)
                .unwrap_or_else(|_| start.clone());
            let recurrence_id = self.plan.recurring.then(|| start.clone());
            return Some(Occurrence {
                start,
                end,
                recurrence_id,
                overridden: false,
            });
        }
    }
}

impl Iterator for Occurrences {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.pending.is_none() {
            self.pending = self.next_base_occurrence();
        }
        let take_override = match (&self.pending, self.overrides.peek()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(base), Some(over)) => over.start.wall_clock() < base.start.wall_clock(),
        };
        if take_override {
            self.overrides.next()
        } else {
            self.pending.take()
        }
    }
}

/// Wall-clock instances of `DTSTART` followed by the rule, stopping at the
/// horizon, at `COUNT` or at `UNTIL`.
///
/// Without `COUNT` no instance before `floor` matters, so expansion starts at
/// the period just before it.
#[derive(Debug, Clone)]
struct RuleInstances {
    expander: Option<Arc<Expander>>,
    dtstart: DateTime,
    horizon: DateTime,
    period: i64,
    buffer: VecDeque<DateTime>,
    emitted: u32,
    empty_periods: u32,
    started: bool,
    done: bool,
}

impl RuleInstances {
    fn new(
        expander: Option<Arc<Expander>>,
        dtstart: DateTime,
        floor: DateTime,
        horizon: DateTime,
    ) -> Self {
        let period = match expander.as_deref() {
            Some(expander) if expander.rule.count.is_none() => expander.period_index_before(floor),
            _ => 0,
        };
        Self {
            expander,
            dtstart,
            horizon,
            period,
            buffer: VecDeque::new(),
            emitted: 0,
            empty_periods: 0,
            started: false,
            done: false,
        }
    }
}

impl Iterator for RuleInstances {
    type Item = DateTime;

    fn next(&mut self) -> Option<DateTime> {
        if self.done {
            return None;
        }
        // DTSTART is always the first instance and counts towards COUNT.
        if !self.started {
            self.started = true;
            self.emitted = 1;
            if self.expander.is_none() {
                self.done = true;
            }
            return Some(self.dtstart);
        }
        let Some(expander) = self.expander.as_deref() else {
            self.done = true;
            return None;
        };

        loop {
            if expander.rule.count.is_some_and(|count| self.emitted >= count) {
                self.done = true;
                return None;
            }
            if let Some(candidate) = self.buffer.pop_front() {
                if candidate <= self.dtstart {
                    continue;
                }
                if !expander.until_allows(candidate) {
                    self.done = true;
                    return None;
                }
                self.emitted += 1;
                return Some(candidate);
            }

            let Some(start) = expander.period_start(self.period) else {
                self.done = true;
                return None;
            };
            if start >= self.horizon || !expander.until_allows(start) {
                self.done = true;
                return None;
            }
            self.period += 1;

            let candidates = expander.candidates(start);
            if candidates.is_empty() {
                self.empty_periods += 1;
                if self.empty_periods > MAX_EMPTY_PERIODS {
                    self.done = true;
                    return None;
                }
            } else {
                self.empty_periods = 0;
                self.buffer.extend(candidates);
            }
        }
    }
}

/// A rule with its defaults filled in from `DTSTART`.
#[derive(Debug)]
struct Expander {
    rule: RecurrenceRule,
    dtstart: DateTime,
    wkst: Weekday,
}

impl Expander {
    fn new(mut rule: RecurrenceRule, dtstart: DateTime) -> Self {
        let date = dtstart.date();
        let month = u8::try_from(date.month()).unwrap_or(1);
        let weekday = WeekDay::from(date.weekday());
        let day = crate::value::WeekDayNum {
            day: weekday,
            occurrence: None,
        };
        rule.interval = rule.interval.max(1);

        match rule.freq {
            Frequency::Yearly => {
                let no_day_parts = rule.by_year_day.is_empty()
                    && rule.by_month_day.is_empty()
                    && rule.by_day.is_empty();
                if no_day_parts && rule.by_week_no.is_empty() {
                    if rule.by_month.is_empty() {
                        rule.by_month.push(month);
                    }
                    rule.by_month_day.push(date.day());
                } else if no_day_parts {
                    rule.by_day.push(day);
                }
            }
            Frequency::Monthly => {
                if rule.by_month_day.is_empty() && rule.by_day.is_empty() && rule.by_year_day.is_empty()
                {
                    rule.by_month_day.push(date.day());
                }
            }
            Frequency::Weekly => {
                if rule.by_day.is_empty() {
                    rule.by_day.push(day);
                }
            }
            _ => {}
        }

        let to_u8 = |v: i8| u8::try_from(v).unwrap_or(0);
        if rule.freq > Frequency::Hourly && rule.by_hour.is_empty() {
            rule.by_hour.push(to_u8(dtstart.hour()));
        }
        if rule.freq > Frequency::Minutely && rule.by_minute.is_empty() {
            rule.by_minute.push(to_u8(dtstart.minute()));
        }
        if rule.freq > Frequency::Secondly && rule.by_second.is_empty() {
            rule.by_second.push(to_u8(dtstart.second()));
        }

        let wkst = rule.wkst.into();
        Self {
            rule,
            dtstart,
            wkst,
        }
    }

    fn until_allows(&self, instance: DateTime) -> bool {
        match &self.rule.until {
            None => true,
            Some(DateTimeValue::Date(until)) => instance.date() <= *until,
            Some(until) => instance <= until.wall_clock(),
        }
    }

    /// Start of the `index`-th period after the one containing `DTSTART`.
    fn period_start(&self, index: i64) -> Option<DateTime> {
        let step = index.checked_mul(i64::from(self.rule.interval))?;
        let date = self.dtstart.date();
        let midnight = |date: Date| DateTime::from_parts(date, Time::midnight());
        match self.rule.freq {
            Frequency::Yearly => {
                let year = i16::try_from(i64::from(date.year()).checked_add(step)?).ok()?;
                Date::new(year, 1, 1).ok().map(midnight)
            }
            Frequency::Monthly => {
                let months = (i64::from(date.year()) * 12 + i64::from(date.month()) - 1)
                    .checked_add(step)?;
                let year = i16::try_from(months.div_euclid(12)).ok()?;
                let month = i8::try_from(months.rem_euclid(12) + 1).ok()?;
                Date::new(year, month, 1).ok().map(midnight)
            }
            Frequency::Weekly => {
                let start = week_start(date, self.wkst)?;
                add_days(start, step.checked_mul(7)?).map(midnight)
            }
            Frequency::Daily => add_days(date, step).map(midnight),
            Frequency::Hourly => {
                let base = date.at(self.dtstart.hour(), 0, 0, 0);
                let span = Span::new().try_hours(step).ok()?;
                base.checked_add(span).ok()
            }
            Frequency::Minutely => {
                let base = date.at(self.dtstart.hour(), self.dtstart.minute(), 0, 0);
                let span = Span::new().try_minutes(step).ok()?;
                base.checked_add(span).ok()
            }
            Frequency::Secondly => {
                let base = date.at(
                    self.dtstart.hour(),
                    self.dtstart.minute(),
                    self.dtstart.second(),
                    0,
                );
                let span = Span::new().try_seconds(step).ok()?;
                base.checked_add(span).ok()
            }
        }
    }

    /// Index of a period starting no later than the one containing `instant`.
    fn period_index_before(&self, instant: DateTime) -> i64 {
        let Some(first) = self.period_start(0) else {
            return 0;
        };
        if instant <= first {
            return 0;
        }
        let secs = instant.duration_since(first).as_secs();
        let months = |dt: DateTime| i64::from(dt.year()) * 12 + i64::from(dt.month());
        let units = match self.rule.freq {
            Frequency::Yearly => i64::from(instant.year()) - i64::from(first.year()),
            Frequency::Monthly => months(instant) - months(first),
            Frequency::Weekly => secs / (7 * 86_400),
            Frequency::Daily => secs / 86_400,
            Frequency::Hourly => secs / 3_600,
            Frequency::Minutely => secs / 60,
            Frequency::Secondly => secs,
        };
        (units / i64::from(self.rule.interval) - 1).max(0)
    }

    /// Sorted instances of the period starting at `start`, `BYSETPOS` applied.
    fn candidates(&self, start: DateTime) -> Vec<DateTime> {
        let date = start.date();
        let days: Vec<Date> = match self.rule.freq {
            Frequency::Yearly => (1..=12)
                .flat_map(|month| days_of_month(date.year(), month))
                .collect(),
            Frequency::Monthly => days_of_month(date.year(), date.month()),
            Frequency::Weekly => (0..7).filter_map(|i| add_days(date, i)).collect(),
            _ => vec![date],
        };
        let times = self.times(start);

        let mut out: Vec<DateTime> = days
            .into_iter()
            .filter(|day| self.day_matches(*day))
            .flat_map(|day| times.iter().map(move |time| DateTime::from_parts(day, *time)))
            .collect();
        out.sort_unstable();
        out.dedup();

        if self.rule.by_set_pos.is_empty() {
            return out;
        }
        let len = i64::try_from(out.len()).unwrap_or(i64::MAX);
        let mut picked: Vec<DateTime> = self
            .rule
            .by_set_pos
            .iter()
            .filter_map(|&pos| {
                let pos = i64::from(pos);
                let index = if pos > 0 { pos - 1 } else { len + pos };
                usize::try_from(index).ok().and_then(|i| out.get(i).copied())
            })
            .collect();
        picked.sort_unstable();
        picked.dedup();
        picked
    }

    /// Times of day for the period. Units finer than `FREQ` are expanded from
    /// the rule, the others are fixed by the period and only filtered.
    fn times(&self, start: DateTime) -> Vec<Time> {
        let rule = &self.rule;
        let unit = |expand: bool, list: &[u8], fixed: i8| -> Vec<i8> {
            if expand {
                list.iter().filter_map(|v| i8::try_from(*v).ok()).collect()
            } else if list.is_empty() || list.iter().any(|v| i8::try_from(*v) == Ok(fixed)) {
                vec![fixed]
            } else {
                Vec::new()
            }
        };
        let hours = unit(rule.freq > Frequency::Hourly, rule.by_hour.as_slice(), start.hour());
        let minutes = unit(rule.freq > Frequency::Minutely, rule.by_minute.as_slice(), start.minute());
        let seconds = unit(rule.freq > Frequency::Secondly, rule.by_second.as_slice(), start.second());

        let mut times = Vec::new();
        for &h in &hours {
            for &m in &minutes {
                for &s in &seconds {
                    // Leap seconds collapse onto :59.
                    if let Ok(time) = Time::new(h, m, s.min(59), 0) {
                        times.push(time);
                    }
                }
            }
        }
        times
    }

    fn day_matches(&self, day: Date) -> bool {
        let rule = &self.rule;
        if !rule.by_month.is_empty()
            && !rule
                .by_month
                .iter()
                .any(|m| i8::try_from(*m) == Ok(day.month()))
        {
            return false;
        }
        if !rule.by_week_no.is_empty() {
            let Some((week, weeks)) = week_number(day, self.wkst) else {
                return false;
            };
            let matches = rule.by_week_no.iter().any(|&n| {
                let n = i16::from(n);
                if n > 0 { week == n } else { week == weeks + 1 + n }
            });
            if !matches {
                return false;
            }
        }
        if !rule.by_year_day.is_empty() {
            let doy = day.day_of_year();
            let total = day.days_in_year();
            if !rule
                .by_year_day
                .iter()
                .any(|&n| if n > 0 { doy == n } else { doy == total + 1 + n })
            {
                return false;
            }
        }
        if !rule.by_month_day.is_empty() {
            let total = day.days_in_month();
            if !rule
                .by_month_day
                .iter()
                .any(|&n| if n > 0 { day.day() == n } else { day.day() == total + 1 + n })
            {
                return false;
            }
        }
        if !rule.by_day.is_empty() {
            let in_month =
                rule.freq == Frequency::Monthly || (rule.freq == Frequency::Yearly && !rule.by_month.is_empty());
            let in_year = rule.freq == Frequency::Yearly && !in_month;
            let weekday = WeekDay::from(day.weekday());
            let matches = rule.by_day.iter().any(|wd| {
                if wd.day != weekday {
                    return false;
                }
                match wd.occurrence {
                    Some(n) if in_month => {
                        nth_matches(n, day.day().into(), day.days_in_month().into())
                    }
                    Some(n) if in_year => nth_matches(n, day.day_of_year(), day.days_in_year()),
                    _ => true,
                }
            });
            if !matches {
                return false;
            }
        }
        true
    }
}

/// Whether the day at `position` (1-based) of a `total`-day span is the
/// `n`-th (negative: from the end) occurrence of its weekday.
fn nth_matches(n: i8, position: i16, total: i16) -> bool {
    let n = i16::from(n);
    if n > 0 {
        (position - 1) / 7 + 1 == n
    } else {
        (total - position) / 7 + 1 == -n
    }
}

fn days_of_month(year: i16, month: i8) -> Vec<Date> {
    (1..=31)
        .map_while(|day| Date::new(year, month, day).ok())
        .collect()
}

fn add_days(date: Date, days: i64) -> Option<Date> {
    let span = Span::new().try_days(days).ok()?;
    date.checked_add(span).ok()
}

fn week_start(date: Date, wkst: Weekday) -> Option<Date> {
    let offset = (date.weekday().to_sunday_zero_offset() - wkst.to_sunday_zero_offset())
        .rem_euclid(7);
    add_days(date, -i64::from(offset))
}

/// Start of week 1 of `year`: the week holding January 4th, so that it has
/// at least four days in the year.
fn first_week_start(year: i16, wkst: Weekday) -> Option<Date> {
    week_start(Date::new(year, 1, 4).ok()?, wkst)
}

/// Week number of `date` and the number of weeks in its week-numbering year.
fn week_number(date: Date, wkst: Weekday) -> Option<(i16, i16)> {
    let year = date.year();
    let mut start = first_week_start(year, wkst)?;
    let mut next = first_week_start(year.checked_add(1)?, wkst)?;
    if date >= next {
        start = next;
        next = first_week_start(year.checked_add(2)?, wkst)?;
    } else if date < start {
        next = start;
        start = first_week_start(year.checked_sub(1)?, wkst)?;
    }
    let days = |from: Date, to: Date| to.duration_since(from).as_hours() / 24;
    let week = i16::try_from(days(start, date) / 7 + 1).ok()?;
    let weeks = i16::try_from(days(start, next) / 7).ok()?;
    Some((week, weeks))
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;
    use crate::parse;

    fn calendar(body: &str) -> CalendarObject {
        let src = format!(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:r\r\n{body}END:VEVENT\r\nEND:VCALENDAR\r\n"
        );
        parse(&src).unwrap()
    }

    fn starts(object: &CalendarObject, from: DateTime, to: DateTime) -> Vec<String> {
        object
            .expand_occurrences(from, to)
            .unwrap()
            .map(|o| o.start.to_string())
            .collect()
    }

    fn year(y: i16) -> (DateTime, DateTime) {
        (date(y, 1, 1).at(0, 0, 0, 0), date(y + 1, 1, 1).at(0, 0, 0, 0))
    }

    #[test]
    fn non_recurring_event_has_one_occurrence() {
        let object = calendar("DTSTART:20250310T090000Z\r\nDTEND:20250310T100000Z\r\n");
        let (from, to) = year(2025);
        let occurrences: Vec<_> = object.expand_occurrences(from, to).unwrap().collect();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].end.to_string(), "20250310T100000Z");
        assert_eq!(occurrences[0].recurrence_id, None);
        assert!(starts(&object, date(2026, 1, 1).at(0, 0, 0, 0), date(2027, 1, 1).at(0, 0, 0, 0)).is_empty());
    }

    #[test]
    fn daily_count_includes_dtstart() {
        let object = calendar("DTSTART:20250101T090000\r\nRRULE:FREQ=DAILY;COUNT=3\r\n");
        let (from, to) = year(2025);
        assert_eq!(
            starts(&object, from, to),
            ["20250101T090000", "20250102T090000", "20250103T090000"]
        );
    }

    #[test]
    fn weekly_byday_with_until() {
        let object = calendar(
            "DTSTART;TZID=America/New_York:20250106T100000\r\nRRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR;UNTIL=20250115T100000\r\n",
        );
        let (from, to) = year(2025);
        let occurrences: Vec<_> = object.expand_occurrences(from, to).unwrap().collect();
        let got: Vec<_> = occurrences.iter().map(|o| o.start.to_string()).collect();
        assert_eq!(
            got,
            [
                "20250106T100000",
                "20250108T100000",
                "20250110T100000",
                "20250113T100000",
                "20250115T100000"
            ]
        );
        assert!(occurrences.iter().all(|o| o.start.tzid() == Some("America/New_York")));
    }

    #[test]
    fn monthly_last_friday_and_negative_monthday() {
        let object = calendar("DTSTART:20250131T120000\r\nRRULE:FREQ=MONTHLY;BYDAY=-1FR;COUNT=4\r\n");
        let (from, to) = year(2025);
        assert_eq!(
            starts(&object, from, to),
            ["20250131T120000", "20250228T120000", "20250328T120000", "20250425T120000"]
        );

        let object = calendar("DTSTART:20250131T120000\r\nRRULE:FREQ=MONTHLY;BYMONTHDAY=-1;COUNT=3\r\n");
        assert_eq!(
            starts(&object, from, to),
            ["20250131T120000", "20250228T120000", "20250331T120000"]
        );
    }

    #[test]
    fn monthly_on_31st_skips_short_months() {
        let object = calendar("DTSTART:20250131T080000\r\nRRULE:FREQ=MONTHLY;COUNT=4\r\n");
        let (from, to) = year(2025);
        assert_eq!(
            starts(&object, from, to),
            ["20250131T080000", "20250331T080000", "20250531T080000", "20250731T080000"]
        );
    }

    #[test]
    fn bysetpos_picks_last_workday() {
        let object = calendar(
            "DTSTART:20250131T170000\r\nRRULE:FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1;COUNT=3\r\n",
        );
        let (from, to) = year(2025);
        assert_eq!(
            starts(&object, from, to),
            ["20250131T170000", "20250228T170000", "20250331T170000"]
        );
    }

    #[test]
    fn yearly_defaults_and_byweekno() {
        let object = calendar("DTSTART;VALUE=DATE:20240229\r\nRRULE:FREQ=YEARLY\r\n");
        let from = date(2024, 1, 1).at(0, 0, 0, 0);
        let to = date(2033, 1, 1).at(0, 0, 0, 0);
        assert_eq!(starts(&object, from, to), ["20240229", "20280229", "20320229"]);

        // Monday of ISO week 20
        let object = calendar("DTSTART:20250512T090000\r\nRRULE:FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO;COUNT=3\r\n");
        let to = date(2030, 1, 1).at(0, 0, 0, 0);
        assert_eq!(
            starts(&object, from, to),
            ["20250512T090000", "20260511T090000", "20270517T090000"]
        );
    }

    #[test]
    fn yearly_byyearday_and_bymonth() {
        let object = calendar("DTSTART:20250101T000000\r\nRRULE:FREQ=YEARLY;BYYEARDAY=1,-1;COUNT=4\r\n");
        let from = date(2025, 1, 1).at(0, 0, 0, 0);
        let to = date(2030, 1, 1).at(0, 0, 0, 0);
        assert_eq!(
            starts(&object, from, to),
            ["20250101T000000", "20251231T000000", "20260101T000000", "20261231T000000"]
        );

        let object = calendar("DTSTART:20250110T080000\r\nRRULE:FREQ=YEARLY;BYMONTH=1,7;COUNT=3\r\n");
        assert_eq!(
            starts(&object, from, to),
            ["20250110T080000", "20250710T080000", "20260110T080000"]
        );
    }

    #[test]
    fn hourly_with_byhour_filter() {
        let object = calendar("DTSTART:20250101T080000\r\nRRULE:FREQ=HOURLY;INTERVAL=4;BYHOUR=8,16\r\n");
        let from = date(2025, 1, 1).at(0, 0, 0, 0);
        let to = date(2025, 1, 2).at(12, 0, 0, 0);
        assert_eq!(
            starts(&object, from, to),
            ["20250101T080000", "20250101T160000", "20250102T080000"]
        );
    }

    #[test]
    fn daily_byhour_byminute_expand() {
        let object = calendar("DTSTART:20250101T090000\r\nRRULE:FREQ=DAILY;BYHOUR=9,17;BYMINUTE=0,30;COUNT=5\r\n");
        let (from, to) = year(2025);
        assert_eq!(
            starts(&object, from, to),
            [
                "20250101T090000",
                "20250101T093000",
                "20250101T170000",
                "20250101T173000",
                "20250102T090000"
            ]
        );
    }

    #[test]
    fn exdate_rdate_and_overrides() {
        let src = "\
BEGIN:VCALENDAR\r
BEGIN:VEVENT\r
UID:s\r
DTSTART:20250106T090000Z\r
DURATION:PT1H\r
RRULE:FREQ=DAILY;COUNT=5\r
EXDATE:20250107T090000Z\r
RDATE:20250104T090000Z,20250106T090000Z\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:s\r
RECURRENCE-ID:20250108T090000Z\r
DTSTART:20250108T140000Z\r
DTEND:20250108T150000Z\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:s\r
RECURRENCE-ID:20250109T090000Z\r
STATUS:CANCELLED\r
END:VEVENT\r
END:VCALENDAR\r
";
        let object = parse(src).unwrap();
        let (from, to) = year(2025);
        let occurrences: Vec<_> = object.expand_occurrences(from, to).unwrap().collect();
        let got: Vec<_> = occurrences
            .iter()
            .map(|o| (o.start.to_string(), o.overridden))
            .collect();
        assert_eq!(
            got,
            [
                ("20250104T090000Z".to_string(), false),
                ("20250106T090000Z".to_string(), false),
                ("20250108T140000Z".to_string(), true),
                ("20250110T090000Z".to_string(), false),
            ]
        );
        assert_eq!(occurrences[0].end.to_string(), "20250104T100000Z");
        assert_eq!(
            occurrences[2].recurrence_id.as_ref().map(ToString::to_string).as_deref(),
            Some("20250108T090000Z")
        );
    }

    #[test]
    fn all_day_exdate_matches_by_date() {
        let object = calendar(
            "DTSTART;VALUE=DATE:20250101\r\nRRULE:FREQ=DAILY;COUNT=3\r\nEXDATE;VALUE=DATE:20250102\r\n",
        );
        let (from, to) = year(2025);
        assert_eq!(starts(&object, from, to), ["20250101", "20250103"]);
    }

    #[test]
    fn unbounded_rule_is_limited_by_window() {
        let object = calendar("DTSTART:20200101T090000\r\nRRULE:FREQ=WEEKLY\r\n");
        let from = date(2025, 3, 1).at(0, 0, 0, 0);
        let to = date(2025, 4, 1).at(0, 0, 0, 0);
        // Wednesdays of March 2025
        assert_eq!(starts(&object, from, to).len(), 4);
    }

    #[test]
    fn open_ended_fine_rule_starts_near_the_window() {
        let object = calendar("DTSTART:20000101T000000Z\r\nRRULE:FREQ=SECONDLY;INTERVAL=7\r\n");
        let from = date(2025, 6, 1).at(12, 0, 0, 0);
        let to = date(2025, 6, 1).at(12, 1, 0, 0);
        let found = starts(&object, from, to);
        // 2025-06-01T12:00:00 is 802_094_400 s after DTSTART, 2 s past a multiple of 7
        assert_eq!(found.first().map(String::as_str), Some("20250601T120005Z"));
        assert_eq!(found.len(), 8);

        let minutely = calendar("DTSTART:19700101T000000\r\nRRULE:FREQ=MINUTELY;UNTIL=20990101T000000\r\n");
        let found = starts(&minutely, from, date(2025, 6, 1).at(12, 3, 0, 0));
        assert_eq!(found, ["20250601T120000", "20250601T120100", "20250601T120200"]);
    }

    #[test]
    fn impossible_rule_terminates() {
        let object = calendar("DTSTART:20250101T090000\r\nRRULE:FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30\r\n");
        let from = date(2025, 1, 1).at(0, 0, 0, 0);
        let to = date(9999, 1, 1).at(0, 0, 0, 0);
        assert_eq!(starts(&object, from, to), ["20250101T090000"]);
    }

    #[test]
    fn iterator_is_restartable() {
        let object = calendar("DTSTART:20250101T090000\r\nRRULE:FREQ=DAILY;COUNT=4\r\n");
        let (from, to) = year(2025);
        let mut occurrences = object.expand_occurrences(from, to).unwrap();
        occurrences.next();
        let snapshot = occurrences.clone();
        assert_eq!(occurrences.by_ref().count(), 3);
        assert_eq!(snapshot.count(), 3);
        occurrences.restart();
        assert_eq!(occurrences.count(), 4);
    }

    #[test]
    fn malformed_rule_is_an_error() {
        let object = calendar("DTSTART:20250101T090000\r\nRRULE:FREQ=SOMETIMES\r\n");
        let (from, to) = year(2025);
        assert!(matches!(
            object.expand_occurrences(from, to),
            Err(RecurrenceError::InvalidValue(_))
        ));

        let object = calendar("RRULE:FREQ=DAILY\r\n");
        assert!(matches!(
            object.expand_occurrences(from, to),
            Err(RecurrenceError::MissingStart { .. })
        ));
    }
}

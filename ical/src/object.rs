// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar object model: the `VCALENDAR` document, typed event views and
//! the builders used to create and modify events.

use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Span, Timestamp};

use crate::component::Component;
use crate::keyword::{
    KW_CREATED, KW_DESCRIPTION, KW_DTEND, KW_DTSTAMP, KW_DTSTART, KW_DUE, KW_DURATION, KW_EXDATE,
    KW_LAST_MODIFIED, KW_LOCATION, KW_PRODID, KW_RDATE, KW_RECURRENCE_ID, KW_RRULE, KW_SEQUENCE,
    KW_STATUS, KW_SUMMARY, KW_UID, KW_VCALENDAR, KW_VERSION, KW_VEVENT, KW_VTODO,
};
use crate::parser::ParseError;
use crate::property::Property;
use crate::value::{DateTimeValue, RecurrenceRule, ValueError};

/// Product identifier written into generated calendars.
pub const PRODUCT_ID: &str = "-//calbridge//calbridge-ical//EN";

/// A parsed `VCALENDAR` document.
///
/// The document is kept as a generic component tree; the typed accessors are
/// views over it, so unknown properties and components survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarObject {
    root: Component,
}

impl CalendarObject {
    /// Creates an empty calendar with `VERSION` and `PRODID`.
    #[must_use]
    pub fn new() -> Self {
        let mut root = Component::new(KW_VCALENDAR);
        root.push_property(Property::raw(KW_VERSION, "2.0"));
        root.push_property(Property::raw(KW_PRODID, PRODUCT_ID));
        Self { root }
    }

    /// The `VCALENDAR` component.
    #[must_use]
    pub const fn root(&self) -> &Component {
        &self.root
    }

    /// Mutable access to the `VCALENDAR` component.
    pub const fn root_mut(&mut self) -> &mut Component {
        &mut self.root
    }

    /// Consumes the object, returning the `VCALENDAR` component.
    #[must_use]
    pub fn into_root(self) -> Component {
        self.root
    }

    /// Every `VEVENT` and `VTODO` in the calendar.
    pub fn events(&self) -> impl Iterator<Item = Event<'_>> {
        self.root
            .children
            .iter()
            .filter(|c| is_schedulable(c))
            .map(Event::new)
    }

    /// The master component: the first event without `RECURRENCE-ID`.
    #[must_use]
    pub fn master(&self) -> Option<Event<'_>> {
        self.events().find(|e| !e.is_override())
    }

    /// Mutable access to the master component.
    pub fn master_mut(&mut self) -> Option<&mut Component> {
        self.root
            .children
            .iter_mut()
            .find(|c| is_schedulable(c) && c.property(KW_RECURRENCE_ID).is_none())
    }

    /// Components overriding single instances of the master.
    pub fn overrides(&self) -> impl Iterator<Item = Event<'_>> {
        self.events().filter(Event::is_override)
    }

    /// The override for the instance identified by `recurrence_id`, if any.
    #[must_use]
    pub fn override_for(&self, recurrence_id: &DateTimeValue) -> Option<Event<'_>> {
        self.overrides().find(|e| {
            e.recurrence_id()
                .ok()
                .flatten()
                .is_some_and(|rid| rid.same_instance(recurrence_id))
        })
    }

    /// UID of the object, taken from the first event.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.events().find_map(|e| e.uid())
    }
}

impl Default for CalendarObject {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Component> for CalendarObject {
    type Error = ParseError;

    /// Wraps a component tree, checking that it is a `VCALENDAR` whose events
    /// and tasks all carry a `UID`.
    fn try_from(root: Component) -> Result<Self, Self::Error> {
        if !root.is(KW_VCALENDAR) {
            return Err(ParseError::NotACalendar { name: root.name });
        }
        if let Some(component) = root
            .children
            .iter()
            .filter(|c| is_schedulable(c))
            .find(|c| c.property(KW_UID).is_none_or(|p| p.value.trim().is_empty()))
        {
            return Err(ParseError::MissingUid {
                component: component.name.clone(),
            });
        }
        Ok(Self { root })
    }
}

fn is_schedulable(component: &Component) -> bool {
    component.is(KW_VEVENT) || component.is(KW_VTODO)
}

/// Event or task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE", ascii_case_insensitive)]
#[expect(missing_docs)]
pub enum Status {
    Tentative,
    Confirmed,
    Cancelled,
    NeedsAction,
    Completed,
    InProcess,
}

/// Read-only typed view over a `VEVENT` or `VTODO`.
///
/// Tasks use `DUE` where events use `DTEND`; the view treats both as the end.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    component: &'a Component,
}

impl<'a> Event<'a> {
    /// Wraps a component.
    #[must_use]
    pub const fn new(component: &'a Component) -> Self {
        Self { component }
    }

    /// The underlying component.
    #[must_use]
    pub const fn component(&self) -> &'a Component {
        self.component
    }

    /// Whether this is a `VTODO`.
    #[must_use]
    pub fn is_task(&self) -> bool {
        self.component.is(KW_VTODO)
    }

    /// Whether this component overrides a recurrence instance.
    #[must_use]
    pub fn is_override(&self) -> bool {
        self.component.property(KW_RECURRENCE_ID).is_some()
    }

    /// `UID`
    #[must_use]
    pub fn uid(&self) -> Option<&'a str> {
        self.component.property(KW_UID).map(|p| p.value.trim())
    }

    /// `SUMMARY`, unescaped
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        self.text(KW_SUMMARY)
    }

    /// `DESCRIPTION`, unescaped
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.text(KW_DESCRIPTION)
    }

    /// `LOCATION`, unescaped
    #[must_use]
    pub fn location(&self) -> Option<String> {
        self.text(KW_LOCATION)
    }

    /// Parsed `STATUS`; unknown values read as `None`.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        self.component
            .property(KW_STATUS)
            .and_then(|p| p.value.trim().parse().ok())
    }

    /// Whether the component is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status() == Some(Status::Cancelled)
    }

    /// `SEQUENCE`, when present and numeric.
    #[must_use]
    pub fn sequence(&self) -> Option<u32> {
        self.component
            .property(KW_SEQUENCE)
            .and_then(|p| p.value.trim().parse().ok())
    }

    /// `DTSTART`
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed.
    pub fn start(&self) -> Result<Option<DateTimeValue>, ValueError> {
        self.datetime(KW_DTSTART)
    }

    /// `DTEND`, or `DUE` for tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed.
    pub fn end(&self) -> Result<Option<DateTimeValue>, ValueError> {
        match self.datetime(KW_DTEND)? {
            Some(end) => Ok(Some(end)),
            None => self.datetime(KW_DUE),
        }
    }

    /// Length of each instance.
    ///
    /// Taken from `DURATION`, else from the end minus the start. Without
    /// either, all-day components last one day and timed ones are instants.
    ///
    /// # Errors
    ///
    /// Returns an error if a date or duration value is malformed.
    pub fn length(&self) -> Result<SignedDuration, ValueError> {
        let Some(start) = self.start()? else {
            return Ok(SignedDuration::ZERO);
        };
        if let Some(prop) = self.component.property(KW_DURATION) {
            let invalid = |e: jiff::Error| ValueError::new(&prop.name, &prop.value, e.to_string());
            let span: Span = prop.value.trim().parse().map_err(invalid)?;
            let from = start.wall_clock();
            let to = from.checked_add(span).map_err(invalid)?;
            return Ok(to.duration_since(from));
        }
        if let Some(end) = self.end()? {
            return Ok(end.wall_clock().duration_since(start.wall_clock()));
        }
        Ok(if start.is_all_day() {
            SignedDuration::from_hours(24)
        } else {
            SignedDuration::ZERO
        })
    }

    /// The end of the first instance, derived via [`Event::length`] when
    /// there is no explicit end.
    ///
    /// # Errors
    ///
    /// Returns an error if a date or duration value is malformed.
    pub fn effective_end(&self) -> Result<Option<DateTimeValue>, ValueError> {
        if let Some(end) = self.end()? {
            return Ok(Some(end));
        }
        let Some(start) = self.start()? else {
            return Ok(None);
        };
        let length = self.length()?;
        start
            .checked_add(length)
            .map(Some)
            .map_err(|e| ValueError::new(KW_DURATION, &length.to_string(), e.to_string()))
    }

    /// The raw `RRULE` value.
    #[must_use]
    pub fn rrule_raw(&self) -> Option<&'a str> {
        self.component.property(KW_RRULE).map(|p| p.value.as_str())
    }

    /// The parsed `RRULE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is malformed.
    pub fn rrule(&self) -> Result<Option<RecurrenceRule>, ValueError> {
        self.component
            .property(KW_RRULE)
            .map(|p| {
                p.value
                    .parse()
                    .map_err(|reason: String| ValueError::new(&p.name, &p.value, reason))
            })
            .transpose()
    }

    /// Every `EXDATE` value, across all `EXDATE` properties.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is malformed.
    pub fn exdates(&self) -> Result<Vec<DateTimeValue>, ValueError> {
        self.datetime_list(KW_EXDATE)
    }

    /// Every `RDATE` value; periods contribute their start.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is malformed.
    pub fn rdates(&self) -> Result<Vec<DateTimeValue>, ValueError> {
        let mut out = Vec::new();
        for prop in self.component.properties_named(KW_RDATE) {
            let starts = prop
                .value
                .split(',')
                .map(|v| v.split_once('/').map_or(v, |(start, _)| start))
                .collect::<Vec<_>>()
                .join(",");
            let mut prop = prop.clone();
            prop.value = starts;
            prop.remove_parameter(crate::keyword::KW_VALUE);
            out.extend(DateTimeValue::list_from_property(&prop)?);
        }
        Ok(out)
    }

    /// `RECURRENCE-ID`
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed.
    pub fn recurrence_id(&self) -> Result<Option<DateTimeValue>, ValueError> {
        self.datetime(KW_RECURRENCE_ID)
    }

    /// `DTSTAMP`
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed.
    pub fn dtstamp(&self) -> Result<Option<DateTimeValue>, ValueError> {
        self.datetime(KW_DTSTAMP)
    }

    /// `CREATED`
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed.
    pub fn created(&self) -> Result<Option<DateTimeValue>, ValueError> {
        self.datetime(KW_CREATED)
    }

    /// `LAST-MODIFIED`
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed.
    pub fn last_modified(&self) -> Result<Option<DateTimeValue>, ValueError> {
        self.datetime(KW_LAST_MODIFIED)
    }

    fn text(&self, name: &str) -> Option<String> {
        self.component.property(name).map(Property::text_value)
    }

    fn datetime(&self, name: &str) -> Result<Option<DateTimeValue>, ValueError> {
        self.component
            .property(name)
            .map(DateTimeValue::from_property)
            .transpose()
    }

    fn datetime_list(&self, name: &str) -> Result<Vec<DateTimeValue>, ValueError> {
        let mut out = Vec::new();
        for prop in self.component.properties_named(name) {
            out.extend(DateTimeValue::list_from_property(prop)?);
        }
        Ok(out)
    }
}

/// Errors raised when modifying a calendar object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectError {
    /// The object contains no `VEVENT` or `VTODO` to modify
    #[error("calendar object contains no event or task")]
    NoComponent,
}

/// Builder for a new event or task.
///
/// The built component always carries `UID`, `DTSTAMP`, `CREATED`,
/// `LAST-MODIFIED` and `STATUS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    /// Summary line
    pub summary: String,
    /// Start of the event
    pub start: DateTimeValue,
    /// End of the event (`DUE` for tasks)
    pub end: Option<DateTimeValue>,
    /// Longer description
    pub description: Option<String>,
    /// Location
    pub location: Option<String>,
    /// Status, defaults to `CONFIRMED` for events and `NEEDS-ACTION` for tasks
    pub status: Option<Status>,
    /// Recurrence rule
    pub rrule: Option<RecurrenceRule>,
    /// Excluded instances
    pub exdates: Vec<DateTimeValue>,
    /// Explicit UID; a random one is generated when absent
    pub uid: Option<String>,
    /// Build a `VTODO` instead of a `VEVENT`
    pub task: bool,
}

impl EventDraft {
    /// Creates a draft with the required fields.
    #[must_use]
    pub const fn new(summary: String, start: DateTimeValue) -> Self {
        Self {
            summary,
            start,
            end: None,
            description: None,
            location: None,
            status: None,
            rrule: None,
            exdates: Vec::new(),
            uid: None,
            task: false,
        }
    }

    /// Set the end.
    #[must_use]
    pub fn end(mut self, end: DateTimeValue) -> Self {
        self.end = Some(end);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location.
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the recurrence rule.
    #[must_use]
    pub fn rrule(mut self, rrule: RecurrenceRule) -> Self {
        self.rrule = Some(rrule);
        self
    }

    /// Exclude an instance.
    #[must_use]
    pub fn exdate(mut self, exdate: DateTimeValue) -> Self {
        self.exdates.push(exdate);
        self
    }

    /// Use the given UID.
    #[must_use]
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Build a task instead of an event.
    #[must_use]
    pub const fn task(mut self) -> Self {
        self.task = true;
        self
    }

    /// Builds the calendar object, stamped with the current UTC time.
    #[must_use]
    pub fn build(self) -> CalendarObject {
        self.build_at(utc_now())
    }

    /// Builds the calendar object, stamped with the given UTC wall clock.
    #[must_use]
    pub fn build_at(self, now: DateTime) -> CalendarObject {
        let stamp = DateTimeValue::Utc(now);
        let (name, end_name, default_status) = if self.task {
            (KW_VTODO, KW_DUE, Status::NeedsAction)
        } else {
            (KW_VEVENT, KW_DTEND, Status::Confirmed)
        };
        let uid = self
            .uid
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut component = Component::new(name);
        component.push_property(Property::raw(KW_UID, uid));
        component.push_property(stamp.to_property(KW_DTSTAMP));
        component.push_property(stamp.to_property(KW_CREATED));
        component.push_property(stamp.to_property(KW_LAST_MODIFIED));
        component.push_property(self.start.to_property(KW_DTSTART));
        if let Some(end) = &self.end {
            component.push_property(end.to_property(end_name));
        }
        component.push_property(Property::text(KW_SUMMARY, &self.summary));
        if let Some(description) = &self.description {
            component.push_property(Property::text(KW_DESCRIPTION, description));
        }
        if let Some(location) = &self.location {
            component.push_property(Property::text(KW_LOCATION, location));
        }
        let status = self.status.unwrap_or(default_status);
        component.push_property(Property::raw(KW_STATUS, status.to_string()));
        if let Some(rrule) = &self.rrule {
            component.push_property(Property::raw(KW_RRULE, rrule.to_string()));
        }
        for exdate in &self.exdates {
            component.push_property(exdate.to_property(KW_EXDATE));
        }

        let mut object = CalendarObject::new();
        object.root_mut().children.push(component);
        object
    }
}

/// Field updates applied to the master component of an existing object.
///
/// `None` leaves a field untouched; for clearable fields `Some(None)` removes
/// the property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    /// New summary
    pub summary: Option<String>,
    /// New or cleared description
    pub description: Option<Option<String>>,
    /// New or cleared location
    pub location: Option<Option<String>>,
    /// New start
    pub start: Option<DateTimeValue>,
    /// New or cleared end
    pub end: Option<Option<DateTimeValue>>,
    /// New status
    pub status: Option<Status>,
    /// New or cleared recurrence rule
    pub rrule: Option<Option<RecurrenceRule>>,
}

impl EventPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch, stamped with the current UTC time.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::NoComponent`] if there is nothing to patch.
    pub fn apply(&self, object: &mut CalendarObject) -> Result<(), ObjectError> {
        self.apply_at(object, utc_now())
    }

    /// Applies the patch and bumps `SEQUENCE`, `LAST-MODIFIED` and `DTSTAMP`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::NoComponent`] if there is nothing to patch.
    pub fn apply_at(&self, object: &mut CalendarObject, now: DateTime) -> Result<(), ObjectError> {
        let component = object.master_mut().ok_or(ObjectError::NoComponent)?;
        let end_name = if component.is(KW_VTODO) {
            KW_DUE
        } else {
            KW_DTEND
        };

        if let Some(summary) = &self.summary {
            component.set_property(Property::text(KW_SUMMARY, summary));
        }
        set_or_remove_text(component, KW_DESCRIPTION, self.description.as_ref());
        set_or_remove_text(component, KW_LOCATION, self.location.as_ref());
        if let Some(start) = &self.start {
            component.set_property(start.to_property(KW_DTSTART));
        }
        match &self.end {
            Some(Some(end)) => {
                component.remove_property(KW_DURATION);
                component.set_property(end.to_property(end_name));
            }
            Some(None) => component.remove_property(end_name),
            None => {}
        }
        if let Some(status) = self.status {
            component.set_property(Property::raw(KW_STATUS, status.to_string()));
        }
        match &self.rrule {
            Some(Some(rrule)) => component.set_property(Property::raw(KW_RRULE, rrule.to_string())),
            Some(None) => component.remove_property(KW_RRULE),
            None => {}
        }

        let sequence = Event::new(component).sequence().map_or(1, |s| s.saturating_add(1));
        component.set_property(Property::raw(KW_SEQUENCE, sequence.to_string()));
        let stamp = DateTimeValue::Utc(now);
        component.set_property(stamp.to_property(KW_LAST_MODIFIED));
        component.set_property(stamp.to_property(KW_DTSTAMP));
        Ok(())
    }
}

fn set_or_remove_text(component: &mut Component, name: &str, value: Option<&Option<String>>) {
    match value {
        Some(Some(text)) => component.set_property(Property::text(name, text)),
        Some(None) => component.remove_property(name),
        None => {}
    }
}

/// Current UTC wall clock, truncated to seconds.
fn utc_now() -> DateTime {
    let now = Timestamp::now().to_zoned(TimeZone::UTC).datetime();
    now.date().at(now.hour(), now.minute(), now.second(), 0)
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for `CalDAV` operations.

use crate::xml::{XmlWriter, ns};

const NAMESPACES: [(&str, &str); 4] = [
    ("D", ns::DAV),
    ("C", ns::CALDAV),
    ("CS", ns::CALENDARSERVER),
    ("A", ns::APPLE_ICAL),
];

/// Properties to request in PROPFIND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    /// Principal of the authenticated user.
    CurrentUserPrincipal,
    /// Display name.
    DisplayName,
    /// Resource type.
    ResourceType,
    /// `ETag`.
    GetETag,
    /// Collection tag of the calendar server extensions.
    GetCTag,
    /// RFC 6578 sync token.
    SyncToken,
    /// Calendar data.
    CalendarData,
    /// Calendar home set.
    CalendarHomeSet,
    /// Supported calendar components.
    SupportedCalendarComponents,
    /// Calendar description.
    CalendarDescription,
    /// Calendar color of the Apple extensions.
    CalendarColor,
}

impl Prop {
    /// Qualified element name, using the prefixes declared by the builders.
    #[must_use]
    pub const fn qualified_name(self) -> &'static str {
        match self {
            Self::CurrentUserPrincipal => "D:current-user-principal",
            Self::DisplayName => "D:displayname",
            Self::ResourceType => "D:resourcetype",
            Self::GetETag => "D:getetag",
            Self::SyncToken => "D:sync-token",
            Self::GetCTag => "CS:getctag",
            Self::CalendarData => "C:calendar-data",
            Self::CalendarHomeSet => "C:calendar-home-set",
            Self::SupportedCalendarComponents => "C:supported-calendar-component-set",
            Self::CalendarDescription => "C:calendar-description",
            Self::CalendarColor => "A:calendar-color",
        }
    }
}

fn write_props(writer: &mut XmlWriter, props: &[Prop]) {
    writer.start("D:prop");
    for prop in props {
        writer.empty(prop.qualified_name());
    }
    writer.end("D:prop");
}

/// PROPFIND request builder.
#[derive(Debug, Clone, Default)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub const fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Adds several properties to the request.
    pub fn add_properties(&mut self, props: &[Prop]) -> &mut Self {
        self.props.extend_from_slice(props);
        self
    }

    /// Builds the XML body for the PROPFIND request.
    #[must_use]
    pub fn build(&self) -> String {
        let mut writer = XmlWriter::new("D:propfind", &NAMESPACES);
        write_props(&mut writer, &self.props);
        writer.finish("D:propfind")
    }
}

/// RFC 6578 `sync-collection` REPORT builder.
#[derive(Debug, Clone, Default)]
pub struct SyncCollectionRequest {
    token: Option<String>,
}

impl SyncCollectionRequest {
    /// Creates a request; `None` or an empty token asks for a full listing.
    #[must_use]
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token.map(str::to_string),
        }
    }

    /// Builds the XML body.
    #[must_use]
    pub fn build(&self) -> String {
        let mut writer = XmlWriter::new("D:sync-collection", &NAMESPACES);
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => writer.text_element("D:sync-token", token),
            _ => writer.empty("D:sync-token"),
        };
        writer.text_element("D:sync-level", "1");
        write_props(&mut writer, &[Prop::GetETag]);
        writer.finish("D:sync-collection")
    }
}

/// Calendar query request builder.
#[derive(Debug, Clone)]
pub struct CalendarQueryRequest {
    component: String,
    time_range: Option<TimeRange>,
    text_match: Option<TextMatch>,
    with_data: bool,
}

/// Time range filter for calendar queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    /// Start date/time, in UTC format (e.g. `20260101T000000Z`).
    pub start: String,
    /// End date/time, in UTC format.
    pub end: Option<String>,
}

/// Text match filter on a property of the queried component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    /// Property to match.
    pub property: String,
    /// Text to search for.
    pub text: String,
    /// Collation to use.
    pub collation: Option<String>,
    /// Whether to negate the match.
    pub negate: bool,
}

impl CalendarQueryRequest {
    /// Creates a query for components of the given type (VEVENT, VTODO).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            time_range: None,
            text_match: None,
            with_data: true,
        }
    }

    /// Sets the time range filter.
    #[must_use]
    pub fn time_range(mut self, start: String, end: Option<String>) -> Self {
        self.time_range = Some(TimeRange { start, end });
        self
    }

    /// Matches the `UID` property exactly.
    #[must_use]
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.text_match = Some(TextMatch {
            property: "UID".to_string(),
            text: uid.into(),
            collation: Some("i;octet".to_string()),
            negate: false,
        });
        self
    }

    /// Sets a text match filter.
    #[must_use]
    pub fn text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = Some(text_match);
        self
    }

    /// Requests only entity tags, without calendar data.
    #[must_use]
    pub const fn etags_only(mut self) -> Self {
        self.with_data = false;
        self
    }

    /// Builds the XML body for the calendar query request.
    #[must_use]
    pub fn build(&self) -> String {
        let mut writer = XmlWriter::new("C:calendar-query", &NAMESPACES);
        if self.with_data {
            write_props(&mut writer, &[Prop::GetETag, Prop::CalendarData]);
        } else {
            write_props(&mut writer, &[Prop::GetETag]);
        }

        writer
            .start("C:filter")
            .start_with("C:comp-filter", &[("name", "VCALENDAR")])
            .start_with("C:comp-filter", &[("name", self.component.as_str())]);

        if let Some(tr) = &self.time_range {
            let mut attrs = vec![("start", tr.start.as_str())];
            if let Some(end) = &tr.end {
                attrs.push(("end", end.as_str()));
            }
            writer.empty_with("C:time-range", &attrs);
        }

        if let Some(tm) = &self.text_match {
            writer.start_with("C:prop-filter", &[("name", tm.property.as_str())]);
            let mut attrs = Vec::new();
            if let Some(collation) = &tm.collation {
                attrs.push(("collation", collation.as_str()));
            }
            if tm.negate {
                attrs.push(("negate-condition", "yes"));
            }
            writer
                .start_with("C:text-match", &attrs)
                .text(&tm.text)
                .end("C:text-match")
                .end("C:prop-filter");
        }

        writer
            .end("C:comp-filter")
            .end("C:comp-filter")
            .end("C:filter");
        writer.finish("C:calendar-query")
    }
}

/// Calendar multiget request builder.
#[derive(Debug, Clone, Default)]
pub struct CalendarMultiGetRequest {
    hrefs: Vec<String>,
}

impl CalendarMultiGetRequest {
    /// Creates a new calendar multiget request.
    #[must_use]
    pub const fn new() -> Self {
        Self { hrefs: Vec::new() }
    }

    /// Adds an href to the request.
    pub fn add_href(&mut self, href: String) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Builds the XML body for the calendar multiget request.
    #[must_use]
    pub fn build(&self) -> String {
        let mut writer = XmlWriter::new("C:calendar-multiget", &NAMESPACES);
        write_props(&mut writer, &[Prop::GetETag, Prop::CalendarData]);
        for href in &self.hrefs {
            writer.text_element("D:href", href);
        }
        writer.finish("C:calendar-multiget")
    }
}

/// MKCALENDAR request builder.
#[derive(Debug, Clone)]
pub struct MkCalendarRequest {
    display_name: String,
    description: Option<String>,
    components: Vec<String>,
}

impl MkCalendarRequest {
    /// Creates a request for a calendar with the given display name.
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            description: None,
            components: Vec::new(),
        }
    }

    /// Sets the calendar description.
    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Restricts the component types the calendar accepts.
    #[must_use]
    pub fn components(mut self, components: &[&str]) -> Self {
        self.components = components.iter().map(|c| (*c).to_string()).collect();
        self
    }

    /// Builds the XML body.
    #[must_use]
    pub fn build(&self) -> String {
        let mut writer = XmlWriter::new("C:mkcalendar", &NAMESPACES);
        writer
            .start("D:set")
            .start("D:prop")
            .text_element("D:displayname", &self.display_name);
        if let Some(desc) = &self.description {
            writer.text_element("C:calendar-description", desc);
        }
        if !self.components.is_empty() {
            writer.start("C:supported-calendar-component-set");
            for comp in &self.components {
                writer.empty_with("C:comp", &[("name", comp.as_str())]);
            }
            writer.end("C:supported-calendar-component-set");
        }
        writer.end("D:prop").end("D:set");
        writer.finish("C:mkcalendar")
    }
}

/// PROPPATCH request builder for calendar metadata.
///
/// A field set to `Some(None)` is removed on the server.
#[derive(Debug, Clone, Default)]
pub struct PropPatchRequest {
    display_name: Option<String>,
    description: Option<Option<String>>,
}

impl PropPatchRequest {
    /// Creates an empty request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            display_name: None,
            description: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets or removes the description.
    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Whether the request changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none()
    }

    /// Builds the XML body.
    #[must_use]
    pub fn build(&self) -> String {
        let mut writer = XmlWriter::new("D:propertyupdate", &NAMESPACES);
        let set_desc = self.description.as_ref().and_then(Option::as_deref);
        if self.display_name.is_some() || set_desc.is_some() {
            writer.start("D:set").start("D:prop");
            if let Some(name) = &self.display_name {
                writer.text_element("D:displayname", name);
            }
            if let Some(desc) = set_desc {
                writer.text_element("C:calendar-description", desc);
            }
            writer.end("D:prop").end("D:set");
        }
        if matches!(self.description, Some(None)) {
            writer
                .start("D:remove")
                .start("D:prop")
                .empty("C:calendar-description")
                .end("D:prop")
                .end("D:remove");
        }
        writer.finish("D:propertyupdate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_collection_with_and_without_token() {
        let initial = SyncCollectionRequest::new(None).build();
        assert!(initial.contains("<D:sync-token/>"));
        assert!(initial.contains("<D:sync-level>1</D:sync-level>"));
        assert!(initial.contains("<D:getetag/>"));

        let empty = SyncCollectionRequest::new(Some("")).build();
        assert!(empty.contains("<D:sync-token/>"));

        let next = SyncCollectionRequest::new(Some("http://example.com/sync/1?a&b")).build();
        assert!(next.contains("<D:sync-token>http://example.com/sync/1?a&amp;b</D:sync-token>"));
    }

    #[test]
    fn proppatch_sets_and_removes() {
        let req = PropPatchRequest::new()
            .display_name("Work")
            .description(None);
        let xml = req.build();
        assert!(xml.contains("<D:set><D:prop><D:displayname>Work</D:displayname></D:prop></D:set>"));
        assert!(xml.contains("<D:remove><D:prop><C:calendar-description/></D:prop></D:remove>"));
        assert!(PropPatchRequest::new().is_empty());
    }
}

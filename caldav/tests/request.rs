// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request building tests.

use calbridge_caldav::{
    CalendarMultiGetRequest, CalendarQueryRequest, MkCalendarRequest, Prop, PropFindRequest,
    TextMatch, parse_document,
};

#[test]
fn request_propfind_builds_xml() {
    let mut request = PropFindRequest::new();
    request.add_property(Prop::DisplayName);
    request.add_property(Prop::GetETag);
    request.add_property(Prop::ResourceType);

    let xml = request.build();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(xml.contains("<D:propfind"));
    assert!(xml.contains("<D:prop>"));
    assert!(xml.contains("<D:displayname/>"));
    assert!(xml.contains("<D:getetag/>"));
    assert!(xml.contains("<D:resourcetype/>"));
    assert!(xml.contains("</D:prop>"));
    assert!(xml.contains("</D:propfind>"));

    let root = parse_document(&xml).expect("request must be well-formed");
    assert!(root.is("propfind"));
}

#[test]
fn request_propfind_declares_every_namespace() {
    let mut request = PropFindRequest::new();
    request.add_properties(&[Prop::CalendarHomeSet, Prop::GetCTag, Prop::CalendarColor]);

    let xml = request.build();

    assert!(xml.contains("xmlns:D=\"DAV:\""));
    assert!(xml.contains("xmlns:C=\"urn:ietf:params:xml:ns:caldav\""));
    assert!(xml.contains("xmlns:CS=\"http://calendarserver.org/ns/\""));
    assert!(xml.contains("xmlns:A=\"http://apple.com/ns/ical/\""));
    assert!(xml.contains("<C:calendar-home-set/>"));
    assert!(xml.contains("<CS:getctag/>"));
    assert!(xml.contains("<A:calendar-color/>"));
}

#[test]
fn request_calendar_query_with_time_range() {
    let xml = CalendarQueryRequest::new("VEVENT")
        .time_range(
            "20260101T000000Z".to_string(),
            Some("20260201T000000Z".to_string()),
        )
        .build();

    assert!(xml.contains("<C:calendar-query"));
    assert!(xml.contains("<C:calendar-data/>"));
    assert!(xml.contains("<C:comp-filter name=\"VCALENDAR\">"));
    assert!(xml.contains("<C:comp-filter name=\"VEVENT\">"));
    assert!(xml.contains("<C:time-range start=\"20260101T000000Z\" end=\"20260201T000000Z\"/>"));
}

#[test]
fn request_calendar_query_by_uid_escapes_text() {
    let xml = CalendarQueryRequest::new("VTODO").uid("a<b>&c").build();

    assert!(xml.contains("<C:comp-filter name=\"VTODO\">"));
    assert!(xml.contains("<C:prop-filter name=\"UID\">"));
    assert!(xml.contains("collation=\"i;octet\""));
    assert!(xml.contains("a&lt;b&gt;&amp;c"));

    let root = parse_document(&xml).expect("request must be well-formed");
    let text = root
        .child("filter")
        .and_then(|f| f.child("comp-filter"))
        .and_then(|f| f.child("comp-filter"))
        .and_then(|f| f.child("prop-filter"))
        .and_then(|f| f.child_text("text-match"));
    assert_eq!(text, Some("a<b>&c"));
}

#[test]
fn request_calendar_query_negated_text_match() {
    let xml = CalendarQueryRequest::new("VEVENT")
        .text_match(TextMatch {
            property: "SUMMARY".to_string(),
            text: "standup".to_string(),
            collation: None,
            negate: true,
        })
        .etags_only()
        .build();

    assert!(xml.contains("negate-condition=\"yes\""));
    assert!(!xml.contains("calendar-data"));
}

#[test]
fn request_calendar_multiget() {
    let mut request = CalendarMultiGetRequest::new();
    request.add_href("/calendars/user/event1.ics".to_string());
    request.add_href("/calendars/user/event2.ics".to_string());

    let xml = request.build();

    assert!(xml.contains("<C:calendar-multiget"));
    assert!(xml.contains("<D:href>/calendars/user/event1.ics</D:href>"));
    assert!(xml.contains("<D:href>/calendars/user/event2.ics</D:href>"));
}

#[test]
fn request_mkcalendar_sets_components() {
    let xml = MkCalendarRequest::new("Work & Play")
        .description(Some("Shared".to_string()))
        .components(&["VEVENT", "VTODO"])
        .build();

    assert!(xml.contains("<C:mkcalendar"));
    assert!(xml.contains("<D:displayname>Work &amp; Play</D:displayname>"));
    assert!(xml.contains("<C:calendar-description>Shared</C:calendar-description>"));
    assert!(xml.contains("<C:comp name=\"VEVENT\"/>"));
    assert!(xml.contains("<C:comp name=\"VTODO\"/>"));
}

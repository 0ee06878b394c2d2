// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsing tests.

use calbridge_caldav::{
    CalDavError, CalendarCollection, ETag, Href, MultiStatusResponse, decode_discovery_response,
    decode_object_list_response, decode_object_resources,
};

#[test]
fn response_parse_multistatus_basic() {
    let xml = "\
<?xml version=\"1.0\" encoding=\"utf-8\" ?>
<D:multistatus xmlns:D=\"DAV:\">
  <D:response>
    <D:href>/calendars/user/event1.ics</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>\"12345\"</D:getetag>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>";

    let response = MultiStatusResponse::from_xml(xml).expect("Failed to parse multistatus");

    assert_eq!(response.responses.len(), 1);
    assert_eq!(
        response.responses[0].href.as_str(),
        "/calendars/user/event1.ics"
    );
    assert_eq!(
        response.responses[0].found_props().etag(),
        Some(ETag::from("\"12345\""))
    );
}

#[test]
fn response_prefixes_and_case_do_not_matter() {
    let xml = r#"<multistatus xmlns="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav">
  <response>
    <HREF>https://dav.example.com/calendars/alice/</HREF>
    <propstat>
      <prop>
        <resourcetype><collection/><cal:calendar/></resourcetype>
        <displayname>Personal</displayname>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#;

    let entries = decode_discovery_response(xml.as_bytes()).expect("Failed to decode");
    assert_eq!(entries.len(), 1);
    let (href, props) = &entries[0];
    assert_eq!(href.as_str(), "/calendars/alice/");
    assert!(props.is_calendar());
    assert_eq!(props.display_name(), Some("Personal"));
}

#[test]
fn response_unknown_properties_are_kept() {
    let xml = r#"<d:multistatus xmlns:d="DAV:" xmlns:x="http://example.com/ns/">
  <d:response>
    <d:href>/cal/</d:href>
    <d:propstat>
      <d:prop><x:quota-color>blue</x:quota-color></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    let entries = decode_discovery_response(xml.as_bytes()).unwrap();
    let props = &entries[0].1;
    assert_eq!(props.text("quota-color"), Some("blue"));
    assert_eq!(props.display_name(), None);
}

#[test]
fn response_collection_metadata() {
    let xml = r#"<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav"
    xmlns:cs="http://calendarserver.org/ns/" xmlns:a="http://apple.com/ns/ical/">
  <d:response>
    <d:href>/calendars/alice/work/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>Work</d:displayname>
        <c:calendar-description>Office &amp; meetings</c:calendar-description>
        <a:calendar-color>#FF0000FF</a:calendar-color>
        <cs:getctag>ctag-7</cs:getctag>
        <d:sync-token>http://example.com/sync/7</d:sync-token>
        <c:supported-calendar-component-set>
          <c:comp name="vevent"/>
          <c:comp name="VTODO"/>
        </c:supported-calendar-component-set>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    let entries = decode_discovery_response(xml.as_bytes()).unwrap();
    let mut collection = CalendarCollection::new(Href::from("/calendars/alice/work/"));
    entries[0].1.apply_metadata(&mut collection);

    assert_eq!(collection.display_name.as_deref(), Some("Work"));
    assert_eq!(collection.description.as_deref(), Some("Office & meetings"));
    assert_eq!(collection.color.as_deref(), Some("#FF0000FF"));
    assert_eq!(collection.ctag.as_deref(), Some("ctag-7"));
    assert_eq!(collection.change_token(), Some("http://example.com/sync/7"));
    assert_eq!(collection.supported_components, ["VEVENT", "VTODO"]);
}

#[test]
fn response_sync_collection_changes_and_removals() {
    let xml = r#"<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/cal/a.ics</d:href>
    <d:propstat>
      <d:prop><d:getetag>"a2"</d:getetag></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/cal/b.ics</d:href>
    <d:status>HTTP/1.1 404 Not Found</d:status>
  </d:response>
  <d:sync-token>http://example.com/sync/2</d:sync-token>
</d:multistatus>"#;

    let list = decode_object_list_response(xml.as_bytes()).unwrap();
    assert_eq!(list.token.as_deref(), Some("http://example.com/sync/2"));
    assert!(!list.truncated);
    assert_eq!(list.entries.len(), 2);
    assert_eq!(list.entries[0].etag, Some(ETag::from("\"a2\"")));
    assert!(!list.entries[0].deleted);
    assert_eq!(list.entries[1].href.as_str(), "/cal/b.ics");
    assert!(list.entries[1].deleted);
}

#[test]
fn response_sync_collection_truncated() {
    let xml = r#"<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/cal/a.ics</d:href>
    <d:propstat>
      <d:prop><d:getetag>"a1"</d:getetag></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/cal/</d:href>
    <d:status>HTTP/1.1 507 Insufficient Storage</d:status>
  </d:response>
  <d:sync-token>page-1</d:sync-token>
</d:multistatus>"#;

    let list = decode_object_list_response(xml.as_bytes()).unwrap();
    assert!(list.truncated);
    assert_eq!(list.entries.len(), 1);
    assert_eq!(list.token.as_deref(), Some("page-1"));
}

#[test]
fn response_calendar_data_is_parsed() {
    let xml = r#"<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:response>
    <d:href>/cal/e1.ics</d:href>
    <d:propstat>
      <d:prop>
        <d:getetag>"e1-1"</d:getetag>
        <c:calendar-data>BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//test//test//EN
BEGIN:VEVENT
UID:e1
DTSTAMP:20250101T000000Z
DTSTART:20250110T140000Z
SUMMARY:Planning &amp; review
END:VEVENT
END:VCALENDAR
</c:calendar-data>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    let resources = decode_object_resources(xml.as_bytes()).unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].etag, ETag::from("\"e1-1\""));
    assert_eq!(resources[0].object.uid(), Some("e1"));
    let master = resources[0].object.master().unwrap();
    assert_eq!(master.summary().as_deref(), Some("Planning & review"));
}

#[test]
fn response_broken_calendar_data_names_the_href() {
    let xml = r#"<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:response>
    <d:href>/cal/bad.ics</d:href>
    <d:propstat>
      <d:prop>
        <d:getetag>"1"</d:getetag>
        <c:calendar-data>BEGIN:VCALENDAR
this is not a content line
</c:calendar-data>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    let err = decode_object_resources(xml.as_bytes()).unwrap_err();
    assert!(
        matches!(&err, CalDavError::MalformedObjectBody { href, .. } if href == "/cal/bad.ics"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn response_malformed_xml_is_rejected() {
    let err = MultiStatusResponse::from_xml("<d:multistatus xmlns:d=\"DAV:\"><d:response>")
        .unwrap_err();
    assert!(matches!(err, CalDavError::MalformedProtocolResponse(_)));

    let err = MultiStatusResponse::from_xml("<d:error xmlns:d=\"DAV:\"/>").unwrap_err();
    assert!(matches!(err, CalDavError::MalformedProtocolResponse(_)));
}

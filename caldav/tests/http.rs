// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport integration tests with wiremock.

use calbridge_caldav::{
    AuthMethod, CalDavClient, CalDavConfig, CalendarSummary, DavMethod, DavRequest, ETag,
    HttpTransport, Prop, PropFindRequest, Transport,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(base_url: String, auth: AuthMethod) -> CalDavConfig {
    CalDavConfig {
        base_url,
        calendar_home: "/dav/calendars/user/".to_string(),
        auth,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "require network"]
async fn http_sends_basic_credentials_and_depth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/dav/calendars/user/"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .and(header("Depth", "1"))
        .and(header("Content-Type", "application/xml; charset=utf-8"))
        .and(body_string_contains("<D:getetag/>"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            r#"<D:multistatus xmlns:D="DAV:"></D:multistatus>"#,
            "application/xml",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new(&config(
        mock_server.uri(),
        AuthMethod::Basic {
            username: "user".to_string(),
            password: "pass".to_string(),
        },
    ))
    .expect("Failed to create transport");

    let body = PropFindRequest::new().add_property(Prop::GetETag).build();
    let resp = transport
        .send(
            DavRequest::new(DavMethod::Propfind, "/dav/calendars/user/")
                .depth(1)
                .xml(body),
        )
        .await
        .expect("Failed to send");

    assert_eq!(resp.status, 207);
    assert!(resp.text().unwrap().contains("multistatus"));
}

#[tokio::test]
#[ignore = "require network"]
async fn http_sends_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dav/calendars/user/work/e1.ics"))
        .and(header("Authorization", "Bearer abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"e1-1\"")
                .set_body_raw("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n", "text/calendar"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new(&config(
        mock_server.uri(),
        AuthMethod::Bearer {
            token: "abc123".to_string(),
        },
    ))
    .expect("Failed to create transport");

    let resp = transport
        .send(DavRequest::new(
            DavMethod::Get,
            "/dav/calendars/user/work/e1.ics",
        ))
        .await
        .expect("Failed to send");

    assert_eq!(resp.status, 200);
    assert_eq!(resp.etag(), Some(ETag::from("\"e1-1\"")));
}

#[tokio::test]
#[ignore = "require network"]
async fn http_error_statuses_are_responses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/dav/calendars/user/work/e1.ics"))
        .and(header("If-Match", "\"stale\""))
        .respond_with(ResponseTemplate::new(412).insert_header("ETag", "\"fresh\""))
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new(&config(mock_server.uri(), AuthMethod::None))
        .expect("Failed to create transport");

    let resp = transport
        .send(
            DavRequest::new(DavMethod::Put, "/dav/calendars/user/work/e1.ics")
                .header("If-Match", "\"stale\"")
                .calendar("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".to_string()),
        )
        .await
        .expect("a 412 is still a response");

    assert_eq!(resp.status, 412);
    assert!(!resp.is_success());
    assert_eq!(resp.etag(), Some(ETag::from("\"fresh\"")));
}

#[tokio::test]
#[ignore = "require network"]
async fn http_unreachable_server_is_retryable() {
    let transport = HttpTransport::new(&CalDavConfig {
        timeout_secs: 2,
        ..config("http://127.0.0.1:9/".to_string(), AuthMethod::None)
    })
    .expect("Failed to create transport");

    let err = transport
        .send(DavRequest::new(DavMethod::Get, "/"))
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "unexpected error: {err:?}");
}

#[tokio::test]
#[ignore = "require network"]
async fn http_client_lists_calendars() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/dav/calendars/user/"))
        .and(header("Depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/dav/calendars/user/</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/calendars/user/personal/</D:href>
    <D:propstat>
      <D:prop>
        <D:displayname>Personal Calendar</D:displayname>
        <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
        <C:supported-calendar-component-set>
          <C:comp name="VEVENT"/>
        </C:supported-calendar-component-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#,
            "application/xml",
        ))
        .mount(&mock_server)
        .await;

    let client = CalDavClient::new(config(mock_server.uri(), AuthMethod::None))
        .expect("Failed to create client");
    let calendars = client
        .list_calendars()
        .await
        .expect("Failed to list calendars");

    assert_eq!(calendars.len(), 1);
    let summary = CalendarSummary::from(&calendars[0]);
    assert_eq!(summary.id, "personal");
    assert_eq!(summary.name, "Personal Calendar");
    assert_eq!(summary.url, "/dav/calendars/user/personal/");
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory transport replaying scripted responses.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calbridge_caldav::{CalDavError, DavMethod, DavRequest, DavResponse, Transport};

#[derive(Debug)]
struct Exchange {
    method: DavMethod,
    path: String,
    prefix: bool,
    outcome: Result<DavResponse, CalDavError>,
}

/// Answers requests in order from a script and records what was sent.
///
/// Every request must match the method and path of the next scripted
/// exchange; anything else fails the test.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Exchange>>,
    sent: Mutex<Vec<DavRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a response for the next request.
    pub fn expect(&self, method: DavMethod, path: &str, response: DavResponse) -> &Self {
        self.push(method, path, false, Ok(response))
    }

    /// Queues a response for the next request, whose path only has to start
    /// with `prefix`.
    pub fn expect_under(&self, method: DavMethod, prefix: &str, response: DavResponse) -> &Self {
        self.push(method, prefix, true, Ok(response))
    }

    /// Queues a transport failure for the next request.
    pub fn fail(&self, method: DavMethod, path: &str, error: CalDavError) -> &Self {
        self.push(method, path, false, Err(error))
    }

    fn push(
        &self,
        method: DavMethod,
        path: &str,
        prefix: bool,
        outcome: Result<DavResponse, CalDavError>,
    ) -> &Self {
        self.script.lock().unwrap().push_back(Exchange {
            method,
            path: path.to_string(),
            prefix,
            outcome,
        });
        self
    }

    /// Requests sent so far.
    pub fn sent(&self) -> Vec<DavRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Whether every scripted exchange was used.
    pub fn is_done(&self) -> bool {
        self.script.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: DavRequest) -> Result<DavResponse, CalDavError> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {} {}", request.method, request.path));
        assert_eq!(request.method, next.method, "method out of script");
        if next.prefix {
            assert!(
                request.path.starts_with(&next.path),
                "{} is not under {}",
                request.path,
                next.path
            );
        } else {
            assert_eq!(request.path, next.path, "path out of script");
        }
        self.sent.lock().unwrap().push(request);
        next.outcome
    }
}

/// A 207 response with the given body.
pub fn multistatus(body: &str) -> DavResponse {
    DavResponse::new(207, body.as_bytes().to_vec())
}

/// A `<response>` carrying only an entity tag.
pub fn etag_entry(href: &str, etag: &str) -> String {
    format!(
        "<d:response><d:href>{href}</d:href><d:propstat><d:prop>\
         <d:getetag>{etag}</d:getetag></d:prop>\
         <d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>"
    )
}

/// A `<response>` reporting a removed object.
pub fn removed_entry(href: &str) -> String {
    format!(
        "<d:response><d:href>{href}</d:href>\
         <d:status>HTTP/1.1 404 Not Found</d:status></d:response>"
    )
}

/// Wraps responses into a multistatus document, with an optional sync token.
pub fn document(entries: &[String], token: Option<&str>) -> String {
    let token = token
        .map(|t| format!("<d:sync-token>{t}</d:sync-token>"))
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <d:multistatus xmlns:d=\"DAV:\" xmlns:c=\"urn:ietf:params:xml:ns:caldav\" \
         xmlns:cs=\"http://calendarserver.org/ns/\">{}{token}</d:multistatus>",
        entries.concat()
    )
}

/// A `<response>` carrying an object with its calendar data.
pub fn object_entry(href: &str, etag: &str, ics: &str) -> String {
    format!(
        "<d:response><d:href>{href}</d:href><d:propstat><d:prop>\
         <d:getetag>{etag}</d:getetag><c:calendar-data>{ics}</c:calendar-data>\
         </d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>"
    )
}

/// A minimal event body.
pub fn event_ics(uid: &str, summary: &str, dtstart: &str, rrule: Option<&str>) -> String {
    let rrule = rrule.map(|r| format!("RRULE:{r}\r\n")).unwrap_or_default();
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//test//EN\r\nBEGIN:VEVENT\r\n\
         UID:{uid}\r\nDTSTAMP:20250101T000000Z\r\nDTSTART:{dtstart}\r\n\
         DURATION:PT1H\r\nSUMMARY:{summary}\r\n{rrule}END:VEVENT\r\nEND:VCALENDAR\r\n"
    )
}

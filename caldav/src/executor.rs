// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Conditional create, update and delete of calendar objects.
//!
//! Every write carries a precondition: `If-None-Match: *` on create and
//! `If-Match` with the caller's entity tag on update and delete. A failed
//! precondition is reported as is and never retried.

use std::fmt::Write as _;
use std::sync::Arc;

use calbridge_ical::CalendarObject;
use jiff::SignedDuration;
use jiff::civil::DateTime;

use crate::codec::{
    DiscoveryScope, decode_discovery_response, decode_object_body, decode_object_resources,
    encode_discovery_request, encode_object_body,
};
use crate::error::CalDavError;
use crate::request::CalendarQueryRequest;
use crate::transport::{DavMethod, DavRequest, DavResponse, Transport, exchange, expect_status};
use crate::types::{CalendarResource, ETag, Href};

/// Margin added on both sides of a server time-range query, so floating and
/// zoned times are not cut off by the server's UTC comparison.
const RANGE_MARGIN: SignedDuration = SignedDuration::from_hours(24);

/// Performs object operations against a collection.
#[derive(Debug, Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    include_tasks: bool,
}

impl Executor {
    /// Creates an executor over a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, include_tasks: bool) -> Self {
        Self {
            transport,
            include_tasks,
        }
    }

    /// Stores a new object as `<collection>/<uid>.ics`.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Conflict`] if an object already exists at that
    /// href, and [`CalDavError::MalformedObjectBody`] if the object has no
    /// UID.
    #[tracing::instrument(skip(self, object))]
    pub async fn create(
        &self,
        collection: &Href,
        object: &CalendarObject,
    ) -> Result<(Href, ETag), CalDavError> {
        let uid = object
            .uid()
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| CalDavError::MalformedObjectBody {
                href: collection.to_string(),
                reason: "object has no UID".to_string(),
            })?;
        let href = object_href(collection, uid);

        let req = DavRequest::new(DavMethod::Put, href.as_str())
            .header("If-None-Match", "*")
            .calendar(encode_object_body(object));
        let resp = exchange(self.transport.as_ref(), req).await?;
        let resp = match resp.status {
            409 | 412 => {
                return Err(CalDavError::Conflict {
                    href: href.to_string(),
                });
            }
            _ => expect_status(resp, &href, &[200, 201, 204])?,
        };

        let etag = self.etag_after_write(&href, &resp).await?;
        tracing::debug!(%href, %etag, "object created");
        Ok((href, etag))
    }

    /// Replaces an object, provided it still has the expected entity tag.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::PreconditionFailed`] if the object changed on
    /// the server, and [`CalDavError::NotFound`] if it is gone.
    #[tracing::instrument(skip(self, object))]
    pub async fn update(
        &self,
        href: &Href,
        expected: &ETag,
        object: &CalendarObject,
    ) -> Result<ETag, CalDavError> {
        let req = DavRequest::new(DavMethod::Put, href.as_str())
            .header("If-Match", expected.as_str())
            .calendar(encode_object_body(object));
        let resp = exchange(self.transport.as_ref(), req).await?;
        let resp = check_precondition(resp, href, expected, &[200, 201, 204])?;
        self.etag_after_write(href, &resp).await
    }

    /// Deletes an object, provided it still has the expected entity tag.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::PreconditionFailed`] if the object changed on
    /// the server, and [`CalDavError::NotFound`] if it is gone.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, href: &Href, expected: &ETag) -> Result<(), CalDavError> {
        let req =
            DavRequest::new(DavMethod::Delete, href.as_str()).header("If-Match", expected.as_str());
        let resp = exchange(self.transport.as_ref(), req).await?;
        check_precondition(resp, href, expected, &[200, 202, 204])?;
        Ok(())
    }

    /// Reads one object.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if there is no object at the href,
    /// and [`CalDavError::MalformedObjectBody`] if it does not parse.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, href: &Href) -> Result<CalendarResource, CalDavError> {
        let req = DavRequest::new(DavMethod::Get, href.as_str());
        let resp = exchange(self.transport.as_ref(), req).await?;
        let resp = expect_status(resp, href, &[200])?;
        let object = decode_object_body(href, &resp.body)?;
        let etag = match resp.etag() {
            Some(etag) => etag,
            None => self.lookup_etag(href).await?,
        };
        Ok(CalendarResource::new(href.clone(), etag, object))
    }

    /// Finds the object with the given UID in a collection.
    ///
    /// # Errors
    ///
    /// Returns the transport or decoding failure of the query.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_uid(
        &self,
        collection: &Href,
        uid: &str,
    ) -> Result<Option<CalendarResource>, CalDavError> {
        for component in self.components() {
            let query = CalendarQueryRequest::new(*component).uid(uid);
            let found = self.query(collection, &query).await?;
            // Some servers ignore the collation and match case-insensitively
            if let Some(resource) = found.into_iter().find(|r| r.object.uid() == Some(uid)) {
                return Ok(Some(resource));
            }
        }
        Ok(None)
    }

    /// Loads the objects that may have occurrences within `[start, end)`.
    ///
    /// The server filter is widened by a day on both sides; callers expand
    /// the objects to get the exact occurrences.
    ///
    /// # Errors
    ///
    /// Returns the transport or decoding failure of the query.
    #[tracing::instrument(skip(self))]
    pub async fn query_range(
        &self,
        collection: &Href,
        start: DateTime,
        end: DateTime,
    ) -> Result<Vec<CalendarResource>, CalDavError> {
        let from = utc_stamp(start.saturating_sub(RANGE_MARGIN));
        let until = utc_stamp(end.saturating_add(RANGE_MARGIN));

        let mut resources: Vec<CalendarResource> = Vec::new();
        for component in self.components() {
            let query = CalendarQueryRequest::new(*component)
                .time_range(from.clone(), Some(until.clone()));
            for resource in self.query(collection, &query).await? {
                if !resources.iter().any(|r| r.href == resource.href) {
                    resources.push(resource);
                }
            }
        }
        tracing::debug!(count = resources.len(), "range query done");
        Ok(resources)
    }

    fn components(&self) -> &'static [&'static str] {
        if self.include_tasks {
            &["VEVENT", "VTODO"]
        } else {
            &["VEVENT"]
        }
    }

    async fn query(
        &self,
        collection: &Href,
        query: &CalendarQueryRequest,
    ) -> Result<Vec<CalendarResource>, CalDavError> {
        let req = DavRequest::new(DavMethod::Report, collection.as_str())
            .depth(1)
            .xml(query.build());
        let resp = exchange(self.transport.as_ref(), req).await?;
        let resp = expect_status(resp, collection, &[207])?;
        decode_object_resources(&resp.body)
    }

    /// Entity tag of a written object, from the response or a follow-up
    /// PROPFIND when the server did not send one.
    async fn etag_after_write(&self, href: &Href, resp: &DavResponse) -> Result<ETag, CalDavError> {
        match resp.etag() {
            Some(etag) => Ok(etag),
            None => {
                tracing::debug!(%href, "no ETag in write response, asking for it");
                self.lookup_etag(href).await
            }
        }
    }

    async fn lookup_etag(&self, href: &Href) -> Result<ETag, CalDavError> {
        let req = DavRequest::new(DavMethod::Propfind, href.as_str())
            .depth(0)
            .xml(encode_discovery_request(DiscoveryScope::ObjectTags));
        let resp = exchange(self.transport.as_ref(), req).await?;
        let resp = expect_status(resp, href, &[207])?;
        decode_discovery_response(&resp.body)?
            .into_iter()
            .find_map(|(_, props)| props.etag())
            .ok_or_else(|| CalDavError::malformed(format!("no entity tag for {href}")))
    }
}

/// Maps 412 to [`CalDavError::PreconditionFailed`], other unexpected
/// statuses to their usual kinds.
fn check_precondition(
    resp: DavResponse,
    href: &Href,
    expected: &ETag,
    accepted: &[u16],
) -> Result<DavResponse, CalDavError> {
    if resp.status == 412 {
        let observed = resp.etag().map(|etag| etag.to_string());
        tracing::debug!(%href, %expected, ?observed, "precondition failed");
        return Err(CalDavError::PreconditionFailed {
            href: href.to_string(),
            expected: expected.to_string(),
            observed,
        });
    }
    expect_status(resp, href, accepted)
}

/// Href under which an object with the given UID is created.
pub(crate) fn object_href(collection: &Href, uid: &str) -> Href {
    collection.join(&object_file_name(uid))
}

/// File name of a new object: the UID with unsafe bytes percent-encoded.
fn object_file_name(uid: &str) -> String {
    let mut name = String::with_capacity(uid.len() + 4);
    for byte in uid.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~' | b'@') {
            name.push(char::from(byte));
        } else {
            let _ = write!(name, "%{byte:02X}");
        }
    }
    name.push_str(".ics");
    name
}

/// Formats a wall-clock value as a UTC time-range bound.
fn utc_stamp(dt: DateTime) -> String {
    dt.strftime("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn object_file_names_are_path_safe() {
        assert_eq!(object_file_name("abc-123@host"), "abc-123@host.ics");
        assert_eq!(object_file_name("a/b c"), "a%2Fb%20c.ics");
    }

    #[test]
    fn utc_stamps() {
        let dt = date(2025, 1, 10).at(14, 0, 0, 0);
        assert_eq!(utc_stamp(dt), "20250110T140000Z");
    }

    #[test]
    fn stale_tag_reports_both_versions() {
        let resp = DavResponse::new(412, "").with_header("ETag", "\"v2\"");
        let err = check_precondition(
            resp,
            &Href::from("/cal/a.ics"),
            &ETag::from("\"v1\""),
            &[204],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CalDavError::PreconditionFailed {
                href: "/cal/a.ics".to_string(),
                expected: "\"v1\"".to_string(),
                observed: Some("\"v2\"".to_string()),
            }
        );
    }
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Encoding and decoding of protocol bodies.
//!
//! Thin functions over the request builders, the multistatus parser and the
//! calendar object parser, shared by the directory, the sync engine and the
//! executor.

use calbridge_ical::{CalendarObject, format, parse_bytes};

use crate::error::CalDavError;
use crate::request::{Prop, PropFindRequest, SyncCollectionRequest};
use crate::response::{MultiStatusResponse, PropertyBag};
use crate::types::{CalendarResource, Href, ObjectEntry, ObjectList};

/// What a discovery PROPFIND asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryScope {
    /// `current-user-principal` of the authenticated user.
    Principal,
    /// `calendar-home-set` of a principal.
    HomeSet,
    /// Resource type and component set of every collection under the home.
    Collections,
    /// Display name, description, color and change tokens of collections.
    Metadata,
    /// Entity tags of the objects in a collection, with its change tokens.
    ObjectTags,
}

impl DiscoveryScope {
    /// Properties requested for the scope.
    #[must_use]
    pub const fn props(self) -> &'static [Prop] {
        match self {
            Self::Principal => &[Prop::CurrentUserPrincipal],
            Self::HomeSet => &[Prop::CalendarHomeSet],
            Self::Collections => &[
                Prop::ResourceType,
                Prop::DisplayName,
                Prop::SupportedCalendarComponents,
            ],
            Self::Metadata => &[
                Prop::ResourceType,
                Prop::DisplayName,
                Prop::CalendarDescription,
                Prop::CalendarColor,
                Prop::GetCTag,
                Prop::SyncToken,
                Prop::SupportedCalendarComponents,
            ],
            Self::ObjectTags => &[Prop::ResourceType, Prop::GetETag, Prop::GetCTag, Prop::SyncToken],
        }
    }
}

/// Builds the PROPFIND body for a discovery scope.
#[must_use]
pub fn encode_discovery_request(scope: DiscoveryScope) -> String {
    let mut propfind = PropFindRequest::new();
    propfind.add_properties(scope.props());
    propfind.build()
}

/// Decodes a PROPFIND multistatus into the found properties of each href.
///
/// # Errors
///
/// Returns [`CalDavError::MalformedProtocolResponse`] if the body is not a
/// multistatus document.
pub fn decode_discovery_response(body: &[u8]) -> Result<Vec<(Href, PropertyBag)>, CalDavError> {
    let multistatus = MultiStatusResponse::from_bytes(body)?;
    Ok(multistatus
        .responses
        .into_iter()
        .map(|item| {
            let props = item.found_props();
            (item.href, props)
        })
        .collect())
}

/// Builds a `sync-collection` REPORT body; no token requests a full listing.
#[must_use]
pub fn encode_object_list_request(token: Option<&str>) -> String {
    SyncCollectionRequest::new(token).build()
}

/// Decodes a `sync-collection` multistatus.
///
/// Responses with a 404 status are removed objects. A 507 response marks
/// the listing as truncated. Responses without an entity tag that are not
/// removals (the collection itself, for instance) are skipped.
///
/// # Errors
///
/// Returns [`CalDavError::MalformedProtocolResponse`] if the body is not a
/// multistatus document.
pub fn decode_object_list_response(body: &[u8]) -> Result<ObjectList, CalDavError> {
    let multistatus = MultiStatusResponse::from_bytes(body)?;
    let mut list = ObjectList {
        token: multistatus.sync_token,
        entries: Vec::new(),
        truncated: false,
    };

    for item in multistatus.responses {
        match item.status {
            Some(507) => list.truncated = true,
            Some(404 | 410) => list.entries.push(ObjectEntry {
                href: item.href,
                etag: None,
                deleted: true,
            }),
            _ => {
                let props = item.found_props();
                if props.is_collection() {
                    continue;
                }
                if let Some(etag) = props.etag() {
                    list.entries.push(ObjectEntry {
                        href: item.href,
                        etag: Some(etag),
                        deleted: false,
                    });
                }
            }
        }
    }
    Ok(list)
}

/// Decodes a `calendar-query` or `calendar-multiget` multistatus into
/// parsed objects.
///
/// Responses without calendar data (removed objects, the collection itself)
/// are skipped.
///
/// # Errors
///
/// Returns [`CalDavError::MalformedProtocolResponse`] if the document is not
/// a multistatus or an object comes without an entity tag, and
/// [`CalDavError::MalformedObjectBody`] if an object does not parse.
pub fn decode_object_resources(body: &[u8]) -> Result<Vec<CalendarResource>, CalDavError> {
    let multistatus = MultiStatusResponse::from_bytes(body)?;
    let mut resources = Vec::new();
    for item in multistatus.responses {
        let props = item.found_props();
        let Some(data) = props.raw_text("calendar-data") else {
            if item.status.is_some_and(|s| s == 404) {
                tracing::debug!(href = %item.href, "object vanished before it could be read");
            }
            continue;
        };
        let etag = props.etag().ok_or_else(|| {
            CalDavError::malformed(format!("no entity tag for {}", item.href))
        })?;
        let object = decode_object_body(&item.href, data.as_bytes())?;
        resources.push(CalendarResource::new(item.href, etag, object));
    }
    Ok(resources)
}

/// Parses a calendar object body.
///
/// # Errors
///
/// Returns [`CalDavError::MalformedObjectBody`] naming the href if the body
/// is not a valid calendar object.
pub fn decode_object_body(href: &Href, body: &[u8]) -> Result<CalendarObject, CalDavError> {
    let malformed = |reason: String| CalDavError::MalformedObjectBody {
        href: href.to_string(),
        reason,
    };
    parse_bytes(body).map_err(|e| malformed(e.to_string()))
}

/// Serializes a calendar object for upload.
#[must_use]
pub fn encode_object_body(object: &CalendarObject) -> String {
    format(object)
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CalDAV` protocol engine (RFC 4791): discovery of calendar collections,
//! token based synchronization (RFC 6578) and entity-tag guarded object
//! operations.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod client;
mod codec;
mod config;
mod directory;
mod error;
mod executor;
mod request;
mod response;
mod sync;
mod transport;
mod types;
mod xml;

pub use crate::client::{CalDavClient, CalendarSummary, EventSummary};
pub use crate::codec::{
    DiscoveryScope, decode_discovery_response, decode_object_body, decode_object_list_response,
    decode_object_resources, encode_discovery_request, encode_object_body,
    encode_object_list_request,
};
pub use crate::config::{AuthMethod, CalDavConfig};
pub use crate::directory::Directory;
pub use crate::error::CalDavError;
pub use crate::executor::Executor;
pub use crate::request::{
    CalendarMultiGetRequest, CalendarQueryRequest, MkCalendarRequest, Prop, PropFindRequest,
    PropPatchRequest, SyncCollectionRequest, TextMatch, TimeRange,
};
pub use crate::response::{MultiStatusResponse, PropStat, PropertyBag, ResponseItem};
pub use crate::sync::SyncEngine;
pub use crate::transport::{
    CONTENT_TYPE_CALENDAR, CONTENT_TYPE_XML, DavMethod, DavRequest, DavResponse, HttpTransport,
    Transport,
};
pub use crate::types::{
    CalendarCollection, CalendarResource, ETag, Href, ObjectEntry, ObjectList, ServerPrincipal,
    SyncEntry, SyncMode, SyncResult, SyncState,
};
pub use crate::xml::{XmlElement, XmlWriter, ns, parse_document};

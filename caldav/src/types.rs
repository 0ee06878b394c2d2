// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use calbridge_ical::CalendarObject;
use reqwest::Url;

/// Calendar resource href (path).
///
/// A `Href` represents the path to a calendar resource on a `CalDAV` server,
/// such as `/calendars/user/event1.ics`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Href(String);

impl Href {
    /// Creates a new `Href` from a string.
    #[must_use]
    pub const fn new(href: String) -> Self {
        Self(href)
    }

    /// Creates a `Href` from a value sent by the server.
    ///
    /// Absolute URLs are reduced to their path so hrefs from different
    /// responses compare equal.
    #[must_use]
    pub fn from_server(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            if let Ok(url) = Url::parse(raw) {
                return Self(url.path().to_string());
            }
        }
        Self(raw.to_string())
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends a path segment, treating `self` as a collection.
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        let base = self.0.trim_end_matches('/');
        Self(format!("{base}/{}", segment.trim_start_matches('/')))
    }

    /// Whether both hrefs name the same resource, ignoring a trailing slash.
    #[must_use]
    pub fn same_resource(&self, other: &Self) -> bool {
        self.0.trim_end_matches('/') == other.0.trim_end_matches('/')
    }
}

impl Deref for Href {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Href {
    fn from(href: String) -> Self {
        Self(href)
    }
}

impl From<&str> for Href {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

/// Entity tag for change detection.
///
/// An `ETag` represents an entity tag returned by the `CalDAV` server,
/// used for optimistic concurrency control and change detection. It is
/// opaque and compared verbatim, quotes included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    /// Creates a new `ETag` from a string.
    #[must_use]
    pub const fn new(etag: String) -> Self {
        Self(etag)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ETag {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ETag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ETag {
    fn from(etag: String) -> Self {
        Self(etag)
    }
}

impl From<&str> for ETag {
    fn from(etag: &str) -> Self {
        Self(etag.to_string())
    }
}

/// A calendar object resource.
///
/// Represents a calendar object (event, todo, etc.) stored on a `CalDAV` server,
/// including its href, `ETag`, and iCalendar data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarResource {
    /// The href of the resource.
    pub href: Href,
    /// The entity tag of the resource.
    pub etag: ETag,
    /// The parsed iCalendar data.
    pub object: CalendarObject,
}

impl CalendarResource {
    /// Creates a new `CalendarResource`.
    #[must_use]
    pub const fn new(href: Href, etag: ETag, object: CalendarObject) -> Self {
        Self { href, etag, object }
    }
}

/// Calendar collection metadata.
///
/// Represents a calendar collection on a `CalDAV` server, containing
/// metadata about the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCollection {
    /// The href of the calendar collection.
    pub href: Href,
    /// The display name of the calendar.
    pub display_name: Option<String>,
    /// The description of the calendar.
    pub description: Option<String>,
    /// The color of the calendar, as sent by the server.
    pub color: Option<String>,
    /// Supported component types (VEVENT, VTODO, etc.). Empty when the
    /// server does not restrict them.
    pub supported_components: Vec<String>,
    /// The collection tag (`CTag`) for change detection.
    pub ctag: Option<String>,
    /// The RFC 6578 sync token.
    pub sync_token: Option<String>,
    /// Whether the collection holds components this client works with.
    pub supported: bool,
}

impl CalendarCollection {
    /// Creates a new `CalendarCollection`.
    #[must_use]
    pub const fn new(href: Href) -> Self {
        Self {
            href,
            display_name: None,
            description: None,
            color: None,
            supported_components: Vec::new(),
            ctag: None,
            sync_token: None,
            supported: true,
        }
    }

    /// The best available collection-level change token.
    #[must_use]
    pub fn change_token(&self) -> Option<&str> {
        self.sync_token.as_deref().or(self.ctag.as_deref())
    }

    /// Name to show, falling back to the last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.display_name {
            Some(name) if !name.is_empty() => name,
            _ => self
                .href
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default(),
        }
    }
}

/// Where a user's calendars live on a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPrincipal {
    /// Base URL of the server.
    pub base_url: String,
    /// Principal href, if the server advertised one.
    pub principal: Option<Href>,
    /// Calendar home collection.
    pub calendar_home: Href,
}

/// Last known state of one collection, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncState {
    /// Collection the state belongs to.
    pub collection: Href,
    /// Change token returned by the last sync.
    pub token: Option<String>,
    /// Entity tag of every known object.
    pub etags: BTreeMap<Href, ETag>,
}

impl SyncState {
    /// Creates an empty state for a collection that was never synced.
    #[must_use]
    pub const fn new(collection: Href) -> Self {
        Self {
            collection,
            token: None,
            etags: BTreeMap::new(),
        }
    }
}

/// An object reported as added or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEntry {
    /// Href of the object.
    pub href: Href,
    /// New entity tag, if the server sent one.
    pub etag: Option<ETag>,
}

/// How a sync pass talked to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// The complete object list was fetched and diffed locally.
    Full,
    /// Only the changes since the stored token were fetched.
    Incremental,
}

/// Outcome of one sync pass.
///
/// No href appears in more than one of `added`, `changed` and `removed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    /// Objects unknown to the previous state.
    pub added: Vec<SyncEntry>,
    /// Known objects whose entity tag differs.
    pub changed: Vec<SyncEntry>,
    /// Known objects no longer on the server.
    pub removed: Vec<Href>,
    /// State to persist once the changes are applied.
    pub new_state: SyncState,
    /// Whether the pass was full or incremental.
    pub mode: SyncMode,
}

impl SyncResult {
    /// Whether nothing changed since the previous state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// One entry of an object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Href of the object.
    pub href: Href,
    /// Entity tag, absent for removed objects.
    pub etag: Option<ETag>,
    /// Whether the server reports the object as removed.
    pub deleted: bool,
}

/// A decoded object listing (`sync-collection` report).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectList {
    /// Token identifying the state of the listing.
    pub token: Option<String>,
    /// Listed objects, in server order.
    pub entries: Vec<ObjectEntry>,
    /// Whether the server truncated the listing.
    pub truncated: bool,
}

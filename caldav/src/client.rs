// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CalDAV` client for calendar operations.

use std::sync::Arc;

use calbridge_ical::{CalendarObject, DateTimeValue, Event, EventDraft, EventPatch};
use jiff::civil::{Date, DateTime, Time};

use crate::config::CalDavConfig;
use crate::directory::Directory;
use crate::error::CalDavError;
use crate::executor::{Executor, object_href};
use crate::sync::SyncEngine;
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    CalendarCollection, CalendarResource, Href, ServerPrincipal, SyncResult, SyncState,
};

/// `CalDAV` client for accessing and managing calendars on `CalDAV` servers.
///
/// Cloning is cheap: clones share the transport and hold no mutable state,
/// so they can run operations concurrently.
///
/// # Example
///
/// ```ignore
/// use calbridge_caldav::{CalDavClient, CalDavConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CalDavConfig::basic("https://caldav.example.com/dav/", "user", "pass");
/// let client = CalDavClient::connect(config).await?;
/// for calendar in client.list_calendars().await? {
///     println!("{}", calendar.name());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CalDavClient {
    config: CalDavConfig,
    transport: Arc<dyn Transport>,
    principal: ServerPrincipal,
    directory: Directory,
    sync: SyncEngine,
    executor: Executor,
}

impl CalDavClient {
    /// Creates a client over HTTP, using the configured calendar home
    /// without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Config`] if the base URL is invalid or no
    /// calendar home is configured.
    pub fn new(config: CalDavConfig) -> Result<Self, CalDavError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, transport)
    }

    /// Creates a client over any transport, using the configured calendar
    /// home without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Config`] if no calendar home is configured.
    pub fn with_transport(
        config: CalDavConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CalDavError> {
        if config.calendar_home.is_empty() {
            return Err(CalDavError::Config(
                "calendar_home must be set when discovery is skipped".to_string(),
            ));
        }
        let principal = ServerPrincipal {
            base_url: config.base_url.clone(),
            principal: None,
            calendar_home: Href::from(config.calendar_home.as_str()),
        };
        Ok(Self::assemble(config, transport, principal))
    }

    /// Creates a client over HTTP and discovers the calendar home.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Config`] for an invalid configuration, or the
    /// failure of the discovery requests.
    pub async fn connect(config: CalDavConfig) -> Result<Self, CalDavError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::connect_with(config, transport).await
    }

    /// Creates a client over any transport and discovers the calendar home.
    ///
    /// # Errors
    ///
    /// Returns the failure of the discovery requests.
    pub async fn connect_with(
        config: CalDavConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CalDavError> {
        let directory = Directory::new(transport.clone(), config.include_tasks);
        let principal = directory.discover_principal(&config).await?;
        Ok(Self::assemble(config, transport, principal))
    }

    fn assemble(
        config: CalDavConfig,
        transport: Arc<dyn Transport>,
        principal: ServerPrincipal,
    ) -> Self {
        Self {
            directory: Directory::new(transport.clone(), config.include_tasks),
            sync: SyncEngine::new(transport.clone()),
            executor: Executor::new(transport.clone(), config.include_tasks),
            config,
            transport,
            principal,
        }
    }

    /// The configuration the client was built with.
    #[must_use]
    pub const fn config(&self) -> &CalDavConfig {
        &self.config
    }

    /// Where the user's calendars live.
    #[must_use]
    pub const fn principal(&self) -> &ServerPrincipal {
        &self.principal
    }

    /// The transport requests go through.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    /// Collection discovery and management.
    #[must_use]
    pub const fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Change detection.
    #[must_use]
    pub const fn sync_engine(&self) -> &SyncEngine {
        &self.sync
    }

    /// Conditional object operations.
    #[must_use]
    pub const fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Lists the calendars under the calendar home.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list_calendars(&self) -> Result<Vec<CalendarCollection>, CalDavError> {
        self.directory.discover(&self.principal).await
    }

    /// Reads one calendar.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if there is no calendar at the href.
    pub async fn get_calendar(&self, href: &Href) -> Result<CalendarCollection, CalDavError> {
        self.directory.get_calendar(href).await
    }

    /// Creates a calendar under the calendar home.
    ///
    /// # Errors
    ///
    /// Returns an error if MKCALENDAR fails.
    pub async fn create_calendar(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<CalendarCollection, CalDavError> {
        self.directory
            .create_calendar(&self.principal, name, description)
            .await
    }

    /// Renames a calendar or changes its description, then reads it back.
    ///
    /// # Errors
    ///
    /// Returns an error if PROPPATCH fails.
    pub async fn update_calendar(
        &self,
        href: &Href,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<CalendarCollection, CalDavError> {
        self.directory
            .update_calendar(href, name, description)
            .await?;
        self.directory.get_calendar(href).await
    }

    /// Deletes a calendar.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete_calendar(&self, href: &Href) -> Result<(), CalDavError> {
        self.directory.delete_calendar(href).await
    }

    /// Lists the event occurrences starting within `[start, end)`, sorted by
    /// start.
    ///
    /// Objects whose recurrence data cannot be interpreted are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Config`] for an empty range, or the failure of
    /// the query.
    #[tracing::instrument(skip(self))]
    pub async fn list_events(
        &self,
        calendar: &Href,
        start: DateTime,
        end: DateTime,
    ) -> Result<Vec<EventSummary>, CalDavError> {
        if end <= start {
            return Err(CalDavError::Config(format!(
                "range end {end} is not after start {start}"
            )));
        }

        let mut events = Vec::new();
        for resource in self.executor.query_range(calendar, start, end).await? {
            let occurrences = match resource.object.expand_occurrences(start, end) {
                Ok(occurrences) => occurrences,
                Err(err) => {
                    tracing::warn!(
                        href = %resource.href,
                        %err,
                        "skipping object with malformed recurrence"
                    );
                    continue;
                }
            };
            for occurrence in occurrences {
                let event = occurrence
                    .recurrence_id
                    .as_ref()
                    .filter(|_| occurrence.overridden)
                    .and_then(|rid| resource.object.override_for(rid))
                    .or_else(|| resource.object.master());
                if let Some(event) = event {
                    events.push(EventSummary::occurrence(
                        &event,
                        &occurrence.start,
                        &occurrence.end,
                        occurrence.recurrence_id.as_ref(),
                    ));
                }
            }
        }
        events.sort_by_key(|e| e.sort_key);
        Ok(events)
    }

    /// Lists the event occurrences of one day, from midnight to midnight.
    ///
    /// # Errors
    ///
    /// Returns the failure of the query.
    pub async fn list_day(
        &self,
        calendar: &Href,
        day: Date,
    ) -> Result<Vec<EventSummary>, CalDavError> {
        let start = day.to_datetime(Time::midnight());
        let end = day
            .tomorrow()
            .map_err(|e| CalDavError::Config(e.to_string()))?
            .to_datetime(Time::midnight());
        self.list_events(calendar, start, end).await
    }

    /// Lists today's event occurrences, today being the local date.
    ///
    /// # Errors
    ///
    /// Returns the failure of the query.
    pub async fn list_today(&self, calendar: &Href) -> Result<Vec<EventSummary>, CalDavError> {
        self.list_day(calendar, jiff::Zoned::now().date()).await
    }

    /// Reads the event with the given UID.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if no object has that UID.
    #[tracing::instrument(skip(self))]
    pub async fn get_event(
        &self,
        calendar: &Href,
        uid: &str,
    ) -> Result<CalendarResource, CalDavError> {
        self.executor
            .find_by_uid(calendar, uid)
            .await?
            .ok_or_else(|| CalDavError::NotFound {
                href: object_href(calendar, uid).to_string(),
            })
    }

    /// Creates an event.
    ///
    /// A [`CalDavError::Conflict`] means the UID is taken; build the draft
    /// again without a UID to retry with a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Conflict`] or the failure of the upload.
    #[tracing::instrument(skip(self, draft), fields(summary = %draft.summary))]
    pub async fn create_event(
        &self,
        calendar: &Href,
        draft: EventDraft,
    ) -> Result<CalendarResource, CalDavError> {
        let object = draft.build();
        let (href, etag) = self.executor.create(calendar, &object).await?;
        Ok(CalendarResource::new(href, etag, object))
    }

    /// Applies a patch to the event with the given UID.
    ///
    /// The update is conditional on the entity tag read just before; a
    /// concurrent change surfaces as [`CalDavError::PreconditionFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`], [`CalDavError::PreconditionFailed`]
    /// or the failure of the upload.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_event(
        &self,
        calendar: &Href,
        uid: &str,
        patch: &EventPatch,
    ) -> Result<CalendarResource, CalDavError> {
        let mut resource = self.get_event(calendar, uid).await?;
        patch
            .apply(&mut resource.object)
            .map_err(|err| CalDavError::MalformedObjectBody {
                href: resource.href.to_string(),
                reason: err.to_string(),
            })?;
        resource.etag = self
            .executor
            .update(&resource.href, &resource.etag, &resource.object)
            .await?;
        Ok(resource)
    }

    /// Deletes the event with the given UID.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`], [`CalDavError::PreconditionFailed`]
    /// or the failure of the request.
    #[tracing::instrument(skip(self))]
    pub async fn delete_event(&self, calendar: &Href, uid: &str) -> Result<(), CalDavError> {
        let resource = self.get_event(calendar, uid).await?;
        self.executor.delete(&resource.href, &resource.etag).await
    }

    /// Runs one sync pass over a collection.
    ///
    /// # Errors
    ///
    /// Returns the failure of the sync requests.
    pub async fn sync(
        &self,
        collection: &CalendarCollection,
        state: &SyncState,
    ) -> Result<SyncResult, CalDavError> {
        self.sync.sync(collection, state).await
    }

    /// Syncs several collections concurrently.
    pub async fn sync_many(
        &self,
        jobs: &[(CalendarCollection, SyncState)],
    ) -> Vec<Result<SyncResult, CalDavError>> {
        self.sync.sync_many(jobs).await
    }

    /// Loads the bodies of objects reported by a sync pass.
    ///
    /// # Errors
    ///
    /// Returns the failure of the multiget request.
    pub async fn fetch_objects(
        &self,
        collection: &Href,
        hrefs: &[Href],
    ) -> Result<Vec<CalendarResource>, CalDavError> {
        self.sync.fetch_objects(collection, hrefs).await
    }
}

/// Calendar record handed to tool layers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CalendarSummary {
    /// Last path segment of the collection.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Href of the collection.
    pub url: String,
}

impl From<&CalendarCollection> for CalendarSummary {
    fn from(collection: &CalendarCollection) -> Self {
        let id = collection
            .href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            name: collection.name().to_string(),
            description: collection.description.clone(),
            url: collection.href.to_string(),
        }
    }
}

/// Event record handed to tool layers.
///
/// Times are ISO 8601: `2025-01-10` for all-day values,
/// `2025-01-10T14:00:00Z` for UTC, `2025-01-10T14:00:00[Europe/Berlin]` for
/// zoned values and no suffix for floating ones.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EventSummary {
    /// UID of the event.
    pub id: String,
    /// Summary line.
    pub summary: String,
    /// Start of the occurrence.
    pub start: String,
    /// End of the occurrence, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Instance identifier for occurrences of a recurring event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<String>,
    #[serde(skip)]
    sort_key: Option<DateTime>,
}

impl EventSummary {
    /// Summarizes the master event of an object.
    #[must_use]
    pub fn from_object(object: &CalendarObject) -> Option<Self> {
        let event = object.master()?;
        let start = event.start().ok().flatten();
        let end = event.effective_end().ok().flatten();
        Some(Self {
            id: event.uid().unwrap_or_default().to_string(),
            summary: event.summary().unwrap_or_default(),
            start: start.as_ref().map(iso_time).unwrap_or_default(),
            end: end.as_ref().map(iso_time),
            description: event.description(),
            recurrence_id: None,
            sort_key: start.map(|s| s.wall_clock()),
        })
    }

    fn occurrence(
        event: &Event<'_>,
        start: &DateTimeValue,
        end: &DateTimeValue,
        recurrence_id: Option<&DateTimeValue>,
    ) -> Self {
        Self {
            id: event.uid().unwrap_or_default().to_string(),
            summary: event.summary().unwrap_or_default(),
            start: iso_time(start),
            end: Some(iso_time(end)),
            description: event.description(),
            recurrence_id: recurrence_id.map(ToString::to_string),
            sort_key: Some(start.wall_clock()),
        }
    }
}

fn iso_time(value: &DateTimeValue) -> String {
    match value {
        DateTimeValue::Date(date) => date.to_string(),
        DateTimeValue::Floating(dt) => dt.to_string(),
        DateTimeValue::Utc(dt) => format!("{dt}Z"),
        DateTimeValue::Zoned { datetime, tzid } => format!("{datetime}[{tzid}]"),
    }
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Discovery and management of calendar collections.

use std::sync::Arc;

use uuid::Uuid;

use crate::codec::{DiscoveryScope, decode_discovery_response, encode_discovery_request};
use crate::config::CalDavConfig;
use crate::error::CalDavError;
use crate::request::{MkCalendarRequest, PropPatchRequest};
use crate::response::{MultiStatusResponse, PropertyBag};
use crate::transport::{DavMethod, DavRequest, DavResponse, Transport, exchange, expect_status};
use crate::types::{CalendarCollection, Href, ServerPrincipal};

/// Statuses with which servers refuse a batched Depth 1 metadata PROPFIND.
const BATCH_REJECTED: [u16; 3] = [400, 403, 501];

/// Finds the calendar home and the calendars in it.
#[derive(Debug, Clone)]
pub struct Directory {
    transport: Arc<dyn Transport>,
    include_tasks: bool,
}

impl Directory {
    /// Creates a directory over a transport.
    ///
    /// With `include_tasks`, collections holding only tasks count as
    /// supported.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, include_tasks: bool) -> Self {
        Self {
            transport,
            include_tasks,
        }
    }

    /// Component types this directory works with.
    #[must_use]
    pub fn components(&self) -> &'static [&'static str] {
        if self.include_tasks {
            &["VEVENT", "VTODO"]
        } else {
            &["VEVENT"]
        }
    }

    /// Locates the principal and calendar home of the configured user.
    ///
    /// Looks up `current-user-principal` at the base URL, then
    /// `calendar-home-set` at the principal (or at the base URL when there is
    /// no principal). Falls back to `calendar_home` from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Authorization`] or [`CalDavError::Transport`]
    /// from the lookups, or [`CalDavError::Config`] if no calendar home can
    /// be determined.
    #[tracing::instrument(skip(self, config), fields(base_url = %config.base_url))]
    pub async fn discover_principal(
        &self,
        config: &CalDavConfig,
    ) -> Result<ServerPrincipal, CalDavError> {
        let base_path = config.base_path()?;

        let principal = self
            .lookup_href(&base_path, DiscoveryScope::Principal, "current-user-principal")
            .await?;
        let home_lookup_at = principal.as_ref().map_or(base_path.as_str(), Href::as_str);
        let home = self
            .lookup_href(home_lookup_at, DiscoveryScope::HomeSet, "calendar-home-set")
            .await?;

        let calendar_home = match home {
            Some(home) => home,
            None if !config.calendar_home.is_empty() => {
                tracing::warn!(
                    calendar_home = %config.calendar_home,
                    "server did not advertise a calendar home, using configured one"
                );
                Href::from(config.calendar_home.as_str())
            }
            None => {
                return Err(CalDavError::Config(
                    "server did not advertise a calendar home and none is configured".to_string(),
                ));
            }
        };

        tracing::debug!(?principal, %calendar_home, "discovered principal");
        Ok(ServerPrincipal {
            base_url: config.base_url.clone(),
            principal,
            calendar_home,
        })
    }

    /// Lists the calendar collections under the principal's calendar home.
    ///
    /// Issues one Depth 1 listing and one batched Depth 1 metadata request;
    /// collections the batch misses are refreshed one by one. Collections
    /// without a supported component type are kept with `supported = false`.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Authorization`] or [`CalDavError::Transport`]
    /// if the listing fails.
    #[tracing::instrument(skip(self, principal), fields(home = %principal.calendar_home))]
    pub async fn discover(
        &self,
        principal: &ServerPrincipal,
    ) -> Result<Vec<CalendarCollection>, CalDavError> {
        let home = &principal.calendar_home;
        let listing = self.propfind(home, 1, DiscoveryScope::Collections).await?;
        let listing = expect_status(listing, home, &[207])?;

        let mut collections: Vec<CalendarCollection> = decode_discovery_response(&listing.body)?
            .into_iter()
            .filter(|(href, props)| !href.same_resource(home) && props.is_calendar())
            .map(|(href, props)| {
                let mut collection = CalendarCollection::new(href);
                props.apply_metadata(&mut collection);
                collection
            })
            .collect();
        if collections.is_empty() {
            return Ok(collections);
        }

        let mut found = vec![false; collections.len()];
        let batch = self.propfind(home, 1, DiscoveryScope::Metadata).await?;
        if BATCH_REJECTED.contains(&batch.status) {
            tracing::warn!(
                status = batch.status,
                "batched metadata request rejected, fetching collections one by one"
            );
        } else {
            let batch = expect_status(batch, home, &[207])?;
            for (href, props) in decode_discovery_response(&batch.body)? {
                for (collection, seen) in collections.iter_mut().zip(found.iter_mut()) {
                    if collection.href.same_resource(&href) {
                        props.apply_metadata(collection);
                        *seen = true;
                    }
                }
            }
        }

        for (collection, seen) in collections.iter_mut().zip(found) {
            if !seen {
                tracing::debug!(href = %collection.href, "collection missing from batch, refreshing");
                *collection = self.refresh_metadata(collection).await?;
            }
            collection.supported = self.is_supported(&collection.supported_components);
        }

        tracing::debug!(count = collections.len(), "discovered collections");
        Ok(collections)
    }

    /// Re-reads display name, description, color and change tokens of a
    /// collection.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if the collection is gone, or the
    /// transport failure.
    #[tracing::instrument(skip(self, collection), fields(href = %collection.href))]
    pub async fn refresh_metadata(
        &self,
        collection: &CalendarCollection,
    ) -> Result<CalendarCollection, CalDavError> {
        let props = self.collection_props(&collection.href).await?;
        let mut refreshed = collection.clone();
        props.apply_metadata(&mut refreshed);
        refreshed.supported = self.is_supported(&refreshed.supported_components);
        Ok(refreshed)
    }

    /// Reads a single calendar collection.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if the href is missing or not a
    /// calendar.
    #[tracing::instrument(skip(self))]
    pub async fn get_calendar(&self, href: &Href) -> Result<CalendarCollection, CalDavError> {
        let props = self.collection_props(href).await?;
        if !props.is_calendar() {
            return Err(CalDavError::NotFound {
                href: href.to_string(),
            });
        }
        let mut collection = CalendarCollection::new(href.clone());
        props.apply_metadata(&mut collection);
        collection.supported = self.is_supported(&collection.supported_components);
        Ok(collection)
    }

    /// Creates a calendar under the principal's calendar home, at a fresh
    /// `<uuid>/` path.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Conflict`] if the path is taken, or the status
    /// error the server sent.
    #[tracing::instrument(skip(self, principal, description))]
    pub async fn create_calendar(
        &self,
        principal: &ServerPrincipal,
        name: &str,
        description: Option<&str>,
    ) -> Result<CalendarCollection, CalDavError> {
        let href = principal
            .calendar_home
            .join(&format!("{}/", Uuid::new_v4()));
        let body = MkCalendarRequest::new(name)
            .description(description.map(str::to_string))
            .components(self.components())
            .build();

        let resp = exchange(
            self.transport.as_ref(),
            DavRequest::new(DavMethod::Mkcalendar, href.as_str()).xml(body),
        )
        .await?;
        match resp.status {
            200 | 201 => {}
            405 | 409 => {
                return Err(CalDavError::Conflict {
                    href: href.to_string(),
                });
            }
            status => return Err(CalDavError::from_status(status, &href)),
        }

        tracing::debug!(%href, "created calendar");
        let mut collection = CalendarCollection::new(href);
        collection.display_name = Some(name.to_string());
        collection.description = description.map(str::to_string);
        collection.supported_components = self
            .components()
            .iter()
            .map(|c| (*c).to_string())
            .collect();
        Ok(collection)
    }

    /// Changes the display name and/or description of a calendar.
    ///
    /// `description: Some(None)` removes the description.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if the calendar is gone, or
    /// [`CalDavError::UnexpectedStatus`] if the server refused a property.
    #[tracing::instrument(skip(self, description))]
    pub async fn update_calendar(
        &self,
        href: &Href,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<(), CalDavError> {
        let mut patch = PropPatchRequest::new();
        if let Some(name) = name {
            patch = patch.display_name(name);
        }
        if let Some(description) = description {
            patch = patch.description(description.map(str::to_string));
        }
        if patch.is_empty() {
            return Ok(());
        }

        let resp = exchange(
            self.transport.as_ref(),
            DavRequest::new(DavMethod::Proppatch, href.as_str()).xml(patch.build()),
        )
        .await?;
        let resp = expect_status(resp, href, &[200, 204, 207])?;
        if resp.status == 207 {
            let multistatus = MultiStatusResponse::from_bytes(&resp.body)?;
            let refused = multistatus
                .responses
                .iter()
                .flat_map(|item| &item.prop_stats)
                .find(|ps| !(200..300).contains(&ps.status));
            if let Some(ps) = refused {
                return Err(CalDavError::UnexpectedStatus {
                    status: ps.status,
                    href: href.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Deletes a calendar and everything in it.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if the calendar is gone.
    #[tracing::instrument(skip(self))]
    pub async fn delete_calendar(&self, href: &Href) -> Result<(), CalDavError> {
        let resp = exchange(
            self.transport.as_ref(),
            DavRequest::new(DavMethod::Delete, href.as_str()),
        )
        .await?;
        expect_status(resp, href, &[200, 202, 204])?;
        Ok(())
    }

    fn is_supported(&self, components: &[String]) -> bool {
        components.is_empty()
            || components.iter().any(|c| {
                c.eq_ignore_ascii_case("VEVENT")
                    || (self.include_tasks && c.eq_ignore_ascii_case("VTODO"))
            })
    }

    async fn propfind(
        &self,
        href: &str,
        depth: u8,
        scope: DiscoveryScope,
    ) -> Result<DavResponse, CalDavError> {
        let req = DavRequest::new(DavMethod::Propfind, href)
            .depth(depth)
            .xml(encode_discovery_request(scope));
        exchange(self.transport.as_ref(), req).await
    }

    async fn collection_props(&self, href: &Href) -> Result<PropertyBag, CalDavError> {
        let resp = self.propfind(href, 0, DiscoveryScope::Metadata).await?;
        let resp = expect_status(resp, href, &[207])?;
        let mut entries = decode_discovery_response(&resp.body)?;
        // Depth 0 answers describe the target even if the server spells the href differently
        let position = entries
            .iter()
            .position(|(h, _)| h.same_resource(href))
            .or_else(|| (entries.len() == 1).then_some(0));
        match position {
            Some(i) => Ok(entries.swap_remove(i).1),
            None => Err(CalDavError::NotFound {
                href: href.to_string(),
            }),
        }
    }

    /// Reads an href-valued property with a Depth 0 PROPFIND.
    ///
    /// Statuses meaning "not available here" yield `None`; authorization and
    /// transport failures are returned.
    async fn lookup_href(
        &self,
        path: &str,
        scope: DiscoveryScope,
        prop: &str,
    ) -> Result<Option<Href>, CalDavError> {
        let resp = self.propfind(path, 0, scope).await?;
        match resp.status {
            207 => Ok(decode_discovery_response(&resp.body)?
                .iter()
                .find_map(|(_, props)| props.href(prop))),
            401 | 403 => Err(CalDavError::from_status(resp.status, path)),
            status if status >= 500 => Err(CalDavError::from_status(status, path)),
            status => {
                tracing::warn!(status, path, prop, "property lookup not answered");
                Ok(None)
            }
        }
    }
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Synchronization of a local view with a collection.
//!
//! A collection without a stored token is enumerated completely and diffed
//! against the stored entity tags. With a token, only the changes since that
//! token are requested; if the server rejects the token the engine falls
//! back to a full enumeration.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::future::join_all;

use crate::codec::{
    DiscoveryScope, decode_discovery_response, decode_object_list_response,
    decode_object_resources, encode_discovery_request, encode_object_list_request,
};
use crate::error::CalDavError;
use crate::request::CalendarMultiGetRequest;
use crate::transport::{DavMethod, DavRequest, Transport, exchange, expect_status};
use crate::types::{
    CalendarCollection, CalendarResource, ETag, Href, ObjectEntry, ObjectList, SyncEntry,
    SyncMode, SyncResult, SyncState,
};

/// Outcome of one `sync-collection` exchange sequence.
#[derive(Debug)]
enum Listing {
    Complete(ObjectList),
    TokenRejected,
    Unsupported,
}

/// Computes what changed in a collection since a [`SyncState`].
///
/// The engine only reads from the server; it never mutates remote state or
/// the caller's state.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    transport: Arc<dyn Transport>,
}

impl SyncEngine {
    /// Creates an engine over a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Runs one sync pass.
    ///
    /// # Errors
    ///
    /// Returns the transport, authorization or decoding failure of any
    /// exchange; the caller's state is left as it was.
    #[tracing::instrument(skip(self, collection, state), fields(href = %collection.href))]
    pub async fn sync(
        &self,
        collection: &CalendarCollection,
        state: &SyncState,
    ) -> Result<SyncResult, CalDavError> {
        let fresh;
        let base = if state.collection.is_empty() || state.collection.same_resource(&collection.href)
        {
            state
        } else {
            tracing::warn!(
                state = %state.collection,
                "sync state belongs to another collection, starting over"
            );
            fresh = SyncState::new(collection.href.clone());
            &fresh
        };

        if let Some(token) = base.token.as_deref().filter(|t| !t.is_empty()) {
            match self.list_changes(&collection.href, Some(token)).await? {
                Listing::Complete(list) => {
                    let result = apply_incremental(&collection.href, base, list);
                    tracing::debug!(
                        added = result.added.len(),
                        changed = result.changed.len(),
                        removed = result.removed.len(),
                        "incremental sync done"
                    );
                    return Ok(result);
                }
                Listing::TokenRejected | Listing::Unsupported => {
                    tracing::warn!("sync token rejected, falling back to full enumeration");
                }
            }
        }

        let list = match self.list_changes(&collection.href, None).await? {
            Listing::Complete(list) if list.truncated => {
                tracing::warn!("listing truncated without a continuation token, listing entity tags");
                self.list_etags(collection).await?
            }
            Listing::Complete(list) => list,
            Listing::TokenRejected | Listing::Unsupported => {
                tracing::debug!("sync-collection not supported, listing entity tags");
                self.list_etags(collection).await?
            }
        };
        let result = diff_full(&collection.href, base, list);
        tracing::debug!(
            added = result.added.len(),
            changed = result.changed.len(),
            removed = result.removed.len(),
            "full sync done"
        );
        Ok(result)
    }

    /// Syncs several collections concurrently.
    ///
    /// Results are returned in input order; one failing collection does not
    /// affect the others.
    pub async fn sync_many(
        &self,
        jobs: &[(CalendarCollection, SyncState)],
    ) -> Vec<Result<SyncResult, CalDavError>> {
        join_all(jobs.iter().map(|(collection, state)| self.sync(collection, state))).await
    }

    /// Loads the bodies of objects reported by a sync pass.
    ///
    /// Objects removed in the meantime are skipped.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, or a decoding error if a body is
    /// malformed.
    #[tracing::instrument(skip(self, hrefs), fields(count = hrefs.len()))]
    pub async fn fetch_objects(
        &self,
        collection: &Href,
        hrefs: &[Href],
    ) -> Result<Vec<CalendarResource>, CalDavError> {
        if hrefs.is_empty() {
            return Ok(Vec::new());
        }

        let mut multiget = CalendarMultiGetRequest::new();
        for href in hrefs {
            multiget.add_href(href.to_string());
        }
        let req = DavRequest::new(DavMethod::Report, collection.as_str())
            .depth(1)
            .xml(multiget.build());
        let resp = exchange(self.transport.as_ref(), req).await?;
        let resp = expect_status(resp, collection, &[207])?;
        decode_object_resources(&resp.body)
    }

    /// Runs `sync-collection` from a token, following truncated responses.
    async fn list_changes(
        &self,
        collection: &Href,
        token: Option<&str>,
    ) -> Result<Listing, CalDavError> {
        let mut token = token.map(str::to_string);
        let mut merged = ObjectList::default();
        loop {
            let req = DavRequest::new(DavMethod::Report, collection.as_str())
                .depth(0)
                .xml(encode_object_list_request(token.as_deref()));
            let resp = exchange(self.transport.as_ref(), req).await?;
            match resp.status {
                207 => {}
                403 | 409 if resp.has_precondition("valid-sync-token") => {
                    return Ok(Listing::TokenRejected);
                }
                410 => return Ok(Listing::TokenRejected),
                403 | 405 | 501 if token.is_none() => return Ok(Listing::Unsupported),
                status => return Err(CalDavError::from_status(status, collection)),
            }

            let page = decode_object_list_response(&resp.body)?;
            merged.entries.extend(page.entries);
            let advanced = page.token.is_some() && page.token != token;
            if page.truncated && advanced {
                tracing::debug!("listing truncated, continuing");
                token.clone_from(&page.token);
                merged.token = page.token;
                continue;
            }

            merged.truncated = page.truncated;
            merged.token = page.token.or(token);
            return Ok(Listing::Complete(merged));
        }
    }

    /// Lists entity tags with a Depth 1 PROPFIND, for servers without
    /// `sync-collection`.
    async fn list_etags(&self, collection: &CalendarCollection) -> Result<ObjectList, CalDavError> {
        let req = DavRequest::new(DavMethod::Propfind, collection.href.as_str())
            .depth(1)
            .xml(encode_discovery_request(DiscoveryScope::ObjectTags));
        let resp = exchange(self.transport.as_ref(), req).await?;
        let resp = expect_status(resp, &collection.href, &[207])?;

        let mut list = ObjectList::default();
        for (href, props) in decode_discovery_response(&resp.body)? {
            if href.same_resource(&collection.href) {
                list.token = props
                    .text("sync-token")
                    .or_else(|| props.text("getctag"))
                    .map(str::to_string);
            } else if !props.is_collection() {
                if let Some(etag) = props.etag() {
                    list.entries.push(ObjectEntry {
                        href,
                        etag: Some(etag),
                        deleted: false,
                    });
                }
            }
        }
        if list.token.is_none() {
            list.token = collection.change_token().map(str::to_string);
        }
        Ok(list)
    }
}

/// Diffs a complete listing against the stored entity tags.
///
/// The listing may merge several pages; an href reported deleted on any page
/// is absent from the collection.
fn diff_full(collection: &Href, base: &SyncState, list: ObjectList) -> SyncResult {
    let deleted: BTreeSet<Href> = list
        .entries
        .iter()
        .filter(|e| e.deleted)
        .map(|e| e.href.clone())
        .collect();

    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut remote: BTreeMap<Href, Option<ETag>> = BTreeMap::new();

    for entry in list.entries {
        if entry.deleted
            || deleted.contains(&entry.href)
            || entry.href.same_resource(collection)
            || remote.contains_key(&entry.href)
        {
            continue;
        }
        match (base.etags.get(&entry.href), &entry.etag) {
            (None, _) => added.push(SyncEntry {
                href: entry.href.clone(),
                etag: entry.etag.clone(),
            }),
            (Some(old), Some(new)) if old == new => {}
            (Some(_), _) => changed.push(SyncEntry {
                href: entry.href.clone(),
                etag: entry.etag.clone(),
            }),
        }
        remote.insert(entry.href, entry.etag);
    }

    let removed = base
        .etags
        .keys()
        .filter(|href| !remote.contains_key(*href))
        .cloned()
        .collect();

    SyncResult {
        added,
        changed,
        removed,
        new_state: SyncState {
            collection: collection.clone(),
            token: list.token,
            etags: remote
                .into_iter()
                .filter_map(|(href, etag)| etag.map(|etag| (href, etag)))
                .collect(),
        },
        mode: SyncMode::Full,
    }
}

/// Classifies the changes of an incremental listing.
///
/// An href reported both changed and removed counts as removed. Removals of
/// hrefs the state never knew are dropped.
fn apply_incremental(collection: &Href, base: &SyncState, list: ObjectList) -> SyncResult {
    let deleted: BTreeSet<&Href> = list
        .entries
        .iter()
        .filter(|e| e.deleted)
        .map(|e| &e.href)
        .collect();

    let mut etags = base.etags.clone();
    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut seen = BTreeSet::new();

    for entry in list.entries.iter().filter(|e| !e.deleted) {
        if deleted.contains(&entry.href) || entry.href.same_resource(collection) {
            continue;
        }
        if seen.insert(&entry.href) {
            match (base.etags.get(&entry.href), &entry.etag) {
                (None, _) => added.push(SyncEntry {
                    href: entry.href.clone(),
                    etag: entry.etag.clone(),
                }),
                (Some(old), Some(new)) if old == new => {}
                (Some(_), _) => changed.push(SyncEntry {
                    href: entry.href.clone(),
                    etag: entry.etag.clone(),
                }),
            }
        }
        match &entry.etag {
            Some(etag) => etags.insert(entry.href.clone(), etag.clone()),
            None => etags.remove(&entry.href),
        };
    }

    let removed = deleted
        .into_iter()
        .filter(|href| etags.remove(*href).is_some() || base.etags.contains_key(*href))
        .cloned()
        .collect();

    SyncResult {
        added,
        changed,
        removed,
        new_state: SyncState {
            collection: collection.clone(),
            token: list.token.or_else(|| base.token.clone()),
            etags,
        },
        mode: SyncMode::Incremental,
    }
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Sync engine tests over a scripted transport.

mod common;

use calbridge_caldav::{
    CalDavError, CalendarCollection, DavMethod, DavResponse, ETag, Href, SyncEngine, SyncMode,
    SyncState,
};

use common::{
    ScriptedTransport, document, etag_entry, event_ics, multistatus, object_entry, removed_entry,
};

const CAL: &str = "/cal/work/";

fn collection() -> CalendarCollection {
    let mut collection = CalendarCollection::new(Href::from(CAL));
    collection.ctag = Some("ctag-9".to_string());
    collection
}

fn state(token: &str, etags: &[(&str, &str)]) -> SyncState {
    SyncState {
        collection: Href::from(CAL),
        token: Some(token.to_string()),
        etags: etags
            .iter()
            .map(|(h, e)| (Href::from(*h), ETag::from(*e)))
            .collect(),
    }
}

fn truncated_marker() -> String {
    format!(
        "<d:response><d:href>{CAL}</d:href>\
         <d:status>HTTP/1.1 507 Insufficient Storage</d:status></d:response>"
    )
}

#[tokio::test]
async fn sync_rejected_token_forces_full_enumeration() {
    let transport = ScriptedTransport::new();
    transport
        .expect(
            DavMethod::Report,
            CAL,
            DavResponse::new(
                403,
                r#"<d:error xmlns:d="DAV:"><d:valid-sync-token/></d:error>"#,
            ),
        )
        .expect(
            DavMethod::Report,
            CAL,
            multistatus(&document(
                &[etag_entry("/cal/work/a.ics", "1"), etag_entry("/cal/work/c.ics", "3")],
                Some("fresh"),
            )),
        );
    let engine = SyncEngine::new(transport.clone());
    let base = state("expired", &[("/cal/work/a.ics", "1"), ("/cal/work/b.ics", "2")]);

    let result = engine.sync(&collection(), &base).await.expect("Failed to sync");

    assert_eq!(result.mode, SyncMode::Full);
    assert_eq!(result.added.len(), 1);
    assert_eq!(result.added[0].href.as_str(), "/cal/work/c.ics");
    assert!(result.changed.is_empty());
    assert_eq!(result.removed, [Href::from("/cal/work/b.ics")]);
    assert_eq!(result.new_state.token.as_deref(), Some("fresh"));

    let sent = transport.sent();
    assert!(sent[1].body.as_deref().unwrap().contains("<D:sync-token/>"));
    assert!(transport.is_done());
}

#[tokio::test]
async fn sync_gone_token_forces_full_enumeration() {
    let transport = ScriptedTransport::new();
    transport
        .expect(DavMethod::Report, CAL, DavResponse::new(410, ""))
        .expect(
            DavMethod::Report,
            CAL,
            multistatus(&document(&[], Some("fresh"))),
        );
    let engine = SyncEngine::new(transport.clone());

    let result = engine
        .sync(&collection(), &state("old", &[("/cal/work/a.ics", "1")]))
        .await
        .expect("Failed to sync");
    assert_eq!(result.mode, SyncMode::Full);
    assert_eq!(result.removed, [Href::from("/cal/work/a.ics")]);
    assert!(result.new_state.etags.is_empty());
}

#[tokio::test]
async fn sync_falls_back_to_etag_listing_without_report_support() {
    let transport = ScriptedTransport::new();
    transport
        .expect(DavMethod::Report, CAL, DavResponse::new(501, ""))
        .expect(
            DavMethod::Propfind,
            CAL,
            multistatus(
                r#"<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
<d:response><d:href>/cal/work/</d:href><d:propstat><d:prop>
<d:resourcetype><d:collection/><c:calendar/></d:resourcetype></d:prop>
<d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>
<d:response><d:href>/cal/work/a.ics</d:href><d:propstat><d:prop>
<d:getetag>"1"</d:getetag></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>
</d:multistatus>"#,
            ),
        );
    let engine = SyncEngine::new(transport.clone());

    let result = engine
        .sync(&collection(), &SyncState::new(Href::from(CAL)))
        .await
        .expect("Failed to sync");

    assert_eq!(result.mode, SyncMode::Full);
    assert_eq!(result.added.len(), 1);
    assert_eq!(result.new_state.token.as_deref(), Some("ctag-9"));
    assert_eq!(transport.sent()[1].header_value("Depth"), Some("1"));
}

#[tokio::test]
async fn sync_continues_truncated_listings() {
    let transport = ScriptedTransport::new();
    transport
        .expect(
            DavMethod::Report,
            CAL,
            multistatus(&document(
                &[etag_entry("/cal/work/a.ics", "1"), truncated_marker()],
                Some("page-1"),
            )),
        )
        .expect(
            DavMethod::Report,
            CAL,
            multistatus(&document(&[etag_entry("/cal/work/b.ics", "2")], Some("page-2"))),
        );
    let engine = SyncEngine::new(transport.clone());

    let result = engine
        .sync(&collection(), &SyncState::new(Href::from(CAL)))
        .await
        .expect("Failed to sync");

    assert_eq!(result.added.len(), 2);
    assert_eq!(result.new_state.token.as_deref(), Some("page-2"));
    let sent = transport.sent();
    assert!(
        sent[1]
            .body
            .as_deref()
            .unwrap()
            .contains("<D:sync-token>page-1</D:sync-token>")
    );
}

#[tokio::test]
async fn sync_truncated_listing_without_token_lists_entity_tags() {
    let transport = ScriptedTransport::new();
    transport
        .expect(
            DavMethod::Report,
            CAL,
            multistatus(&document(
                &[etag_entry("/cal/work/a.ics", "1"), truncated_marker()],
                None,
            )),
        )
        .expect(
            DavMethod::Propfind,
            CAL,
            multistatus(&document(
                &[etag_entry("/cal/work/a.ics", "1"), etag_entry("/cal/work/b.ics", "2")],
                None,
            )),
        );
    let engine = SyncEngine::new(transport.clone());
    let base = SyncState {
        token: None,
        ..state("", &[("/cal/work/a.ics", "1"), ("/cal/work/b.ics", "2")])
    };

    let result = engine.sync(&collection(), &base).await.expect("Failed to sync");

    assert_eq!(result.mode, SyncMode::Full);
    assert!(result.added.is_empty());
    assert!(result.changed.is_empty());
    assert!(result.removed.is_empty(), "partial listing must not remove");
    assert_eq!(result.new_state.etags, base.etags);
    assert_eq!(result.new_state.token.as_deref(), Some("ctag-9"));
    assert!(transport.is_done());
}

#[tokio::test]
async fn sync_removal_on_continuation_page_is_reported() {
    let transport = ScriptedTransport::new();
    transport
        .expect(
            DavMethod::Report,
            CAL,
            multistatus(&document(
                &[etag_entry("/cal/work/a.ics", "1"), truncated_marker()],
                Some("p1"),
            )),
        )
        .expect(
            DavMethod::Report,
            CAL,
            multistatus(&document(&[removed_entry("/cal/work/a.ics")], Some("p2"))),
        );
    let engine = SyncEngine::new(transport.clone());
    let base = SyncState {
        token: None,
        ..state("", &[("/cal/work/a.ics", "1")])
    };

    let result = engine.sync(&collection(), &base).await.expect("Failed to sync");

    assert_eq!(result.removed, [Href::from("/cal/work/a.ics")]);
    assert!(result.added.is_empty());
    assert!(result.new_state.etags.is_empty());
    assert_eq!(result.new_state.token.as_deref(), Some("p2"));
}

#[tokio::test]
async fn sync_incremental_removal_and_change() {
    let transport = ScriptedTransport::new();
    transport.expect(
        DavMethod::Report,
        CAL,
        multistatus(&document(
            &[
                etag_entry("/cal/work/a.ics", "1b"),
                removed_entry("/cal/work/a.ics"),
                removed_entry("/cal/work/b.ics"),
                etag_entry("/cal/work/n.ics", "9"),
            ],
            Some("T8"),
        )),
    );
    let engine = SyncEngine::new(transport.clone());
    let base = state("T7", &[("/cal/work/a.ics", "1"), ("/cal/work/b.ics", "2")]);

    let result = engine.sync(&collection(), &base).await.expect("Failed to sync");

    assert_eq!(result.mode, SyncMode::Incremental);
    assert_eq!(result.added.len(), 1);
    assert!(result.changed.is_empty());
    assert_eq!(
        result.removed,
        [Href::from("/cal/work/a.ics"), Href::from("/cal/work/b.ics")]
    );
    assert_eq!(result.new_state, state("T8", &[("/cal/work/n.ics", "9")]));
    assert_eq!(base.token.as_deref(), Some("T7"), "caller state is untouched");
}

#[tokio::test]
async fn sync_state_of_another_collection_starts_over() {
    let transport = ScriptedTransport::new();
    transport.expect(
        DavMethod::Report,
        CAL,
        multistatus(&document(&[etag_entry("/cal/work/a.ics", "1")], Some("T1"))),
    );
    let engine = SyncEngine::new(transport.clone());
    let foreign = SyncState {
        collection: Href::from("/cal/home/"),
        ..state("H5", &[("/cal/home/x.ics", "1")])
    };

    let result = engine.sync(&collection(), &foreign).await.expect("Failed to sync");
    assert_eq!(result.mode, SyncMode::Full);
    assert!(result.removed.is_empty());
    assert_eq!(result.new_state.collection.as_str(), CAL);
}

#[tokio::test]
async fn sync_authorization_failure_is_reported() {
    let transport = ScriptedTransport::new();
    transport.expect(DavMethod::Report, CAL, DavResponse::new(401, ""));
    let engine = SyncEngine::new(transport.clone());

    let err = engine
        .sync(&collection(), &SyncState::new(Href::from(CAL)))
        .await
        .unwrap_err();
    assert!(matches!(err, CalDavError::Authorization { status: 401, .. }));
}

#[tokio::test]
async fn sync_many_keeps_collections_independent() {
    let transport = ScriptedTransport::new();
    transport
        .expect(DavMethod::Report, CAL, DavResponse::new(500, ""))
        .expect(
            DavMethod::Report,
            "/cal/home/",
            multistatus(&document(&[etag_entry("/cal/home/x.ics", "1")], Some("H1"))),
        );
    let engine = SyncEngine::new(transport.clone());
    let home = CalendarCollection::new(Href::from("/cal/home/"));
    let jobs = [
        (collection(), SyncState::new(Href::from(CAL))),
        (home, SyncState::new(Href::from("/cal/home/"))),
    ];

    let results = engine.sync_many(&jobs).await;

    assert_eq!(results.len(), 2);
    assert!(matches!(&results[0], Err(err) if err.is_retryable()));
    let home = results[1].as_ref().expect("second collection must sync");
    assert_eq!(home.new_state.token.as_deref(), Some("H1"));
}

#[tokio::test]
async fn fetch_objects_uses_multiget() {
    let transport = ScriptedTransport::new();
    let ics = event_ics("a", "Alpha", "20250110T090000Z", None);
    transport.expect(
        DavMethod::Report,
        CAL,
        multistatus(&document(
            &[
                object_entry("/cal/work/a.ics", "\"1\"", &ics),
                removed_entry("/cal/work/gone.ics"),
            ],
            None,
        )),
    );
    let engine = SyncEngine::new(transport.clone());

    let resources = engine
        .fetch_objects(
            &Href::from(CAL),
            &[Href::from("/cal/work/a.ics"), Href::from("/cal/work/gone.ics")],
        )
        .await
        .expect("Failed to fetch");

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].object.uid(), Some("a"));
    let body = transport.sent()[0].body.clone().unwrap();
    assert!(body.contains("<C:calendar-multiget"));
    assert!(body.contains("<D:href>/cal/work/gone.ics</D:href>"));

    let none = engine
        .fetch_objects(&Href::from(CAL), &[])
        .await
        .expect("Failed to fetch");
    assert!(none.is_empty());
    assert_eq!(transport.sent().len(), 1);
}

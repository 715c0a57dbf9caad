mod common;

use common::{Harness, Reply, query_value};
use reqwest::Method;
use serde_json::json;
use streamcat::store::HistoryStore;

#[tokio::test]
async fn missing_progress_is_not_an_error() {
    let harness = Harness::signed_in("user");
    harness.transport.on(
        Method::GET,
        "/api/watch-history/content/7",
        Reply::status(404, json!({ "error": "Progress not found" })),
    );
    let store = HistoryStore::new(harness.api.clone());

    let progress = store.fetch_progress(7, Some(70)).await.unwrap();

    assert_eq!(progress, None);
    assert_eq!(store.error(), None);
    assert_eq!(
        query_value(&harness.transport.last_request(), "episodeId"),
        Some("70")
    );
}

#[tokio::test]
async fn saved_progress_is_kept() {
    let harness = Harness::signed_in("user");
    harness.transport.on(
        Method::GET,
        "/api/watch-history/content/7",
        Reply::ok(json!({ "id": 5, "content_id": 7, "watch_progress": 420 })),
    );
    let store = HistoryStore::new(harness.api.clone());

    let progress = store.fetch_progress(7, None).await.unwrap().unwrap();

    assert_eq!(progress.watch_progress, 420);
    assert_eq!(store.state().current_progress.unwrap().id, 5);
    assert!(harness.transport.last_request().query.is_empty());
}

#[tokio::test]
async fn history_page_and_delete() {
    let harness = Harness::signed_in("user");
    harness.transport.on(
        Method::GET,
        "/api/watch-history/user",
        Reply::ok(json!({
            "history": [
                { "id": 1, "content_id": 7, "watch_progress": 60 },
                { "id": 2, "content_id": 8, "watch_progress": 90, "completed_watch": true }
            ],
            "total": 2,
            "page": 1,
            "pageSize": 12
        })),
    );
    harness.transport.on(
        Method::DELETE,
        "/api/watch-history/1",
        Reply::ok(json!({ "message": "Watch history deleted successfully" })),
    );
    let store = HistoryStore::new(harness.api.clone());

    store.fetch_history().await.unwrap();
    let request = harness.transport.last_request();
    assert_eq!(query_value(&request, "page"), Some("1"));
    assert_eq!(query_value(&request, "pageSize"), Some("12"));
    assert_eq!(store.state().entries.len(), 2);

    store.delete_entry(1).await.unwrap();
    let state = store.state();
    assert_eq!(state.entries.len(), 1);
    assert_eq!(state.entries[0].id, 2);
    assert_eq!(state.pagination.total, 1);
}

#[tokio::test]
async fn continue_watching_uses_limit() {
    let harness = Harness::signed_in("user");
    harness.transport.on(
        Method::GET,
        "/api/watch-history/continue-watching",
        Reply::ok(json!([{ "id": 3, "content_id": 9, "watch_progress": 12 }])),
    );
    let store = HistoryStore::new(harness.api.clone());

    store.fetch_continue_watching(5).await.unwrap();

    assert_eq!(store.state().continue_watching[0].content_id, 9);
    assert_eq!(
        query_value(&harness.transport.last_request(), "limit"),
        Some("5")
    );
}

#[tokio::test]
async fn failed_delete_keeps_entries() {
    let harness = Harness::signed_in("user");
    harness.transport.on(
        Method::DELETE,
        "/api/watch-history/4",
        Reply::status(500, json!({ "error": "cannot delete" })),
    );
    let store = HistoryStore::new(harness.api.clone());

    assert!(store.delete_entry(4).await.is_err());
    assert_eq!(store.error().as_deref(), Some("cannot delete"));
}

#[tokio::test]
async fn delete_with_empty_acknowledgement_removes_entry() {
    let harness = Harness::signed_in("user");
    harness.transport.on(
        Method::GET,
        "/api/watch-history/continue-watching",
        Reply::ok(json!([{ "id": 3, "content_id": 9, "watch_progress": 30 }])),
    );
    harness
        .transport
        .on(Method::DELETE, "/api/watch-history/3", Reply::ok(json!(null)));
    let store = HistoryStore::new(harness.api.clone());

    store.fetch_continue_watching(5).await.unwrap();
    assert_eq!(store.state().continue_watching.len(), 1);

    store.delete_entry(3).await.unwrap();
    assert!(store.state().continue_watching.is_empty());
    assert_eq!(store.error(), None);
}

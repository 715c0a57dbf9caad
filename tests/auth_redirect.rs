mod common;

use common::{Harness, Reply};
use reqwest::Method;
use serde_json::json;
use streamcat::{
    storage::{TOKEN_KEY, USER_KEY},
    store::{ContentStore, HistoryStore},
};

#[tokio::test]
async fn unauthorized_clears_storage_and_redirects_once() {
    let harness = Harness::signed_in("admin");
    harness.api.set_default_authorization(Some("t1"));
    harness.transport.on(
        Method::GET,
        "/api/watch-history/user",
        Reply::status(401, json!({ "error": "Invalid token" })),
    );
    let history = HistoryStore::new(harness.api.clone());

    let err = history.fetch_history().await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    assert_eq!(harness.stored(TOKEN_KEY), None);
    assert_eq!(harness.stored(USER_KEY), None);
    assert_eq!(harness.api.default_authorization(), None);
    assert_eq!(harness.login_redirects(), 1);
    assert_eq!(history.error().as_deref(), Some("Invalid token"));
}

#[tokio::test]
async fn forbidden_for_non_admin_ends_session() {
    let harness = Harness::signed_in("user");
    harness.transport.on(
        Method::POST,
        "/api/media/content/3/video",
        Reply::status(403, json!({ "error": "Admin access required" })),
    );
    let store = ContentStore::new(harness.api.clone());

    let result = store
        .upload_video(3, None, streamcat::http::VideoFile::new("a.mp4", vec![1]))
        .await;

    assert!(result.is_err());
    assert_eq!(harness.stored(TOKEN_KEY), None);
    assert_eq!(harness.login_redirects(), 1);
}

#[tokio::test]
async fn forbidden_for_admin_keeps_session() {
    let harness = Harness::signed_in("admin");
    harness.transport.on(
        Method::GET,
        "/api/contents",
        Reply::status(403, json!({ "error": "forbidden" })),
    );
    let store = ContentStore::new(harness.api.clone());

    assert!(store.fetch_contents().await.is_err());
    assert_eq!(harness.stored(TOKEN_KEY).as_deref(), Some("t1"));
    assert_eq!(harness.login_redirects(), 0);
}

#[tokio::test]
async fn forbidden_without_session_redirects() {
    let harness = Harness::new();
    harness.transport.on(
        Method::GET,
        "/api/contents",
        Reply::status(403, json!({})),
    );
    let store = ContentStore::new(harness.api.clone());

    assert!(store.fetch_contents().await.is_err());
    assert_eq!(harness.login_redirects(), 1);
}

#[tokio::test]
async fn other_failures_leave_session_alone() {
    let harness = Harness::signed_in("user");
    harness.transport.on(
        Method::GET,
        "/api/contents",
        Reply::status(500, json!({ "error": "boom" })),
    );
    harness
        .transport
        .on(Method::GET, "/api/contents", Reply::Fail("timed out".into()));
    let store = ContentStore::new(harness.api.clone());

    assert!(store.fetch_contents().await.is_err());
    assert!(store.fetch_contents().await.is_err());
    assert_eq!(harness.stored(TOKEN_KEY).as_deref(), Some("t1"));
    assert_eq!(harness.login_redirects(), 0);
}

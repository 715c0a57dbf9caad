//! Cross-cutting request and response hooks.

use reqwest::{
    StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
use tracing::debug;

use super::transport::{ApiRequest, RequestBody};
use crate::{
    error::ApiError,
    models::User,
    storage::{Storage, TOKEN_KEY, USER_KEY},
    util::log::redact,
};

const JSON: &str = "application/json";

pub fn bearer(token: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ApiError::Validation("Token contains invalid header characters".into()))
}

/// Applies default headers, then the default authorization, then the
/// persisted token. The persisted token wins when both are present.
pub fn decorate_request(
    mut request: ApiRequest,
    default_authorization: Option<&str>,
    storage: &dyn Storage,
) -> Result<ApiRequest, ApiError> {
    request.headers.entry(ACCEPT).or_insert(HeaderValue::from_static(JSON));
    if matches!(request.body, RequestBody::Json(_)) {
        request.headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(JSON));
    }

    if let Some(token) = default_authorization {
        request.headers.insert(AUTHORIZATION, bearer(token)?);
    }

    if let Some(token) = storage.get(TOKEN_KEY)?.filter(|t| !t.is_empty()) {
        debug!(token = %redact(&token), "attaching_bearer_token");
        request.headers.insert(AUTHORIZATION, bearer(&token)?);
    }

    Ok(request)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    /// 403 without a valid admin session.
    ForbiddenLogout,
    /// 401.
    ExpiredLogout,
}

/// Decides whether a failed response must end the persisted session.
pub fn session_verdict(status: Option<StatusCode>, storage: &dyn Storage) -> Verdict {
    match status {
        Some(status) if status == StatusCode::FORBIDDEN && !holds_admin_session(storage) => {
            Verdict::ForbiddenLogout
        }
        Some(status) if status == StatusCode::UNAUTHORIZED => Verdict::ExpiredLogout,
        _ => Verdict::Keep,
    }
}

fn holds_admin_session(storage: &dyn Storage) -> bool {
    let token = storage.get(TOKEN_KEY).ok().flatten();
    let user = storage
        .get(USER_KEY)
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str::<User>(&raw).ok());

    debug!(
        has_token = token.is_some(),
        role = ?user.as_ref().and_then(|u| u.role.clone()),
        "checking_admin_session"
    );

    token.is_some_and(|t| !t.is_empty()) && user.is_some_and(|u| u.is_admin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use reqwest::Method;

    fn admin_storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "t1").unwrap();
        storage.set(USER_KEY, r#"{"id":1,"role":"admin"}"#).unwrap();
        storage
    }

    #[test]
    fn persisted_token_overrides_default_authorization() {
        let storage = admin_storage();
        let request = decorate_request(
            ApiRequest::new(Method::GET, "/api/contents"),
            Some("stale"),
            &storage,
        )
        .unwrap();
        assert_eq!(request.headers[AUTHORIZATION], "Bearer t1");
        assert_eq!(request.headers[ACCEPT], "application/json");
        assert!(request.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn anonymous_request_passes_through() {
        let storage = MemoryStorage::new();
        let request = decorate_request(
            ApiRequest::new(Method::POST, "/api/auth/login").json(serde_json::json!({})),
            None,
            &storage,
        )
        .unwrap();
        assert!(request.headers.get(AUTHORIZATION).is_none());
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn forbidden_keeps_admin_session() {
        let storage = admin_storage();
        assert_eq!(
            session_verdict(Some(StatusCode::FORBIDDEN), &storage),
            Verdict::Keep
        );
    }

    #[test]
    fn forbidden_ends_non_admin_or_broken_session() {
        let storage = admin_storage();
        storage.set(USER_KEY, r#"{"role":"user"}"#).unwrap();
        assert_eq!(
            session_verdict(Some(StatusCode::FORBIDDEN), &storage),
            Verdict::ForbiddenLogout
        );

        storage.set(USER_KEY, "{broken").unwrap();
        assert_eq!(
            session_verdict(Some(StatusCode::FORBIDDEN), &storage),
            Verdict::ForbiddenLogout
        );

        let empty = MemoryStorage::new();
        assert_eq!(
            session_verdict(Some(StatusCode::FORBIDDEN), &empty),
            Verdict::ForbiddenLogout
        );
    }

    #[test]
    fn unauthorized_always_ends_session() {
        let storage = admin_storage();
        assert_eq!(
            session_verdict(Some(StatusCode::UNAUTHORIZED), &storage),
            Verdict::ExpiredLogout
        );
        assert_eq!(
            session_verdict(Some(StatusCode::NOT_FOUND), &storage),
            Verdict::Keep
        );
        assert_eq!(session_verdict(None, &storage), Verdict::Keep);
    }
}

use std::sync::{Arc, RwLock};

use flume::Sender;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{InFlight, read, write};
use crate::{
    error::ApiError,
    event::events::Event,
    http::ApiClient,
    models::{LoginRequest, LoginResponse, RegisterRequest, User},
    storage::{self, Storage, TOKEN_KEY, USER_KEY},
    util::log::redact,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

/// Authentication state: `token` and `user` are always set or cleared
/// together, in memory and in durable storage.
#[derive(Clone)]
pub struct SessionStore {
    api: Arc<ApiClient>,
    state: Arc<RwLock<SessionState>>,
    in_flight: InFlight,
    event_tx: Option<Sender<Event>>,
}

impl SessionStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (token, user) = load_persisted(api.storage());
        Self {
            api,
            state: Arc::new(RwLock::new(SessionState {
                token,
                user,
                ..SessionState::default()
            })),
            in_flight: InFlight::default(),
            event_tx: None,
        }
    }

    pub fn with_events(mut self, event_tx: Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn state(&self) -> SessionState {
        let mut state = read(&self.state).clone();
        state.loading = self.in_flight.is_active();
        state
    }

    pub fn is_authenticated(&self) -> bool {
        read(&self.state).is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        read(&self.state).is_admin()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_active()
    }

    pub fn token(&self) -> Option<String> {
        read(&self.state).token.clone()
    }

    pub fn user(&self) -> Option<User> {
        read(&self.state).user.clone()
    }

    pub fn error(&self) -> Option<String> {
        read(&self.state).error.clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        debug!(email, "login_attempt");

        let result = match self
            .api
            .post_json::<_, LoginResponse>("/api/auth/login", &LoginRequest { email, password })
            .await
        {
            Ok(body) => self.establish(body),
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            error!(status = ?err.status(), response = ?err.body(), "Login error: {err}");
            write(&self.state).error = Some(describe(err, "Login failed"));
        }
        result
    }

    fn establish(&self, body: LoginResponse) -> Result<LoginResponse, ApiError> {
        let (Some(token), Some(user)) = (
            body.token.clone().filter(|t| !t.is_empty()),
            body.user.clone(),
        ) else {
            return Err(ApiError::Format("Invalid response format".into()));
        };

        persist(self.api.storage(), &token, &user)?;
        self.api.set_default_authorization(Some(&token));

        {
            let mut state = write(&self.state);
            state.token = Some(token.clone());
            state.user = Some(user.clone());
        }

        info!(user_id = user.id, token = %redact(&token), "login_successful");
        self.emit(Event::SessionStarted(user));
        Ok(body)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Value, ApiError> {
        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        debug!(username, email, "registration_attempt");

        let result = self
            .api
            .post_json::<_, Value>(
                "/api/auth/register",
                &RegisterRequest {
                    username,
                    email,
                    password,
                },
            )
            .await;

        match &result {
            Ok(body) => info!(response = %body, "registration_complete"),
            Err(err) => {
                error!(status = ?err.status(), response = ?err.body(), "Registration error: {err}");
                write(&self.state).error = Some(describe(err, "Registration failed"));
            }
        }
        result
    }

    /// Ends the session locally. No network call.
    pub fn logout(&self) {
        {
            let mut state = write(&self.state);
            state.token = None;
            state.user = None;
        }
        if let Err(e) = storage::clear_session(self.api.storage()) {
            warn!("Failed to clear persisted session: {e}");
        }
        self.api.set_default_authorization(None);
        info!("logout");
        self.emit(Event::SessionCleared);
    }

    /// Re-reads durable storage, e.g. after a forced logout by the
    /// response hook.
    pub fn reload(&self) {
        let (token, user) = load_persisted(self.api.storage());
        let cleared = token.is_none();
        let was_authenticated = {
            let mut state = write(&self.state);
            let was = state.is_authenticated();
            state.token = token;
            state.user = user;
            was
        };
        if cleared {
            self.api.set_default_authorization(None);
            if was_authenticated {
                self.emit(Event::SessionCleared);
            }
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

/// Prefers the backend's `error` text, then the error itself.
fn describe(err: &ApiError, fallback: &str) -> String {
    err.server_error()
        .map(str::to_string)
        .or_else(|| Some(err.to_string()).filter(|m| !m.is_empty()))
        .unwrap_or_else(|| fallback.to_string())
}

fn persist(storage: &dyn Storage, token: &str, user: &User) -> Result<(), ApiError> {
    let user_json = serde_json::to_string(user)?;
    let result = storage
        .set(TOKEN_KEY, token)
        .and_then(|_| storage.set(USER_KEY, &user_json));
    if let Err(e) = result {
        let _ = storage::clear_session(storage);
        return Err(e.into());
    }
    Ok(())
}

/// Loads the persisted pair. Anything short of a readable token plus a
/// parseable user is treated as no session, and the leftovers are removed.
fn load_persisted(storage: &dyn Storage) -> (Option<String>, Option<User>) {
    let token = match storage.get(TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            warn!("Failed to read persisted token: {e}");
            None
        }
    };
    let user = match storage.get(USER_KEY) {
        Ok(Some(raw)) => serde_json::from_str::<User>(&raw)
            .map_err(|e| error!("Failed to parse user data: {e}"))
            .ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to read persisted user: {e}");
            None
        }
    };

    match (token, user) {
        (Some(token), Some(user)) => (Some(token), Some(user)),
        (None, None) => (None, None),
        _ => {
            warn!("Discarding partial persisted session");
            if let Err(e) = storage::clear_session(storage) {
                warn!("Failed to clear persisted session: {e}");
            }
            (None, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn partial_session_is_discarded() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "t1").unwrap();
        storage.set(USER_KEY, "{not json").unwrap();

        assert_eq!(load_persisted(&storage), (None, None));
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn complete_session_is_restored() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "t1").unwrap();
        storage.set(USER_KEY, r#"{"id":4,"role":"admin"}"#).unwrap();

        let (token, user) = load_persisted(&storage);
        assert_eq!(token.as_deref(), Some("t1"));
        assert!(user.unwrap().is_admin());
    }

    #[test]
    fn describe_prefers_server_error_text() {
        let err = ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: Some(json!({ "error": "invalid credentials" })),
        };
        assert_eq!(describe(&err, "Login failed"), "invalid credentials");

        let err = ApiError::Transport("connection refused".into());
        assert_eq!(describe(&err, "Login failed"), "Network error: connection refused");
    }
}

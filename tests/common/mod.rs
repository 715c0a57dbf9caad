#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use flume::Receiver;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use streamcat::{
    error::ApiError,
    event::events::Event,
    http::{ApiClient, ApiRequest, ApiResponse, Transport},
    navigation::{ChannelNavigator, Route},
    storage::{MemoryStorage, Storage, TOKEN_KEY, USER_KEY},
};
use tokio::sync::Notify;

pub enum Reply {
    Json(StatusCode, Value),
    Fail(String),
    /// Holds the reply back until the gate is opened.
    Gated(Arc<Notify>, Box<Reply>),
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Reply::Json(StatusCode::OK, body)
    }

    pub fn status(status: u16, body: Value) -> Self {
        Reply::Json(StatusCode::from_u16(status).unwrap(), body)
    }
}

/// Scripted transport: replies are queued per method and path and consumed
/// in order. Unscripted requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn on(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.requests().pop().expect("at least one request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let key = (request.method.clone(), request.path.clone());
        self.requests.lock().unwrap().push(request);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        let mut reply = reply.unwrap_or_else(|| {
            Reply::status(404, serde_json::json!({ "error": "no scripted reply" }))
        });
        loop {
            match reply {
                Reply::Json(status, body) => {
                    return Ok(ApiResponse {
                        status,
                        body: serde_json::to_vec(&body).unwrap(),
                    });
                }
                Reply::Fail(message) => return Err(ApiError::Transport(message)),
                Reply::Gated(gate, inner) => {
                    gate.notified().await;
                    reply = *inner;
                }
            }
        }
    }
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryStorage>,
    pub api: Arc<ApiClient>,
    pub events: Receiver<Event>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }

    pub fn with_storage(storage: MemoryStorage) -> Self {
        let transport = Arc::new(MockTransport::default());
        let storage = Arc::new(storage);
        let (event_tx, events) = flume::unbounded();
        let api = Arc::new(ApiClient::with_transport(
            transport.clone(),
            storage.clone(),
            Arc::new(ChannelNavigator::new(event_tx)),
        ));
        Self {
            transport,
            storage,
            api,
            events,
        }
    }

    pub fn signed_in(role: &str) -> Self {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "t1").unwrap();
        storage
            .set(USER_KEY, &format!(r#"{{"id":1,"username":"ana","role":"{role}"}}"#))
            .unwrap();
        Self::with_storage(storage)
    }

    pub fn login_redirects(&self) -> usize {
        self.events
            .try_iter()
            .filter(|e| *e == Event::Navigate(Route::Login))
            .count()
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap()
    }
}

pub fn query_value<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

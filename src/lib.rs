//! Client for a streaming catalog backend.
//!
//! [`http::ApiClient`] carries the shared client configuration: transport,
//! durable session storage, request decoration and the forced-logout
//! handling of 401/403 responses. The stores in [`store`] sit on top of it
//! and mirror server responses into local state.

pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod models;
pub mod navigation;
pub mod storage;
pub mod store;
pub mod util;

pub use config::ClientConfig;
pub use error::{ApiError, StorageError};
pub use http::ApiClient;
pub use store::{ContentStore, HistoryStore, SessionStore};

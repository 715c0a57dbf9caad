pub mod interceptor;
pub mod transport;

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{Instrument, error, info_span, warn};

pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, RequestBody, Transport, VideoFile};

use crate::{
    config::ClientConfig,
    error::ApiError,
    navigation::{Navigator, Route},
    storage::{self, Storage},
};
use interceptor::Verdict;

/// The shared client configuration every store talks through.
///
/// Holds the transport, the durable session storage, the navigator used for
/// forced logouts and the default authorization slot that login/logout
/// manage. Request decoration and failure inspection happen here, once per
/// request, regardless of which store issued it.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    navigator: Arc<dyn Navigator>,
    default_authorization: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::with_transport(transport, storage, navigator))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            storage,
            navigator,
            default_authorization: RwLock::new(None),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn default_authorization(&self) -> Option<String> {
        self.default_authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_default_authorization(&self, token: Option<&str>) {
        *self
            .default_authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token.map(str::to_string);
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let span = info_span!("request", id = %request.id, method = %method, path = %path);

        let default_authorization = self.default_authorization();
        let request = interceptor::decorate_request(
            request,
            default_authorization.as_deref(),
            self.storage(),
        )?;

        let result = match self.transport.send(request).instrument(span.clone()).await {
            Ok(response) if response.status.is_success() => Ok(response),
            Ok(response) => Err(ApiError::Status {
                status: response.status,
                body: response.json_value(),
            }),
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            let _entered = span.enter();
            self.inspect_failure(err, &method, &path);
        }
        result
    }

    fn inspect_failure(&self, err: &ApiError, method: &Method, path: &str) {
        error!(
            method = %method,
            path,
            status = ?err.status().map(|s| s.as_u16()),
            response = ?err.body(),
            "request_failed: {err}"
        );

        match interceptor::session_verdict(err.status(), self.storage()) {
            Verdict::Keep => {}
            Verdict::ForbiddenLogout => {
                warn!("Invalid admin access, redirecting to login");
                self.force_logout();
            }
            Verdict::ExpiredLogout => {
                warn!("Token expired, redirecting to login");
                self.force_logout();
            }
        }
    }

    fn force_logout(&self) {
        if let Err(e) = storage::clear_session(self.storage()) {
            warn!("Failed to clear persisted session: {e}");
        }
        self.set_default_authorization(None);
        self.navigator.navigate(Route::Login);
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(&str, String)>,
    ) -> Result<T, ApiError> {
        self.execute(ApiRequest::new(Method::GET, path).query(query))
            .await?
            .json()
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::new(Method::POST, path).json(body))
            .await?
            .json()
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(ApiRequest::new(Method::DELETE, path))
            .await?
            .json()
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        file: VideoFile,
    ) -> Result<T, ApiError> {
        self.execute(ApiRequest::new(Method::POST, path).multipart(field, file))
            .await?
            .json()
    }
}

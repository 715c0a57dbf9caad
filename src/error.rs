use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Storage data is corrupt: {0}")]
    Corrupt(String),

    #[error("Credential store error: {0}")]
    Credential(String),
}

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request failed with status code {}", .status.as_u16())]
    Status { status: StatusCode, body: Option<Value> },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Format(String),

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// The backend's `error` field, if the failure carried one.
    pub fn server_error(&self) -> Option<&str> {
        self.body_field("error")
    }

    /// The backend's `message` field, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        self.body_field("message")
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    fn body_field(&self, key: &str) -> Option<&str> {
        self.body()?
            .get(key)?
            .as_str()
            .filter(|text| !text.is_empty())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Corrupt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_error_prefers_error_field() {
        let err = ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: Some(json!({ "error": "invalid credentials", "message": "nope" })),
        };
        assert_eq!(err.server_error(), Some("invalid credentials"));
        assert_eq!(err.server_message(), Some("nope"));
    }

    #[test]
    fn empty_or_missing_fields_are_none() {
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Some(json!({ "error": "" })),
        };
        assert_eq!(err.server_error(), None);
        assert_eq!(err.server_message(), None);

        let err = ApiError::Transport("connection refused".into());
        assert_eq!(err.server_error(), None);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn status_display_mentions_code() {
        let err = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            body: None,
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Request failed with status code 404");
    }
}

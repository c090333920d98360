//! error.rs: API error type and the uniform `{ success: false, message }` envelope.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures a handler can surface. `Store` carries the internal cause, which
/// is logged but never sent to the caller.
#[derive(Debug)]
pub enum ApiError {
    InvalidQuery(String),
    NotFound(String),
    Unauthorized,
    Store(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::InvalidQuery(m) | ApiError::NotFound(m) => m.clone(),
            ApiError::Unauthorized => "Not authorized, missing user identity".to_string(),
            ApiError::Store(_) => "Server error".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidQuery(m) => write!(f, "invalid query: {m}"),
            ApiError::NotFound(m) => write!(f, "not found: {m}"),
            ApiError::Unauthorized => write!(f, "unauthorized"),
            ApiError::Store(e) => write!(f, "store fault: {e:#}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Store(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.public_message(),
        }));
        (self.status(), body).into_response()
    }
}

/// Error with the endpoint-specific message the caller sees on a 500.
#[derive(Debug)]
pub struct EndpointError {
    pub message: &'static str,
    pub inner: ApiError,
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let message = match &self.inner {
            ApiError::Store(_) => self.message.to_string(),
            other => other.public_message(),
        };
        let body = Json(json!({ "success": false, "message": message }));
        (self.inner.status(), body).into_response()
    }
}

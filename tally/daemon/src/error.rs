//! HTTP error mapping
//!
//! Every handler error becomes a JSON body `{"error": "<message>"}` with a
//! status derived from the variant. Store failures keep the store's message
//! behind a `Failed to <context>:` prefix.

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tally_core::StoreError;
use thiserror::Error;
use tracing::{debug, error};

/// Errors returned by route handlers
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body or path could not be parsed
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No such record
    #[error("Not Found")]
    NotFound,

    /// Unknown `action` on the users form
    #[error("Failed to perform action: Invalid action")]
    InvalidAction,

    /// The user store refused or failed
    #[error("Failed to {context}: {source}")]
    Store {
        /// What the handler was doing
        context: &'static str,
        /// Store failure
        #[source]
        source: StoreError,
    },
}

impl AppError {
    /// Wrap a store failure with the handler's context
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { context, source }
    }

    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_) | Self::InvalidAction => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store { source, .. } => match source {
                StoreError::Validation { .. } => StatusCode::BAD_REQUEST,
                StoreError::Conflict(_) => StatusCode::CONFLICT,
                StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedPayload(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        Self::MalformedPayload(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::MalformedPayload(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

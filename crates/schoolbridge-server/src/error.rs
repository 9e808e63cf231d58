//! HTTP error mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use schoolbridge_core::error::BridgeError;
use schoolbridge_db::DbError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;

/// Every error a handler can return.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Bridge(e) => match e {
                BridgeError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation"),
                BridgeError::InvalidState { .. } => (StatusCode::BAD_REQUEST, "invalid_state"),
                BridgeError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
                BridgeError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                BridgeError::AuthenticationRequired { .. } => {
                    (StatusCode::UNAUTHORIZED, "authentication_required")
                }
                BridgeError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
                BridgeError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal")
                }
            },
            ApiError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "malformed_payload"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorBody {
                error: kind,
                message,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedPayload(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::MalformedPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedPayload(rejection.body_text())
    }
}

/// Failures while bringing the server up.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Invalid session key: {0}")]
    SessionKey(#[from] jsonwebtoken::errors::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

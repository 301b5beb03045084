//! Maps failures to HTTP responses with a `{"error", "detail"}` JSON body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::reports::{ReportError, ScriptError};
use crate::user::RegistrationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Report(ReportError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Report(ReportError::Script(ScriptError::Timeout { .. })) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Report(ReportError::Script(ScriptError::Busy(_))) => StatusCode::CONFLICT,
            ApiError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Report(ReportError::Config(_)) => "ConfigError",
            ApiError::Report(ReportError::Script(err)) => err.kind().as_str(),
            ApiError::Report(ReportError::Aborted(_)) => "Aborted",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Unauthenticated => "Unauthenticated",
            ApiError::InvalidCredentials => "InvalidCredentials",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self {
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.kind(),
            detail,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::EmptyField => ApiError::BadRequest(err.to_string()),
            RegistrationError::HandleTaken(_) => ApiError::Conflict(err.to_string()),
            RegistrationError::Store(err) => ApiError::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

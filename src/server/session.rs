use super::error::ApiError;
use super::state::ServerState;
use crate::user::auth::AuthTokenValue;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: usize,
    pub user_handle: String,
    pub token: String,
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

#[derive(Debug)]
pub enum SessionExtractionError {
    Unauthenticated,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::Unauthenticated => ApiError::Unauthenticated.into_response(),
            SessionExtractionError::InternalError => {
                ApiError::Internal(anyhow::anyhow!("Session lookup failed")).into_response()
            }
        }
    }
}

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(HEADER_SESSION_TOKEN_KEY)?;
    let raw = String::from_utf8_lossy(value.as_bytes());
    let value = raw.strip_prefix("Bearer ").unwrap_or(&raw).trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn extract_session_from_request_parts(
    parts: &Parts,
    ctx: &ServerState,
) -> Result<Option<Session>, SessionExtractionError> {
    let token = match extract_session_token_from_cookies(parts)
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return Ok(None);
        }
        Some(x) => x,
    };

    let auth_token = match ctx.user_manager.get_auth_token(&AuthTokenValue(token)) {
        Ok(Some(token)) => token,
        Ok(None) => {
            debug!("Auth token not found or expired");
            return Ok(None);
        }
        Err(err) => {
            error!("Failed to get auth token from database: {:#}", err);
            return Err(SessionExtractionError::InternalError);
        }
    };

    let user_handle = match ctx.user_manager.get_user_handle(auth_token.user_id) {
        Ok(Some(handle)) => handle,
        Ok(None) => {
            debug!("Auth token of unknown user_id={}", auth_token.user_id);
            return Ok(None);
        }
        Err(err) => {
            error!("Failed to get user handle: {:#}", err);
            return Err(SessionExtractionError::InternalError);
        }
    };
    debug!("Session of user {}", user_handle);

    Ok(Some(Session {
        user_id: auth_token.user_id,
        user_handle,
        token: auth_token.value.0,
    }))
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)?
            .ok_or(SessionExtractionError::Unauthenticated)
    }
}

impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
    }
}

//! Registration, login and logout.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::ApiError;
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::user::AuthTokenValue;

pub const LOGIN_PAGE: &str = "/static/login.html";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Not Debug, it carries a plain password.
#[derive(Deserialize)]
pub struct CredentialsBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub msg: &'static str,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub msg: &'static str,
    pub token: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn register(
    State(state): State<ServerState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    if !state.config.allow_registration {
        return Err(ApiError::Forbidden("Registration is disabled".to_string()));
    }
    let Json(body) = body?;
    let username = body.username.trim();
    state.user_manager.register(username, &body.password)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            msg: "User created",
            username: username.to_string(),
        }),
    )
        .into_response())
}

async fn token(
    State(user_manager): State<GuardedUserManager>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let username = body.username.trim();
    let auth_token = match user_manager.login(username, &body.password)? {
        Some(auth_token) => auth_token,
        None => {
            warn!("Failed login attempt for user {}", username);
            return Err(ApiError::InvalidCredentials);
        }
    };
    info!("User {} logged in", username);

    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, auth_token.value.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(TokenResponse {
            msg: "Login successful",
            token: auth_token.value.0,
        }),
    )
        .into_response())
}

/// Always ends on the login page, with or without a live session.
async fn logout(State(user_manager): State<GuardedUserManager>, session: Option<Session>) -> Response {
    if let Some(session) = session {
        match user_manager.delete_auth_token(session.user_id, &AuthTokenValue(session.token)) {
            Ok(()) => info!("User {} logged out", session.user_handle),
            Err(err) => warn!("Could not delete auth token on logout: {:#}", err),
        }
    }

    let expired = Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build();

    (
        [(header::SET_COOKIE, expired.to_string())],
        Redirect::to(LOGIN_PAGE),
    )
        .into_response()
}

// =============================================================================
// Router Construction
// =============================================================================

pub fn auth_routes() -> Router<ServerState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/token", post(token))
        .route("/logout", get(logout))
}

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::info;

use super::{
    auth_routes::{auth_routes, LOGIN_PAGE},
    error::ApiError,
    log_requests,
    report_routes::report_routes,
    session::Session,
    state::ServerState,
    telemetry_routes::telemetry_routes,
    ServerConfig,
};
use crate::dashboard::DashboardView;
use crate::reports::ReportService;
use crate::user::UserManager;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn get_status(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    })
}

fn assemble_dashboard(state: &ServerState, session: &Session) -> Result<DashboardView, ApiError> {
    Ok(DashboardView::assemble(
        state.reports.catalog(),
        &state.config.hostname,
        &session.user_handle,
    )?)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> Result<Response, ApiError> {
    let session = match session {
        Some(session) => session,
        None => return Ok(Redirect::to(LOGIN_PAGE).into_response()),
    };

    match &state.config.static_dir {
        Some(static_dir) => {
            let index = Path::new(static_dir).join("index.html");
            match tokio::fs::read_to_string(&index).await {
                Ok(page) => Ok(Html(page).into_response()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    Err(ApiError::NotFound(format!("{:?} not found", index)))
                }
                Err(err) => Err(err.into()),
            }
        }
        None => Ok(Json(assemble_dashboard(&state, &session)?).into_response()),
    }
}

async fn get_dashboard(
    session: Session,
    State(state): State<ServerState>,
) -> Result<Json<DashboardView>, ApiError> {
    Ok(Json(assemble_dashboard(&state, &session)?))
}

pub fn make_app(
    config: ServerConfig,
    user_manager: Arc<UserManager>,
    reports: Arc<ReportService>,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), user_manager, reports);

    let mut app: Router = Router::new()
        .route("/", get(home))
        .route("/api/status", get(get_status))
        .route("/api/dashboard", get(get_dashboard))
        .merge(auth_routes())
        .merge(report_routes())
        .merge(telemetry_routes())
        .with_state(state.clone());

    if let Some(static_dir) = &config.static_dir {
        if !Path::new(static_dir).is_dir() {
            anyhow::bail!("Static directory {} does not exist", static_dir);
        }
        app = app.nest_service("/static", ServeDir::new(static_dir));
    }

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

pub async fn run_server(
    config: ServerConfig,
    user_manager: Arc<UserManager>,
    reports: Arc<ReportService>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, user_manager, reports)?;

    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Could not bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

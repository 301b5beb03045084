//! Host metrics polled by the dashboard widgets.

use axum::{extract::State, routing::get, Json, Router};
use tracing::error;

use super::error::ApiError;
use super::state::ServerState;
use super::ServerConfig;
use crate::telemetry::{self, DiskIoRate, MountUsage, NetworkIoRate, SystemStats};

async fn get_system_stats(State(config): State<ServerConfig>) -> Json<SystemStats> {
    Json(telemetry::system_stats(config.telemetry.cpu_sample).await)
}

async fn get_mount_usage() -> Result<Json<Vec<MountUsage>>, ApiError> {
    let mounts = tokio::task::spawn_blocking(telemetry::mount_usage)
        .await
        .map_err(|err| ApiError::Internal(err.into()))?;
    Ok(Json(mounts))
}

async fn get_disk_io_rate(State(config): State<ServerConfig>) -> Result<Json<DiskIoRate>, ApiError> {
    match telemetry::disk_io_rate(config.telemetry.io_window).await {
        Ok(rate) => Ok(Json(rate)),
        Err(err) => {
            error!("Could not sample disk counters: {:#}", err);
            Err(ApiError::Internal(err))
        }
    }
}

async fn get_network_io_rate(State(config): State<ServerConfig>) -> Json<NetworkIoRate> {
    Json(telemetry::network_io_rate(config.telemetry.io_window).await)
}

pub fn telemetry_routes() -> Router<ServerState> {
    Router::new()
        .route("/api/system-stats", get(get_system_stats))
        .route("/api/mount-usage", get(get_mount_usage))
        .route("/api/disk-io-rate", get(get_disk_io_rate))
        .route("/api/network-io-rate", get(get_network_io_rate))
}

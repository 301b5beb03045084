//! Report generation, lookup and download.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::str::FromStr;
use tracing::{debug, info};

use super::error::ApiError;
use super::session::Session;
use super::state::{GuardedReportService, ServerState};
use crate::reports::{ReportRecord, ReportType};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

enum Disposition {
    Attachment,
    Inline,
}

async fn run_report(
    session: Session,
    reports: GuardedReportService,
    report_type: ReportType,
) -> Result<Json<ReportRecord>, ApiError> {
    info!("{} requested a {} report", session.user_handle, report_type);
    let record = reports.run(report_type).await?;
    Ok(Json(record))
}

async fn get_reports(
    _session: Session,
    State(reports): State<GuardedReportService>,
) -> Result<Json<BTreeMap<ReportType, Option<ReportRecord>>>, ApiError> {
    Ok(Json(reports.catalog().latest_all()?))
}

async fn get_report(
    _session: Session,
    State(reports): State<GuardedReportService>,
    Path(id): Path<String>,
) -> Result<Json<ReportRecord>, ApiError> {
    let report_type = ReportType::from_str(&id)
        .map_err(|_| ApiError::NotFound(format!("Unknown report type {}", id)))?;
    match reports.latest(report_type)? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(format!(
            "No {} report has been generated yet",
            report_type
        ))),
    }
}

async fn serve_report_file(
    reports: &GuardedReportService,
    name: &str,
    disposition: Disposition,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound(format!("Report {} not found", name));
    let path = reports.catalog().report_path(name).ok_or_else(|| {
        debug!("Rejected report name {:?}", name);
        not_found()
    })?;

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(err) => return Err(err.into()),
    };
    if !metadata.is_file() {
        return Err(not_found());
    }
    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(err) => return Err(err.into()),
    };

    let disposition = match disposition {
        Disposition::Attachment => {
            format!("attachment; filename=\"{}\"", name.replace('"', "\\\""))
        }
        Disposition::Inline => "inline".to_string(),
    };
    Ok((
        [
            (header::CONTENT_TYPE, HTML_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

async fn download_report(
    _session: Session,
    State(reports): State<GuardedReportService>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    serve_report_file(&reports, &name, Disposition::Attachment).await
}

async fn view_report(
    _session: Session,
    State(reports): State<GuardedReportService>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    serve_report_file(&reports, &name, Disposition::Inline).await
}

pub fn run_report_route(report_type: ReportType) -> String {
    format!("/api/run-{}-report", report_type.id())
}

pub fn report_routes() -> Router<ServerState> {
    let mut router = Router::new()
        .route("/api/reports", get(get_reports))
        .route("/api/reports/{id}", get(get_report))
        .route("/download-report/{name}", get(download_report))
        .route("/report/{name}", get(view_report));

    for report_type in ReportType::ALL {
        router = router.route(
            &run_report_route(report_type),
            post(
                move |session: Session, State(reports): State<GuardedReportService>| async move {
                    run_report(session, reports, report_type).await
                },
            ),
        );
    }
    router
}

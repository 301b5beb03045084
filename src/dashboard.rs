//! The data behind the dashboard page.
//!
//! Assembling the view only reads the report directory, telemetry is polled
//! separately by the page.

use serde::Serialize;

use crate::reports::{ReportCatalog, ReportRecord, ReportType, StrategyKind};

#[derive(Debug, Clone, Serialize)]
pub struct ReportTile {
    pub id: ReportType,
    pub label: &'static str,
    pub strategy: StrategyKind,
    pub latest: Option<ReportRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub hostname: String,
    pub user: String,
    pub reports: Vec<ReportTile>,
}

impl DashboardView {
    pub fn assemble(
        catalog: &ReportCatalog,
        hostname: &str,
        user: &str,
    ) -> std::io::Result<DashboardView> {
        let reports = catalog
            .latest_all()?
            .into_iter()
            .map(|(report_type, latest)| ReportTile {
                id: report_type,
                label: report_type.label(),
                strategy: report_type.strategy().kind(),
                latest,
            })
            .collect();

        Ok(DashboardView {
            hostname: hostname.to_string(),
            user: user.to_string(),
            reports,
        })
    }
}

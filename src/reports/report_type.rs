use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the catalog finds the output of a report type in the report directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStrategy {
    /// The script always (over)writes the same file.
    Fixed { filename: &'static str },
    /// Legacy scripts write timestamped files sharing a prefix, the most
    /// recently modified one is the latest report.
    Prefix {
        prefix: &'static str,
        suffix: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Fixed,
    Prefix,
}

impl ReportStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ReportStrategy::Fixed { .. } => StrategyKind::Fixed,
            ReportStrategy::Prefix { .. } => StrategyKind::Prefix,
        }
    }

    /// Whether `filename` is a file this strategy would pick up.
    pub fn matches(&self, filename: &str) -> bool {
        match self {
            ReportStrategy::Fixed { filename: expected } => filename == *expected,
            ReportStrategy::Prefix { prefix, suffix } => {
                filename.len() >= prefix.len() + suffix.len()
                    && filename.starts_with(*prefix)
                    && filename.ends_with(*suffix)
            }
        }
    }
}

const HTML_SUFFIX: &str = ".html";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    Tablespace,
    InvalidObjects,
    ConcurrentManagers,
    WorkflowMailer,
    TopSegments,
    ConcurrentHistory,
    DatabaseBackup,
    MountMonitor,
    AdPreclone,
    DailyHealthCheck,
    OracleHomeBackup,
}

impl ReportType {
    pub const ALL: [ReportType; 11] = [
        ReportType::Tablespace,
        ReportType::InvalidObjects,
        ReportType::ConcurrentManagers,
        ReportType::WorkflowMailer,
        ReportType::TopSegments,
        ReportType::ConcurrentHistory,
        ReportType::DatabaseBackup,
        ReportType::MountMonitor,
        ReportType::AdPreclone,
        ReportType::DailyHealthCheck,
        ReportType::OracleHomeBackup,
    ];

    /// The kebab-case identifier used in routes and JSON payloads.
    pub fn id(&self) -> &'static str {
        match self {
            ReportType::Tablespace => "tablespace",
            ReportType::InvalidObjects => "invalid-objects",
            ReportType::ConcurrentManagers => "concurrent-managers",
            ReportType::WorkflowMailer => "workflow-mailer",
            ReportType::TopSegments => "top-segments",
            ReportType::ConcurrentHistory => "concurrent-history",
            ReportType::DatabaseBackup => "database-backup",
            ReportType::MountMonitor => "mount-monitor",
            ReportType::AdPreclone => "ad-preclone",
            ReportType::DailyHealthCheck => "daily-health-check",
            ReportType::OracleHomeBackup => "oracle-home-backup",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportType::Tablespace => "Tablespace Usage",
            ReportType::InvalidObjects => "Invalid Objects",
            ReportType::ConcurrentManagers => "Concurrent Managers",
            ReportType::WorkflowMailer => "Workflow Mailer",
            ReportType::TopSegments => "Top Segments",
            ReportType::ConcurrentHistory => "Concurrent Request History",
            ReportType::DatabaseBackup => "Database Backup",
            ReportType::MountMonitor => "OS Mount Monitor",
            ReportType::AdPreclone => "AD Preclone Report",
            ReportType::DailyHealthCheck => "Daily Health Check",
            ReportType::OracleHomeBackup => "Oracle Home Backup",
        }
    }

    pub fn strategy(&self) -> ReportStrategy {
        let fixed = |filename: &'static str| ReportStrategy::Fixed { filename };
        let prefix = |prefix: &'static str| ReportStrategy::Prefix {
            prefix,
            suffix: HTML_SUFFIX,
        };
        match self {
            ReportType::Tablespace => fixed("tablespace_report.html"),
            ReportType::InvalidObjects => fixed("invalid_objects_report.html"),
            ReportType::ConcurrentManagers => fixed("concurrent_managers_report.html"),
            ReportType::WorkflowMailer => fixed("workflow_mailer_report.html"),
            ReportType::TopSegments => fixed("top_segments_report.html"),
            ReportType::ConcurrentHistory => fixed("concurrent_history_report.html"),
            ReportType::DatabaseBackup => fixed("database_backup_report.html"),
            ReportType::MountMonitor => prefix("mount_report_"),
            ReportType::AdPreclone => prefix("adpreclone_"),
            ReportType::DailyHealthCheck => prefix("Daily_health_check_"),
            ReportType::OracleHomeBackup => prefix("Oracle_Home_Backup_"),
        }
    }

    /// File name of the generating script, relative to the scripts directory.
    pub fn script_name(&self) -> &'static str {
        match self {
            ReportType::Tablespace => "tablespace_report.sh",
            ReportType::InvalidObjects => "invalid_objects_report.sh",
            ReportType::ConcurrentManagers => "concurrent_managers_report.sh",
            ReportType::WorkflowMailer => "workflow_mailer_report.sh",
            ReportType::TopSegments => "top_segments_report.sh",
            ReportType::ConcurrentHistory => "concurrent_history_report.sh",
            ReportType::DatabaseBackup => "database_backup_report.sh",
            ReportType::MountMonitor => "mount_report.sh",
            ReportType::AdPreclone => "adpreclone_report.sh",
            ReportType::DailyHealthCheck => "daily_health_check.sh",
            ReportType::OracleHomeBackup => "oracle_home_backup.sh",
        }
    }

    /// Scripts that talk to the database receive `instance_id username password`
    /// before the output directory, the others only get the output directory.
    pub fn requires_credentials(&self) -> bool {
        !matches!(
            self,
            ReportType::MountMonitor | ReportType::AdPreclone | ReportType::OracleHomeBackup
        )
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ReportType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match ReportType::ALL.iter().find(|t| t.id() == s) {
            Some(report_type) => Ok(*report_type),
            None => bail!("Unknown report type {}", s),
        }
    }
}

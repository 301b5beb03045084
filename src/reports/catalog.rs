use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::report_type::{ReportStrategy, StrategyKind};
use super::ReportType;

const LAST_MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn serialize_last_modified<S: Serializer>(value: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_last_modified(*value))
}

pub fn format_last_modified(value: SystemTime) -> String {
    DateTime::<Local>::from(value)
        .format(LAST_MODIFIED_FORMAT)
        .to_string()
}

/// A report file found on disk. Derived on every query, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    pub report_type: ReportType,
    pub filename: String,
    #[serde(serialize_with = "serialize_last_modified")]
    pub last_modified: SystemTime,
}

/// Answers "which is the latest report of type X" by looking at the report
/// directory. Nothing is cached, scripts write this directory behind our back.
#[derive(Debug, Clone)]
pub struct ReportCatalog {
    report_dir: PathBuf,
}

impl ReportCatalog {
    pub fn new<P: Into<PathBuf>>(report_dir: P) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Resolves a report name to a path inside the report directory.
    /// Returns None for anything that is not a plain file name.
    pub fn report_path(&self, filename: &str) -> Option<PathBuf> {
        if !is_plain_filename(filename) {
            return None;
        }
        Some(self.report_dir.join(filename))
    }

    pub fn latest(&self, report_type: ReportType) -> std::io::Result<Option<ReportRecord>> {
        match report_type.strategy() {
            ReportStrategy::Fixed { filename } => self.record_for(report_type, filename),
            ReportStrategy::Prefix { .. } => self.latest_by_prefix(report_type),
        }
    }

    pub fn latest_all(&self) -> std::io::Result<BTreeMap<ReportType, Option<ReportRecord>>> {
        self.latest_where(|_| true)
    }

    /// The fixed-name and the legacy tables can be queried on their own.
    pub fn latest_by_strategy(
        &self,
        kind: StrategyKind,
    ) -> std::io::Result<BTreeMap<ReportType, Option<ReportRecord>>> {
        self.latest_where(|t| t.strategy().kind() == kind)
    }

    fn latest_where<F: Fn(&ReportType) -> bool>(
        &self,
        filter: F,
    ) -> std::io::Result<BTreeMap<ReportType, Option<ReportRecord>>> {
        let mut latest = BTreeMap::new();
        for report_type in ReportType::ALL.into_iter().filter(|t| filter(t)) {
            latest.insert(report_type, self.latest(report_type)?);
        }
        Ok(latest)
    }

    /// Looks up a single file, None if it does not exist.
    pub fn record_for(
        &self,
        report_type: ReportType,
        filename: &str,
    ) -> std::io::Result<Option<ReportRecord>> {
        let path = match self.report_path(filename) {
            Some(path) => path,
            None => return Ok(None),
        };
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        if !metadata.is_file() {
            return Ok(None);
        }
        Ok(Some(ReportRecord {
            report_type,
            filename: filename.to_string(),
            last_modified: metadata.modified()?,
        }))
    }

    fn latest_by_prefix(&self, report_type: ReportType) -> std::io::Result<Option<ReportRecord>> {
        let strategy = report_type.strategy();
        let mut best: Option<ReportRecord> = None;

        for entry in std::fs::read_dir(&self.report_dir)? {
            let entry = entry?;
            let filename = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !strategy.matches(&filename) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                // Removed between listing and stat.
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            if !metadata.is_file() {
                continue;
            }
            let candidate = ReportRecord {
                report_type,
                filename,
                last_modified: metadata.modified()?,
            };
            // Newest wins, ties go to the greatest filename so the answer is
            // stable regardless of directory order.
            let is_better = match &best {
                None => true,
                Some(current) => {
                    (candidate.last_modified, &candidate.filename)
                        > (current.last_modified, &current.filename)
                }
            };
            if is_better {
                best = Some(candidate);
            }
        }

        Ok(best)
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

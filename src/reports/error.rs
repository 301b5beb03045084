//! Error taxonomy of the report subsystem.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::ReportType;

/// Credential or instance resolution failures. Never transient, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read credential file {path:?}: {reason}")]
    CredentialFileUnreadable { path: PathBuf, reason: String },

    #[error("No credential section for instance {instance}")]
    MissingSection { instance: String },

    #[error("Missing or empty system_password for instance {instance}")]
    MissingPassword { instance: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptErrorKind {
    ExecutionFailed,
    NoOutputFilename,
    OutputMissing,
    Timeout,
    SpawnFailed,
    Busy,
    Io,
}

impl ScriptErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptErrorKind::ExecutionFailed => "ExecutionFailed",
            ScriptErrorKind::NoOutputFilename => "NoOutputFilename",
            ScriptErrorKind::OutputMissing => "OutputMissing",
            ScriptErrorKind::Timeout => "Timeout",
            ScriptErrorKind::SpawnFailed => "SpawnFailed",
            ScriptErrorKind::Busy => "Busy",
            ScriptErrorKind::Io => "Io",
        }
    }
}

/// Violations of the report script contract.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script exited with {exit_code:?}: {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Script succeeded but did not print the generated filename")]
    NoOutputFilename,

    #[error("Report file {filename} not found in the report directory")]
    OutputMissing { filename: String },

    #[error("Script did not complete within {limit:?}")]
    Timeout { limit: Duration },

    #[error("Could not start script {script:?}: {reason}")]
    SpawnFailed { script: PathBuf, reason: String },

    #[error("A {0} report is already being generated")]
    Busy(ReportType),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    pub fn kind(&self) -> ScriptErrorKind {
        match self {
            ScriptError::ExecutionFailed { .. } => ScriptErrorKind::ExecutionFailed,
            ScriptError::NoOutputFilename => ScriptErrorKind::NoOutputFilename,
            ScriptError::OutputMissing { .. } => ScriptErrorKind::OutputMissing,
            ScriptError::Timeout { .. } => ScriptErrorKind::Timeout,
            ScriptError::SpawnFailed { .. } => ScriptErrorKind::SpawnFailed,
            ScriptError::Busy(_) => ScriptErrorKind::Busy,
            ScriptError::Io(_) => ScriptErrorKind::Io,
        }
    }
}

/// Anything that can go wrong while producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("Report task aborted: {0}")]
    Aborted(String),
}

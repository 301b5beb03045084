mod file_config;

pub use file_config::{AuthConfig, CredentialsConfig, FileConfig, ReportsConfig, TelemetryConfig};

use crate::reports::{CredentialSettings, ReportSettings};
use crate::server::RequestsLoggingLevel;
use crate::telemetry::TelemetrySettings;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub static_dir: Option<String>,
    pub report_dir: Option<PathBuf>,
    pub scripts_dir: Option<PathBuf>,
    pub credentials_file: Option<PathBuf>,
    pub interpreter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub static_dir: Option<String>,
    /// Overrides the hostname shown on the dashboard.
    pub hostname: Option<String>,

    // Feature configs (with defaults)
    pub reports: ReportSettings,
    pub credentials: CredentialSettings,
    pub telemetry: TelemetrySettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub session_ttl: Duration,
    pub allow_registration: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(60 * 60),
            allow_registration: true,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = match file.logging_level {
            Some(level) => match parse_logging_level(&level) {
                Some(level) => level,
                None => bail!("Invalid logging_level in config file: {}", level),
            },
            None => cli.logging_level.clone(),
        };

        let static_dir = file.static_dir.or_else(|| cli.static_dir.clone());
        let hostname = file.hostname.filter(|h| !h.trim().is_empty());

        let reports_file = file.reports.unwrap_or_default();
        let report_defaults = ReportSettings::default();
        let reports = ReportSettings {
            report_dir: reports_file
                .report_dir
                .map(PathBuf::from)
                .or_else(|| cli.report_dir.clone())
                .unwrap_or(report_defaults.report_dir),
            scripts_dir: reports_file
                .scripts_dir
                .map(PathBuf::from)
                .or_else(|| cli.scripts_dir.clone())
                .unwrap_or(report_defaults.scripts_dir),
            interpreter: reports_file
                .interpreter
                .or_else(|| cli.interpreter.clone())
                .filter(|i| !i.trim().is_empty()),
            timeout: match reports_file.timeout_sec {
                Some(0) => bail!("[reports] timeout_sec must be greater than zero"),
                Some(secs) => Some(Duration::from_secs(secs)),
                None => None,
            },
        };

        let credentials_file = file.credentials.unwrap_or_default();
        let credential_defaults = CredentialSettings::default();
        let credentials = CredentialSettings {
            file: credentials_file
                .file
                .map(PathBuf::from)
                .or_else(|| cli.credentials_file.clone())
                .unwrap_or(credential_defaults.file),
            instance_env_var: credentials_file
                .instance_env_var
                .unwrap_or(credential_defaults.instance_env_var),
            oratab_path: credentials_file
                .oratab_path
                .map(PathBuf::from)
                .unwrap_or(credential_defaults.oratab_path),
            default_instance: credentials_file
                .default_instance
                .unwrap_or(credential_defaults.default_instance),
            default_user: credentials_file
                .default_user
                .unwrap_or(credential_defaults.default_user),
        };

        let telemetry_file = file.telemetry.unwrap_or_default();
        let telemetry_defaults = TelemetrySettings::default();
        let telemetry = TelemetrySettings {
            cpu_sample: telemetry_file
                .cpu_sample_ms
                .map(Duration::from_millis)
                .unwrap_or(telemetry_defaults.cpu_sample),
            io_window: match telemetry_file.io_window_ms {
                Some(0) => bail!("[telemetry] io_window_ms must be greater than zero"),
                Some(ms) => Duration::from_millis(ms),
                None => telemetry_defaults.io_window,
            },
        };

        let auth_file = file.auth.unwrap_or_default();
        let auth_defaults = AuthSettings::default();
        let auth = AuthSettings {
            session_ttl: auth_file
                .session_ttl_minutes
                .map(|minutes| Duration::from_secs(minutes * 60))
                .unwrap_or(auth_defaults.session_ttl),
            allow_registration: auth_file
                .allow_registration
                .unwrap_or(auth_defaults.allow_registration),
        };

        Ok(Self {
            db_dir,
            port,
            logging_level,
            static_dir,
            hostname,
            reports,
            credentials,
            telemetry,
            auth,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

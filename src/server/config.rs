use super::RequestsLoggingLevel;
use crate::config::AppConfig;
use crate::telemetry::{self, TelemetrySettings};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Served under `/static` when set, `index.html` is the dashboard page.
    pub static_dir: Option<String>,
    /// Shown on the dashboard.
    pub hostname: String,
    pub telemetry: TelemetrySettings,
    pub allow_registration: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 8000,
            static_dir: None,
            hostname: telemetry::host_name(),
            telemetry: TelemetrySettings::default(),
            allow_registration: true,
        }
    }
}

impl From<&AppConfig> for ServerConfig {
    fn from(config: &AppConfig) -> Self {
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            static_dir: config.static_dir.clone(),
            hostname: config
                .hostname
                .clone()
                .unwrap_or_else(telemetry::host_name),
            telemetry: config.telemetry.clone(),
            allow_registration: config.auth.allow_registration,
        }
    }
}

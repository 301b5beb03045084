use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub static_dir: Option<String>,
    pub hostname: Option<String>,

    // Feature configs
    pub reports: Option<ReportsConfig>,
    pub credentials: Option<CredentialsConfig>,
    pub telemetry: Option<TelemetryConfig>,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ReportsConfig {
    pub report_dir: Option<String>,
    pub scripts_dir: Option<String>,
    /// e.g. "sh" or "/bin/bash"
    pub interpreter: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CredentialsConfig {
    pub file: Option<String>,
    pub instance_env_var: Option<String>,
    pub oratab_path: Option<String>,
    pub default_instance: Option<String>,
    pub default_user: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub cpu_sample_ms: Option<u64>,
    pub io_window_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_minutes: Option<u64>,
    pub allow_registration: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ops_dashboard::config;
use ops_dashboard::reports::{CredentialResolver, ReportService};
use ops_dashboard::server::{run_server, RequestsLoggingLevel, ServerConfig};
use ops_dashboard::user::{SqliteUserStore, UserManager};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the user database (user.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Directory served under /static, its index.html is the dashboard page.
    #[clap(long)]
    pub static_dir: Option<String>,

    /// Where the report scripts write their HTML output.
    #[clap(long, value_parser = parse_path)]
    pub report_dir: Option<PathBuf>,

    /// Directory containing the report scripts.
    #[clap(long, value_parser = parse_path)]
    pub scripts_dir: Option<PathBuf>,

    /// INI file with one section of database credentials per instance.
    #[clap(long, value_parser = parse_path)]
    pub credentials_file: Option<PathBuf>,

    /// Program used to run the report scripts, e.g. `sh`.
    #[clap(long)]
    pub interpreter: Option<String>,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            static_dir: args.static_dir.clone(),
            report_dir: args.report_dir.clone(),
            scripts_dir: args.scripts_dir.clone(),
            credentials_file: args.credentials_file.clone(),
            interpreter: args.interpreter.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Could not initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // TOML overrides CLI
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  report_dir: {:?}", app_config.reports.report_dir);
    info!("  scripts_dir: {:?}", app_config.reports.scripts_dir);
    info!("  credentials: {:?}", app_config.credentials.file);

    std::fs::create_dir_all(&app_config.reports.report_dir).with_context(|| {
        format!(
            "Could not create report directory {:?}",
            app_config.reports.report_dir
        )
    })?;

    info!("Opening user database at {:?}", app_config.user_db_path());
    let user_store = SqliteUserStore::new(app_config.user_db_path())?;
    let user_manager = Arc::new(UserManager::new(
        Box::new(user_store),
        app_config.auth.session_ttl,
    ));

    let reports = Arc::new(ReportService::new(
        app_config.reports.clone(),
        CredentialResolver::new(app_config.credentials.clone()),
    ));

    let server_config = ServerConfig::from(&app_config);
    info!(
        "Ready to serve {} at port {}!",
        server_config.hostname, server_config.port
    );
    run_server(server_config, user_manager, reports).await
}

//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own user database, report
//! directory and scripts.

use super::constants::*;
use super::fixtures::{create_test_environment, write_script, TestEnvironment};
use ops_dashboard::reports::{
    CredentialResolver, CredentialSettings, ReportService, ReportSettings, ReportType,
};
use ops_dashboard::server::{make_app, RequestsLoggingLevel, ServerConfig};
use ops_dashboard::telemetry::TelemetrySettings;
use ops_dashboard::user::{SqliteUserStore, UserManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Knobs for the few tests that need a non-default server.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub allow_registration: bool,
    pub serve_static: bool,
    pub script_timeout: Option<Duration>,
    pub session_ttl: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            allow_registration: true,
            serve_static: false,
            script_timeout: None,
            session_ttl: Duration::from_secs(3600),
        }
    }
}

/// Test server instance with isolated state
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Where the scripts write their reports
    pub report_dir: PathBuf,

    /// Where the scripts live, tests may overwrite them
    pub scripts_dir: PathBuf,

    // Keeps the temp dir alive until drop
    _env: TestEnvironment,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl TestServer {
    /// Spawns a new test server on a random port
    pub async fn spawn() -> Self {
        Self::spawn_with(ServerOptions::default()).await
    }

    /// Spawns a server with the given options
    ///
    /// # Panics
    ///
    /// Panics if the environment cannot be created, the port cannot be bound
    /// or the server doesn't become ready within timeout.
    pub async fn spawn_with(options: ServerOptions) -> Self {
        let env = create_test_environment().expect("Failed to create test environment");

        let user_store = SqliteUserStore::new(&env.db_path).expect("Failed to open user store");
        let user_manager = Arc::new(UserManager::new(Box::new(user_store), options.session_ttl));

        let reports = Arc::new(ReportService::new(
            ReportSettings {
                report_dir: env.report_dir.clone(),
                scripts_dir: env.scripts_dir.clone(),
                interpreter: Some("sh".to_string()),
                timeout: options.script_timeout,
            },
            CredentialResolver::new(CredentialSettings {
                file: env.credentials_file.clone(),
                instance_env_var: UNSET_INSTANCE_ENV_VAR.to_string(),
                oratab_path: env.oratab_path.clone(),
                ..CredentialSettings::default()
            }),
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            static_dir: options
                .serve_static
                .then(|| env.static_dir.to_string_lossy().to_string()),
            hostname: "test-host".to_string(),
            telemetry: TelemetrySettings {
                cpu_sample: Duration::from_millis(TEST_SAMPLE_WINDOW_MS),
                io_window: Duration::from_millis(TEST_SAMPLE_WINDOW_MS),
            },
            allow_registration: options.allow_registration,
        };

        let app = make_app(config, user_manager, reports).expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            report_dir: env.report_dir.clone(),
            scripts_dir: env.scripts_dir.clone(),
            _env: env,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Replaces the script of a report type
    pub fn set_script(&self, report_type: ReportType, body: &str) {
        write_script(&self.scripts_dir, report_type, body).expect("Failed to write script");
    }

    /// Drops a file in the report directory as if a script had produced it
    pub fn put_report(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.report_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write report");
        path
    }

    /// Waits for the server to become ready by polling /api/status
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/api/status", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for all dashboard endpoints.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Redirects are not followed so tests can check where they point.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in as the test user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(TEST_USER, TEST_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap_or_else(|err| panic!("GET {} failed: {}", path, err))
    }

    async fn post(&self, path: &str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap_or_else(|err| panic!("POST {} failed: {}", path, err))
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /api/token
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/api/token", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// POST /api/register
    pub async fn register(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/api/register", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Register request failed")
    }

    /// GET /logout
    pub async fn logout(&self) -> Response {
        self.get("/logout").await
    }

    // ========================================================================
    // Dashboard Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    /// GET /api/dashboard
    pub async fn get_dashboard(&self) -> Response {
        self.get("/api/dashboard").await
    }

    /// GET /api/status
    pub async fn get_status(&self) -> Response {
        self.get("/api/status").await
    }

    /// GET /static/{path}
    pub async fn get_static(&self, path: &str) -> Response {
        self.get(&format!("/static/{}", path)).await
    }

    // ========================================================================
    // Report Endpoints
    // ========================================================================

    /// POST /api/run-{id}-report
    pub async fn run_report(&self, id: &str) -> Response {
        self.post(&format!("/api/run-{}-report", id)).await
    }

    /// GET /api/reports
    pub async fn get_reports(&self) -> Response {
        self.get("/api/reports").await
    }

    /// GET /api/reports/{id}
    pub async fn get_report(&self, id: &str) -> Response {
        self.get(&format!("/api/reports/{}", id)).await
    }

    /// GET /download-report/{name}
    pub async fn download_report(&self, name: &str) -> Response {
        self.get(&format!("/download-report/{}", name)).await
    }

    /// GET /report/{name}
    pub async fn view_report(&self, name: &str) -> Response {
        self.get(&format!("/report/{}", name)).await
    }

    // ========================================================================
    // Telemetry Endpoints
    // ========================================================================

    /// GET /api/system-stats
    pub async fn get_system_stats(&self) -> Response {
        self.get("/api/system-stats").await
    }

    /// GET /api/mount-usage
    pub async fn get_mount_usage(&self) -> Response {
        self.get("/api/mount-usage").await
    }

    /// GET /api/disk-io-rate
    pub async fn get_disk_io_rate(&self) -> Response {
        self.get("/api/disk-io-rate").await
    }

    /// GET /api/network-io-rate
    pub async fn get_network_io_rate(&self) -> Response {
        self.get("/api/network-io-rate").await
    }
}

//! Shared constants for end-to-end tests
#![allow(dead_code)]

// ============================================================================
// Test User Credentials
// ============================================================================

/// Registered in every test database
pub const TEST_USER: &str = "testuser";

pub const TEST_PASS: &str = "testpass123";

// ============================================================================
// Database Credentials
// ============================================================================

/// Instance written to the test oratab
pub const TEST_INSTANCE: &str = "TESTDB";

pub const TEST_DB_USER: &str = "scott";

pub const TEST_DB_PASSWORD: &str = "tiger";

/// Never set, so the instance comes from the test oratab
pub const UNSET_INSTANCE_ENV_VAR: &str = "OPS_DASHBOARD_E2E_SID_NEVER_SET";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Telemetry sampling windows are shortened to keep tests fast (milliseconds)
pub const TEST_SAMPLE_WINDOW_MS: u64 = 100;

/// Served as /static/index.html when static files are enabled
pub const TEST_INDEX_HTML: &str = "<html><body>ops dashboard test page</body></html>";

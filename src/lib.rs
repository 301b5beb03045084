//! Operations dashboard server library.
//!
//! Exposes the internal modules for the binaries and the end-to-end tests.

pub mod config;
pub mod dashboard;
pub mod reports;
pub mod server;
pub mod sqlite_persistence;
pub mod telemetry;
pub mod user;

pub use reports::{ReportCatalog, ReportRecord, ReportService, ReportType};
pub use server::{run_server, RequestsLoggingLevel};
pub use user::{SqliteUserStore, UserManager, UserStore};

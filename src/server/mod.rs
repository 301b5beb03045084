mod auth_routes;
pub mod config;
mod error;
mod http_layers;
mod report_routes;
#[allow(clippy::module_inception)]
pub mod server;
pub mod session;
pub mod state;
mod telemetry_routes;

pub use auth_routes::LOGIN_PAGE;
pub use config::ServerConfig;
pub use error::ApiError;
pub use http_layers::*;
pub use report_routes::run_report_route;
pub use server::{make_app, run_server};

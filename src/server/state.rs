use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::reports::ReportService;
use crate::user::UserManager;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedReportService = Arc<ReportService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub reports: GuardedReportService,
    pub hash: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        user_manager: GuardedUserManager,
        reports: GuardedReportService,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            user_manager,
            reports,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedReportService {
    fn from_ref(input: &ServerState) -> Self {
        input.reports.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

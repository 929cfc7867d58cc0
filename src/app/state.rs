//! Application state wiring

use std::sync::Arc;

use crate::config::Config;
use crate::net::server::SessionRegistry;
use crate::policy::PolicyInstaller;
use crate::sim::SimHandle;

/// Shared application state. Explicit service objects, constructed once and
/// passed into the server and every session; no globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Non-owning handle onto the simulation loop
    pub sim: SimHandle,
    pub installer: Arc<PolicyInstaller>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config, sim: SimHandle) -> Self {
        let config = Arc::new(config);
        let installer = Arc::new(PolicyInstaller::new(config.policy_dir.clone()));
        let sessions = Arc::new(SessionRegistry::new());

        Self {
            config,
            sim,
            installer,
            sessions,
        }
    }
}

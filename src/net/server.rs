//! Training server accept loop and session registry

use std::net::SocketAddr;

use dashmap::DashMap;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::net::handler::handle_socket;
use crate::util::time::unix_millis;

/// Live training session metadata
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub peer: SocketAddr,
    pub connected_at: u64,
}

/// Registry of all active training sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn register(&self, id: Uuid, peer: SocketAddr) {
        self.sessions.insert(
            id,
            SessionInfo {
                peer,
                connected_at: unix_millis(),
            },
        );
    }

    pub fn unregister(&self, id: Uuid) {
        self.sessions.remove(&id);
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The TCP training server. The host process controls lifecycle via
/// [`TrainingServer::start`] and [`ServerHandle::stop`].
pub struct TrainingServer {
    state: AppState,
}

impl TrainingServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Bind the configured address and spawn the accept loop
    pub async fn start(&self) -> std::io::Result<ServerHandle> {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let state = self.state.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            let session_state = state.clone();
                            tokio::spawn(handle_socket(stream, peer, session_state));
                        }
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                        }
                    },
                    _ = shutdown_rx.changed() => {
                        info!("Training server accept loop stopping");
                        break;
                    }
                }
            }
        });

        info!(addr = %local_addr, "Training server listening");
        Ok(ServerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

/// Handle to a running training server
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound address (useful when the configured port was 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    /// Established sessions wind down when their clients disconnect.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

//! Per-connection training session
//!
//! Each connection gets its own episode controller and an outbound writer
//! task. Step traffic is strictly lock-step through the simulation handoff;
//! policy installs run on independent tasks and push their acks through the
//! same writer without blocking steps.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::episode::{EpisodeController, StepError};
use crate::net::codec::{write_line, LineReader};
use crate::net::protocol::{ClientMsg, ServerMsg};

/// Handle one training client connection until EOF, I/O error, or a fatal
/// contract violation
pub async fn handle_socket(stream: TcpStream, peer: SocketAddr, state: AppState) {
    let session_id = Uuid::new_v4();
    state.sessions.register(session_id, peer);
    info!(session_id = %session_id, peer = %peer, "Training client connected");

    // Lock-step request/response: latency matters more than throughput
    if let Err(e) = stream.set_nodelay(true) {
        debug!(session_id = %session_id, error = %e, "Failed to set TCP_NODELAY");
    }

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = LineReader::new(read_half);

    // Outbound queue: session replies and install acks funnel through one
    // writer task so framed messages never interleave
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMsg>(32);
    let writer_session_id = session_id;
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = write_line(&mut write_half, &msg).await {
                debug!(session_id = %writer_session_id, error = %e, "Send failed");
                break;
            }
        }
    });

    run_session(session_id, &mut reader, &out_tx, &state).await;

    state.sessions.unregister(session_id);
    info!(session_id = %session_id, "Training client disconnected");

    // In-flight install tasks hold their own sender clones; the writer task
    // drains their acks (or fails to deliver them) and exits on its own once
    // every sender is gone
    drop(out_tx);
    let _ = writer;
}

async fn run_session(
    session_id: Uuid,
    reader: &mut LineReader<tokio::net::tcp::OwnedReadHalf>,
    out_tx: &mpsc::Sender<ServerMsg>,
    state: &AppState,
) {
    let mut controller = EpisodeController::new(state.sim.clone(), state.config.step_cap);

    // The initial reset observation goes out before any client byte is read
    match controller.reset().await {
        Ok(msg) => {
            if out_tx.send(msg).await.is_err() {
                return;
            }
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Simulation unavailable at connect");
            return;
        }
    }

    loop {
        let line = match reader.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(session_id = %session_id, "Client closed the connection");
                return;
            }
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "Receive failed");
                return;
            }
        };

        let msg = match serde_json::from_slice::<ClientMsg>(&line) {
            Ok(msg) => msg,
            Err(e) => {
                // Protocol error: dropped silently, connection stays open
                debug!(session_id = %session_id, error = %e, "Dropping undecodable line");
                continue;
            }
        };

        match msg {
            ClientMsg::Step { a } => match controller.step(&a).await {
                Ok(outcome) => {
                    if out_tx.send(outcome.reply).await.is_err() {
                        return;
                    }
                    // Terminal tick: the fresh reset observation follows on
                    // the same connection before the next client request
                    if let Some(reset_msg) = outcome.reset_reply {
                        if out_tx.send(reset_msg).await.is_err() {
                            return;
                        }
                    }
                }
                Err(StepError::BadArity(n)) => {
                    debug!(session_id = %session_id, arity = n, "Dropping malformed action");
                }
                Err(StepError::NonFiniteAction(value)) => {
                    // Client-contract violation: a corrupted training client,
                    // not a recoverable runtime condition
                    error!(
                        session_id = %session_id,
                        value,
                        "Non-finite action component; closing connection"
                    );
                    return;
                }
                Err(StepError::SimGone(e)) => {
                    warn!(session_id = %session_id, error = %e, "Simulation torn down");
                    return;
                }
            },

            ClientMsg::SavePolicy { name, data_b64, .. } => {
                // Installs never block concurrent step traffic and never run
                // on the simulation context
                let installer = state.installer.clone();
                let ack_tx = out_tx.clone();
                tokio::spawn(async move {
                    let ack = run_install(&installer, name, data_b64).await;
                    // Ack is undeliverable if the connection already closed
                    let _ = ack_tx.send(ack).await;
                });
            }
        }
    }
}

async fn run_install(
    installer: &crate::policy::PolicyInstaller,
    name: Option<String>,
    data_b64: Option<String>,
) -> ServerMsg {
    let name = name.unwrap_or_else(|| "policy".to_string());
    let Some(data_b64) = data_b64 else {
        return ServerMsg::PolicyAck {
            ok: false,
            saved_path: None,
            error: Some("missing data_b64".to_string()),
        };
    };

    match installer.install_b64(&data_b64, &name).await {
        Ok(path) => ServerMsg::PolicyAck {
            ok: true,
            saved_path: Some(path.display().to_string()),
            error: None,
        },
        Err(e) => {
            warn!(name = %name, error = %e, "Policy install failed");
            ServerMsg::PolicyAck {
                ok: false,
                saved_path: None,
                error: Some(e.to_string()),
            }
        }
    }
}

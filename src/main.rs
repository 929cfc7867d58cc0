//! Car RL Server - training bridge entry point
//!
//! Starts the simulation loop with the default arena world and the TCP
//! training server, then runs until a shutdown signal arrives.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use car_rl_server::app::AppState;
use car_rl_server::config::Config;
use car_rl_server::net::TrainingServer;
use car_rl_server::sim::arena::{ArenaConfig, ArenaWorld};
use car_rl_server::sim::SimLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Car Combat Training Bridge");
    info!("Server address: {}", config.bind_addr);
    info!("Policy directory: {}", config.policy_dir.display());

    // Spawn the simulation loop that exclusively owns the world
    let world = ArenaWorld::new(ArenaConfig {
        seed: config.arena_seed,
        ..ArenaConfig::default()
    });
    let (sim, _sim_task) = SimLoop::spawn(Box::new(world));

    // Create application state and start the server
    let state = AppState::new(config, sim);
    let server = TrainingServer::new(state);
    let handle = server.start().await?;

    info!("Training endpoint: tcp://{}", handle.local_addr());

    shutdown_signal().await;
    handle.stop().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}

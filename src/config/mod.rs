//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address (default port 5556; a legacy deployment used 5555,
    /// so the port is always configuration, never a constant in code paths)
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Maximum steps per episode before a forced reset
    pub step_cap: u32,
    /// Root directory for published policy bundles
    pub policy_dir: PathBuf,
    /// Seed for the deterministic arena world
    pub arena_seed: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PORT overrides the full address, matching container platforms
        let bind_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("TRAINER_ADDR").unwrap_or_else(|_| "0.0.0.0:5556".to_string())
        };

        Ok(Self {
            bind_addr: bind_addr.parse().map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            step_cap: env::var("STEP_CAP")
                .unwrap_or_else(|_| "2048".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("STEP_CAP"))?,

            policy_dir: env::var("POLICY_DIR")
                .unwrap_or_else(|_| "Policies".to_string())
                .into(),

            arena_seed: env::var("ARENA_SEED")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("ARENA_SEED"))?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_training_port() {
        // Serialize env access: tests in this module share process env vars
        std::env::remove_var("PORT");
        std::env::remove_var("TRAINER_ADDR");
        std::env::remove_var("STEP_CAP");
        std::env::remove_var("POLICY_DIR");
        std::env::remove_var("ARENA_SEED");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr.port(), 5556);
        assert_eq!(config.step_cap, 2048);
        assert_eq!(config.policy_dir, PathBuf::from("Policies"));
    }
}

//! Car RL Server - lock-step training bridge for the car combat simulation
//!
//! An external policy-training process connects over TCP and drives an
//! in-process simulated agent one fixed tick at a time:
//! - Newline-delimited JSON protocol (one message per line)
//! - Observation/reward/done telemetry per tick
//! - Inline hot-install of trained policy artifacts
//!
//! The host process controls lifecycle via [`net::TrainingServer::start`] and
//! [`net::ServerHandle::stop`].

pub mod app;
pub mod config;
pub mod episode;
pub mod net;
pub mod policy;
pub mod sim;
pub mod util;

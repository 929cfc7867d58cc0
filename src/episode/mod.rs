//! Episode orchestration: per-connection state machine and reward shaping

pub mod controller;
pub mod reward;

pub use controller::{EpisodeController, StepError, StepOutcome};
pub use reward::{shape_reward, RewardConfig, Snapshot};

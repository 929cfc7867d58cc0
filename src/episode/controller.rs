//! Per-connection episode state machine
//!
//! Owns step count, cap, and previous-tick baselines, and orchestrates
//! reset -> step* -> done -> reset against the simulation loop. The protocol
//! is strict request/response; clients must not pipeline (caller contract,
//! not enforced here).

use crate::net::protocol::ServerMsg;
use crate::sim::{Control, SimGone, SimHandle};
use crate::util::time::tick_delta;

use super::reward::{shape_reward, RewardConfig, Snapshot};

/// Minimum heading-error cosine for the tactical fire gate (~60 degree
/// half-cone); a requested shot outside it is suppressed for the tick
const FIRE_CONE_COS: f64 = 0.5;

/// Step handling errors. `BadArity` is a protocol error (the line is dropped,
/// the connection survives); `NonFiniteAction` is a client-contract violation
/// and fatal for the connection.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    SimGone(#[from] SimGone),

    #[error("action must have exactly 3 components, got {0}")]
    BadArity(usize),

    #[error("non-finite action component: {0}")]
    NonFiniteAction(f64),
}

/// Result of one step: the tick response, plus the auto-reset observation
/// when the tick was terminal
#[derive(Debug)]
pub struct StepOutcome {
    pub reply: ServerMsg,
    /// Sent immediately after `reply` so the client can prime the next
    /// episode without an extra round trip
    pub reset_reply: Option<ServerMsg>,
}

pub struct EpisodeController {
    sim: SimHandle,
    reward_cfg: RewardConfig,
    step_cap: u32,
    step_count: u32,
    prev: Snapshot,
    done: bool,
}

impl EpisodeController {
    pub fn new(sim: SimHandle, step_cap: u32) -> Self {
        Self {
            sim,
            reward_cfg: RewardConfig::default(),
            step_cap,
            step_count: 0,
            prev: Snapshot {
                prev_agent_hp: 0.0,
                prev_target_lives: 0,
                prev_distance: 0.0,
            },
            done: false,
        }
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// True when the last step terminated the episode (the controller has
    /// already auto-reset by the time a caller can observe this)
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Reset the episode and produce the fresh observation
    /// (`reward = 0, done = false`).
    ///
    /// Stale event counters are drained here so nothing from a previous
    /// episode leaks into the first step of the next one.
    pub async fn reset(&mut self) -> Result<ServerMsg, SimGone> {
        let (obs, telemetry) = self
            .sim
            .call(|world| {
                world.reset_episode();
                let _ = world.consume_reward_events();
                (world.read_observation(), world.read_telemetry())
            })
            .await?;

        self.step_count = 0;
        self.done = false;
        self.prev = Snapshot {
            prev_agent_hp: telemetry.agent_hp,
            prev_target_lives: telemetry.target_lives,
            prev_distance: telemetry.target_distance,
        };

        Ok(ServerMsg::Step {
            obs,
            reward: 0.0,
            done: false,
        })
    }

    /// Apply one action, advance exactly one fixed tick, and compose the
    /// response. On a terminal tick the episode auto-resets and the fresh
    /// reset observation rides along in the outcome.
    pub async fn step(&mut self, action: &[f64]) -> Result<StepOutcome, StepError> {
        if action.len() != 3 {
            return Err(StepError::BadArity(action.len()));
        }
        if let Some(&bad) = action.iter().find(|v| !v.is_finite()) {
            return Err(StepError::NonFiniteAction(bad));
        }

        let throttle = action[0].clamp(-1.0, 1.0);
        let steer = action[1].clamp(-1.0, 1.0);
        let fire_requested = action[2] > 0.5;
        let dt = tick_delta();

        let (obs, events, telemetry, world_done) = self
            .sim
            .call(move |world| {
                // Tactical fire gate: only shoot when the target is roughly
                // in the frontal cone and within weapon range
                let pre = world.read_telemetry();
                let fire = fire_requested
                    && pre.in_weapon_range
                    && pre.heading_error_cos > FIRE_CONE_COS;

                world.apply_control(Control {
                    throttle,
                    steer,
                    fire,
                });
                world.step_one_tick(dt);

                let events = world.consume_reward_events();
                (
                    world.read_observation(),
                    events,
                    world.read_telemetry(),
                    world.is_done(),
                )
            })
            .await?;

        self.step_count += 1;
        let reward = shape_reward(&self.reward_cfg, &self.prev, &events, &telemetry);
        let done = world_done || self.step_count >= self.step_cap;

        self.prev = Snapshot {
            prev_agent_hp: telemetry.agent_hp,
            prev_target_lives: telemetry.target_lives,
            prev_distance: telemetry.target_distance,
        };
        self.done = done;

        let reply = ServerMsg::Step { obs, reward, done };
        let reset_reply = if done { Some(self.reset().await?) } else { None };

        Ok(StepOutcome { reply, reset_reply })
    }
}

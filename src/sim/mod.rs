//! Simulation world interface and single-writer command loop
//!
//! The simulation is a single mutable resource. All control application, tick
//! advancement, and observation reads happen on the loop task that owns it;
//! network sessions reach it only through [`SimHandle`].

pub mod arena;
pub mod handle;

pub use handle::{SimGone, SimHandle, SimLoop};

/// Control inputs applied to the agent for the next tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Control {
    /// Forward/reverse throttle in [-1, 1]
    pub throttle: f64,
    /// Steering in [-1, 1] (negative = left)
    pub steer: f64,
    /// Fire the weapon this tick (already gated by the episode controller)
    pub fire: bool,
}

/// One-shot event counters incremented by the simulation during a tick.
///
/// Invariant: drained (and reset to zero) exactly once per tick via
/// [`SimWorld::consume_reward_events`]. Double consumption or a skipped drain
/// both corrupt reward accounting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardEvents {
    /// Damage the agent inflicted this tick
    pub damage_dealt: f64,
    /// Damage the agent received this tick
    pub damage_taken: f64,
    /// Pickups collected this tick
    pub pickups: u32,
    /// Destructible obstacles destroyed this tick
    pub obstacles_destroyed: u32,
    /// Opponent lives taken this tick
    pub kills: u32,
    /// Wall collisions this tick
    pub wall_bumps: u32,
    /// Vehicle-to-vehicle contact occurred this tick
    pub collided: bool,
    /// The agent's HP reached zero this tick
    pub died: bool,
    /// The client requested reverse throttle this tick
    pub reverse_intent: bool,
    /// The agent actually moved backward relative to its heading this tick
    pub reverse_motion: bool,
    /// The opponent's life count hit zero this tick
    pub win: bool,
    /// The agent's own life count hit zero this tick
    pub lose: bool,
}

/// Continuous scalars snapshotted around each tick for reward shaping and
/// fire gating. Recomputed from state, never accumulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub agent_hp: f64,
    pub agent_max_hp: f64,
    pub agent_alive: bool,
    pub target_lives: u32,
    /// Distance from agent to target, world units
    pub target_distance: f64,
    /// Agent speed as a fraction of its max speed
    pub speed_frac: f64,
    /// Cosine of the angle between the agent's heading and the target bearing
    pub heading_error_cos: f64,
    /// Target is within the agent's weapon range
    pub in_weapon_range: bool,
}

/// The simulation world behind the training bridge.
///
/// Everything the bridge needs is expressed through this interface; rendering,
/// audio, and the internal solver stay on the other side of it.
pub trait SimWorld: Send {
    /// Set the agent's control inputs for the next tick
    fn apply_control(&mut self, control: Control);

    /// Advance the simulation exactly one fixed timestep
    fn step_one_tick(&mut self, dt: f64);

    /// Snapshot agent/target/world state as the observation vector
    fn read_observation(&mut self) -> Vec<f64>;

    /// Snapshot continuous reward/gating telemetry
    fn read_telemetry(&self) -> Telemetry;

    /// Drain the one-shot event counters, resetting them to zero
    fn consume_reward_events(&mut self) -> RewardEvents;

    /// The current episode reached a terminal state (agent death)
    fn is_done(&self) -> bool;

    /// Respawn everything for a fresh episode
    fn reset_episode(&mut self);
}

//! Reward shaping - one auditable term table per tick
//!
//! Deterministic and stateless given its inputs: the previous-tick snapshot,
//! the event counters drained exactly once for this tick, and the current
//! telemetry. One-shot terms come only from the drained counters; continuous
//! terms are recomputed from snapshots, never accumulated.

use crate::sim::{RewardEvents, Telemetry};

/// All reward constants in one place
#[derive(Debug, Clone)]
pub struct RewardConfig {
    /// Small constant credited every tick the agent is alive
    pub alive_bonus: f64,
    /// Scale for current speed as a fraction of max speed
    pub speed_scale: f64,
    /// Scale for closing distance to the target since the previous tick
    pub approach_scale: f64,
    /// Penalty per HP lost this tick
    pub damage_taken_scale: f64,
    /// Bonus per HP of damage inflicted this tick
    pub damage_dealt_scale: f64,
    /// Bonus per pickup collected
    pub pickup_bonus: f64,
    /// Bonus per destructible obstacle destroyed
    pub obstacle_bonus: f64,
    /// Fixed bonus per opponent life taken
    pub kill_bonus: f64,
    /// Fixed penalty when the agent dies this tick
    pub death_penalty: f64,
    /// Fixed penalty per tick a wall collision occurred
    pub wall_bump_penalty: f64,
    /// Penalty when the client requested reverse this tick
    pub reverse_intent_penalty: f64,
    /// Smaller penalty when the agent actually moved backward this tick
    pub reverse_motion_penalty: f64,
    /// Large terminal bonus when the opponent's life count hits zero
    pub win_bonus: f64,
    /// Extra terminal bonus per remaining-HP quartile on a win
    pub win_hp_tier_bonus: f64,
    /// Large terminal penalty when the agent's own life count hits zero
    pub lose_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            alive_bonus: 0.001,
            speed_scale: 0.005,
            approach_scale: 0.01,
            damage_taken_scale: 0.01,
            damage_dealt_scale: 0.02,
            pickup_bonus: 0.25,
            obstacle_bonus: 0.1,
            kill_bonus: 1.0,
            death_penalty: 1.0,
            wall_bump_penalty: 0.05,
            reverse_intent_penalty: 0.01,
            reverse_motion_penalty: 0.005,
            win_bonus: 10.0,
            win_hp_tier_bonus: 0.5,
            lose_penalty: 10.0,
        }
    }
}

/// Previous-tick baselines owned by the episode controller
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub prev_agent_hp: f64,
    pub prev_target_lives: u32,
    pub prev_distance: f64,
}

/// Compose the scalar reward for one tick. All terms are additive.
pub fn shape_reward(
    cfg: &RewardConfig,
    prev: &Snapshot,
    events: &RewardEvents,
    now: &Telemetry,
) -> f64 {
    let mut total = 0.0;

    // Continuous terms, recomputed from snapshots
    total += cfg.alive_bonus;
    total += now.speed_frac * cfg.speed_scale;
    total += (prev.prev_distance - now.target_distance) * cfg.approach_scale;

    let hp_lost = (prev.prev_agent_hp - now.agent_hp).max(0.0);
    total -= hp_lost * cfg.damage_taken_scale;

    // One-shot terms, valid only for the tick the counters were drained
    total += events.damage_dealt * cfg.damage_dealt_scale;
    total += events.pickups as f64 * cfg.pickup_bonus;
    total += events.obstacles_destroyed as f64 * cfg.obstacle_bonus;
    total += events.kills as f64 * cfg.kill_bonus;
    total -= events.wall_bumps as f64 * cfg.wall_bump_penalty;

    if events.died {
        total -= cfg.death_penalty;
    }
    if events.reverse_intent {
        total -= cfg.reverse_intent_penalty;
    }
    if events.reverse_motion {
        total -= cfg.reverse_motion_penalty;
    }

    let lives_hit_zero = prev.prev_target_lives > 0 && now.target_lives == 0;
    if events.win || lives_hit_zero {
        total += cfg.win_bonus;
        let hp_frac = (now.agent_hp / now.agent_max_hp).clamp(0.0, 1.0);
        total += cfg.win_hp_tier_bonus * (hp_frac * 4.0).floor();
    }
    if events.lose {
        total -= cfg.lose_penalty;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_telemetry() -> Telemetry {
        Telemetry {
            agent_hp: 100.0,
            agent_max_hp: 100.0,
            agent_alive: true,
            target_lives: 3,
            target_distance: 500.0,
            speed_frac: 0.0,
            heading_error_cos: 1.0,
            in_weapon_range: false,
        }
    }

    fn idle_snapshot() -> Snapshot {
        Snapshot {
            prev_agent_hp: 100.0,
            prev_target_lives: 3,
            prev_distance: 500.0,
        }
    }

    #[test]
    fn quiet_tick_earns_only_the_alive_bonus() {
        let cfg = RewardConfig::default();
        let reward = shape_reward(
            &cfg,
            &idle_snapshot(),
            &RewardEvents::default(),
            &idle_telemetry(),
        );
        assert!((reward - cfg.alive_bonus).abs() < 1e-12);
    }

    #[test]
    fn one_shot_terms_never_leak_into_the_next_tick() {
        let cfg = RewardConfig::default();
        let busy = RewardEvents {
            damage_dealt: 12.0,
            kills: 1,
            wall_bumps: 2,
            ..RewardEvents::default()
        };

        let first = shape_reward(&cfg, &idle_snapshot(), &busy, &idle_telemetry());
        // The counters were drained; the next tick sees defaults only
        let second = shape_reward(
            &cfg,
            &idle_snapshot(),
            &RewardEvents::default(),
            &idle_telemetry(),
        );

        assert!(first > second);
        assert!((second - cfg.alive_bonus).abs() < 1e-12);
    }

    #[test]
    fn damage_taken_is_derived_from_hp_delta() {
        let cfg = RewardConfig::default();
        let mut now = idle_telemetry();
        now.agent_hp = 80.0;

        let reward = shape_reward(&cfg, &idle_snapshot(), &RewardEvents::default(), &now);
        let expected = cfg.alive_bonus - 20.0 * cfg.damage_taken_scale;
        assert!((reward - expected).abs() < 1e-12);

        // HP gains (pickups) never count as negative damage
        now.agent_hp = 100.0;
        let healed = shape_reward(
            &cfg,
            &Snapshot {
                prev_agent_hp: 80.0,
                ..idle_snapshot()
            },
            &RewardEvents::default(),
            &now,
        );
        assert!((healed - cfg.alive_bonus).abs() < 1e-12);
    }

    #[test]
    fn reverse_penalties_toggle_independently() {
        let cfg = RewardConfig::default();
        let base = shape_reward(
            &cfg,
            &idle_snapshot(),
            &RewardEvents::default(),
            &idle_telemetry(),
        );

        let intent_only = shape_reward(
            &cfg,
            &idle_snapshot(),
            &RewardEvents {
                reverse_intent: true,
                ..RewardEvents::default()
            },
            &idle_telemetry(),
        );
        let both = shape_reward(
            &cfg,
            &idle_snapshot(),
            &RewardEvents {
                reverse_intent: true,
                reverse_motion: true,
                ..RewardEvents::default()
            },
            &idle_telemetry(),
        );

        assert!((base - intent_only - cfg.reverse_intent_penalty).abs() < 1e-12);
        assert!((intent_only - both - cfg.reverse_motion_penalty).abs() < 1e-12);
    }

    #[test]
    fn winning_pays_the_terminal_bonus_with_hp_tier() {
        let cfg = RewardConfig::default();
        let mut now = idle_telemetry();
        now.target_lives = 0;
        now.agent_hp = 90.0; // top quartile

        let reward = shape_reward(
            &cfg,
            &Snapshot {
                prev_agent_hp: 90.0,
                ..idle_snapshot()
            },
            &RewardEvents {
                kills: 1,
                win: true,
                ..RewardEvents::default()
            },
            &now,
        );

        let expected = cfg.alive_bonus + cfg.kill_bonus + cfg.win_bonus + cfg.win_hp_tier_bonus * 3.0;
        assert!((reward - expected).abs() < 1e-12);
    }

    #[test]
    fn dying_and_losing_stack() {
        let cfg = RewardConfig::default();
        let mut now = idle_telemetry();
        now.agent_hp = 0.0;
        now.agent_alive = false;

        let reward = shape_reward(
            &cfg,
            &idle_snapshot(),
            &RewardEvents {
                died: true,
                lose: true,
                damage_taken: 100.0,
                ..RewardEvents::default()
            },
            &now,
        );

        let expected =
            cfg.alive_bonus - 100.0 * cfg.damage_taken_scale - cfg.death_penalty - cfg.lose_penalty;
        assert!((reward - expected).abs() < 1e-12);
    }
}

//! Arena world - vehicles, obstacles, pickups, projectiles
//!
//! Default [`SimWorld`] implementation: one trainable agent vehicle against a
//! turret-style target in a walled rectangular arena with destructible
//! obstacles and health pickups. Deterministic for a given seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{Control, RewardEvents, SimWorld, Telemetry};

/// Ray fan used for the clearance observations, radians relative to heading
const RAY_ANGLES: [f64; 5] = [
    -std::f64::consts::FRAC_PI_3,
    -std::f64::consts::FRAC_PI_6,
    0.0,
    std::f64::consts::FRAC_PI_6,
    std::f64::consts::FRAC_PI_3,
];

/// Maximum ray-cast distance; clearances are fractions of this
const RAY_LENGTH: f64 = 500.0;

/// Forward velocity below which the agent counts as moving backward (units/s)
const REVERSE_MOTION_THRESHOLD: f64 = -5.0;

/// Throttle below which the client counts as requesting reverse
const REVERSE_INTENT_THRESHOLD: f64 = -0.05;

/// Vehicle physics constants
#[derive(Debug, Clone, Copy)]
pub struct VehicleStats {
    /// Maximum forward speed
    pub max_speed: f64,
    /// Acceleration rate
    pub acceleration: f64,
    /// Per-tick drag coefficient
    pub drag: f64,
    /// Turn rate in radians per second
    pub turn_rate: f64,
    /// Maximum health
    pub max_health: f64,
    /// Hitbox radius
    pub hitbox_radius: f64,
}

impl VehicleStats {
    pub fn agent() -> Self {
        Self {
            max_speed: 320.0,
            acceleration: 260.0,
            drag: 0.94,
            turn_rate: 3.2,
            max_health: 100.0,
            hitbox_radius: 22.0,
        }
    }

    pub fn target() -> Self {
        Self {
            max_speed: 0.0, // turret-style, rotates in place
            acceleration: 0.0,
            drag: 1.0,
            turn_rate: 1.6,
            max_health: 80.0,
            hitbox_radius: 26.0,
        }
    }
}

/// Weapon constants
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    pub damage: f64,
    pub projectile_speed: f64,
    /// Cooldown between shots (seconds)
    pub cooldown: f64,
    /// Projectile lifetime (seconds)
    pub projectile_lifetime: f64,
    pub projectile_radius: f64,
    /// Effective range, used for fire gating and the target AI
    pub range: f64,
}

impl WeaponStats {
    pub fn agent() -> Self {
        Self {
            damage: 12.0,
            projectile_speed: 520.0,
            cooldown: 0.25,
            projectile_lifetime: 1.2,
            projectile_radius: 4.0,
            range: 420.0,
        }
    }

    pub fn target() -> Self {
        Self {
            damage: 10.0,
            projectile_speed: 460.0,
            cooldown: 0.8,
            projectile_lifetime: 1.2,
            projectile_radius: 4.0,
            range: 380.0,
        }
    }
}

/// Which entity fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shooter {
    Agent,
    Target,
}

#[derive(Debug, Clone)]
struct Projectile {
    owner: Shooter,
    x: f64,
    y: f64,
    vel_x: f64,
    vel_y: f64,
    damage: f64,
    radius: f64,
    lifetime_remaining: f64,
}

impl Projectile {
    fn new(owner: Shooter, x: f64, y: f64, direction: f64, stats: &WeaponStats) -> Self {
        Self {
            owner,
            x,
            y,
            vel_x: direction.cos() * stats.projectile_speed,
            vel_y: direction.sin() * stats.projectile_speed,
            damage: stats.damage,
            radius: stats.projectile_radius,
            lifetime_remaining: stats.projectile_lifetime,
        }
    }

    /// Advance one tick, returns false when expired
    fn update(&mut self, dt: f64) -> bool {
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.lifetime_remaining -= dt;
        self.lifetime_remaining > 0.0
    }

    fn check_hit(&self, target_x: f64, target_y: f64, target_radius: f64) -> bool {
        let dx = self.x - target_x;
        let dy = self.y - target_y;
        let combined = self.radius + target_radius;
        dx * dx + dy * dy <= combined * combined
    }
}

#[derive(Debug, Clone)]
struct Vehicle {
    x: f64,
    y: f64,
    heading: f64,
    vel_x: f64,
    vel_y: f64,
    health: f64,
    lives: u32,
    alive: bool,
    weapon_cooldown: f64,
    stats: VehicleStats,
    weapon: WeaponStats,
}

impl Vehicle {
    fn spawn(x: f64, y: f64, heading: f64, lives: u32, stats: VehicleStats, weapon: WeaponStats) -> Self {
        Self {
            x,
            y,
            heading,
            vel_x: 0.0,
            vel_y: 0.0,
            health: stats.max_health,
            lives,
            alive: true,
            weapon_cooldown: 0.0,
            stats,
            weapon,
        }
    }

    fn speed(&self) -> f64 {
        (self.vel_x * self.vel_x + self.vel_y * self.vel_y).sqrt()
    }

    /// Velocity component along the heading direction
    fn forward_velocity(&self) -> f64 {
        self.vel_x * self.heading.cos() + self.vel_y * self.heading.sin()
    }
}

#[derive(Debug, Clone)]
struct Obstacle {
    x: f64,
    y: f64,
    radius: f64,
    health: f64,
    alive: bool,
}

#[derive(Debug, Clone)]
struct Pickup {
    x: f64,
    y: f64,
    radius: f64,
    taken: bool,
}

/// Arena layout and episode parameters
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub half_width: f64,
    pub half_height: f64,
    pub obstacle_count: usize,
    pub pickup_count: usize,
    pub agent_lives: u32,
    pub target_lives: u32,
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_width: 1000.0,
            half_height: 700.0,
            obstacle_count: 6,
            pickup_count: 3,
            agent_lives: 3,
            target_lives: 3,
            seed: 7,
        }
    }
}

/// The car-combat arena world
pub struct ArenaWorld {
    cfg: ArenaConfig,
    rng: ChaCha8Rng,
    agent: Vehicle,
    target: Vehicle,
    obstacles: Vec<Obstacle>,
    pickups: Vec<Pickup>,
    projectiles: Vec<Projectile>,
    pending: Control,
    events: RewardEvents,
    tick: u64,
}

impl ArenaWorld {
    pub fn new(cfg: ArenaConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let mut world = Self {
            agent: Self::spawn_agent(&cfg),
            target: Self::spawn_target(&cfg),
            obstacles: Vec::new(),
            pickups: Vec::new(),
            projectiles: Vec::new(),
            pending: Control::default(),
            events: RewardEvents::default(),
            tick: 0,
            rng,
            cfg,
        };
        world.generate_layout();
        world
    }

    fn spawn_agent(cfg: &ArenaConfig) -> Vehicle {
        Vehicle::spawn(
            -cfg.half_width * 0.5,
            0.0,
            0.0,
            cfg.agent_lives,
            VehicleStats::agent(),
            WeaponStats::agent(),
        )
    }

    fn spawn_target(cfg: &ArenaConfig) -> Vehicle {
        Vehicle::spawn(
            cfg.half_width * 0.5,
            0.0,
            std::f64::consts::PI,
            cfg.target_lives,
            VehicleStats::target(),
            WeaponStats::target(),
        )
    }

    /// Place obstacles and pickups, keeping both spawn points clear
    fn generate_layout(&mut self) {
        self.obstacles.clear();
        self.pickups.clear();

        let clear_radius = 180.0;
        let spawns = [(self.agent.x, self.agent.y), (self.target.x, self.target.y)];

        while self.obstacles.len() < self.cfg.obstacle_count {
            let x = self.rng.gen_range(-self.cfg.half_width * 0.8..self.cfg.half_width * 0.8);
            let y = self.rng.gen_range(-self.cfg.half_height * 0.8..self.cfg.half_height * 0.8);
            let radius = self.rng.gen_range(40.0..80.0);
            if spawns
                .iter()
                .any(|(sx, sy)| ((x - sx).powi(2) + (y - sy).powi(2)).sqrt() < clear_radius + radius)
            {
                continue;
            }
            self.obstacles.push(Obstacle {
                x,
                y,
                radius,
                health: 30.0,
                alive: true,
            });
        }

        while self.pickups.len() < self.cfg.pickup_count {
            let x = self.rng.gen_range(-self.cfg.half_width * 0.7..self.cfg.half_width * 0.7);
            let y = self.rng.gen_range(-self.cfg.half_height * 0.7..self.cfg.half_height * 0.7);
            if spawns
                .iter()
                .any(|(sx, sy)| ((x - sx).powi(2) + (y - sy).powi(2)).sqrt() < clear_radius)
            {
                continue;
            }
            self.pickups.push(Pickup {
                x,
                y,
                radius: 18.0,
                taken: false,
            });
        }
    }

    fn diag(&self) -> f64 {
        (self.cfg.half_width * self.cfg.half_width * 4.0
            + self.cfg.half_height * self.cfg.half_height * 4.0)
            .sqrt()
    }

    fn target_distance(&self) -> f64 {
        let dx = self.target.x - self.agent.x;
        let dy = self.target.y - self.agent.y;
        (dx * dx + dy * dy).sqrt()
    }

    fn heading_error(&self) -> f64 {
        let bearing = (self.target.y - self.agent.y).atan2(self.target.x - self.agent.x);
        let mut err = bearing - self.agent.heading;
        while err > std::f64::consts::PI {
            err -= std::f64::consts::TAU;
        }
        while err < -std::f64::consts::PI {
            err += std::f64::consts::TAU;
        }
        err
    }

    /// Integrate the agent's motion from the pending control inputs
    fn update_agent_physics(&mut self, dt: f64) {
        let control = self.pending;
        let stats = self.agent.stats;

        if control.throttle < REVERSE_INTENT_THRESHOLD {
            self.events.reverse_intent = true;
        }

        let heading = (self.agent.heading + control.steer * stats.turn_rate * dt)
            .rem_euclid(std::f64::consts::TAU);
        self.agent.heading = heading;

        // Reverse at reduced power
        let thrust_power = if control.throttle >= 0.0 {
            control.throttle * stats.acceleration
        } else {
            control.throttle * stats.acceleration * 0.5
        };

        self.agent.vel_x += heading.cos() * thrust_power * dt;
        self.agent.vel_y += heading.sin() * thrust_power * dt;
        self.agent.vel_x *= stats.drag;
        self.agent.vel_y *= stats.drag;

        let speed = self.agent.speed();
        if speed > stats.max_speed {
            let scale = stats.max_speed / speed;
            self.agent.vel_x *= scale;
            self.agent.vel_y *= scale;
        }

        self.agent.x += self.agent.vel_x * dt;
        self.agent.y += self.agent.vel_y * dt;

        if self.agent.forward_velocity() < REVERSE_MOTION_THRESHOLD {
            self.events.reverse_motion = true;
        }

        self.clamp_agent_to_walls();
        self.resolve_obstacle_overlap();
        self.resolve_vehicle_overlap();
    }

    fn clamp_agent_to_walls(&mut self) {
        let r = self.agent.stats.hitbox_radius;
        let max_x = self.cfg.half_width - r;
        let max_y = self.cfg.half_height - r;
        let mut bumped = false;

        if self.agent.x < -max_x || self.agent.x > max_x {
            self.agent.x = self.agent.x.clamp(-max_x, max_x);
            self.agent.vel_x = 0.0;
            bumped = true;
        }
        if self.agent.y < -max_y || self.agent.y > max_y {
            self.agent.y = self.agent.y.clamp(-max_y, max_y);
            self.agent.vel_y = 0.0;
            bumped = true;
        }
        if bumped {
            self.events.wall_bumps += 1;
            self.events.collided = true;
        }
    }

    /// Push the agent out of any live obstacle it overlaps
    fn resolve_obstacle_overlap(&mut self) {
        let r = self.agent.stats.hitbox_radius;
        for obstacle in self.obstacles.iter().filter(|o| o.alive) {
            let dx = self.agent.x - obstacle.x;
            let dy = self.agent.y - obstacle.y;
            let dist = (dx * dx + dy * dy).sqrt();
            let combined = r + obstacle.radius;
            if dist < combined && dist > 1e-6 {
                let push = combined - dist + 0.1;
                self.agent.x += dx / dist * push;
                self.agent.y += dy / dist * push;
                self.agent.vel_x *= 0.5;
                self.agent.vel_y *= 0.5;
                self.events.collided = true;
            }
        }
    }

    fn resolve_vehicle_overlap(&mut self) {
        let dx = self.target.x - self.agent.x;
        let dy = self.target.y - self.agent.y;
        let dist = (dx * dx + dy * dy).sqrt();
        let combined = self.agent.stats.hitbox_radius + self.target.stats.hitbox_radius;
        if dist < combined {
            self.events.collided = true;
            if dist > 1e-6 {
                let push = combined - dist + 0.1;
                self.agent.x -= dx / dist * push;
                self.agent.y -= dy / dist * push;
            } else {
                self.agent.x -= combined;
            }
        }
    }

    /// Rotate the turret toward the agent and fire when lined up and in range
    fn update_target_ai(&mut self, dt: f64) {
        if !self.target.alive {
            return;
        }
        let bearing = (self.agent.y - self.target.y).atan2(self.agent.x - self.target.x);
        let mut err = bearing - self.target.heading;
        while err > std::f64::consts::PI {
            err -= std::f64::consts::TAU;
        }
        while err < -std::f64::consts::PI {
            err += std::f64::consts::TAU;
        }
        let max_turn = self.target.stats.turn_rate * dt;
        self.target.heading =
            (self.target.heading + err.clamp(-max_turn, max_turn)).rem_euclid(std::f64::consts::TAU);

        let aimed = err.abs() < 0.15;
        let in_range = self.target_distance() <= self.target.weapon.range;
        if aimed && in_range && self.target.weapon_cooldown <= 0.0 {
            let spawn_offset = self.target.stats.hitbox_radius + 5.0;
            let x = self.target.x + self.target.heading.cos() * spawn_offset;
            let y = self.target.y + self.target.heading.sin() * spawn_offset;
            self.projectiles.push(Projectile::new(
                Shooter::Target,
                x,
                y,
                self.target.heading,
                &self.target.weapon,
            ));
            self.target.weapon_cooldown = self.target.weapon.cooldown;
        }
    }

    fn fire_agent_weapon(&mut self) {
        if !self.pending.fire || self.agent.weapon_cooldown > 0.0 {
            return;
        }
        let spawn_offset = self.agent.stats.hitbox_radius + 5.0;
        let x = self.agent.x + self.agent.heading.cos() * spawn_offset;
        let y = self.agent.y + self.agent.heading.sin() * spawn_offset;
        self.projectiles.push(Projectile::new(
            Shooter::Agent,
            x,
            y,
            self.agent.heading,
            &self.agent.weapon,
        ));
        self.agent.weapon_cooldown = self.agent.weapon.cooldown;
    }

    fn update_projectiles(&mut self, dt: f64) {
        let drained = std::mem::take(&mut self.projectiles);
        let mut survivors = Vec::with_capacity(drained.len());

        'outer: for mut projectile in drained {
            if !projectile.update(dt) {
                continue;
            }

            // Obstacles absorb projectiles from either side
            for obstacle in self.obstacles.iter_mut().filter(|o| o.alive) {
                if projectile.check_hit(obstacle.x, obstacle.y, obstacle.radius) {
                    obstacle.health -= projectile.damage;
                    if obstacle.health <= 0.0 {
                        obstacle.alive = false;
                        if projectile.owner == Shooter::Agent {
                            self.events.obstacles_destroyed += 1;
                        }
                    }
                    continue 'outer;
                }
            }

            match projectile.owner {
                Shooter::Agent => {
                    if self.target.alive
                        && projectile.check_hit(
                            self.target.x,
                            self.target.y,
                            self.target.stats.hitbox_radius,
                        )
                    {
                        self.target.health -= projectile.damage;
                        self.events.damage_dealt += projectile.damage;
                        if self.target.health <= 0.0 {
                            self.on_target_life_lost();
                        }
                        continue;
                    }
                }
                Shooter::Target => {
                    if self.agent.alive
                        && projectile.check_hit(
                            self.agent.x,
                            self.agent.y,
                            self.agent.stats.hitbox_radius,
                        )
                    {
                        let damage = projectile.damage.min(self.agent.health);
                        self.agent.health -= damage;
                        self.events.damage_taken += damage;
                        if self.agent.health <= 0.0 {
                            self.on_agent_death();
                        }
                        continue;
                    }
                }
            }

            survivors.push(projectile);
        }

        self.projectiles = survivors;
    }

    fn on_target_life_lost(&mut self) {
        self.target.lives = self.target.lives.saturating_sub(1);
        self.events.kills += 1;
        if self.target.lives == 0 {
            self.target.alive = false;
            self.events.win = true;
        } else {
            self.target.health = self.target.stats.max_health;
        }
    }

    fn on_agent_death(&mut self) {
        self.agent.health = 0.0;
        self.agent.alive = false;
        self.agent.lives = self.agent.lives.saturating_sub(1);
        self.events.died = true;
        if self.agent.lives == 0 {
            self.events.lose = true;
        }
    }

    fn collect_pickups(&mut self) {
        let r = self.agent.stats.hitbox_radius;
        let max_health = self.agent.stats.max_health;
        for pickup in self.pickups.iter_mut().filter(|p| !p.taken) {
            let dx = self.agent.x - pickup.x;
            let dy = self.agent.y - pickup.y;
            let combined = r + pickup.radius;
            if dx * dx + dy * dy <= combined * combined {
                pickup.taken = true;
                self.events.pickups += 1;
                self.agent.health = (self.agent.health + 25.0).min(max_health);
            }
        }
    }

    /// Distance along a ray until the first wall or live obstacle, capped at
    /// [`RAY_LENGTH`]
    fn ray_clearance(&self, angle: f64) -> f64 {
        let dir_x = angle.cos();
        let dir_y = angle.sin();
        let mut nearest = RAY_LENGTH;

        // Walls: positive parametric distance to each boundary plane
        if dir_x.abs() > 1e-9 {
            let boundary = if dir_x > 0.0 { self.cfg.half_width } else { -self.cfg.half_width };
            let t = (boundary - self.agent.x) / dir_x;
            if t > 0.0 {
                nearest = nearest.min(t);
            }
        }
        if dir_y.abs() > 1e-9 {
            let boundary = if dir_y > 0.0 { self.cfg.half_height } else { -self.cfg.half_height };
            let t = (boundary - self.agent.y) / dir_y;
            if t > 0.0 {
                nearest = nearest.min(t);
            }
        }

        // Obstacle circles: smallest positive root of the ray-circle quadratic
        for obstacle in self.obstacles.iter().filter(|o| o.alive) {
            let ox = obstacle.x - self.agent.x;
            let oy = obstacle.y - self.agent.y;
            let proj = ox * dir_x + oy * dir_y;
            if proj <= 0.0 {
                continue;
            }
            let closest_sq = ox * ox + oy * oy - proj * proj;
            let r_sq = obstacle.radius * obstacle.radius;
            if closest_sq > r_sq {
                continue;
            }
            let t = proj - (r_sq - closest_sq).sqrt();
            if t > 0.0 {
                nearest = nearest.min(t);
            }
        }

        nearest.clamp(0.0, RAY_LENGTH)
    }

    fn nearest_pickup(&self) -> Option<(f64, f64)> {
        self.pickups
            .iter()
            .filter(|p| !p.taken)
            .map(|p| {
                let dx = p.x - self.agent.x;
                let dy = p.y - self.agent.y;
                (dx, dy)
            })
            .min_by(|a, b| {
                let da = a.0 * a.0 + a.1 * a.1;
                let db = b.0 * b.0 + b.1 * b.1;
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Simplified 5-value observation for the secondary agent type:
    /// `[x, y, vel_x, vel_y, health_fraction]`, positions normalized by the
    /// arena half-extents and velocities by max speed. A distinct, shorter
    /// schema from the standard 16-value vector; do not mix the two.
    pub fn legacy_observation(&self) -> Vec<f64> {
        vec![
            self.agent.x / self.cfg.half_width,
            self.agent.y / self.cfg.half_height,
            self.agent.vel_x / self.agent.stats.max_speed,
            self.agent.vel_y / self.agent.stats.max_speed,
            self.agent.health / self.agent.stats.max_health,
        ]
    }
}

impl SimWorld for ArenaWorld {
    fn apply_control(&mut self, control: Control) {
        self.pending = control;
    }

    fn step_one_tick(&mut self, dt: f64) {
        self.tick += 1;

        self.agent.weapon_cooldown = (self.agent.weapon_cooldown - dt).max(0.0);
        self.target.weapon_cooldown = (self.target.weapon_cooldown - dt).max(0.0);

        if self.agent.alive {
            self.update_agent_physics(dt);
            self.fire_agent_weapon();
            self.collect_pickups();
        }
        self.update_target_ai(dt);
        self.update_projectiles(dt);
    }

    fn read_observation(&mut self) -> Vec<f64> {
        let heading_error = self.heading_error();
        let diag = self.diag();
        let forward = self.agent.forward_velocity();
        let lateral = -self.agent.vel_x * self.agent.heading.sin()
            + self.agent.vel_y * self.agent.heading.cos();

        let mut obs = Vec::with_capacity(crate::net::protocol::OBS_LEN);
        obs.push(heading_error.cos());
        obs.push(heading_error.sin());
        obs.push(self.target_distance() / diag);
        obs.push(forward / self.agent.stats.max_speed);
        obs.push(lateral / self.agent.stats.max_speed);
        for offset in RAY_ANGLES {
            obs.push(self.ray_clearance(self.agent.heading + offset) / RAY_LENGTH);
        }
        match self.nearest_pickup() {
            Some((dx, dy)) => {
                let bearing = dy.atan2(dx) - self.agent.heading;
                obs.push(bearing.cos());
                obs.push(bearing.sin());
                obs.push((dx * dx + dy * dy).sqrt() / diag);
            }
            None => {
                obs.push(1.0);
                obs.push(0.0);
                obs.push(1.0);
            }
        }
        obs.push(self.agent.health / self.agent.stats.max_health);
        obs.push(self.agent.weapon_cooldown / self.agent.weapon.cooldown);
        obs.push(self.rng.gen_range(-0.01..0.01));

        debug_assert_eq!(obs.len(), crate::net::protocol::OBS_LEN);
        obs
    }

    fn read_telemetry(&self) -> Telemetry {
        let distance = self.target_distance();
        Telemetry {
            agent_hp: self.agent.health,
            agent_max_hp: self.agent.stats.max_health,
            agent_alive: self.agent.alive,
            target_lives: self.target.lives,
            target_distance: distance,
            speed_frac: (self.agent.speed() / self.agent.stats.max_speed).clamp(0.0, 1.0),
            heading_error_cos: self.heading_error().cos(),
            in_weapon_range: distance <= self.agent.weapon.range,
        }
    }

    fn consume_reward_events(&mut self) -> RewardEvents {
        std::mem::take(&mut self.events)
    }

    fn is_done(&self) -> bool {
        !self.agent.alive
    }

    fn reset_episode(&mut self) {
        self.agent = Self::spawn_agent(&self.cfg);
        self.target = Self::spawn_target(&self.cfg);
        self.projectiles.clear();
        self.pending = Control::default();
        self.events = RewardEvents::default();
        self.tick = 0;
        self.generate_layout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{LEGACY_OBS_LEN, OBS_LEN};
    use crate::util::time::tick_delta;

    fn world() -> ArenaWorld {
        ArenaWorld::new(ArenaConfig::default())
    }

    fn open_world() -> ArenaWorld {
        // No obstacles: driving paths stay clear regardless of seed
        ArenaWorld::new(ArenaConfig {
            obstacle_count: 0,
            ..ArenaConfig::default()
        })
    }

    #[test]
    fn observation_has_stable_length() {
        let mut w = world();
        assert_eq!(w.read_observation().len(), OBS_LEN);
        w.apply_control(Control {
            throttle: 1.0,
            steer: 0.3,
            fire: true,
        });
        w.step_one_tick(tick_delta());
        assert_eq!(w.read_observation().len(), OBS_LEN);
        assert_eq!(w.legacy_observation().len(), LEGACY_OBS_LEN);
    }

    #[test]
    fn event_counters_drain_exactly_once() {
        let mut w = world();
        w.apply_control(Control {
            throttle: -1.0,
            steer: 0.0,
            fire: false,
        });
        w.step_one_tick(tick_delta());

        let first = w.consume_reward_events();
        assert!(first.reverse_intent);

        let second = w.consume_reward_events();
        assert_eq!(second, RewardEvents::default());
    }

    #[test]
    fn driving_into_wall_bumps() {
        let mut w = open_world();
        w.apply_control(Control {
            throttle: -1.0,
            steer: 0.0,
            fire: false,
        });
        // Agent faces +x; steady reverse throttle drives it into the -x wall
        for _ in 0..2000 {
            w.step_one_tick(tick_delta());
        }
        let events = w.consume_reward_events();
        assert!(events.wall_bumps > 0);
        assert!(events.reverse_intent);
        assert!(events.reverse_motion);
    }

    #[test]
    fn firing_respects_cooldown() {
        let mut w = world();
        w.apply_control(Control {
            throttle: 0.0,
            steer: 0.0,
            fire: true,
        });
        w.step_one_tick(tick_delta());
        let after_one = w.projectiles.len();
        w.step_one_tick(tick_delta());
        // Second tick is inside the cooldown window, no extra shot
        assert_eq!(w.projectiles.len(), after_one);
        assert!(w.agent.weapon_cooldown > 0.0);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut a = world();
        let mut b = world();
        let control = Control {
            throttle: 0.8,
            steer: -0.2,
            fire: true,
        };
        for _ in 0..120 {
            a.apply_control(control);
            b.apply_control(control);
            a.step_one_tick(tick_delta());
            b.step_one_tick(tick_delta());
        }
        assert_eq!(a.read_observation(), b.read_observation());
        assert_eq!(a.consume_reward_events(), b.consume_reward_events());
    }

    #[test]
    fn reset_restores_a_fresh_episode() {
        let mut w = world();
        w.apply_control(Control {
            throttle: 1.0,
            steer: 0.1,
            fire: true,
        });
        for _ in 0..300 {
            w.step_one_tick(tick_delta());
        }
        w.reset_episode();

        let telemetry = w.read_telemetry();
        assert!(telemetry.agent_alive);
        assert_eq!(telemetry.agent_hp, telemetry.agent_max_hp);
        assert_eq!(w.consume_reward_events(), RewardEvents::default());
        assert!(!w.is_done());
    }

    #[test]
    fn agent_death_marks_done() {
        let mut w = open_world();
        // Drive straight at the turret until it shoots the agent down
        for _ in 0..20_000 {
            w.apply_control(Control {
                throttle: 1.0,
                steer: 0.0,
                fire: false,
            });
            w.step_one_tick(tick_delta());
            if w.is_done() {
                break;
            }
        }
        assert!(w.is_done());
        let events = w.consume_reward_events();
        assert!(events.died);
        assert!(events.damage_taken > 0.0);
    }
}

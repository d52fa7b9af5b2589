//! Descending seekers
//!
//! A particle performs momentum gradient descent across the height field.
//! Lifecycle is one-way: `Active → Fading → destroyed`. While a wave is
//! still spawning, active particles are *staged*: pinned in place with their
//! trail collapsed onto the head.
//!
//! # Integration
//!
//! ```text
//! v ← v·momentum − ∇h·learning_rate·frame_scale
//! p ← p + v·frame_scale
//! ```
//!
//! Momentum is applied once per tick regardless of frame duration; only the
//! gradient force and the position step are frame-scaled. This matches the
//! tuned behaviour at the reference frame rate and drifts from it at very
//! different frame rates.

use super::appearance::VisualState;
use crate::config::{AppearanceConfig, PhysicsConfig, TerrainConfig};
use crate::core_types::{Vec2, Vec3};
use crate::grid::{GradientField, HeightField};
use serde::{Deserialize, Serialize};

/// Stable particle identifier, unique for the lifetime of a simulation
pub type ParticleId = u32;

/// Particle lifecycle flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Moving under physics (or staged while its wave spawns)
    Active,
    /// Shrinking toward removal; physics no longer integrated
    Fading,
}

/// Shared inputs for one simulation tick
pub(crate) struct StepContext<'a> {
    pub height: &'a HeightField,
    pub gradient: &'a GradientField,
    pub terrain: &'a TerrainConfig,
    pub physics: &'a PhysicsConfig,
    pub appearance: &'a AppearanceConfig,
    /// Same value for every particle in a tick
    pub frame_scale: f32,
    /// Spawn queue non-empty: active particles hold still
    pub staging: bool,
}

/// Result of stepping a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Alive,
    Destroyed,
}

/// One seeker
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    id: ParticleId,
    /// Ground-plane position; `y` is world Z
    position: Vec2,
    velocity: Vec2,
    /// Surface elevation under the particle (without hover)
    surface: f32,
    /// Ticks since spawn
    age: u32,
    /// Recent world positions, most recent first; length never changes
    trail: Vec<Vec3>,
    lifecycle: Lifecycle,
    visual: VisualState,
}

impl Particle {
    pub(crate) fn spawn(
        id: ParticleId,
        x: f32,
        z: f32,
        height: &HeightField,
        terrain: &TerrainConfig,
        physics: &PhysicsConfig,
        appearance: &AppearanceConfig,
    ) -> Self {
        let surface = height.elevation(x, z);
        let head = Vec3::new(x, surface + physics.hover_offset, z);
        Self {
            id,
            position: Vec2::new(x, z),
            velocity: Vec2::zeros(),
            surface,
            age: 0,
            trail: vec![head; physics.trail_length],
            lifecycle: Lifecycle::Active,
            visual: VisualState::staged(surface, terrain, appearance),
        }
    }

    /// Advance one tick
    pub(crate) fn step(&mut self, ctx: &StepContext<'_>) -> StepOutcome {
        self.age = self.age.saturating_add(1);

        match self.lifecycle {
            Lifecycle::Fading => {
                self.surface = ctx.height.elevation(self.position.x, self.position.y);
                self.collapse_trail(ctx.physics.trail_collapse_rate, ctx.physics.hover_offset);
                self.visual
                    .decay(ctx.physics.fade_out_speed, ctx.physics.fade_glow_decay);
                if self.visual.scale < ctx.physics.despawn_scale {
                    return StepOutcome::Destroyed;
                }
            }
            // Held in place; velocity carries over to the release
            Lifecycle::Active if ctx.staging => {
                self.surface = ctx.height.elevation(self.position.x, self.position.y);
                let head = self.head(ctx.physics.hover_offset);
                self.trail.fill(head);
                self.visual
                    .update_staged(self.surface, ctx.terrain, ctx.appearance);
            }
            Lifecycle::Active => {
                self.integrate(ctx);
                self.surface = ctx.height.elevation(self.position.x, self.position.y);
                let head = self.head(ctx.physics.hover_offset);
                self.trail.rotate_right(1);
                self.trail[0] = head;
                self.visual.update_active(
                    self.speed(),
                    self.surface,
                    ctx.frame_scale,
                    ctx.terrain,
                    ctx.appearance,
                );
            }
        }
        StepOutcome::Alive
    }

    fn integrate(&mut self, ctx: &StepContext<'_>) {
        let physics = ctx.physics;
        let fs = ctx.frame_scale;
        let grad = ctx.gradient.sample(self.position.x, self.position.y);

        self.velocity = self.velocity * physics.momentum - grad * (physics.learning_rate * fs);
        if !(self.velocity.x.is_finite() && self.velocity.y.is_finite()) {
            self.velocity = Vec2::zeros();
        }
        let speed = self.velocity.norm();
        if speed > physics.max_speed {
            self.velocity *= physics.max_speed / speed;
        }

        let next = self.position + self.velocity * fs;
        let (x, z) = ctx.height.clamp_to_extent(next.x, next.y);
        // Stop motion into the terrain edge
        if x != next.x {
            self.velocity.x = 0.0;
        }
        if z != next.y {
            self.velocity.y = 0.0;
        }
        self.position = Vec2::new(x, z);
    }

    fn collapse_trail(&mut self, rate: f32, hover: f32) {
        let head = self.head(hover);
        for point in &mut self.trail {
            *point += (head - *point) * rate;
        }
    }

    fn head(&self, hover: f32) -> Vec3 {
        Vec3::new(self.position.x, self.surface + hover, self.position.y)
    }

    /// Flag for fade-out. Irreversible.
    pub fn begin_fade(&mut self) {
        self.lifecycle = Lifecycle::Fading;
    }

    pub fn id(&self) -> ParticleId {
        self.id
    }

    /// Ground-plane position `(x, z)`
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// World position including hover offset (trail head)
    pub fn world_position(&self) -> Vec3 {
        self.trail
            .first()
            .copied()
            .unwrap_or_else(|| Vec3::new(self.position.x, self.surface, self.position.y))
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    /// Surface elevation under the particle
    pub fn surface(&self) -> f32 {
        self.surface
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn trail(&self) -> &[Vec3] {
        &self.trail
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_fading(&self) -> bool {
        self.lifecycle == Lifecycle::Fading
    }

    pub fn visual(&self) -> &VisualState {
        &self.visual
    }

    #[cfg(test)]
    pub(crate) fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LandscapeConfig;

    struct World {
        config: LandscapeConfig,
        height: HeightField,
        gradient: GradientField,
    }

    impl World {
        fn new() -> Self {
            let mut config = LandscapeConfig::seeded(42);
            config.terrain.width = 400.0;
            config.terrain.depth = 400.0;
            let height = HeightField::new(&config.terrain, 42);
            let gradient = GradientField::build(&height, 101, config.terrain.gradient_step);
            Self {
                config,
                height,
                gradient,
            }
        }

        fn ctx(&self, staging: bool, frame_scale: f32) -> StepContext<'_> {
            StepContext {
                height: &self.height,
                gradient: &self.gradient,
                terrain: &self.config.terrain,
                physics: &self.config.physics,
                appearance: &self.config.appearance,
                frame_scale,
                staging,
            }
        }

        fn spawn(&self, x: f32, z: f32) -> Particle {
            Particle::spawn(
                1,
                x,
                z,
                &self.height,
                &self.config.terrain,
                &self.config.physics,
                &self.config.appearance,
            )
        }
    }

    #[test]
    fn test_spawn_state() {
        let world = World::new();
        let p = world.spawn(10.0, -20.0);
        assert_eq!(p.lifecycle(), Lifecycle::Active);
        assert_eq!(p.age(), 0);
        assert_eq!(p.trail().len(), world.config.physics.trail_length);
        let expected_y = world.height.elevation(10.0, -20.0) + world.config.physics.hover_offset;
        assert_eq!(p.world_position(), Vec3::new(10.0, expected_y, -20.0));
    }

    #[test]
    fn test_staged_particle_holds_position() {
        let world = World::new();
        let mut p = world.spawn(33.0, 41.0);
        p.set_velocity(Vec2::new(1.0, 1.0));
        for _ in 0..10 {
            assert_eq!(p.step(&world.ctx(true, 1.0)), StepOutcome::Alive);
        }
        assert_eq!(p.position(), Vec2::new(33.0, 41.0));
        let head = p.world_position();
        assert!(p.trail().iter().all(|&t| t == head));
        assert_eq!(p.age(), 10);
    }

    #[test]
    fn test_staging_keeps_velocity_for_release() {
        let world = World::new();
        let mut p = world.spawn(-40.0, 25.0);
        let v0 = Vec2::new(-1.5, 0.75);
        p.set_velocity(v0);
        for _ in 0..5 {
            p.step(&world.ctx(true, 1.0));
        }
        assert_eq!(p.velocity(), v0);
        assert_eq!(p.position(), Vec2::new(-40.0, 25.0));

        // First free step continues from the carried velocity
        let physics = &world.config.physics;
        let grad = world.gradient.sample(-40.0, 25.0);
        p.step(&world.ctx(false, 1.0));
        let expected_v = v0 * physics.momentum - grad * physics.learning_rate;
        assert!((p.velocity() - expected_v).norm() < 1e-5);
    }

    #[test]
    fn test_active_particle_descends() {
        let world = World::new();
        let mut p = world.spawn(57.0, -83.0);
        let start = p.surface();
        for _ in 0..300 {
            p.step(&world.ctx(false, 1.0));
        }
        assert!(
            p.surface() < start,
            "Expected descent from {start}, ended at {}",
            p.surface()
        );
    }

    #[test]
    fn test_first_active_step_follows_formula() {
        let world = World::new();
        let mut p = world.spawn(57.0, -83.0);
        let physics = &world.config.physics;
        let grad = world.gradient.sample(57.0, -83.0);
        let v0 = Vec2::new(0.5, -0.25);
        p.set_velocity(v0);

        p.step(&world.ctx(false, 2.0));

        let mut expected_v = v0 * physics.momentum - grad * (physics.learning_rate * 2.0);
        if expected_v.norm() > physics.max_speed {
            expected_v *= physics.max_speed / expected_v.norm();
        }
        let expected_p = Vec2::new(57.0, -83.0) + expected_v * 2.0;
        assert!((p.velocity() - expected_v).norm() < 1e-5);
        assert!((p.position() - expected_p).norm() < 1e-4);
    }

    #[test]
    fn test_speed_is_capped() {
        let world = World::new();
        let mut p = world.spawn(0.0, 0.0);
        p.set_velocity(Vec2::new(500.0, 0.0));
        p.step(&world.ctx(false, 1.0));
        assert!(p.speed() <= world.config.physics.max_speed + 1e-4);
    }

    #[test]
    fn test_trail_shifts_most_recent_first() {
        let world = World::new();
        let mut p = world.spawn(5.0, 5.0);
        p.set_velocity(Vec2::new(2.0, 0.0));
        p.step(&world.ctx(false, 1.0));
        let first_head = p.world_position();
        p.step(&world.ctx(false, 1.0));
        assert_eq!(p.trail()[0], p.world_position());
        assert_eq!(p.trail()[1], first_head);
        assert_eq!(p.trail().len(), world.config.physics.trail_length);
    }

    #[test]
    fn test_position_stays_inside_extent() {
        let world = World::new();
        let mut p = world.spawn(199.0, 0.0);
        p.set_velocity(Vec2::new(4.0, 0.0));
        p.step(&world.ctx(false, 3.0));
        assert!(p.position().x <= 200.0);
        assert!(p.velocity().x <= 0.0 || p.position().x < 200.0);
    }

    #[test]
    fn test_fading_destroys_within_bound() {
        let world = World::new();
        let mut p = world.spawn(12.0, 12.0);
        p.step(&world.ctx(false, 1.0));
        p.begin_fade();
        let physics = &world.config.physics;
        let start = p.visual().scale;
        let bound = ((physics.despawn_scale / start).ln() / physics.fade_out_speed.ln()).ceil()
            as u32
            + 1;

        let position = p.position();
        let mut ticks = 0;
        while p.step(&world.ctx(false, 1.0)) == StepOutcome::Alive {
            ticks += 1;
            assert!(ticks <= bound, "Particle outlived fade bound {bound}");
            assert_eq!(p.position(), position, "Fading particle moved");
            assert_eq!(p.trail().len(), physics.trail_length);
        }
        assert!(p.is_fading());
    }

    #[test]
    fn test_fading_trail_converges_to_head() {
        let world = World::new();
        let mut p = world.spawn(20.0, 20.0);
        p.set_velocity(Vec2::new(3.0, 1.0));
        for _ in 0..5 {
            p.step(&world.ctx(false, 1.0));
        }
        p.begin_fade();
        let head = p.world_position();
        let spread = |p: &Particle| {
            p.trail()
                .iter()
                .map(|t| (t - head).norm())
                .fold(0.0_f32, f32::max)
        };
        let before = spread(&p);
        assert!(before > 0.0);
        for _ in 0..20 {
            p.step(&world.ctx(false, 1.0));
        }
        assert!(spread(&p) < before * 0.5);
        assert_eq!(p.trail().len(), world.config.physics.trail_length);
    }
}

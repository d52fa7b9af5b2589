//! Loss-landscape simulation context
//!
//! `LossLandscape` owns every piece of mutable simulation state: the wave
//! scheduler, the spawn queue (inside the scheduler), the spawn RNG, and the
//! particle list. A single driver calls [`LossLandscape::tick`] once per
//! frame; nothing is shared across threads and nothing suspends mid-tick.
//!
//! Each tick runs, in order:
//! 1. wave-state transitions (fading every live particle when a wave ends)
//! 2. one spawn batch, bounded by `batch_cap`
//! 3. one step per particle with a shared frame scale
//! 4. removal of destroyed particles (ids queued for `drain_despawned`)

pub mod appearance;
pub mod particle;
pub mod spawn;
pub mod wave;

pub use appearance::VisualState;
pub use particle::{Lifecycle, Particle, ParticleId};
pub use spawn::{GroundHit, GroundIntersector, PlanarGroundPicker, SiteRejection, SpawnSelector};
pub use wave::{WaveScheduler, WaveState, WaveTransition};

use crate::config::{ConfigError, LandscapeConfig};
use crate::core_types::{Vec2, Vec3};
use crate::grid::{GradientField, HeightField, TerrainMesh};
use crate::render::ParticleInstance;
use particle::{StepContext, StepOutcome};
use rand::Rng;
use tracing::{debug, info};

/// Upper bound (exclusive) for randomly drawn terrain seeds
const RANDOM_SEED_RANGE: u32 = 10_000;

/// Summary of one [`LossLandscape::tick`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Scheduler state after the tick
    pub state: WaveState,
    /// Transition taken this tick, if any
    pub transition: Option<WaveTransition>,
    /// Particles placed by the wave batch
    pub spawned: u32,
    /// Particles destroyed this tick
    pub despawned: u32,
    /// Live particles after removal
    pub live: usize,
    /// Slots still queued for the current wave
    pub spawn_queue: u32,
    /// Frame scale shared by every particle this tick
    pub frame_scale: f32,
}

/// Cumulative counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandscapeStats {
    pub live_particles: usize,
    pub total_spawned: u64,
    pub total_despawned: u64,
    pub waves_started: u32,
    pub waves_completed: u32,
    pub forced_settles: u32,
    pub ticks: u64,
}

/// Terrain, gradient grid, wave scheduler, and particles
pub struct LossLandscape {
    config: LandscapeConfig,
    height: HeightField,
    gradient: GradientField,
    scheduler: WaveScheduler,
    selector: SpawnSelector,
    particles: Vec<Particle>,
    next_id: ParticleId,
    despawned: Vec<ParticleId>,
    time: f64,
    ticks: u64,
    total_spawned: u64,
    total_despawned: u64,
}

impl LossLandscape {
    /// Validate `config`, resolve the seed, and build the gradient grid.
    ///
    /// The gradient build is the only expensive step and completes before
    /// this returns, so no tick ever sees a partial grid.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn new(mut config: LandscapeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = if let Some(seed) = config.terrain.seed {
            seed
        } else {
            let seed = rand::rng().random_range(0..RANDOM_SEED_RANGE);
            config.terrain.seed = Some(seed);
            seed
        };

        info!(
            "Creating loss landscape: seed={}, extent={}x{}, octaves={}",
            seed, config.terrain.width, config.terrain.depth, config.terrain.octaves
        );

        let height = HeightField::new(&config.terrain, seed);
        let gradient = GradientField::build(
            &height,
            config.terrain.gradient_resolution,
            config.terrain.gradient_step,
        );
        let scheduler = WaveScheduler::new(&config.wave, config.physics.reference_frame);
        let selector = SpawnSelector::new(&config.spawn, seed);

        Ok(Self {
            config,
            height,
            gradient,
            scheduler,
            selector,
            particles: Vec::new(),
            next_id: 0,
            despawned: Vec::new(),
            time: 0.0,
            ticks: 0,
            total_spawned: 0,
            total_despawned: 0,
        })
    }

    /// `dt / reference_frame`, clamped to `[0, max_frame_scale]`
    pub fn frame_scale(&self, dt: f64) -> f32 {
        let physics = &self.config.physics;
        let scale = dt as f32 / physics.reference_frame;
        if scale.is_nan() {
            0.0
        } else {
            scale.clamp(0.0, physics.max_frame_scale)
        }
    }

    /// Advance the simulation to time `now` (seconds), `dt` after the last tick
    pub fn tick(&mut self, now: f64, dt: f64, ground: &dyn GroundIntersector) -> TickReport {
        let frame_scale = self.frame_scale(dt);
        self.time = now;
        self.ticks += 1;

        // 1. Scheduler
        let settled = self.settled();
        let transition = self.scheduler.update(now, frame_scale, settled);
        if let Some(t) = transition {
            if t.to == WaveState::Waiting {
                for particle in &mut self.particles {
                    particle.begin_fade();
                }
            }
        }

        // 2. Spawn batch
        let spawned = self.spawn_batch(now, ground);

        // 3-4. Step and remove
        let despawned = self.step_particles(frame_scale);

        TickReport {
            state: self.scheduler.state(),
            transition,
            spawned,
            despawned,
            live: self.particles.len(),
            spawn_queue: self.scheduler.spawn_queue(),
            frame_scale,
        }
    }

    /// `None` without non-fading particles, else whether all have settled
    fn settled(&self) -> Option<bool> {
        let wave = &self.config.wave;
        let mut any = false;
        for particle in self.particles.iter().filter(|p| !p.is_fading()) {
            any = true;
            if particle.speed() >= wave.settle_velocity || particle.age() < wave.settle_min_age {
                return Some(false);
            }
        }
        any.then_some(true)
    }

    fn spawn_batch(&mut self, now: f64, ground: &dyn GroundIntersector) -> u32 {
        let slots = self.scheduler.spawn_queue().min(self.config.spawn.batch_cap);
        let mut spawned = 0;
        for _ in 0..slots {
            if self.particles.len() >= self.config.spawn.max_particles {
                break;
            }
            // A failed slot stays queued for the next tick
            let Some(site) = self.selector.find_site(&self.height, ground) else {
                continue;
            };
            self.push_particle(site.x, site.y);
            self.scheduler.record_placement(now);
            spawned += 1;
        }
        spawned
    }

    fn step_particles(&mut self, frame_scale: f32) -> u32 {
        let ctx = StepContext {
            height: &self.height,
            gradient: &self.gradient,
            terrain: &self.config.terrain,
            physics: &self.config.physics,
            appearance: &self.config.appearance,
            frame_scale,
            staging: self.scheduler.is_staging(),
        };

        let despawned = &mut self.despawned;
        let mut removed = 0;
        self.particles.retain_mut(|particle| match particle.step(&ctx) {
            StepOutcome::Alive => true,
            StepOutcome::Destroyed => {
                despawned.push(particle.id());
                removed += 1;
                false
            }
        });
        self.total_despawned += u64::from(removed);
        removed
    }

    fn push_particle(&mut self, x: f32, z: f32) -> ParticleId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.particles.push(Particle::spawn(
            id,
            x,
            z,
            &self.height,
            &self.config.terrain,
            &self.config.physics,
            &self.config.appearance,
        ));
        self.total_spawned += 1;
        id
    }

    /// Place a click cluster around world `point`.
    ///
    /// Returns the ids placed; empty when the point is off the terrain or the
    /// particle cap is reached.
    pub fn spawn_at(&mut self, point: Vec3) -> Vec<ParticleId> {
        if !self.height.contains(point.x, point.z, 0.0) {
            debug!(
                "Click at ({:.2}, {:.2}) is outside the terrain",
                point.x, point.z
            );
            return Vec::new();
        }

        let interaction = &self.config.interaction;
        let (count, radius) = (interaction.click_cluster_size, interaction.click_jitter_radius);
        let center = Vec2::new(point.x, point.z);
        let mut ids = Vec::new();
        for _ in 0..count {
            if self.particles.len() >= self.config.spawn.max_particles {
                break;
            }
            let p = self.selector.jitter(center, radius);
            let (x, z) = self.height.clamp_to_extent(p.x, p.y);
            ids.push(self.push_particle(x, z));
        }
        debug!(
            "Click spawned {} particles at ({:.2}, {:.2})",
            ids.len(),
            point.x,
            point.z
        );
        ids
    }

    /// Resolve a view query through `ground` and spawn a cluster there
    pub fn click(&mut self, query: Vec2, ground: &dyn GroundIntersector) -> Vec<ParticleId> {
        match ground.intersect(query) {
            Some(hit) => self.spawn_at(hit.point),
            None => Vec::new(),
        }
    }

    /// Fill `out` with render records; returns how many were written
    pub fn write_instances(&self, out: &mut [ParticleInstance]) -> usize {
        let mut written = 0;
        for (slot, particle) in out.iter_mut().zip(&self.particles) {
            *slot = ParticleInstance::from(particle);
            written += 1;
        }
        written
    }

    /// Render records for every live particle
    pub fn instances(&self) -> Vec<ParticleInstance> {
        self.particles.iter().map(ParticleInstance::from).collect()
    }

    /// Fill `out` with trail points, `trail_length` per particle in particle
    /// order. Only whole trails are written; returns the number of trails.
    pub fn write_trails(&self, out: &mut [[f32; 3]]) -> usize {
        let len = self.config.physics.trail_length;
        let mut written = 0;
        for (chunk, particle) in out.chunks_exact_mut(len).zip(&self.particles) {
            for (slot, point) in chunk.iter_mut().zip(particle.trail()) {
                *slot = [point.x, point.y, point.z];
            }
            written += 1;
        }
        written
    }

    /// Ids destroyed since the last call; their render resources can be freed
    pub fn drain_despawned(&mut self) -> Vec<ParticleId> {
        std::mem::take(&mut self.despawned)
    }

    /// Destroy every particle at once.
    ///
    /// Returns all ids whose render resources must be released, including
    /// any not yet drained.
    pub fn teardown(&mut self) -> Vec<ParticleId> {
        let mut ids = std::mem::take(&mut self.despawned);
        ids.extend(self.particles.drain(..).map(|p| p.id()));
        self.total_despawned += ids.len() as u64;
        info!("Loss landscape torn down, released {} particles", ids.len());
        ids
    }

    /// Terrain vertex/index buffers for the renderer
    pub fn terrain_mesh(&self) -> TerrainMesh {
        TerrainMesh::build(
            &self.height,
            &self.config.terrain,
            self.config.terrain.mesh_segments,
        )
    }

    /// Terrain elevation at `(x, z)`
    pub fn elevation(&self, x: f32, z: f32) -> f32 {
        self.height.elevation(x, z)
    }

    /// Configuration with the resolved seed
    pub fn config(&self) -> &LandscapeConfig {
        &self.config
    }

    pub fn seed(&self) -> u32 {
        self.height.seed()
    }

    pub fn height_field(&self) -> &HeightField {
        &self.height
    }

    pub fn gradient_field(&self) -> &GradientField {
        &self.gradient
    }

    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    pub fn wave_state(&self) -> WaveState {
        self.scheduler.state()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Time passed to the latest tick
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn stats(&self) -> LandscapeStats {
        LandscapeStats {
            live_particles: self.particles.len(),
            total_spawned: self.total_spawned,
            total_despawned: self.total_despawned,
            waves_started: self.scheduler.waves_started(),
            waves_completed: self.scheduler.waves_completed(),
            forced_settles: self.scheduler.forced_settles(),
            ticks: self.ticks,
        }
    }
}

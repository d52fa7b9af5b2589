//! Landscape configuration
//!
//! All tunables are grouped the way the simulation consumes them:
//! - [`TerrainConfig`] - noise shape, extent, seed, display height range
//! - [`WaveConfig`] - wave timing and the swell indicator
//! - [`PhysicsConfig`] - momentum descent and frame normalization
//! - [`AppearanceConfig`] - visual-state derivation for the render sink
//! - [`SpawnConfig`] - spawn-site selection and batch limits
//! - [`InteractionConfig`] - click-to-spawn behaviour
//!
//! The configuration is read-only once a [`crate::LossLandscape`] has been built.
//! The only value resolved at construction is the terrain seed when none is fixed.

use crate::core_types::Color;
use serde::{Deserialize, Serialize};

/// Resolution preset for the precomputed grids
///
/// Higher quality means a denser gradient grid and terrain mesh at a higher
/// one-time build cost. Per-tick cost is unaffected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityPreset {
    /// 200² gradient grid, 128-segment mesh
    Low,
    /// 350² gradient grid, 256-segment mesh
    #[default]
    Medium,
    /// 512² gradient grid, 384-segment mesh
    High,
}

impl QualityPreset {
    /// Gradient grid resolution (samples per axis)
    #[must_use]
    pub const fn gradient_resolution(&self) -> usize {
        match self {
            Self::Low => 200,
            Self::Medium => 350,
            Self::High => 512,
        }
    }

    /// Terrain mesh segments per axis
    #[must_use]
    pub const fn mesh_segments(&self) -> u32 {
        match self {
            Self::Low => 128,
            Self::Medium => 256,
            Self::High => 384,
        }
    }
}

/// Terrain shape and noise parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Extent along X (world units), centered on the origin
    pub width: f32,
    /// Extent along Z (world units), centered on the origin
    pub depth: f32,
    /// Fixed noise seed; `None` draws one at startup
    pub seed: Option<u32>,
    /// Number of fBm octaves
    pub octaves: u32,
    /// Frequency of the first octave (lattice cells per world unit).
    ///
    /// Bounds the finest octave's wavelength; it must stay several gradient
    /// grid cells wide for the bilinear lookup to follow the surface.
    pub base_frequency: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
    /// Amplitude multiplier per octave
    pub gain: f64,
    /// Exponent applied to each ridged octave
    pub ridge_power: f64,
    /// Subtracted from the octave sum before scaling
    pub height_offset: f64,
    /// Final elevation multiplier
    pub height_scale: f64,
    /// Gradient grid resolution (samples per axis)
    pub gradient_resolution: usize,
    /// Central-difference step used to build the gradient grid
    pub gradient_step: f32,
    /// Terrain mesh segments per axis
    pub mesh_segments: u32,
    /// Lowest elevation of the display range (maps to "low loss")
    pub min_height: f32,
    /// Highest elevation of the display range
    pub max_height: f32,
    /// Terrain color at `min_height`
    pub low_color: Color,
    /// Terrain color at `max_height`
    pub high_color: Color,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        let quality = QualityPreset::default();
        Self {
            width: 2000.0,
            depth: 2000.0,
            seed: None,
            octaves: 5,
            base_frequency: 0.0005,
            lacunarity: 2.1,
            gain: 0.55,
            ridge_power: 3.0,
            height_offset: 0.5,
            height_scale: 28.0,
            gradient_resolution: quality.gradient_resolution(),
            gradient_step: 0.05,
            mesh_segments: quality.mesh_segments(),
            min_height: -15.0,
            max_height: 45.0,
            low_color: Color::new(0.02, 0.05, 0.12),
            high_color: Color::new(0.18, 0.32, 0.55),
        }
    }
}

/// Wave timing (seconds) and the swell indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Delay before the very first swell begins
    pub first_delay: f64,
    /// Time spent in WAITING before swelling
    pub buffer_time: f64,
    /// Duration of the swell
    pub swell_time: f64,
    /// Particles queued when a wave goes ACTIVE
    pub particles_per_wave: u32,
    /// Forced-settle timeout for an ACTIVE wave
    pub max_wave_interval: f64,
    /// Speed under which a particle counts as settled
    pub settle_velocity: f32,
    /// Minimum age (ticks) before a particle may count as settled
    pub settle_min_age: u32,
    /// Swell indicator resting value
    pub swell_baseline: f32,
    /// Swell indicator peak value
    pub swell_peak: f32,
    /// Per-reference-frame retention while exhaling toward baseline
    pub exhale_decay: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            first_delay: 1.5,
            buffer_time: 2.0,
            swell_time: 1.8,
            particles_per_wave: 40,
            max_wave_interval: 14.0,
            settle_velocity: 0.02,
            settle_min_age: 90,
            swell_baseline: 0.08,
            swell_peak: 0.35,
            exhale_decay: 0.95,
        }
    }
}

/// Gradient-descent physics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Velocity retention per tick (not frame-scaled)
    pub momentum: f32,
    /// Gradient force multiplier
    pub learning_rate: f32,
    /// Speed cap applied after integration
    pub max_speed: f32,
    /// Reference frame duration (seconds) that `frame_scale = 1` stands for
    pub reference_frame: f32,
    /// Upper bound on `frame_scale` after long frames
    pub max_frame_scale: f32,
    /// Height of the particle above the surface
    pub hover_offset: f32,
    /// Multiplicative scale decay per tick while fading
    pub fade_out_speed: f32,
    /// Multiplicative glow/opacity decay per tick while fading
    pub fade_glow_decay: f32,
    /// Scale under which a fading particle is destroyed
    pub despawn_scale: f32,
    /// Number of trail points per particle
    pub trail_length: usize,
    /// Fraction of the gap to the head a fading trail closes per tick
    pub trail_collapse_rate: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            momentum: 0.92,
            learning_rate: 0.3,
            max_speed: 4.0,
            reference_frame: 1.0 / 60.0,
            max_frame_scale: 3.0,
            hover_offset: 1.2,
            fade_out_speed: 0.98,
            fade_glow_decay: 0.94,
            despawn_scale: 0.01,
            trail_length: 24,
            trail_collapse_rate: 0.15,
        }
    }
}

/// Visual-state derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceConfig {
    /// Smallest loss-dependent size
    pub min_scale: f32,
    /// Largest loss-dependent size
    pub max_scale: f32,
    /// Exponent on normalized elevation (or its complement)
    pub size_emphasis: f32,
    /// Grow with elevation instead of shrinking
    pub reverse_scaling: bool,
    /// Glow at rest
    pub glow_min: f32,
    /// Glow at full reaction
    pub glow_max: f32,
    /// Opacity at rest
    pub opacity_min: f32,
    /// Opacity at full reaction
    pub opacity_max: f32,
    /// Speed multiplier feeding the reaction factor
    pub reaction_sensitivity: f32,
    /// Speed multiplier feeding the color factor
    pub color_sensitivity: f32,
    /// Exponent on the color factor
    pub color_power: f32,
    /// Color of a slow seeker
    pub active_color: Color,
    /// Color of a fast seeker
    pub flash_color: Color,
    /// Maximum additive speed boost on scale
    pub speed_boost_max: f32,
    /// Speed multiplier feeding the boost target
    pub boost_sensitivity: f32,
    /// Boost interpolation rate per reference frame
    pub boost_rate: f32,
    /// Boost interpolation rate when nearly stationary
    pub boost_rate_still: f32,
    /// Speed under which a seeker counts as nearly stationary
    pub still_speed: f32,
    /// Glow while staged
    pub staging_glow: f32,
    /// Scale multiplier while staged
    pub staging_scale: f32,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.6,
            max_scale: 2.2,
            size_emphasis: 1.6,
            reverse_scaling: false,
            glow_min: 0.4,
            glow_max: 2.5,
            opacity_min: 0.55,
            opacity_max: 1.0,
            reaction_sensitivity: 0.6,
            color_sensitivity: 0.5,
            color_power: 1.5,
            active_color: Color::new(0.35, 0.75, 1.0),
            flash_color: Color::new(1.0, 0.95, 0.8),
            speed_boost_max: 0.8,
            boost_sensitivity: 0.4,
            boost_rate: 0.15,
            boost_rate_still: 0.03,
            still_speed: 0.05,
            staging_glow: 3.0,
            staging_scale: 1.25,
        }
    }
}

/// Spawn-site selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Maximum spawn slots attempted per tick
    pub batch_cap: u32,
    /// Draws per slot before the slot rolls into the next tick
    pub attempts_per_slot: u32,
    /// Lowest terrain elevation accepted as a spawn site
    pub min_spawn_height: f32,
    /// Distance from the terrain edge a site must keep
    pub edge_margin: f32,
    /// Exponent pulling horizontal draws toward the view center (>1)
    pub horizontal_bias: f32,
    /// Exponent pulling distance draws toward the near edge (>1)
    pub distance_bias: f32,
    /// Interior points sampled along the camera-to-site segment
    pub los_samples: u32,
    /// Height the sight line must keep above the terrain
    pub los_clearance: f32,
    /// Live particle cap
    pub max_particles: usize,
    /// Seed for spawn draws; `None` uses the terrain seed
    pub rng_seed: Option<u64>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            batch_cap: 6,
            attempts_per_slot: 4,
            min_spawn_height: 4.0,
            edge_margin: 20.0,
            horizontal_bias: 1.4,
            distance_bias: 1.8,
            los_samples: 5,
            los_clearance: 0.5,
            max_particles: 400,
            rng_seed: None,
        }
    }
}

/// Click-to-spawn behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Seekers placed per click
    pub click_cluster_size: u32,
    /// Radius of the jitter disc around the click point
    pub click_jitter_radius: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            click_cluster_size: 5,
            click_jitter_radius: 12.0,
        }
    }
}

/// Complete landscape configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandscapeConfig {
    pub terrain: TerrainConfig,
    pub wave: WaveConfig,
    pub physics: PhysicsConfig,
    pub appearance: AppearanceConfig,
    pub spawn: SpawnConfig,
    pub interaction: InteractionConfig,
}

impl LandscapeConfig {
    /// Default configuration with grids sized by `quality`
    #[must_use]
    pub fn with_quality(quality: QualityPreset) -> Self {
        let mut config = Self::default();
        config.terrain.gradient_resolution = quality.gradient_resolution();
        config.terrain.mesh_segments = quality.mesh_segments();
        config
    }

    /// Default configuration with a fixed terrain seed
    #[must_use]
    pub fn seeded(seed: u32) -> Self {
        let mut config = Self::default();
        config.terrain.seed = Some(seed);
        config
    }

    /// Check every group for values the simulation cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.terrain;
        positive("terrain.width", t.width)?;
        positive("terrain.depth", t.depth)?;
        if t.octaves == 0 {
            return Err(ConfigError::Zero("terrain.octaves"));
        }
        positive_f64("terrain.base_frequency", t.base_frequency)?;
        positive_f64("terrain.lacunarity", t.lacunarity)?;
        positive_f64("terrain.gain", t.gain)?;
        positive_f64("terrain.ridge_power", t.ridge_power)?;
        if !t.height_offset.is_finite() || !t.height_scale.is_finite() {
            return Err(ConfigError::NotFinite("terrain.height_scale"));
        }
        if t.gradient_resolution < 2 {
            return Err(ConfigError::GridTooSmall(t.gradient_resolution));
        }
        positive("terrain.gradient_step", t.gradient_step)?;
        if t.mesh_segments == 0 {
            return Err(ConfigError::Zero("terrain.mesh_segments"));
        }
        ordered("terrain.min_height", t.min_height, t.max_height)?;

        let w = &self.wave;
        non_negative_f64("wave.first_delay", w.first_delay)?;
        non_negative_f64("wave.buffer_time", w.buffer_time)?;
        positive_f64("wave.swell_time", w.swell_time)?;
        positive_f64("wave.max_wave_interval", w.max_wave_interval)?;
        fraction("wave.exhale_decay", w.exhale_decay)?;
        if w.swell_peak < w.swell_baseline {
            return Err(ConfigError::InvertedRange("wave.swell_baseline"));
        }

        let p = &self.physics;
        fraction("physics.momentum", p.momentum)?;
        non_negative("physics.learning_rate", p.learning_rate)?;
        positive("physics.max_speed", p.max_speed)?;
        positive("physics.reference_frame", p.reference_frame)?;
        positive("physics.max_frame_scale", p.max_frame_scale)?;
        fraction("physics.fade_out_speed", p.fade_out_speed)?;
        fraction("physics.fade_glow_decay", p.fade_glow_decay)?;
        positive("physics.despawn_scale", p.despawn_scale)?;
        if p.trail_length == 0 {
            return Err(ConfigError::Zero("physics.trail_length"));
        }
        fraction("physics.trail_collapse_rate", p.trail_collapse_rate)?;

        let a = &self.appearance;
        positive("appearance.min_scale", a.min_scale)?;
        ordered("appearance.min_scale", a.min_scale, a.max_scale)?;
        ordered("appearance.glow_min", a.glow_min, a.glow_max)?;
        ordered("appearance.opacity_min", a.opacity_min, a.opacity_max)?;
        positive("appearance.size_emphasis", a.size_emphasis)?;
        positive("appearance.color_power", a.color_power)?;
        fraction("appearance.boost_rate", a.boost_rate)?;
        fraction("appearance.boost_rate_still", a.boost_rate_still)?;

        let s = &self.spawn;
        if s.batch_cap == 0 {
            return Err(ConfigError::Zero("spawn.batch_cap"));
        }
        if s.attempts_per_slot == 0 {
            return Err(ConfigError::Zero("spawn.attempts_per_slot"));
        }
        non_negative("spawn.edge_margin", s.edge_margin)?;
        positive("spawn.horizontal_bias", s.horizontal_bias)?;
        positive("spawn.distance_bias", s.distance_bias)?;
        if s.edge_margin * 2.0 >= t.width.min(t.depth) {
            return Err(ConfigError::OutOfRange {
                field: "spawn.edge_margin",
                value: s.edge_margin,
            });
        }

        non_negative(
            "interaction.click_jitter_radius",
            self.interaction.click_jitter_radius,
        )?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite(field));
    }
    if value <= 0.0 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite(field));
    }
    if value < 0.0 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}

fn positive_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    positive(field, value as f32)
}

fn non_negative_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    non_negative(field, value as f32)
}

/// Retention factors must lie in (0, 1]
fn fraction(field: &'static str, value: f32) -> Result<(), ConfigError> {
    positive(field, value)?;
    if value > 1.0 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}

fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(ConfigError::NotFinite(field));
    }
    if min > max {
        return Err(ConfigError::InvertedRange(field));
    }
    Ok(())
}

/// Errors reported by [`LandscapeConfig::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value is NaN or infinite
    NotFinite(&'static str),
    /// Value lies outside its accepted range
    OutOfRange { field: &'static str, value: f32 },
    /// Count must be non-zero
    Zero(&'static str),
    /// Lower bound of a pair exceeds the upper bound
    InvertedRange(&'static str),
    /// Gradient grid needs at least 2×2 samples
    GridTooSmall(usize),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFinite(field) => write!(f, "{field} must be finite"),
            ConfigError::OutOfRange { field, value } => {
                write!(f, "{field} is out of range: {value}")
            }
            ConfigError::Zero(field) => write!(f, "{field} must be non-zero"),
            ConfigError::InvertedRange(field) => {
                write!(f, "{field} exceeds its upper bound")
            }
            ConfigError::GridTooSmall(resolution) => {
                write!(f, "gradient resolution must be at least 2, got {resolution}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

//! Procedural loss surface
//!
//! The height field is a pure function of `(x, z)`: ridged value noise summed
//! over several octaves (fractal Brownian motion), offset and scaled into a
//! loss-like elevation. Nothing is stored; every query evaluates the noise.

use crate::config::TerrainConfig;
use crate::core_types::{ridge, value_noise_2d, Vec3};

/// Central-difference step for surface normals
pub const NORMAL_STEP: f32 = 0.05;

/// Deterministic ridged-fBm elevation over the terrain extent
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    seed: u32,
    octaves: u32,
    base_frequency: f64,
    lacunarity: f64,
    gain: f64,
    ridge_power: f64,
    height_offset: f64,
    height_scale: f64,
    width: f32,
    depth: f32,
}

impl HeightField {
    /// Create a height field from terrain parameters and a resolved seed
    pub fn new(config: &TerrainConfig, seed: u32) -> Self {
        Self {
            seed,
            octaves: config.octaves,
            base_frequency: config.base_frequency,
            lacunarity: config.lacunarity,
            gain: config.gain,
            ridge_power: config.ridge_power,
            height_offset: config.height_offset,
            height_scale: config.height_scale,
            width: config.width,
            depth: config.depth,
        }
    }

    /// Elevation at `(x, z)` in double precision.
    ///
    /// Sums `octaves` ridged noise layers; frequency grows by `lacunarity` and
    /// amplitude shrinks by `gain` per octave. Non-finite results are
    /// reported as zero.
    pub fn elevation_f64(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.base_frequency;

        for _ in 0..self.octaves {
            let n = value_noise_2d(x * frequency, z * frequency, self.seed);
            total += ridge(n, self.ridge_power) * amplitude;
            frequency *= self.lacunarity;
            amplitude *= self.gain;
        }

        let elevation = (total - self.height_offset) * self.height_scale;
        if elevation.is_finite() {
            elevation
        } else {
            0.0
        }
    }

    /// Elevation at `(x, z)`
    #[inline]
    pub fn elevation(&self, x: f32, z: f32) -> f32 {
        self.elevation_f64(f64::from(x), f64::from(z)) as f32
    }

    /// Central-difference gradient `(∂h/∂x, ∂h/∂z)` with step `h`.
    ///
    /// Four elevation evaluations. Non-finite partials are replaced with zero.
    pub fn central_gradient(&self, x: f32, z: f32, h: f32) -> (f32, f32) {
        let (x, z, h) = (f64::from(x), f64::from(z), f64::from(h));
        let dx = (self.elevation_f64(x + h, z) - self.elevation_f64(x - h, z)) / (2.0 * h);
        let dz = (self.elevation_f64(x, z + h) - self.elevation_f64(x, z - h)) / (2.0 * h);
        (finite_or_zero(dx as f32), finite_or_zero(dz as f32))
    }

    /// Unit surface normal at `(x, z)`
    pub fn normal_at(&self, x: f32, z: f32, h: f32) -> Vec3 {
        let (dx, dz) = self.central_gradient(x, z, h);
        Vec3::new(-dx, 1.0, -dz).normalize()
    }

    /// Whether `(x, z)` lies inside the terrain extent shrunk by `margin`
    pub fn contains(&self, x: f32, z: f32, margin: f32) -> bool {
        let hw = self.half_width() - margin;
        let hd = self.half_depth() - margin;
        x.is_finite() && z.is_finite() && x.abs() <= hw && z.abs() <= hd
    }

    /// Clamp `(x, z)` into the terrain extent. NaN maps to the center line.
    pub fn clamp_to_extent(&self, x: f32, z: f32) -> (f32, f32) {
        let clamp = |v: f32, half: f32| {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(-half, half)
            }
        };
        (clamp(x, self.half_width()), clamp(z, self.half_depth()))
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn half_width(&self) -> f32 {
        self.width * 0.5
    }

    pub fn half_depth(&self) -> f32 {
        self.depth * 0.5
    }
}

#[inline]
pub(crate) fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

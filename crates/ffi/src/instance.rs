use loss_landscape_core::{LandscapeConfig, LossLandscape, ParticleId, ParticleInstance, QualityPreset};
use std::ptr;
use std::sync::{Mutex, RwLock};

use crate::error::{DefaultLandscapeError, LandscapeErrorCode};
use crate::helpers::{track_error, track_result};

/// Grid quality preset for the precomputed gradient grid and terrain mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandscapeQuality {
    /// 200² gradient grid, 128-segment mesh
    Low = 0,
    /// 350² gradient grid, 256-segment mesh
    Medium = 1,
    /// 512² gradient grid, 384-segment mesh
    High = 2,
}

impl From<LandscapeQuality> for QualityPreset {
    fn from(quality: LandscapeQuality) -> Self {
        match quality {
            LandscapeQuality::Low => QualityPreset::Low,
            LandscapeQuality::Medium => QualityPreset::Medium,
            LandscapeQuality::High => QualityPreset::High,
        }
    }
}

/// Settings accepted by `landscape_new`.
///
/// Everything not listed here uses the library defaults. Obtain a filled-in
/// value from `landscape_default_settings` and override fields as needed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandscapeSettings {
    /// Terrain seed; negative draws a random seed at creation.
    pub seed: i64,
    /// Terrain extent along X (world units).
    pub width: f32,
    /// Terrain extent along Z (world units).
    pub depth: f32,
    pub quality: LandscapeQuality,
    /// Particles queued per wave.
    pub particles_per_wave: u32,
    /// Live particle cap.
    pub max_particles: u32,
}

impl LandscapeSettings {
    pub(crate) fn to_config(self) -> Result<LandscapeConfig, DefaultLandscapeError> {
        let mut config = LandscapeConfig::with_quality(self.quality.into());
        config.terrain.seed = if self.seed < 0 {
            None
        } else {
            let seed = u32::try_from(self.seed).map_err(|_| {
                DefaultLandscapeError::invalid_parameter(format!(
                    "seed {} does not fit in 32 bits",
                    self.seed
                ))
            })?;
            Some(seed)
        };
        config.terrain.width = self.width;
        config.terrain.depth = self.depth;
        config.wave.particles_per_wave = self.particles_per_wave;
        config.spawn.max_particles = self.max_particles as usize;
        Ok(config)
    }
}

/// Settings matching the library defaults (random seed, medium quality).
#[no_mangle]
pub extern "C" fn landscape_default_settings() -> LandscapeSettings {
    let config = LandscapeConfig::default();
    LandscapeSettings {
        seed: -1,
        width: config.terrain.width,
        depth: config.terrain.depth,
        quality: LandscapeQuality::Medium,
        particles_per_wave: config.wave.particles_per_wave,
        max_particles: u32::try_from(config.spawn.max_particles).unwrap_or(u32::MAX),
    }
}

/// The landscape context handed to C callers.
///
/// The simulation sits behind an `RwLock`: queries take the read lock,
/// `landscape_tick` and spawn calls take the write lock. Snapshot buffers
/// back the borrowed arrays returned by the query functions and are reused
/// across calls to avoid per-frame allocations.
pub struct LandscapeInstance {
    pub(crate) landscape: RwLock<LossLandscape>,
    pub(crate) particle_snapshot: Mutex<Vec<ParticleInstance>>,
    pub(crate) trail_snapshot: Mutex<Vec<f32>>,
    pub(crate) despawn_snapshot: Mutex<Vec<ParticleId>>,
}

impl LandscapeInstance {
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an out-of-range seed and
    /// `InvalidConfig` when the settings fail validation.
    pub(crate) fn new(settings: LandscapeSettings) -> Result<Box<Self>, DefaultLandscapeError> {
        let config = settings.to_config()?;
        let capacity = config.spawn.max_particles;
        let trail_length = config.physics.trail_length;
        let landscape = LossLandscape::new(config)?;

        Ok(Box::new(Self {
            landscape: RwLock::new(landscape),
            particle_snapshot: Mutex::new(Vec::with_capacity(capacity)),
            trail_snapshot: Mutex::new(Vec::with_capacity(capacity * trail_length * 3)),
            despawn_snapshot: Mutex::new(Vec::new()),
        }))
    }
}

/// Create a landscape and return it via out-parameter.
///
/// Builds the gradient grid before returning; this is the only expensive call.
///
/// Returns
/// - `LandscapeErrorCode::Ok` (0) with a valid instance in `out_instance`
/// - `LandscapeErrorCode::NullPointer` if `out_instance` is null
/// - `LandscapeErrorCode::InvalidConfig` / `InvalidParameter` for rejected settings
///   (`out_instance` is set to null)
///
/// # Safety
///
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller owns the instance and MUST call `landscape_destroy` exactly once.
///
/// Example (C++)
/// ```cpp
/// LandscapeSettings settings = landscape_default_settings();
/// settings.seed = 42;
/// LandscapeInstance* landscape = nullptr;
/// if (landscape_new(settings, &landscape) != LandscapeErrorCode::Ok) {
///     fprintf(stderr, "%s\n", landscape_get_last_error());
///     return;
/// }
/// // ... tick and draw ...
/// landscape_destroy(landscape);
/// ```
#[no_mangle]
pub unsafe extern "C" fn landscape_new(
    settings: LandscapeSettings,
    out_instance: *mut *mut LandscapeInstance,
) -> LandscapeErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultLandscapeError::null_pointer("out_instance"));
    }

    match track_result(LandscapeInstance::new(settings)) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            LandscapeErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroy a landscape created by `landscape_new`. Null is a no-op.
///
/// Call `landscape_teardown` first if the renderer still holds per-particle
/// resources that must be released.
///
/// # Safety
/// - The pointer MUST have been created by `landscape_new` and not freed already.
/// - The pointer must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn landscape_destroy(ptr: *mut LandscapeInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: `ptr` came from `Box::into_raw` in `landscape_new` and is
    // still owned by the caller
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

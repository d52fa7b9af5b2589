use loss_landscape_core::{ParticleId, ParticleInstance};
use std::ptr;
use std::sync::Mutex;

use crate::error::{DefaultLandscapeError, LandscapeErrorCode};
use crate::helpers::{
    handle_ffi_result_error, instance_from_ptr, lock_snapshot, track_error, with_landscape,
    with_landscape_mut,
};
use crate::instance::LandscapeInstance;
use crate::simulation::LandscapeWaveState;

/// Scheduler and population counters.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandscapeWaveStatus {
    pub state: LandscapeWaveState,
    /// Particles still to be placed in the current wave.
    pub spawn_queue: u32,
    /// Terrain overlay opacity driven by the swell.
    pub swell_opacity: f32,
    pub waves_started: u32,
    pub waves_completed: u32,
    /// Waves ended by the timeout rather than by settling.
    pub forced_settles: u32,
    pub live_particles: u32,
    /// Simulation clock (seconds) as of the last tick.
    pub time: f64,
}

/// Validate a pair of array out-parameters, zeroing `out_len` when only the
/// array pointer is missing.
unsafe fn check_array_out<T>(out_len: *mut usize, out_array: *mut *const T) -> Result<(), LandscapeErrorCode> {
    if out_len.is_null() {
        return Err(track_error(&DefaultLandscapeError::null_pointer("out_len")));
    }
    if out_array.is_null() {
        unsafe {
            *out_len = 0;
        }
        return Err(track_error(&DefaultLandscapeError::null_pointer("out_array")));
    }
    Ok(())
}

/// Run `fill` against a snapshot buffer and publish it through the
/// out-parameters. On error the outputs are set to null/0.
unsafe fn publish_snapshot<T, F>(
    ptr: *const LandscapeInstance,
    out_len: *mut usize,
    out_array: *mut *const T,
    snapshot: fn(&LandscapeInstance) -> &Mutex<Vec<T>>,
    name: &str,
    fill: F,
) -> LandscapeErrorCode
where
    F: FnOnce(&LandscapeInstance, &mut Vec<T>) -> Result<(), DefaultLandscapeError>,
{
    if let Err(code) = unsafe { check_array_out(out_len, out_array) } {
        return code;
    }

    let result = handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let mut buffer = lock_snapshot(snapshot(instance), name)?;
        buffer.clear(); // keeps capacity
        fill(instance, &mut buffer)?;

        unsafe {
            *out_len = buffer.len();
            *out_array = buffer.as_ptr();
        }
        Ok(())
    });

    if result != LandscapeErrorCode::Ok {
        unsafe {
            *out_array = ptr::null();
            *out_len = 0;
        }
    }
    result
}

/// Return a borrowed pointer to render records for every live particle.
///
/// The array is owned by the instance and reused between calls to avoid
/// per-frame allocations. **DO NOT FREE THIS POINTER**. It stays valid until
/// the next call to this function or `landscape_destroy`.
///
/// Returns
/// - `LandscapeErrorCode::Ok` (0) with the array in `out_array` and count in `out_len`
/// - `LandscapeErrorCode::NullPointer` if `ptr`, `out_len`, or `out_array` is null
/// - `LandscapeErrorCode::LockPoisoned` if an internal lock is poisoned
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_len` and `out_array` must be valid pointers to writable memory.
///
/// Example (C++)
/// ```cpp
/// uintptr_t len = 0;
/// const ParticleInstance* particles = nullptr;
/// if (landscape_get_particles(landscape, &len, &particles) == LandscapeErrorCode::Ok) {
///     for (uintptr_t i = 0; i < len; i++) {
///         draw_sprite(particles[i].position, particles[i].scale, particles[i].color);
///     }
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn landscape_get_particles(
    ptr: *const LandscapeInstance,
    out_len: *mut usize,
    out_array: *mut *const ParticleInstance,
) -> LandscapeErrorCode {
    unsafe {
        publish_snapshot(
            ptr,
            out_len,
            out_array,
            |instance| &instance.particle_snapshot,
            "particle_snapshot",
            |instance, buffer| {
                with_landscape(instance, |landscape| {
                    buffer.extend(landscape.particles().iter().map(ParticleInstance::from));
                })
            },
        )
    }
}

/// Return a borrowed pointer to every particle trail, flattened.
///
/// Each particle contributes `trail_length` points of three floats
/// (`x, y, z`), newest first, in the same order as `landscape_get_particles`.
/// `out_len` receives the float count and `out_trail_length` (optional) the
/// points per trail. Same lifetime rules as `landscape_get_particles`.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_len` and `out_array` must be valid pointers to writable memory.
/// - `out_trail_length`, if non-null, must point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_get_trails(
    ptr: *const LandscapeInstance,
    out_trail_length: *mut usize,
    out_len: *mut usize,
    out_array: *mut *const f32,
) -> LandscapeErrorCode {
    let mut trail_length = 0;
    let result = unsafe {
        publish_snapshot(
            ptr,
            out_len,
            out_array,
            |instance| &instance.trail_snapshot,
            "trail_snapshot",
            |instance, buffer| {
                with_landscape(instance, |landscape| {
                    trail_length = landscape.config().physics.trail_length;
                    buffer.extend(
                        landscape
                            .particles()
                            .iter()
                            .flat_map(|p| p.trail().iter().flat_map(|v| [v.x, v.y, v.z])),
                    );
                })
            },
        )
    };
    if !out_trail_length.is_null() {
        unsafe {
            *out_trail_length = trail_length;
        }
    }
    result
}

/// Return the ids of particles destroyed since the previous call.
///
/// The renderer releases per-particle resources for these ids. Each id is
/// reported exactly once. Same lifetime rules as `landscape_get_particles`.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_len` and `out_array` must be valid pointers to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_drain_despawned(
    ptr: *const LandscapeInstance,
    out_len: *mut usize,
    out_array: *mut *const ParticleId,
) -> LandscapeErrorCode {
    unsafe {
        publish_snapshot(
            ptr,
            out_len,
            out_array,
            |instance| &instance.despawn_snapshot,
            "despawn_snapshot",
            |instance, buffer| {
                with_landscape_mut(instance, |landscape| {
                    buffer.extend(landscape.drain_despawned());
                })
            },
        )
    }
}

/// Destroy every live particle and return all ids still awaiting release,
/// including ones not yet drained. The landscape stays usable afterwards.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_len` and `out_array` must be valid pointers to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_teardown(
    ptr: *const LandscapeInstance,
    out_len: *mut usize,
    out_array: *mut *const ParticleId,
) -> LandscapeErrorCode {
    unsafe {
        publish_snapshot(
            ptr,
            out_len,
            out_array,
            |instance| &instance.despawn_snapshot,
            "despawn_snapshot",
            |instance, buffer| {
                with_landscape_mut(instance, |landscape| {
                    buffer.extend(landscape.teardown());
                })
            },
        )
    }
}

/// Fill `out_status` with the scheduler state and counters.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_status` must be a valid pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_get_wave_status(
    ptr: *const LandscapeInstance,
    out_status: *mut LandscapeWaveStatus,
) -> LandscapeErrorCode {
    if out_status.is_null() {
        return track_error(&DefaultLandscapeError::null_pointer("out_status"));
    }

    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let status = with_landscape(instance, |landscape| {
            let scheduler = landscape.scheduler();
            LandscapeWaveStatus {
                state: scheduler.state().into(),
                spawn_queue: scheduler.spawn_queue(),
                swell_opacity: scheduler.swell_opacity(),
                waves_started: scheduler.waves_started(),
                waves_completed: scheduler.waves_completed(),
                forced_settles: scheduler.forced_settles(),
                live_particles: u32::try_from(landscape.particle_count()).unwrap_or(u32::MAX),
                time: landscape.time(),
            }
        })?;
        unsafe {
            *out_status = status;
        }
        Ok(())
    })
}

/// Terrain height at world `(x, z)`, clamped to the terrain extent.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_elevation` must be a valid pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_get_elevation(
    ptr: *const LandscapeInstance,
    x: f32,
    z: f32,
    out_elevation: *mut f32,
) -> LandscapeErrorCode {
    if out_elevation.is_null() {
        return track_error(&DefaultLandscapeError::null_pointer("out_elevation"));
    }

    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let elevation = with_landscape(instance, |landscape| landscape.elevation(x, z))?;
        unsafe {
            *out_elevation = elevation;
        }
        Ok(())
    })
}

/// Terrain seed in use (resolved at creation when a random seed was requested).
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_seed` must be a valid pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_get_seed(
    ptr: *const LandscapeInstance,
    out_seed: *mut u32,
) -> LandscapeErrorCode {
    if out_seed.is_null() {
        return track_error(&DefaultLandscapeError::null_pointer("out_seed"));
    }

    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let seed = with_landscape(instance, loss_landscape_core::LossLandscape::seed)?;
        unsafe {
            *out_seed = seed;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{
        landscape_default_settings, landscape_destroy, landscape_new, LandscapeQuality,
        LandscapeSettings,
    };
    use crate::simulation::{landscape_spawn_at, landscape_tick};

    fn create() -> *mut LandscapeInstance {
        let settings = LandscapeSettings {
            seed: 7,
            width: 400.0,
            depth: 400.0,
            quality: LandscapeQuality::Low,
            ..landscape_default_settings()
        };
        let mut instance = ptr::null_mut();
        let code = unsafe { landscape_new(settings, &mut instance) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        instance
    }

    #[test]
    fn test_particles_and_trails_after_click() {
        let instance = create();
        let mut placed = 0;
        unsafe { landscape_spawn_at(instance, 10.0, 0.0, -10.0, &mut placed) };
        assert!(placed > 0);

        let mut len = 0;
        let mut particles: *const ParticleInstance = ptr::null();
        let code = unsafe { landscape_get_particles(instance, &mut len, &mut particles) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        assert_eq!(len, placed as usize);
        assert!(!particles.is_null());

        let mut trail_length = 0;
        let mut floats = 0;
        let mut trails: *const f32 = ptr::null();
        let code =
            unsafe { landscape_get_trails(instance, &mut trail_length, &mut floats, &mut trails) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        assert!(trail_length > 0);
        assert_eq!(floats, len * trail_length * 3);

        // A fresh trail is collapsed onto the head position
        let head = unsafe { (*particles).position };
        let first = unsafe { std::slice::from_raw_parts(trails, 3) };
        assert_eq!(first, head.as_slice());

        unsafe { landscape_destroy(instance) };
    }

    #[test]
    fn test_teardown_reports_every_id() {
        let instance = create();
        let mut placed = 0;
        unsafe { landscape_spawn_at(instance, 0.0, 0.0, 0.0, &mut placed) };

        let mut len = 0;
        let mut ids: *const ParticleId = ptr::null();
        let code = unsafe { landscape_teardown(instance, &mut len, &mut ids) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        assert_eq!(len, placed as usize);

        let code = unsafe { landscape_drain_despawned(instance, &mut len, &mut ids) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        assert_eq!(len, 0);
        unsafe { landscape_destroy(instance) };
    }

    #[test]
    fn test_null_out_array_zeroes_length() {
        let instance = create();
        let mut len = 99;
        let code = unsafe { landscape_get_particles(instance, &mut len, ptr::null_mut()) };
        assert_eq!(code, LandscapeErrorCode::NullPointer);
        assert_eq!(len, 0);

        let mut array: *const ParticleInstance = ptr::null();
        let code = unsafe { landscape_get_particles(ptr::null(), &mut len, &mut array) };
        assert_eq!(code, LandscapeErrorCode::NullPointer);
        assert!(array.is_null());
        unsafe { landscape_destroy(instance) };
    }

    #[test]
    fn test_wave_status_and_elevation() {
        let instance = create();
        let dt = 1.0 / 60.0;
        for i in 0..240 {
            let code = unsafe {
                landscape_tick(
                    instance,
                    f64::from(i) * dt,
                    dt,
                    None,
                    ptr::null_mut(),
                    0.0,
                    0.0,
                    0.0,
                    ptr::null_mut(),
                )
            };
            assert_eq!(code, LandscapeErrorCode::Ok);
        }

        let mut status = LandscapeWaveStatus {
            state: LandscapeWaveState::Waiting,
            spawn_queue: 0,
            swell_opacity: 0.0,
            waves_started: 0,
            waves_completed: 0,
            forced_settles: 0,
            live_particles: 0,
            time: 0.0,
        };
        let code = unsafe { landscape_get_wave_status(instance, &mut status) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        assert_eq!(status.state, LandscapeWaveState::Active);
        assert_eq!(status.waves_started, 1);

        let mut elevation = f32::NAN;
        let code = unsafe { landscape_get_elevation(instance, 0.0, 0.0, &mut elevation) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        assert!(elevation.is_finite());

        let mut seed = 0;
        let code = unsafe { landscape_get_seed(instance, &mut seed) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        assert_eq!(seed, 7);
        unsafe { landscape_destroy(instance) };
    }
}

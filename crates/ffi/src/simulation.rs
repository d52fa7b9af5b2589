use loss_landscape_core::{GroundHit, GroundIntersector, PlanarGroundPicker, TickReport, Vec2, Vec3, WaveState};
use std::ffi::c_void;

use crate::error::{DefaultLandscapeError, LandscapeErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, track_error, with_landscape_mut};
use crate::instance::LandscapeInstance;

/// Wave scheduler state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandscapeWaveState {
    Waiting = 0,
    Swelling = 1,
    Active = 2,
}

impl From<WaveState> for LandscapeWaveState {
    fn from(state: WaveState) -> Self {
        match state {
            WaveState::Waiting => LandscapeWaveState::Waiting,
            WaveState::Swelling => LandscapeWaveState::Swelling,
            WaveState::Active => LandscapeWaveState::Active,
        }
    }
}

/// Ground point written by a `LandscapeGroundQuery` callback.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LandscapeGroundHit {
    pub point: [f32; 3],
    pub normal: [f32; 3],
}

/// Ground-intersection callback supplied by the renderer.
///
/// Receives a normalized view coordinate (`u` left→right, `v` near→far, both
/// in [-1, 1]). Returns `true` and fills `out_hit` when the terrain is hit.
pub type LandscapeGroundQuery = Option<
    unsafe extern "C" fn(user_data: *mut c_void, u: f32, v: f32, out_hit: *mut LandscapeGroundHit) -> bool,
>;

/// Summary of one tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandscapeTickReport {
    pub state: LandscapeWaveState,
    /// A wave-state transition happened this tick.
    pub transitioned: bool,
    /// The transition was a forced settle (timeout).
    pub forced: bool,
    pub spawned: u32,
    pub despawned: u32,
    pub live: u32,
    pub spawn_queue: u32,
    pub frame_scale: f32,
}

impl From<TickReport> for LandscapeTickReport {
    fn from(report: TickReport) -> Self {
        Self {
            state: report.state.into(),
            transitioned: report.transition.is_some(),
            forced: report.transition.is_some_and(|t| t.forced),
            spawned: report.spawned,
            despawned: report.despawned,
            live: u32::try_from(report.live).unwrap_or(u32::MAX),
            spawn_queue: report.spawn_queue,
            frame_scale: report.frame_scale,
        }
    }
}

/// Adapts a C callback to the core ground-query interface
struct CallbackGround {
    query: unsafe extern "C" fn(*mut c_void, f32, f32, *mut LandscapeGroundHit) -> bool,
    user_data: *mut c_void,
    camera: Vec3,
}

impl GroundIntersector for CallbackGround {
    fn intersect(&self, query: Vec2) -> Option<GroundHit> {
        let mut hit = LandscapeGroundHit::default();
        // SAFETY: the callback and its user data are supplied by the caller of
        // `landscape_tick`, which guarantees they are valid for the call
        let found = unsafe { (self.query)(self.user_data, query.x, query.y, &mut hit) };
        found.then(|| GroundHit {
            point: Vec3::from(hit.point),
            normal: Vec3::from(hit.normal),
        })
    }

    fn camera_position(&self) -> Vec3 {
        self.camera
    }
}

/// Advance the landscape to time `now` (seconds), `dt` seconds after the
/// previous tick.
///
/// Runs scheduler transitions, one spawn batch, and one step per particle.
/// Takes the write lock.
///
/// - `query`: ground callback; null uses a built-in picker covering the whole
///   terrain with its own camera (`camera_*` ignored).
/// - `out_report`: optional, receives the tick summary.
///
/// Returns
/// - `LandscapeErrorCode::Ok` (0) on success
/// - `LandscapeErrorCode::NullPointer` if `ptr` is null
/// - `LandscapeErrorCode::InvalidParameter` if `now` or `dt` is not finite
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `query`, if non-null, must be safe to call with `user_data` for the
///   duration of this call.
/// - `out_report`, if non-null, must point to writable memory.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn landscape_tick(
    ptr: *const LandscapeInstance,
    now: f64,
    dt: f64,
    query: LandscapeGroundQuery,
    user_data: *mut c_void,
    camera_x: f32,
    camera_y: f32,
    camera_z: f32,
    out_report: *mut LandscapeTickReport,
) -> LandscapeErrorCode {
    if !now.is_finite() || !dt.is_finite() {
        return track_error(&DefaultLandscapeError::invalid_parameter(format!(
            "tick time must be finite, got now={now}, dt={dt}"
        )));
    }

    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let report = with_landscape_mut(instance, |landscape| match query {
            Some(query) => {
                let ground = CallbackGround {
                    query,
                    user_data,
                    camera: Vec3::new(camera_x, camera_y, camera_z),
                };
                landscape.tick(now, dt, &ground)
            }
            None => {
                let picker = PlanarGroundPicker::covering(landscape.height_field());
                landscape.tick(now, dt, &picker)
            }
        })?;

        if !out_report.is_null() {
            unsafe {
                *out_report = report.into();
            }
        }
        Ok(())
    })
}

/// Place a click cluster at world point `(x, y, z)`.
///
/// Points outside the terrain place nothing and still return `Ok`.
/// `out_count`, if non-null, receives the number of particles placed.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_count`, if non-null, must point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_spawn_at(
    ptr: *const LandscapeInstance,
    x: f32,
    y: f32,
    z: f32,
    out_count: *mut u32,
) -> LandscapeErrorCode {
    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let placed = with_landscape_mut(instance, |landscape| {
            landscape.spawn_at(Vec3::new(x, y, z)).len()
        })?;
        if !out_count.is_null() {
            unsafe {
                *out_count = u32::try_from(placed).unwrap_or(u32::MAX);
            }
        }
        Ok(())
    })
}

/// Resolve the view coordinate `(u, v)` through `query` and place a click
/// cluster at the hit point.
///
/// A miss places nothing and still returns `Ok`.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `query` must be safe to call with `user_data` for the duration of this call.
/// - `out_count`, if non-null, must point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_click(
    ptr: *const LandscapeInstance,
    u: f32,
    v: f32,
    query: LandscapeGroundQuery,
    user_data: *mut c_void,
    out_count: *mut u32,
) -> LandscapeErrorCode {
    let Some(query) = query else {
        return track_error(&DefaultLandscapeError::null_pointer("query"));
    };

    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let ground = CallbackGround {
            query,
            user_data,
            camera: Vec3::zeros(),
        };
        let placed = with_landscape_mut(instance, |landscape| {
            landscape.click(Vec2::new(u, v), &ground).len()
        })?;
        if !out_count.is_null() {
            unsafe {
                *out_count = u32::try_from(placed).unwrap_or(u32::MAX);
            }
        }
        Ok(())
    })
}

//! C ABI for the loss landscape simulation
//!
//! Every function returns a [`LandscapeErrorCode`]; details of the most recent
//! failure on the calling thread are available through
//! `landscape_get_last_error`. Array results are borrowed from buffers owned
//! by the instance and must not be freed.
//!
//! Typical frame:
//! 1. `landscape_tick` with the frame time and a ground-query callback
//! 2. `landscape_get_particles` / `landscape_get_trails` to draw
//! 3. `landscape_drain_despawned` to release per-particle resources

mod error;
mod helpers;
mod instance;
mod mesh;
mod queries;
mod simulation;

pub use error::{landscape_get_last_error, landscape_get_last_error_code, LandscapeErrorCode};
pub use instance::{
    landscape_default_settings, landscape_destroy, landscape_new, LandscapeInstance,
    LandscapeQuality, LandscapeSettings,
};
pub use mesh::{
    landscape_build_terrain_mesh, landscape_terrain_mesh_destroy, landscape_terrain_mesh_view,
    LandscapeTerrainMesh, LandscapeTerrainMeshView,
};
pub use queries::{
    landscape_drain_despawned, landscape_get_elevation, landscape_get_particles,
    landscape_get_seed, landscape_get_trails, landscape_get_wave_status, landscape_teardown,
    LandscapeWaveStatus,
};
pub use simulation::{
    landscape_click, landscape_spawn_at, landscape_tick, LandscapeGroundHit,
    LandscapeGroundQuery, LandscapeTickReport, LandscapeWaveState,
};

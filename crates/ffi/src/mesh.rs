use loss_landscape_core::TerrainMesh;
use std::ptr;

use crate::error::{DefaultLandscapeError, LandscapeErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, track_error, with_landscape};
use crate::instance::LandscapeInstance;

/// Terrain mesh owned by the library. Opaque to C.
pub struct LandscapeTerrainMesh {
    mesh: TerrainMesh,
}

/// Borrowed view of a `LandscapeTerrainMesh`.
///
/// `positions`, `normals` and `colors` hold `vertex_count * 3` floats each.
/// `indices` holds `index_count` triangle-list indices. All pointers stay
/// valid until `landscape_terrain_mesh_destroy`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LandscapeTerrainMeshView {
    pub segments: u32,
    pub vertex_count: usize,
    pub index_count: usize,
    pub positions: *const f32,
    pub normals: *const f32,
    pub colors: *const f32,
    pub indices: *const u32,
}

impl LandscapeTerrainMeshView {
    fn of(mesh: &TerrainMesh) -> Self {
        Self {
            segments: mesh.segments,
            vertex_count: mesh.vertex_count(),
            index_count: mesh.indices.len(),
            positions: mesh.positions.as_ptr().cast(),
            normals: mesh.normals.as_ptr().cast(),
            colors: mesh.colors.as_ptr().cast(),
            indices: mesh.indices.as_ptr(),
        }
    }
}

/// Build the height-colored terrain mesh at the configured segment count.
///
/// The caller owns the returned mesh and MUST free it with
/// `landscape_terrain_mesh_destroy`. It does not borrow the landscape and may
/// outlive it.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `landscape_new` or null.
/// - `out_mesh` must be a valid pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_build_terrain_mesh(
    ptr: *const LandscapeInstance,
    out_mesh: *mut *mut LandscapeTerrainMesh,
) -> LandscapeErrorCode {
    if out_mesh.is_null() {
        return track_error(&DefaultLandscapeError::null_pointer("out_mesh"));
    }

    let result = handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let mesh = with_landscape(instance, |landscape| landscape.terrain_mesh())?;
        unsafe {
            *out_mesh = Box::into_raw(Box::new(LandscapeTerrainMesh { mesh }));
        }
        Ok(())
    });

    if result != LandscapeErrorCode::Ok {
        unsafe {
            *out_mesh = ptr::null_mut();
        }
    }
    result
}

/// Describe the buffers of `mesh`.
///
/// # Safety
///
/// - `mesh` must be a live pointer from `landscape_build_terrain_mesh` or null.
/// - `out_view` must be a valid pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn landscape_terrain_mesh_view(
    mesh: *const LandscapeTerrainMesh,
    out_view: *mut LandscapeTerrainMeshView,
) -> LandscapeErrorCode {
    if out_view.is_null() {
        return track_error(&DefaultLandscapeError::null_pointer("out_view"));
    }

    handle_ffi_result_error(|| {
        // SAFETY: caller guarantees `mesh` is null or live
        let mesh = unsafe { mesh.as_ref() }.ok_or_else(|| DefaultLandscapeError::null_pointer("mesh"))?;
        unsafe {
            *out_view = LandscapeTerrainMeshView::of(&mesh.mesh);
        }
        Ok(())
    })
}

/// Free a mesh from `landscape_build_terrain_mesh`. Null is a no-op.
///
/// # Safety
///
/// - The pointer MUST have come from `landscape_build_terrain_mesh` and not
///   been freed already. Views into it are invalid afterwards.
#[no_mangle]
pub unsafe extern "C" fn landscape_terrain_mesh_destroy(mesh: *mut LandscapeTerrainMesh) {
    if mesh.is_null() {
        return;
    }
    // SAFETY: `mesh` came from `Box::into_raw` above
    unsafe {
        drop(Box::from_raw(mesh));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{
        landscape_default_settings, landscape_destroy, landscape_new, LandscapeQuality,
        LandscapeSettings,
    };

    #[test]
    fn test_mesh_outlives_landscape() {
        let settings = LandscapeSettings {
            seed: 3,
            width: 400.0,
            depth: 400.0,
            quality: LandscapeQuality::Low,
            ..landscape_default_settings()
        };
        let mut instance = ptr::null_mut();
        assert_eq!(unsafe { landscape_new(settings, &mut instance) }, LandscapeErrorCode::Ok);

        let mut mesh = ptr::null_mut();
        let code = unsafe { landscape_build_terrain_mesh(instance, &mut mesh) };
        assert_eq!(code, LandscapeErrorCode::Ok);
        unsafe { landscape_destroy(instance) };

        let mut view = LandscapeTerrainMeshView {
            segments: 0,
            vertex_count: 0,
            index_count: 0,
            positions: ptr::null(),
            normals: ptr::null(),
            colors: ptr::null(),
            indices: ptr::null(),
        };
        let code = unsafe { landscape_terrain_mesh_view(mesh, &mut view) };
        assert_eq!(code, LandscapeErrorCode::Ok);

        let n = view.segments as usize + 1;
        assert_eq!(view.vertex_count, n * n);
        assert_eq!(view.index_count, (n - 1) * (n - 1) * 6);

        let indices = unsafe { std::slice::from_raw_parts(view.indices, view.index_count) };
        assert!(indices.iter().all(|&i| (i as usize) < view.vertex_count));
        unsafe { landscape_terrain_mesh_destroy(mesh) };
    }

    #[test]
    fn test_null_mesh() {
        let mut view = std::mem::MaybeUninit::<LandscapeTerrainMeshView>::uninit();
        let code = unsafe { landscape_terrain_mesh_view(ptr::null(), view.as_mut_ptr()) };
        assert_eq!(code, LandscapeErrorCode::NullPointer);
        unsafe { landscape_terrain_mesh_destroy(ptr::null_mut()) };
    }
}

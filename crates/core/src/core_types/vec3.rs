//! Vector type aliases for world positions, velocities, and normals.

use nalgebra::{Vector2, Vector3};

/// 3D vector type for world positions and surface normals.
///
/// Alias for `nalgebra::Vector3<f32>`. The Y axis is elevation.
pub type Vec3 = Vector3<f32>;

/// 2D vector type for ground-plane positions and velocities.
///
/// Alias for `nalgebra::Vector2<f32>`; `x` maps to world X and `y` to world Z.
pub type Vec2 = Vector2<f32>;

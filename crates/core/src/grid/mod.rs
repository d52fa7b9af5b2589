//! Terrain surface and its precomputed grids

pub mod gradient_field;
pub mod height_field;
pub mod terrain_mesh;

// Re-export main types
pub use gradient_field::GradientField;
pub use height_field::{HeightField, NORMAL_STEP};
pub use terrain_mesh::TerrainMesh;

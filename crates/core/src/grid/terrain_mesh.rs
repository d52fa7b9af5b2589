//! Terrain mesh export for the rendering collaborator
//!
//! Samples the height field on a `(segments + 1)²` vertex grid and attaches
//! normals and a height-ramp color per vertex. Built once; the renderer owns
//! how the buffers are uploaded and shaded.

use super::height_field::{HeightField, NORMAL_STEP};
use crate::config::TerrainConfig;
use rayon::prelude::*;

/// Vertex and index buffers describing the terrain surface
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    /// Vertices per axis minus one
    pub segments: u32,
    /// World positions, row-major (row along Z)
    pub positions: Vec<[f32; 3]>,
    /// Unit normals, same order as `positions`
    pub normals: Vec<[f32; 3]>,
    /// Height-ramp colors, same order as `positions`
    pub colors: Vec<[f32; 3]>,
    /// Triangle list, two triangles per quad, counter-clockwise seen from +Y
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    /// Sample `height` into a mesh with `segments` quads per axis
    pub fn build(height: &HeightField, config: &TerrainConfig, segments: u32) -> Self {
        let segments = segments.max(1);
        let verts = segments as usize + 1;
        let step_x = height.width() / segments as f32;
        let step_z = height.depth() / segments as f32;
        let min_x = -height.half_width();
        let min_z = -height.half_depth();
        let span = (config.max_height - config.min_height).max(f32::EPSILON);

        let rows: Vec<Vec<([f32; 3], [f32; 3], [f32; 3])>> = (0..verts)
            .into_par_iter()
            .map(|row| {
                let z = min_z + row as f32 * step_z;
                (0..verts)
                    .map(|col| {
                        let x = min_x + col as f32 * step_x;
                        let y = height.elevation(x, z);
                        let n = height.normal_at(x, z, NORMAL_STEP);
                        let t = (y - config.min_height) / span;
                        let color = config.low_color.lerp(config.high_color, t);
                        ([x, y, z], [n.x, n.y, n.z], color.to_array())
                    })
                    .collect()
            })
            .collect();

        let mut positions = Vec::with_capacity(verts * verts);
        let mut normals = Vec::with_capacity(verts * verts);
        let mut colors = Vec::with_capacity(verts * verts);
        for (p, n, c) in rows.into_iter().flatten() {
            positions.push(p);
            normals.push(n);
            colors.push(c);
        }

        Self {
            segments,
            positions,
            normals,
            colors,
            indices: Self::grid_indices(segments),
        }
    }

    fn grid_indices(segments: u32) -> Vec<u32> {
        let verts = segments + 1;
        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for row in 0..segments {
            for col in 0..segments {
                let a = row * verts + col;
                let b = a + 1;
                let c = a + verts;
                let d = c + 1;
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }
        indices
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

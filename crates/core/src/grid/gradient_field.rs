//! Precomputed gradient grid
//!
//! Evaluating the height field gradient directly costs four full fBm
//! evaluations per query. The gradient field samples it once on a regular
//! grid covering the terrain extent and answers per-tick queries with a
//! bilinear lookup of the stored partials.
//!
//! Grid layout: `resolution × resolution` samples in row-major order
//! (`row * resolution + col`), row along Z, column along X, covering exactly
//! `[-width/2, width/2] × [-depth/2, depth/2]`.

use super::height_field::HeightField;
use crate::core_types::Vec2;
use rayon::prelude::*;
use tracing::info;

/// Immutable grid of `∂h/∂x` and `∂h/∂z`
#[derive(Debug, Clone, PartialEq)]
pub struct GradientField {
    dx: Vec<f32>,
    dz: Vec<f32>,
    resolution: usize,
    min_x: f32,
    min_z: f32,
    step_x: f32,
    step_z: f32,
}

impl GradientField {
    /// Build the grid from `height` with central-difference step `h`.
    ///
    /// O(resolution²) with four height evaluations per cell. Rows are filled in
    /// parallel; every cell depends only on its own coordinates, so the result
    /// is identical to a sequential build.
    ///
    /// `resolution` below 2 is raised to 2.
    pub fn build(height: &HeightField, resolution: usize, h: f32) -> Self {
        let n = resolution.max(2);
        let min_x = -height.half_width();
        let min_z = -height.half_depth();
        let step_x = height.width() / (n - 1) as f32;
        let step_z = height.depth() / (n - 1) as f32;

        let mut dx = vec![0.0_f32; n * n];
        let mut dz = vec![0.0_f32; n * n];

        dx.par_chunks_mut(n)
            .zip(dz.par_chunks_mut(n))
            .enumerate()
            .for_each(|(row, (dx_row, dz_row))| {
                let z = min_z + row as f32 * step_z;
                for col in 0..n {
                    let x = min_x + col as f32 * step_x;
                    let (gx, gz) = height.central_gradient(x, z, h);
                    dx_row[col] = gx;
                    dz_row[col] = gz;
                }
            });

        info!(
            "Gradient field built: {}x{} samples, step=({:.3}, {:.3})",
            n, n, step_x, step_z
        );

        Self {
            dx,
            dz,
            resolution: n,
            min_x,
            min_z,
            step_x,
            step_z,
        }
    }

    /// Bilinearly interpolated gradient at world `(x, z)`.
    ///
    /// Coordinates are clamped so the 2×2 neighborhood always lies inside the
    /// grid; any input, including NaN and infinities, is safe.
    pub fn sample(&self, x: f32, z: f32) -> Vec2 {
        let gx = self.grid_coord(x, self.min_x, self.step_x);
        let gz = self.grid_coord(z, self.min_z, self.step_z);

        let last = self.resolution - 2;
        let col = (gx.floor() as usize).min(last);
        let row = (gz.floor() as usize).min(last);
        let fx = gx - col as f32;
        let fz = gz - row as f32;

        let i00 = row * self.resolution + col;
        let i10 = i00 + 1;
        let i01 = i00 + self.resolution;
        let i11 = i01 + 1;

        let bilinear = |a: &[f32]| {
            let top = a[i00] * (1.0 - fx) + a[i10] * fx;
            let bottom = a[i01] * (1.0 - fx) + a[i11] * fx;
            top * (1.0 - fz) + bottom * fz
        };

        Vec2::new(bilinear(&self.dx), bilinear(&self.dz))
    }

    /// Fractional grid coordinate clamped to `[0, resolution - 2]`
    #[inline]
    fn grid_coord(&self, v: f32, min: f32, step: f32) -> f32 {
        let g = (v - min) / step;
        if g.is_nan() {
            0.0
        } else {
            g.clamp(0.0, (self.resolution - 2) as f32)
        }
    }

    /// Samples per axis
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Stored `∂h/∂x` values, row-major
    pub fn dx(&self) -> &[f32] {
        &self.dx
    }

    /// Stored `∂h/∂z` values, row-major
    pub fn dz(&self) -> &[f32] {
        &self.dz
    }

    /// Grid spacing along X and Z
    pub fn step(&self) -> (f32, f32) {
        (self.step_x, self.step_z)
    }

    /// World coordinates of grid sample `(col, row)`
    pub fn sample_position(&self, col: usize, row: usize) -> (f32, f32) {
        (
            self.min_x + col as f32 * self.step_x,
            self.min_z + row as f32 * self.step_z,
        )
    }
}

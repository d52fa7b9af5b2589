//! Noise primitives for the loss surface
//!
//! Provides the deterministic building blocks of the height field:
//! - A sine-scrambled lattice hash in [0, 1)
//! - Value noise with Hermite-smoothed bilinear interpolation
//! - The ridged remap that folds each octave into sharp crests
//!
//! Everything here runs in `f64` so the same seed reproduces the same terrain
//! bit for bit across runs, and so golden values computed with ordinary
//! double-precision arithmetic match.

/// Lattice hash multiplier for the X coordinate
const HASH_X: f64 = 127.1;
/// Lattice hash multiplier for the Z coordinate
const HASH_Z: f64 = 311.7;
/// Scrambling factor applied to the sine before taking the fraction
const HASH_SCRAMBLE: f64 = 43758.5453123;

/// Sine-based hash of an integer lattice point, offset by `seed`.
///
/// Returns a pseudo-random value in [0, 1).
#[inline]
pub fn hash_2d(ix: i64, iz: i64, seed: u32) -> f64 {
    let seed = f64::from(seed);
    let h = ((ix as f64 + seed) * HASH_X + (iz as f64 + seed) * HASH_Z).sin() * HASH_SCRAMBLE;
    h - h.floor()
}

/// Cubic Hermite curve
#[inline]
fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// 2D value noise in lattice space.
///
/// Bilinearly interpolates the hashes of the four lattice corners around
/// `(x, z)` with a Hermite-smoothed fractional offset. Returns a value in
/// [0, 1) for finite input; non-finite input yields NaN, which callers
/// are expected to absorb.
///
/// # Parameters
/// - `x`, `z`: coordinates already multiplied by the octave frequency
/// - `seed`: lattice offset
pub fn value_noise_2d(x: f64, z: f64, seed: u32) -> f64 {
    let x0 = x.floor();
    let z0 = z.floor();
    let ix = x0 as i64;
    let iz = z0 as i64;

    let fx = smoothstep(x - x0);
    let fz = smoothstep(z - z0);

    // Corner values; `as` saturates on huge input, so step with wrapping adds
    let (ix1, iz1) = (ix.wrapping_add(1), iz.wrapping_add(1));
    let v00 = hash_2d(ix, iz, seed);
    let v10 = hash_2d(ix1, iz, seed);
    let v01 = hash_2d(ix, iz1, seed);
    let v11 = hash_2d(ix1, iz1, seed);

    let v0 = v00 + (v10 - v00) * fx;
    let v1 = v01 + (v11 - v01) * fx;
    v0 + (v1 - v0) * fz
}

/// Ridged remap: `(1 - |2n - 1|)^power`.
///
/// Folds the noise around its midpoint so crests become sharp ridges, then
/// sharpens them with `power`.
#[inline]
pub fn ridge(n: f64, power: f64) -> f64 {
    (1.0 - (2.0 * n - 1.0).abs()).powf(power)
}

//! Render-sink records
//!
//! Plain per-particle data the rendering collaborator copies into its own
//! instance buffers. The layout is fixed (`#[repr(C)]`, `Pod`) so a slice of
//! records can be uploaded with `bytemuck::cast_slice` or read across FFI.

use crate::simulation::Particle;
use bytemuck::{Pod, Zeroable};

/// One particle as drawn (40 bytes, 4-byte aligned)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    /// World position including hover offset
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 3],
    pub glow: f32,
    pub opacity: f32,
    /// Stable particle id, matches entries from `drain_despawned`
    pub id: u32,
}

impl From<&Particle> for ParticleInstance {
    fn from(particle: &Particle) -> Self {
        let p = particle.world_position();
        let visual = particle.visual();
        Self {
            position: [p.x, p.y, p.z],
            scale: visual.scale,
            color: visual.color.to_array(),
            glow: visual.glow,
            opacity: visual.opacity,
            id: particle.id(),
        }
    }
}

//! Loss Landscape Core Library
//!
//! A procedurally generated terrain standing in for an optimization loss
//! surface, with particles ("seekers") descending it by momentum gradient
//! descent in periodic waves.
//!
//! ## Components
//!
//! - Height field: seeded ridged fBm value noise, evaluated on demand
//! - Gradient field: precomputed central-difference grid with bilinear lookup
//! - Particle simulation: momentum descent, trails, visual-state derivation
//! - Wave scheduler: `WAITING → SWELLING → ACTIVE` pacing of spawns
//! - Spawn-site selector: biased, validated placement through a ground query
//!
//! Drawing is left to the caller. The core exposes particle render records
//! ([`ParticleInstance`]) and a one-time [`TerrainMesh`].

// Core types and utilities
pub mod core_types;

// Configuration
pub mod config;

// Terrain surface and grids
pub mod grid;

// Render-sink records
pub mod render;

// Simulation context
pub mod simulation;

// Re-export core types
pub use core_types::{Color, Vec2, Vec3};

// Re-export configuration
pub use config::{
    AppearanceConfig, ConfigError, InteractionConfig, LandscapeConfig, PhysicsConfig,
    QualityPreset, SpawnConfig, TerrainConfig, WaveConfig,
};

// Re-export terrain types
pub use grid::{GradientField, HeightField, TerrainMesh};

// Re-export simulation types
pub use render::ParticleInstance;
pub use simulation::{
    GroundHit, GroundIntersector, LandscapeStats, Lifecycle, LossLandscape, Particle, ParticleId,
    PlanarGroundPicker, SiteRejection, TickReport, VisualState, WaveState, WaveTransition,
};

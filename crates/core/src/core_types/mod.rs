//! Core types and utilities

pub mod color;
pub mod noise;
pub mod vec3;

pub use color::Color;
pub use noise::{hash_2d, ridge, value_noise_2d};
pub use vec3::{Vec2, Vec3};

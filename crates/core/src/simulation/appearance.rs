//! Visual-state derivation
//!
//! Maps kinematic quantities (speed, elevation) to the values the renderer
//! draws: scale, glow, opacity, and color. Nothing here touches rendering
//! resources; the results are plain numbers on [`VisualState`].

use crate::config::{AppearanceConfig, TerrainConfig};
use crate::core_types::Color;
use serde::{Deserialize, Serialize};

/// Per-particle values consumed by the render sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    /// Mesh scale (loss size × speed boost, or decaying while fading)
    pub scale: f32,
    /// Glow intensity
    pub glow: f32,
    /// Opacity
    pub opacity: f32,
    /// Display color
    pub color: Color,
    /// Smoothed additive speed boost
    pub speed_boost: f32,
}

impl VisualState {
    /// Appearance of a freshly placed, staged particle
    pub fn staged(
        surface: f32,
        terrain: &TerrainConfig,
        appearance: &AppearanceConfig,
    ) -> Self {
        Self {
            scale: loss_size(surface, terrain, appearance) * appearance.staging_scale,
            glow: appearance.staging_glow,
            opacity: appearance.opacity_max,
            color: appearance.active_color,
            speed_boost: 0.0,
        }
    }

    /// Recompute from the current speed and surface elevation.
    ///
    /// The speed boost eases toward its target at `boost_rate` per reference
    /// frame, or at `boost_rate_still` when the particle is nearly stationary.
    pub fn update_active(
        &mut self,
        speed: f32,
        surface: f32,
        frame_scale: f32,
        terrain: &TerrainConfig,
        appearance: &AppearanceConfig,
    ) {
        let r = reaction(speed, appearance);
        self.glow = lerp(appearance.glow_min, appearance.glow_max, r);
        self.opacity = lerp(appearance.opacity_min, appearance.opacity_max, r);
        self.color = appearance
            .active_color
            .lerp(appearance.flash_color, color_factor(speed, appearance));

        let target = (speed * appearance.boost_sensitivity).clamp(0.0, 1.0)
            * appearance.speed_boost_max;
        let rate = if speed < appearance.still_speed {
            appearance.boost_rate_still
        } else {
            appearance.boost_rate
        };
        self.speed_boost += (target - self.speed_boost) * frame_lerp(rate, frame_scale);
        if !self.speed_boost.is_finite() {
            self.speed_boost = 0.0;
        }

        self.scale = loss_size(surface, terrain, appearance) * (1.0 + self.speed_boost);
    }

    /// Appearance while staged: pinned, emphasized, no boost
    pub fn update_staged(
        &mut self,
        surface: f32,
        terrain: &TerrainConfig,
        appearance: &AppearanceConfig,
    ) {
        *self = Self::staged(surface, terrain, appearance);
    }

    /// One tick of fade-out decay
    pub fn decay(&mut self, scale_decay: f32, glow_decay: f32) {
        self.scale *= scale_decay;
        self.glow *= glow_decay;
        self.opacity *= glow_decay;
    }
}

/// Loss-dependent size.
///
/// Elevation is normalized over the display height range; low ground
/// (near minima) yields the largest size unless `reverse_scaling` is set.
/// The normalized value is raised to `size_emphasis` and mapped onto
/// `[min_scale, max_scale]`.
pub fn loss_size(surface: f32, terrain: &TerrainConfig, appearance: &AppearanceConfig) -> f32 {
    let span = (terrain.max_height - terrain.min_height).max(f32::EPSILON);
    let t = ((surface - terrain.min_height) / span).clamp(0.0, 1.0);
    let t = if t.is_nan() { 0.0 } else { t };
    let base = if appearance.reverse_scaling { t } else { 1.0 - t };
    let size = appearance.min_scale
        + (appearance.max_scale - appearance.min_scale) * base.powf(appearance.size_emphasis);
    size.clamp(appearance.min_scale, appearance.max_scale)
}

/// Reaction factor in [0, 1] driving glow and opacity
pub fn reaction(speed: f32, appearance: &AppearanceConfig) -> f32 {
    unit(speed * appearance.reaction_sensitivity)
}

/// Power-curved color factor in [0, 1]
pub fn color_factor(speed: f32, appearance: &AppearanceConfig) -> f32 {
    unit(speed * appearance.color_sensitivity).powf(appearance.color_power)
}

/// Convert a per-reference-frame interpolation rate to this tick's frame scale
#[inline]
pub(crate) fn frame_lerp(rate: f32, frame_scale: f32) -> f32 {
    1.0 - (1.0 - rate).powf(frame_scale)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn configs() -> (TerrainConfig, AppearanceConfig) {
        (TerrainConfig::default(), AppearanceConfig::default())
    }

    #[test]
    fn test_loss_size_largest_near_minima() {
        let (terrain, appearance) = configs();
        let low = loss_size(terrain.min_height, &terrain, &appearance);
        let high = loss_size(terrain.max_height, &terrain, &appearance);
        assert_relative_eq!(low, appearance.max_scale);
        assert_relative_eq!(high, appearance.min_scale);

        let mid = loss_size(15.0, &terrain, &appearance);
        assert!(mid > high && mid < low);
    }

    #[test]
    fn test_reverse_scaling() {
        let (terrain, mut appearance) = configs();
        appearance.reverse_scaling = true;
        let low = loss_size(terrain.min_height, &terrain, &appearance);
        let high = loss_size(terrain.max_height, &terrain, &appearance);
        assert_relative_eq!(low, appearance.min_scale);
        assert_relative_eq!(high, appearance.max_scale);
    }

    #[test]
    fn test_loss_size_clamped_outside_range() {
        let (terrain, appearance) = configs();
        assert_relative_eq!(loss_size(-500.0, &terrain, &appearance), appearance.max_scale);
        assert_relative_eq!(loss_size(500.0, &terrain, &appearance), appearance.min_scale);
        assert_relative_eq!(loss_size(f32::NAN, &terrain, &appearance), appearance.max_scale);
    }

    #[test]
    fn test_reaction_bounds() {
        let (_, appearance) = configs();
        assert_eq!(reaction(0.0, &appearance), 0.0);
        assert_eq!(reaction(100.0, &appearance), 1.0);
        assert_eq!(reaction(f32::NAN, &appearance), 0.0);
        assert_eq!(color_factor(100.0, &appearance), 1.0);
    }

    #[test]
    fn test_active_visuals_follow_speed() {
        let (terrain, appearance) = configs();
        let mut slow = VisualState::staged(0.0, &terrain, &appearance);
        let mut fast = slow;
        slow.update_active(0.0, 0.0, 1.0, &terrain, &appearance);
        fast.update_active(3.0, 0.0, 1.0, &terrain, &appearance);

        assert_relative_eq!(slow.glow, appearance.glow_min);
        assert_relative_eq!(slow.opacity, appearance.opacity_min);
        assert_eq!(slow.color, appearance.active_color);
        assert!(fast.glow > slow.glow);
        assert!(fast.speed_boost > 0.0);
        assert!(fast.scale > slow.scale);
    }

    #[test]
    fn test_boost_eases_slower_when_still() {
        let (terrain, appearance) = configs();
        let mut moving = VisualState::staged(0.0, &terrain, &appearance);
        moving.speed_boost = 0.5;
        let mut still = moving;

        moving.update_active(appearance.still_speed, 0.0, 1.0, &terrain, &appearance);
        still.update_active(0.0, 0.0, 1.0, &terrain, &appearance);

        // Both head toward small targets; the stationary one moves less
        assert!(0.5 - still.speed_boost < 0.5 - moving.speed_boost);
        assert_relative_eq!(still.speed_boost, 0.5 * (1.0 - appearance.boost_rate_still));
    }

    #[test]
    fn test_frame_lerp() {
        assert_relative_eq!(frame_lerp(0.2, 1.0), 0.2);
        assert_relative_eq!(frame_lerp(0.2, 2.0), 0.36, epsilon = 1e-6);
        assert_eq!(frame_lerp(0.2, 0.0), 0.0);
    }

    #[test]
    fn test_decay() {
        let (terrain, appearance) = configs();
        let mut v = VisualState::staged(0.0, &terrain, &appearance);
        let before = v;
        v.decay(0.5, 0.25);
        assert_relative_eq!(v.scale, before.scale * 0.5);
        assert_relative_eq!(v.glow, before.glow * 0.25);
        assert_relative_eq!(v.opacity, before.opacity * 0.25);
    }
}

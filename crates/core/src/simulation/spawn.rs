//! Spawn-site selection
//!
//! The selector draws biased view-space queries, resolves them to terrain
//! points through a [`GroundIntersector`], and rejects sites that are off
//! the terrain, too low, or hidden from the camera. A slot whose attempts
//! all fail is simply left for the next tick; selection never blocks.

use crate::config::SpawnConfig;
use crate::core_types::{Vec2, Vec3};
use crate::grid::{HeightField, NORMAL_STEP};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::trace;

/// A resolved point on the terrain surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundHit {
    pub point: Vec3,
    pub normal: Vec3,
}

/// Ground-intersection query supplied by the view collaborator.
///
/// `query` is a normalized view coordinate in `[-1, 1]²`: `x` runs left to
/// right, `y` runs from the near edge of the view (-1) to the far edge (+1).
pub trait GroundIntersector {
    /// Resolve a view query to the terrain, or `None` when nothing is hit
    fn intersect(&self, query: Vec2) -> Option<GroundHit>;

    /// Eye position used for the line-of-sight test
    fn camera_position(&self) -> Vec3;
}

/// Ground picker that maps view queries straight onto a rectangle of the
/// terrain, for headless runs and tests.
#[derive(Debug, Clone)]
pub struct PlanarGroundPicker {
    height: HeightField,
    center: Vec2,
    half_extent: Vec2,
    camera: Vec3,
}

impl PlanarGroundPicker {
    /// `center`/`half_extent` describe the visible footprint on the ground
    /// plane (`y` is world Z).
    pub fn new(height: HeightField, center: Vec2, half_extent: Vec2, camera: Vec3) -> Self {
        Self {
            height,
            center,
            half_extent,
            camera,
        }
    }

    /// Footprint covering the whole terrain, camera raised behind the -Z edge
    pub fn covering(height: &HeightField) -> Self {
        let camera = Vec3::new(0.0, height.depth() * 0.35, -height.depth() * 0.75);
        Self::new(
            height.clone(),
            Vec2::zeros(),
            Vec2::new(height.half_width(), height.half_depth()),
            camera,
        )
    }
}

impl GroundIntersector for PlanarGroundPicker {
    fn intersect(&self, query: Vec2) -> Option<GroundHit> {
        if !(query.x.is_finite() && query.y.is_finite()) {
            return None;
        }
        if query.x.abs() > 1.0 || query.y.abs() > 1.0 {
            return None;
        }
        let x = self.center.x + query.x * self.half_extent.x;
        let z = self.center.y + query.y * self.half_extent.y;
        if !self.height.contains(x, z, 0.0) {
            return None;
        }
        Some(GroundHit {
            point: Vec3::new(x, self.height.elevation(x, z), z),
            normal: self.height.normal_at(x, z, NORMAL_STEP),
        })
    }

    fn camera_position(&self) -> Vec3 {
        self.camera
    }
}

/// Why a candidate site was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteRejection {
    /// The query resolved to nothing
    NoHit,
    /// Outside the terrain or inside the edge margin
    OutOfBounds,
    /// Terrain under the site is below the minimum spawn height
    TooLow,
    /// Terrain blocks the line of sight from the camera
    Occluded,
}

/// Draws and validates spawn sites with a seeded RNG
#[derive(Debug, Clone)]
pub struct SpawnSelector {
    rng: StdRng,
    config: SpawnConfig,
}

impl SpawnSelector {
    /// Seeded from `spawn.rng_seed`, falling back to the terrain seed
    pub fn new(config: &SpawnConfig, terrain_seed: u32) -> Self {
        let seed = config.rng_seed.unwrap_or(u64::from(terrain_seed));
        Self {
            rng: StdRng::seed_from_u64(seed),
            config: config.clone(),
        }
    }

    /// Biased view query.
    ///
    /// Horizontal draws are pulled toward the view center by
    /// `|r|^horizontal_bias`; depth draws toward the near edge by
    /// `s^distance_bias`.
    pub fn draw_query(&mut self) -> Vec2 {
        let r: f32 = self.rng.random_range(-1.0..=1.0);
        let s: f32 = self.rng.random();
        let u = r.signum() * r.abs().powf(self.config.horizontal_bias);
        let v = 2.0 * s.powf(self.config.distance_bias) - 1.0;
        Vec2::new(u, v)
    }

    /// Resolve and check one query, returning the ground-plane site
    pub fn evaluate(
        &self,
        query: Vec2,
        height: &HeightField,
        ground: &dyn GroundIntersector,
    ) -> Result<Vec2, SiteRejection> {
        let hit = ground.intersect(query).ok_or(SiteRejection::NoHit)?;
        let (x, z) = (hit.point.x, hit.point.z);
        if !height.contains(x, z, self.config.edge_margin) {
            return Err(SiteRejection::OutOfBounds);
        }
        let elevation = height.elevation(x, z);
        if elevation < self.config.min_spawn_height {
            return Err(SiteRejection::TooLow);
        }
        if !self.line_of_sight(ground.camera_position(), Vec3::new(x, elevation, z), height) {
            return Err(SiteRejection::Occluded);
        }
        Ok(Vec2::new(x, z))
    }

    /// Coarse visibility: interior points of the camera-to-site segment must
    /// stay `los_clearance` above the terrain.
    fn line_of_sight(&self, camera: Vec3, site: Vec3, height: &HeightField) -> bool {
        let samples = self.config.los_samples;
        (1..=samples).all(|k| {
            let t = k as f32 / (samples + 1) as f32;
            let p = camera + (site - camera) * t;
            height.elevation(p.x, p.z) + self.config.los_clearance <= p.y
        })
    }

    /// Try up to `attempts_per_slot` draws for one slot
    pub fn find_site(
        &mut self,
        height: &HeightField,
        ground: &dyn GroundIntersector,
    ) -> Option<Vec2> {
        for attempt in 0..self.config.attempts_per_slot {
            let query = self.draw_query();
            match self.evaluate(query, height, ground) {
                Ok(site) => return Some(site),
                Err(reason) => trace!(
                    "Spawn attempt {} rejected at ({:.2}, {:.2}): {:?}",
                    attempt,
                    query.x,
                    query.y,
                    reason
                ),
            }
        }
        None
    }

    /// Uniform point in the disc of `radius` around `center`
    pub fn jitter(&mut self, center: Vec2, radius: f32) -> Vec2 {
        if radius <= 0.0 {
            return center;
        }
        let angle: f32 = self.rng.random_range(0.0..TAU);
        let r = radius * self.rng.random::<f32>().sqrt();
        center + Vec2::new(angle.cos(), angle.sin()) * r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpawnConfig, TerrainConfig};

    fn height() -> HeightField {
        HeightField::new(&TerrainConfig::default(), 42)
    }

    /// Always resolves to the same ground point
    struct FixedGround {
        hit: Option<GroundHit>,
        camera: Vec3,
    }

    impl GroundIntersector for FixedGround {
        fn intersect(&self, _query: Vec2) -> Option<GroundHit> {
            self.hit
        }

        fn camera_position(&self) -> Vec3 {
            self.camera
        }
    }

    fn fixed(x: f32, z: f32, camera: Vec3) -> FixedGround {
        FixedGround {
            hit: Some(GroundHit {
                point: Vec3::new(x, 0.0, z),
                normal: Vec3::y(),
            }),
            camera,
        }
    }

    #[test]
    fn test_planar_picker_maps_corners() {
        let hf = height();
        let picker = PlanarGroundPicker::covering(&hf);
        let hit = picker.intersect(Vec2::new(-1.0, 1.0)).expect("corner hit");
        assert_eq!((hit.point.x, hit.point.z), (-1000.0, 1000.0));
        assert_eq!(hit.point.y, hf.elevation(-1000.0, 1000.0));
        assert!(picker.intersect(Vec2::new(1.5, 0.0)).is_none());
        assert!(picker.intersect(Vec2::new(f32::NAN, 0.0)).is_none());
        assert!(picker.camera_position().z < -hf.half_depth());
    }

    #[test]
    fn test_query_draws_stay_in_view() {
        let mut selector = SpawnSelector::new(&SpawnConfig::default(), 42);
        let mut near = 0;
        for _ in 0..2000 {
            let q = selector.draw_query();
            assert!((-1.0..=1.0).contains(&q.x));
            assert!((-1.0..=1.0).contains(&q.y));
            if q.y < 0.0 {
                near += 1;
            }
        }
        // s^1.8 < 0.5 for s < 0.68
        assert!(near > 1200, "Distance bias missing: {near} near draws");
    }

    #[test]
    fn test_same_seed_same_draws() {
        let config = SpawnConfig::default();
        let mut a = SpawnSelector::new(&config, 7);
        let mut b = SpawnSelector::new(&config, 7);
        for _ in 0..20 {
            assert_eq!(a.draw_query(), b.draw_query());
        }
    }

    #[test]
    fn test_rejects_out_of_bounds_and_no_hit() {
        let hf = height();
        let selector = SpawnSelector::new(&SpawnConfig::default(), 1);
        let camera = Vec3::new(0.0, 700.0, -1500.0);
        let edge = fixed(995.0, 0.0, camera);
        assert_eq!(
            selector.evaluate(Vec2::zeros(), &hf, &edge),
            Err(SiteRejection::OutOfBounds)
        );
        let miss = FixedGround { hit: None, camera };
        assert_eq!(
            selector.evaluate(Vec2::zeros(), &hf, &miss),
            Err(SiteRejection::NoHit)
        );
    }

    #[test]
    fn test_rejects_low_ground() {
        let hf = height();
        let config = SpawnConfig {
            min_spawn_height: 1000.0,
            ..SpawnConfig::default()
        };
        let selector = SpawnSelector::new(&config, 1);
        let ground = fixed(0.0, 0.0, Vec3::new(0.0, 700.0, -1500.0));
        assert_eq!(
            selector.evaluate(Vec2::zeros(), &hf, &ground),
            Err(SiteRejection::TooLow)
        );
    }

    #[test]
    fn test_rejects_occluded_site() {
        let hf = height();
        let config = SpawnConfig {
            min_spawn_height: f32::MIN,
            ..SpawnConfig::default()
        };
        let selector = SpawnSelector::new(&config, 1);
        // Camera buried far below the surface
        let ground = fixed(0.0, 0.0, Vec3::new(0.0, -500.0, -900.0));
        assert_eq!(
            selector.evaluate(Vec2::zeros(), &hf, &ground),
            Err(SiteRejection::Occluded)
        );
        // Same site seen from high above
        let ground = fixed(0.0, 0.0, Vec3::new(0.0, 5000.0, 0.0));
        assert_eq!(
            selector.evaluate(Vec2::zeros(), &hf, &ground),
            Ok(Vec2::new(0.0, 0.0))
        );
    }

    #[test]
    fn test_find_site_gives_up_without_blocking() {
        let hf = height();
        let mut selector = SpawnSelector::new(&SpawnConfig::default(), 3);
        let miss = FixedGround {
            hit: None,
            camera: Vec3::zeros(),
        };
        assert_eq!(selector.find_site(&hf, &miss), None);
    }

    #[test]
    fn test_find_site_on_planar_picker() {
        let hf = height();
        let picker = PlanarGroundPicker::covering(&hf);
        let config = SpawnConfig::default();
        let mut selector = SpawnSelector::new(&config, 42);
        let found: Vec<Vec2> = (0..50)
            .filter_map(|_| selector.find_site(&hf, &picker))
            .collect();
        assert!(!found.is_empty());
        for site in found {
            assert!(hf.contains(site.x, site.y, config.edge_margin));
            assert!(hf.elevation(site.x, site.y) >= config.min_spawn_height);
        }
    }

    #[test]
    fn test_jitter_stays_in_disc() {
        let mut selector = SpawnSelector::new(&SpawnConfig::default(), 5);
        let center = Vec2::new(10.0, -4.0);
        for _ in 0..500 {
            let p = selector.jitter(center, 12.0);
            assert!((p - center).norm() <= 12.0 + 1e-4);
        }
        assert_eq!(selector.jitter(center, 0.0), center);
    }
}

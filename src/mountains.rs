use std::f32::consts::TAU;

use crate::noise::NoiseEngine;
use crate::rng::{sub_seed, Rng};

/// One linear mountain range in normalized [0, 1]² coordinates.
#[derive(Clone, Debug)]
pub struct Range {
    pub center: (f32, f32),
    /// Extent along the range axis, as a fraction of the world.
    pub length: f32,
    /// Extent across the axis.
    pub width: f32,
    pub max_height: f32,
    pub orientation: f32,
}

/// Fixed set of ranges for one seed; evaluation is pure.
pub struct MountainModel {
    pub ranges: Vec<Range>,
}

impl MountainModel {
    pub fn new(seed: u64, num_ranges: usize, min_height: f32, max_height: f32) -> Self {
        let mut rng = Rng::new(sub_seed(seed, 0x6d74_6e73));
        let mut ranges = Vec::with_capacity(num_ranges);
        for _ in 0..num_ranges {
            ranges.push(Range {
                center: (rng.range_f32(0.1, 0.9), rng.range_f32(0.1, 0.9)),
                length: rng.range_f32(0.2, 0.6),
                width: rng.range_f32(0.05, 0.15),
                max_height: rng.range_f32(min_height, max_height),
                orientation: rng.range_f32(0.0, TAU),
            });
        }
        Self { ranges }
    }

    /// Elevation contribution in meters at a normalized point. Each range
    /// is a rotated ridge with quadratic falloff along both axes, broken
    /// up by 30% noise variation.
    pub fn elevation(&self, noise: &NoiseEngine, x: f32, y: f32) -> f32 {
        let mut total = 0.0;
        for range in &self.ranges {
            let dx = x - range.center.0;
            let dy = y - range.center.1;

            // Rotate into the range frame; local_x runs along the spine.
            let cos_a = (-range.orientation).cos();
            let sin_a = (-range.orientation).sin();
            let local_x = dx * cos_a - dy * sin_a;
            let local_y = dx * sin_a + dy * cos_a;

            let across = (1.0 - local_y.abs() / (range.width * 0.5)).max(0.0);
            let along = (1.0 - local_x.abs() / (range.length * 0.5)).max(0.0);
            if across == 0.0 || along == 0.0 {
                continue;
            }

            let variation = 1.0 + 0.3 * noise.noise2d(x * 8.0, y * 8.0);
            total += range.max_height * across * across * along * along * variation;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_respect_config() {
        let model = MountainModel::new(42, 4, 800.0, 2500.0);
        assert_eq!(model.ranges.len(), 4);
        for r in &model.ranges {
            assert!(r.center.0 >= 0.1 && r.center.0 <= 0.9);
            assert!(r.length >= 0.2 && r.length <= 0.6);
            assert!(r.width >= 0.05 && r.width <= 0.15);
            assert!(r.max_height >= 800.0 && r.max_height <= 2500.0);
        }
    }

    #[test]
    fn zero_far_from_all_ranges() {
        // A single tiny range pinned by construction cannot reach the
        // opposite corner of the unit square.
        let model = MountainModel::new(9, 1, 800.0, 2500.0);
        let noise = NoiseEngine::new(9);
        let r = &model.ranges[0];
        let far = (
            if r.center.0 < 0.5 { 1.4 } else { -0.4 },
            if r.center.1 < 0.5 { 1.4 } else { -0.4 },
        );
        assert_eq!(model.elevation(&noise, far.0, far.1), 0.0);
    }

    #[test]
    fn peak_near_center_is_positive() {
        let model = MountainModel::new(42, 4, 800.0, 2500.0);
        let noise = NoiseEngine::new(42);
        let r = &model.ranges[0];
        let v = model.elevation(&noise, r.center.0, r.center.1);
        assert!(v > 0.0);
    }

    #[test]
    fn deterministic_across_instances() {
        let a = MountainModel::new(5, 4, 800.0, 2500.0);
        let b = MountainModel::new(5, 4, 800.0, 2500.0);
        let noise = NoiseEngine::new(5);
        for i in 0..20 {
            let x = i as f32 / 19.0;
            assert_eq!(a.elevation(&noise, x, 0.4), b.elevation(&noise, x, 0.4));
        }
    }
}

use crate::rng::{sub_seed, Rng};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BasinKind {
    Continental,
    Foreland,
    Rift,
}

const KINDS: [BasinKind; 3] = [BasinKind::Continental, BasinKind::Foreland, BasinKind::Rift];

/// Bowl-shaped sedimentary depression in normalized coordinates.
#[derive(Clone, Debug)]
pub struct Basin {
    pub center: (f32, f32),
    pub radius: f32,
    /// Depth at the basin center, meters.
    pub depth: f32,
    pub kind: BasinKind,
}

pub struct BasinModel {
    pub basins: Vec<Basin>,
}

impl BasinModel {
    pub fn new(seed: u64, num_basins: usize, min_depth: f32, max_depth: f32) -> Self {
        let mut rng = Rng::new(sub_seed(seed, 0x6261_7369));
        let mut basins = Vec::with_capacity(num_basins);
        for i in 0..num_basins {
            basins.push(Basin {
                center: (rng.range_f32(0.1, 0.9), rng.range_f32(0.1, 0.9)),
                radius: rng.range_f32(0.15, 0.3),
                depth: rng.range_f32(min_depth, max_depth),
                kind: KINDS[i % 3],
            });
        }
        Self { basins }
    }

    /// Depression in meters at a normalized point. `(1 - (d/r)²)²` inside
    /// the radius, zero outside; never positive.
    pub fn depression(&self, x: f32, y: f32) -> f32 {
        let mut total = 0.0;
        for basin in &self.basins {
            let dx = x - basin.center.0;
            let dy = y - basin.center.1;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < basin.radius {
                let t = 1.0 - (dist / basin.radius) * (dist / basin.radius);
                total -= basin.depth * t * t;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depression_is_never_positive() {
        let model = BasinModel::new(42, 3, 20.0, 60.0);
        for iy in 0..25 {
            for ix in 0..25 {
                let v = model.depression(ix as f32 / 24.0, iy as f32 / 24.0);
                assert!(v <= 0.0, "positive depression at ({ix}, {iy}): {v}");
            }
        }
    }

    #[test]
    fn deepest_at_center_zero_outside() {
        let model = BasinModel::new(7, 1, 20.0, 60.0);
        let b = &model.basins[0];
        let at_center = model.depression(b.center.0, b.center.1);
        assert!((at_center + b.depth).abs() < 1e-4);
        let outside = model.depression(b.center.0 + b.radius * 1.01, b.center.1);
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn kinds_cycle_through_catalog() {
        let model = BasinModel::new(1, 3, 20.0, 60.0);
        assert_eq!(model.basins[0].kind, BasinKind::Continental);
        assert_eq!(model.basins[1].kind, BasinKind::Foreland);
        assert_eq!(model.basins[2].kind, BasinKind::Rift);
    }
}

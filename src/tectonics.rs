use std::f32::consts::TAU;

use rayon::prelude::*;

use crate::grid::Grid;
use crate::rng::{sub_seed, Rng};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlateKind {
    Continental,
    Oceanic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryKind {
    Divergent,
    Convergent,
    Transform,
}

/// One tectonic plate in normalized [0, 1]² world coordinates.
#[derive(Clone, Debug)]
pub struct Plate {
    pub center: (f32, f32),
    pub radius: f32,
    pub kind: PlateKind,
    pub velocity: (f32, f32),
    /// Geological age in My. Drives nothing directly yet but is part of
    /// the model so stress/age queries stay cheap.
    pub age: f32,
    pub density: f32,
    pub thickness: f32,
}

/// Contact zone between two adjacent plates.
#[derive(Clone, Debug)]
pub struct Boundary {
    pub plate_a: usize,
    pub plate_b: usize,
    pub kind: BoundaryKind,
    pub strength: f32,
    /// Midpoint between the plate centers.
    pub position: (f32, f32),
}

#[derive(Clone, Debug)]
pub struct Fault {
    pub position: (f32, f32),
    pub length: f32,
    pub angle: f32,
    pub depth: f32,
    pub activity: f32,
    pub boundary_kind: BoundaryKind,
}

/// Plate layout, boundaries and fault zones for one seed. Built once per
/// world and only read afterwards.
pub struct TectonicModel {
    pub plates: Vec<Plate>,
    pub boundaries: Vec<Boundary>,
    pub faults: Vec<Fault>,
}

impl TectonicModel {
    pub fn new(seed: u64, num_plates: usize, continental_fraction: f32) -> Self {
        let mut rng = Rng::new(sub_seed(seed, 0x7465_6374));

        let mut plates = Vec::with_capacity(num_plates);
        for _ in 0..num_plates {
            let center = (rng.range_f32(0.1, 0.9), rng.range_f32(0.1, 0.9));
            let radius = rng.range_f32(0.15, 0.35);
            // Continental crust is lighter and thicker than oceanic.
            let (kind, density, thickness) = if rng.next_f32() < continental_fraction {
                (
                    PlateKind::Continental,
                    rng.range_f32(2.7, 3.0),
                    rng.range_f32(30.0, 70.0),
                )
            } else {
                (
                    PlateKind::Oceanic,
                    rng.range_f32(3.0, 3.3),
                    rng.range_f32(5.0, 15.0),
                )
            };
            let velocity = (rng.range_f32(-0.001, 0.001), rng.range_f32(-0.001, 0.001));
            let age = rng.range_f32(10.0, 200.0);
            plates.push(Plate {
                center,
                radius,
                kind,
                velocity,
                age,
                density,
                thickness,
            });
        }

        let boundaries = Self::derive_boundaries(&plates);
        let faults = Self::derive_faults(&plates, &boundaries, &mut rng);

        Self {
            plates,
            boundaries,
            faults,
        }
    }

    fn derive_boundaries(plates: &[Plate]) -> Vec<Boundary> {
        let mut boundaries = Vec::new();
        for i in 0..plates.len() {
            for j in (i + 1)..plates.len() {
                let a = &plates[i];
                let b = &plates[j];
                let dx = b.center.0 - a.center.0;
                let dy = b.center.1 - a.center.1;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist >= (a.radius + b.radius) * 1.2 {
                    continue;
                }

                // Project relative velocity onto the inter-center axis.
                let (nx, ny) = (dx / dist, dy / dist);
                let rvx = b.velocity.0 - a.velocity.0;
                let rvy = b.velocity.1 - a.velocity.1;
                let dot = rvx * nx + rvy * ny;
                let kind = if dot.abs() < 1e-4 {
                    BoundaryKind::Transform
                } else if dot > 0.0 {
                    BoundaryKind::Divergent
                } else {
                    BoundaryKind::Convergent
                };

                let rel_speed = (rvx * rvx + rvy * rvy).sqrt();
                let strength = ((a.density - b.density).abs() * 0.5 + rel_speed * 1000.0) * 0.5;

                boundaries.push(Boundary {
                    plate_a: i,
                    plate_b: j,
                    kind,
                    strength,
                    position: (
                        (a.center.0 + b.center.0) * 0.5,
                        (a.center.1 + b.center.1) * 0.5,
                    ),
                });
            }
        }
        boundaries
    }

    fn derive_faults(_plates: &[Plate], boundaries: &[Boundary], rng: &mut Rng) -> Vec<Fault> {
        let mut faults = Vec::new();
        for boundary in boundaries {
            let count = match boundary.kind {
                BoundaryKind::Convergent => rng.range_usize(3, 8),
                BoundaryKind::Divergent => rng.range_usize(2, 5),
                BoundaryKind::Transform => rng.range_usize(1, 4),
            };
            for _ in 0..count {
                let position = (
                    boundary.position.0 + rng.range_f32(-0.1, 0.1),
                    boundary.position.1 + rng.range_f32(-0.1, 0.1),
                );
                faults.push(Fault {
                    position,
                    length: rng.range_f32(0.05, 0.2),
                    angle: rng.range_f32(0.0, TAU),
                    depth: rng.range_f32(5.0, 25.0),
                    activity: rng.range_f32(0.1, 1.0),
                    boundary_kind: boundary.kind,
                });
            }
        }
        faults
    }

    /// Dimensionless tectonic contribution at a normalized point.
    /// Continental plates lift, oceanic plates depress; boundaries add
    /// peaks, rifts or damped oscillation; faults perturb directionally.
    pub fn influence(&self, x: f32, y: f32) -> f32 {
        let mut total = 0.0;

        for plate in &self.plates {
            let dx = x - plate.center.0;
            let dy = y - plate.center.1;
            let dist = (dx * dx + dy * dy).sqrt();
            total += match plate.kind {
                PlateKind::Continental => (-dist / (plate.radius * 0.5)).exp() * 0.8,
                PlateKind::Oceanic => -(-dist / (plate.radius * 0.3)).exp() * 0.4,
            };
        }

        for boundary in &self.boundaries {
            let dx = x - boundary.position.0;
            let dy = y - boundary.position.1;
            let dist = (dx * dx + dy * dy).sqrt();
            total += match boundary.kind {
                BoundaryKind::Convergent => (-dist / 0.1).exp() * boundary.strength * 1.5,
                BoundaryKind::Divergent => -(-dist / 0.08).exp() * boundary.strength * 0.8,
                BoundaryKind::Transform => {
                    (dist * 20.0).sin() * (-dist / 0.05).exp() * boundary.strength * 0.3
                }
            };
        }

        for fault in &self.faults {
            let dx = x - fault.position.0;
            let dy = y - fault.position.1;
            let dist = (dx * dx + dy * dy).sqrt();
            let directional = (fault.angle.cos() * dx + fault.angle.sin() * dy).abs();
            let f = (-dist / 0.03).exp() * fault.activity * (1.0 + directional) * 0.2;
            match fault.boundary_kind {
                BoundaryKind::Convergent => total += f,
                _ => total -= f * 0.5,
            }
        }

        total
    }

    /// Fills `out` with influence sampled at the given normalized
    /// coordinate axes, one rayon task per row.
    pub fn influence_into(&self, xs: &[f32], ys: &[f32], out: &mut Grid<f32>) {
        debug_assert_eq!(out.w, xs.len());
        debug_assert_eq!(out.h, ys.len());
        out.data
            .par_chunks_mut(xs.len())
            .zip(ys.par_iter())
            .for_each(|(row, &y)| {
                for (cell, &x) in row.iter_mut().zip(xs) {
                    *cell = self.influence(x, y);
                }
            });
    }

    /// Plate containing the point, if any. First match wins.
    pub fn plate_at(&self, x: f32, y: f32) -> Option<&Plate> {
        self.plates.iter().find(|p| {
            let dx = x - p.center.0;
            let dy = y - p.center.1;
            (dx * dx + dy * dy).sqrt() <= p.radius
        })
    }

    /// Stress level near boundaries and faults, usable for differential
    /// erosion weighting.
    pub fn stress(&self, x: f32, y: f32) -> f32 {
        let mut stress = 0.0;
        for boundary in &self.boundaries {
            let dx = x - boundary.position.0;
            let dy = y - boundary.position.1;
            let dist = (dx * dx + dy * dy).sqrt();
            stress += (-dist / 0.15).exp() * boundary.strength;
        }
        for fault in &self.faults {
            let dx = x - fault.position.0;
            let dy = y - fault.position.1;
            let dist = (dx * dx + dy * dy).sqrt();
            stress += (-dist / 0.05).exp() * fault.activity;
        }
        stress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plates_land_inside_margins() {
        let model = TectonicModel::new(42, 8, 0.6);
        assert_eq!(model.plates.len(), 8);
        for p in &model.plates {
            assert!(p.center.0 >= 0.1 && p.center.0 <= 0.9);
            assert!(p.center.1 >= 0.1 && p.center.1 <= 0.9);
            assert!(p.radius >= 0.15 && p.radius <= 0.35);
            match p.kind {
                PlateKind::Continental => {
                    assert!(p.density >= 2.7 && p.density <= 3.0);
                    assert!(p.thickness >= 30.0 && p.thickness <= 70.0);
                }
                PlateKind::Oceanic => {
                    assert!(p.density >= 3.0 && p.density <= 3.3);
                    assert!(p.thickness >= 5.0 && p.thickness <= 15.0);
                }
            }
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let a = TectonicModel::new(7, 8, 0.6);
        let b = TectonicModel::new(7, 8, 0.6);
        assert_eq!(a.boundaries.len(), b.boundaries.len());
        assert_eq!(a.faults.len(), b.faults.len());
        for (pa, pb) in a.plates.iter().zip(&b.plates) {
            assert_eq!(pa.center, pb.center);
            assert_eq!(pa.velocity, pb.velocity);
        }
        assert_eq!(a.influence(0.3, 0.7), b.influence(0.3, 0.7));
    }

    #[test]
    fn influence_is_finite_everywhere() {
        let model = TectonicModel::new(42, 8, 0.6);
        for iy in 0..20 {
            for ix in 0..20 {
                let v = model.influence(ix as f32 / 19.0, iy as f32 / 19.0);
                assert!(v.is_finite());
            }
        }
    }

    #[test]
    fn influence_into_matches_pointwise() {
        let model = TectonicModel::new(3, 6, 0.6);
        let xs: Vec<f32> = (0..9).map(|i| i as f32 / 8.0).collect();
        let ys = xs.clone();
        let mut grid: Grid<f32> = Grid::new(9, 9);
        model.influence_into(&xs, &ys, &mut grid);
        for (yi, &y) in ys.iter().enumerate() {
            for (xi, &x) in xs.iter().enumerate() {
                assert_eq!(grid.get(xi, yi), model.influence(x, y));
            }
        }
    }

    #[test]
    fn plate_centers_resolve_to_their_plate() {
        let model = TectonicModel::new(11, 8, 0.6);
        let first = &model.plates[0];
        let found = model.plate_at(first.center.0, first.center.1);
        assert!(found.is_some());
        // far outside the unit square no plate can reach
        assert!(model.plate_at(5.0, 5.0).is_none());
    }

    #[test]
    fn stress_peaks_near_boundaries() {
        let model = TectonicModel::new(42, 8, 0.6);
        let b = &model.boundaries[0];
        let near = model.stress(b.position.0, b.position.1);
        let far = model.stress(5.0, 5.0);
        assert!(near > far);
        assert!(near.is_finite() && near >= 0.0);
    }

    #[test]
    fn boundary_strength_is_positive() {
        let model = TectonicModel::new(42, 8, 0.6);
        for b in &model.boundaries {
            assert!(b.strength > 0.0);
        }
    }
}

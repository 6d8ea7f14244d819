use log::debug;

use crate::config::ErosionParams;
use crate::grid::Grid;
use crate::rng::{sub_seed, Rng};

/// Grid-mass accounting for one erosion pass. `eroded` and `deposited`
/// are total height removed/added across all cells, in the same units as
/// droplet sediment, so `eroded - deposited` equals the drop in the
/// grid's height sum and `eroded = deposited + carried_out` up to
/// rounding.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErosionReport {
    pub droplets: usize,
    pub eroded: f32,
    pub deposited: f32,
    /// Sediment still carried by droplets that died or left the grid.
    pub carried_out: f32,
}

struct Droplet {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    water: f32,
    sediment: f32,
}

/// Central-difference gradients, one-sided at the borders.
fn gradients(height: &Grid<f32>) -> (Grid<f32>, Grid<f32>) {
    let (w, h) = (height.w, height.h);
    let mut gx: Grid<f32> = Grid::new(w, h);
    let mut gy: Grid<f32> = Grid::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = if x == 0 {
                height.get(1, y) - height.get(0, y)
            } else if x == w - 1 {
                height.get(w - 1, y) - height.get(w - 2, y)
            } else {
                (height.get(x + 1, y) - height.get(x - 1, y)) * 0.5
            };
            let dy = if y == 0 {
                height.get(x, 1) - height.get(x, 0)
            } else if y == h - 1 {
                height.get(x, h - 1) - height.get(x, h - 2)
            } else {
                (height.get(x, y + 1) - height.get(x, y - 1)) * 0.5
            };
            gx.set(x, y, dx);
            gy.set(x, y, dy);
        }
    }
    (gx, gy)
}

/// Spread `amount` (positive deposits, negative erodes) over the cells
/// within `radius` of the droplet, weighted `1 - d/r` and normalized so
/// the total applied equals `amount`. Keeps grid mass in the same units
/// as droplet sediment. Returns the total height actually applied.
fn apply_radial(height: &mut Grid<f32>, cx: f32, cy: f32, radius: usize, amount: f32) -> f32 {
    let (w, h) = (height.w as i64, height.h as i64);
    let (cx, cy) = (cx as i64, cy as i64);
    let r = radius as i64;
    let rf = radius as f32;

    let mut weight_sum = 0.0;
    for dy in -r..=r {
        for dx in -r..=r {
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || x >= w || y < 0 || y >= h {
                continue;
            }
            let dist = ((dx * dx + dy * dy) as f32).sqrt();
            if dist <= rf {
                weight_sum += 1.0 - dist / rf;
            }
        }
    }
    if weight_sum <= 0.0 {
        return 0.0;
    }

    let mut applied = 0.0;
    for dy in -r..=r {
        for dx in -r..=r {
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || x >= w || y < 0 || y >= h {
                continue;
            }
            let dist = ((dx * dx + dy * dy) as f32).sqrt();
            if dist > rf {
                continue;
            }
            let delta = amount * (1.0 - dist / rf) / weight_sum;
            let i = height.idx(x as usize, y as usize);
            height.data[i] += delta;
            applied += delta;
        }
    }
    applied
}

/// Droplet-based hydraulic erosion, strictly sequential within a tile.
/// All randomness comes from the salted seed, so the same tile erodes the
/// same way on every run.
pub fn erode(height: &mut Grid<f32>, params: &ErosionParams, seed: u64) -> ErosionReport {
    let mut report = ErosionReport::default();
    if height.w < 2 || height.h < 2 || params.iterations == 0 {
        return report;
    }

    let mut rng = Rng::new(sub_seed(seed, 0x6572_6f64));
    let refresh = params.gradient_refresh_interval.max(1);
    let (mut gx, mut gy) = gradients(height);

    for iteration in 0..params.iterations {
        if iteration > 0 && iteration % refresh == 0 {
            let g = gradients(height);
            gx = g.0;
            gy = g.1;
        }

        let mut d = Droplet {
            x: rng.next_f32() * (height.w - 1) as f32,
            y: rng.next_f32() * (height.h - 1) as f32,
            vx: 0.0,
            vy: 0.0,
            water: 1.0,
            sediment: 0.0,
        };

        for _ in 0..params.max_droplet_lifetime {
            let node_x = d.x as i64;
            let node_y = d.y as i64;
            if node_x < 0
                || node_x >= height.w as i64 - 1
                || node_y < 0
                || node_y >= height.h as i64 - 1
            {
                break;
            }

            let current = height.sample(d.x, d.y);
            let mut dir_x = -gx.sample(d.x, d.y);
            let mut dir_y = -gy.sample(d.x, d.y);
            let len = (dir_x * dir_x + dir_y * dir_y).sqrt();
            if len > 0.0 {
                dir_x /= len;
                dir_y /= len;
            }

            let new_x = d.x + dir_x;
            let new_y = d.y + dir_y;
            let height_diff = current - height.sample(new_x, new_y);

            let speed = (d.vx * d.vx + d.vy * d.vy).sqrt();
            let capacity = (height_diff * speed * d.water * params.sediment_capacity_factor)
                .max(params.min_sediment_capacity);

            if d.sediment > capacity || height_diff < 0.0 {
                // Over capacity or climbing: drop sediment. Uphill moves
                // may fill the pit completely but never more than carried.
                let amount = if height_diff < 0.0 {
                    (-height_diff).min(d.sediment)
                } else {
                    (d.sediment - capacity) * params.deposit_speed
                };
                d.sediment -= amount;
                report.deposited += apply_radial(height, d.x, d.y, params.radius, amount);
            } else {
                let amount = ((capacity - d.sediment) * params.erode_speed).min(height_diff);
                report.eroded -= apply_radial(height, d.x, d.y, params.radius, -amount);
                d.sediment += amount;
            }

            d.vx = d.vx * 0.9 + dir_x * height_diff * params.gravity;
            d.vy = d.vy * 0.9 + dir_y * height_diff * params.gravity;
            d.water *= 1.0 - params.evaporation_rate;

            d.x = new_x;
            d.y = new_y;

            if d.water < 0.01 {
                break;
            }
        }

        report.carried_out += d.sediment;
        report.droplets += 1;
    }

    debug!(
        "erosion pass: {} droplets, eroded {:.2}, deposited {:.2}, carried out {:.2}",
        report.droplets, report.eroded, report.deposited, report.carried_out
    );
    report
}

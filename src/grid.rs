use serde::{Deserialize, Serialize};

/// Row-major flat grid. No per-cell objects, f32 friendly.
/// Tiles are finite squares; out-of-range access is a caller bug.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grid<T> {
    pub data: Vec<T>,
    pub w: usize,
    pub h: usize,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            data: vec![T::default(); w * h],
            w,
            h,
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.w && y < self.h);
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: T) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }
}

impl Grid<f32> {
    /// Bilinear sample at a continuous position. Coordinates are clamped
    /// just inside the grid so the 2x2 neighborhood always exists.
    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x = x.clamp(0.0, (self.w - 1) as f32 - 1e-3);
        let y = y.clamp(0.0, (self.h - 1) as f32 - 1e-3);
        let x0 = x as usize;
        let y0 = y as usize;
        let x1 = (x0 + 1).min(self.w - 1);
        let y1 = (y0 + 1).min(self.h - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let top = self.get(x0, y0) + (self.get(x1, y0) - self.get(x0, y0)) * fx;
        let bot = self.get(x0, y1) + (self.get(x1, y1) - self.get(x0, y1)) * fx;
        top + (bot - top) * fy
    }

    /// True if every cell is finite (no NaN/Inf).
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    pub fn min_max_mean(&self) -> (f32, f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut sum = 0.0f64;
        for &v in &self.data {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
        }
        (min, max, (sum / self.data.len().max(1) as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_matches_cells_at_lattice_points() {
        let mut g = Grid::<f32>::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                g.set(x, y, (y * 4 + x) as f32);
            }
        }
        assert_eq!(g.sample(2.0, 1.0), g.get(2, 1));
    }

    #[test]
    fn sample_interpolates_midpoints() {
        let mut g = Grid::<f32>::new(2, 2);
        g.set(0, 0, 0.0);
        g.set(1, 0, 2.0);
        g.set(0, 1, 0.0);
        g.set(1, 1, 2.0);
        let v = g.sample(0.5, 0.5);
        assert!((v - 1.0).abs() < 1e-3);
    }

    #[test]
    fn sample_clamps_outside_bounds() {
        let mut g = Grid::<f32>::new(3, 3);
        g.set(2, 2, 9.0);
        assert!((g.sample(10.0, 10.0) - 9.0).abs() < 0.1);
    }

    #[test]
    fn min_max_mean_summarizes() {
        let g = Grid::<f32> {
            data: vec![-1.0, 0.0, 4.0, 1.0],
            w: 2,
            h: 2,
        };
        let (min, max, mean) = g.min_max_mean();
        assert_eq!(min, -1.0);
        assert_eq!(max, 4.0);
        assert!((mean - 1.0).abs() < 1e-6);
    }
}

use crate::config_err;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub nx: usize, // Number of cells in x
    pub ny: usize, // Number of cells in y
    pub dx: f64,   // Spacing in x
    pub dy: f64,   // Spacing in y
}

impl Grid {
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return config_err!("Grid dimensions must be positive (nx={}, ny={})", nx, ny);
        }
        if !(dx > 0.0) || !(dy > 0.0) {
            return config_err!("Grid spacing must be positive (dx={}, dy={})", dx, dy);
        }
        Ok(Grid { nx, ny, dx, dy })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn in_bounds(&self, i: usize, j: usize) -> bool {
        i < self.nx && j < self.ny
    }

    /// Number of cells between (i, j) and the nearest of the four edges.
    /// Edge cells are at distance 0.
    pub fn distance_to_edge(&self, i: usize, j: usize) -> usize {
        let d_left = i;
        let d_right = self.nx - 1 - i;
        let d_bottom = j;
        let d_top = self.ny - 1 - j;
        d_left.min(d_right).min(d_bottom.min(d_top))
    }

    /// Squared Euclidean distance from (i, j) to a point, in grid-index units.
    pub fn index_distance_sq(&self, i: usize, j: usize, cx: f64, cy: f64) -> f64 {
        let di = i as f64 - cx;
        let dj = j as f64 - cy;
        di * di + dj * dj
    }
}

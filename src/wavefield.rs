use crate::grid::Grid;
use ndarray::{Array2, Zip};
use std::mem;

/// Starting shape of the field. Both time levels start equal, so the
/// initial time derivative is zero.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialCondition {
    /// amplitude * exp(-r^2 / (2 spread^2)), r in grid-index units
    Gaussian {
        center_x: f64,
        center_y: f64,
        spread: f64,
        amplitude: f64,
    },
    /// A single non-zero cell
    Point { i: usize, j: usize, amplitude: f64 },
    Zero,
}

impl InitialCondition {
    pub fn sample(&self, grid: &Grid) -> Array2<f64> {
        match *self {
            InitialCondition::Gaussian {
                center_x,
                center_y,
                spread,
                amplitude,
            } => {
                let two_s2 = 2.0 * spread * spread;
                Array2::from_shape_fn(grid.shape(), |(i, j)| {
                    amplitude * (-grid.index_distance_sq(i, j, center_x, center_y) / two_s2).exp()
                })
            }
            InitialCondition::Point { i, j, amplitude } => {
                let mut u = Array2::zeros(grid.shape());
                if grid.in_bounds(i, j) {
                    u[[i, j]] = amplitude;
                }
                u
            }
            InitialCondition::Zero => Array2::zeros(grid.shape()),
        }
    }
}

/// Two live time levels plus a scratch buffer that receives the next level.
/// Rotation is a pointer swap; no array is ever reallocated while stepping.
pub struct Wavefield {
    pub current: Array2<f64>,  // u^n
    pub previous: Array2<f64>, // u^(n-1)
    pub next: Array2<f64>,     // u^(n+1), valid only between update and rotate
}

impl Wavefield {
    pub fn new(nx: usize, ny: usize) -> Self {
        Wavefield {
            current: Array2::zeros((nx, ny)),
            previous: Array2::zeros((nx, ny)),
            next: Array2::zeros((nx, ny)),
        }
    }

    pub fn from_initial(grid: &Grid, initial: &InitialCondition) -> Self {
        let mut wavefield = Self::new(grid.nx, grid.ny);
        wavefield.current = initial.sample(grid);
        wavefield.previous.assign(&wavefield.current);
        wavefield
    }

    /// previous <- current, current <- next. The old previous becomes
    /// the scratch buffer for the following step.
    pub fn rotate(&mut self) {
        mem::swap(&mut self.previous, &mut self.current);
        mem::swap(&mut self.current, &mut self.next);
    }

    pub fn snapshot(&self) -> Array2<f64> {
        self.current.clone()
    }

    /// First non-finite value in either live level, if any.
    pub fn first_non_finite(&self) -> Option<f64> {
        self.current
            .iter()
            .chain(self.previous.iter())
            .copied()
            .find(|v| !v.is_finite())
    }

    pub fn max_abs(&self) -> f64 {
        self.current.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
    }

    /// (u^n - u^(n-1)) / dt
    pub fn velocity(&self, dt: f64) -> Array2<f64> {
        Zip::from(&self.current)
            .and(&self.previous)
            .map_collect(|&u, &u_prev| (u - u_prev) / dt)
    }
}

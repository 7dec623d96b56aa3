//! Absorbing boundary realised as a graded damping layer.
//!
//! The layer adds a `2 sigma u_t` term to the wave equation in a band of
//! `thickness` cells along every edge. Inside the band the damping rate
//! ramps polynomially from zero at the inner edge to `sigma_max` at the
//! outer boundary, with `sigma_max` chosen so that a wave crossing the
//! layer and back is attenuated by the target reflection coefficient.

use crate::config_err;
use crate::error::Result;
use crate::grid::Grid;
use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpongeParams {
    pub thickness: usize, // Cells
    pub order: u32,       // Polynomial order m
    pub reflection: f64,  // Target reflection coefficient R
}

impl Default for SpongeParams {
    fn default() -> Self {
        Self {
            thickness: 20,
            order: 2,
            reflection: 1e-5,
        }
    }
}

impl SpongeParams {
    pub fn validate(&self) -> Result<()> {
        if self.thickness == 0 {
            return config_err!("Sponge thickness must be at least one cell");
        }
        if self.order == 0 {
            return config_err!("Sponge polynomial order must be at least 1");
        }
        if !(self.reflection > 0.0 && self.reflection < 1.0) {
            return config_err!(
                "Sponge reflection coefficient must lie in (0, 1), got {}",
                self.reflection
            );
        }
        Ok(())
    }

    /// Layers from opposite edges meet when the band is wider than half
    /// the smaller grid dimension.
    pub fn overlaps(&self, grid: &Grid) -> bool {
        self.thickness > grid.nx.min(grid.ny) / 2
    }

    /// sigma_max = -(c0 (m + 1) / L) ln(R), L = thickness * dx
    pub fn sigma_max(&self, dx: f64, c0: f64) -> f64 {
        let layer_width = self.thickness as f64 * dx;
        -(c0 * (self.order as f64 + 1.0) / layer_width) * self.reflection.ln()
    }
}

pub struct SpongeLayer {
    pub sigma: Array2<f64>,
    pub sigma_dt: Array2<f64>, // sigma * dt, cached for the time update
    pub sigma_max: f64,
    pub thickness: usize,
}

impl SpongeLayer {
    /// No damping anywhere; the domain edges stay purely reflective.
    pub fn disabled(grid: &Grid) -> Self {
        Self {
            sigma: Array2::zeros(grid.shape()),
            sigma_dt: Array2::zeros(grid.shape()),
            sigma_max: 0.0,
            thickness: 0,
        }
    }

    /// `c0` is the representative wave speed used to size the damping.
    pub fn build(grid: &Grid, params: &SpongeParams, c0: f64, dt: f64) -> Result<Self> {
        params.validate()?;
        if !(c0 > 0.0) {
            return config_err!("Representative wave speed must be positive, got {}", c0);
        }
        if params.overlaps(grid) {
            log::warn!(
                "Sponge thickness {} exceeds half the smaller grid dimension ({}x{}); layers from opposite edges overlap",
                params.thickness,
                grid.nx,
                grid.ny
            );
        }

        let b = params.thickness;
        let sigma_max = params.sigma_max(grid.dx, c0);
        let sigma = Array2::from_shape_fn(grid.shape(), |(i, j)| {
            let d = grid.distance_to_edge(i, j);
            if d >= b {
                0.0
            } else {
                let t = (b - d) as f64 / b as f64;
                sigma_max * t.powi(params.order as i32)
            }
        });
        let sigma_dt = sigma.mapv(|s| s * dt);

        Ok(Self {
            sigma,
            sigma_dt,
            sigma_max,
            thickness: b,
        })
    }

    pub fn is_active(&self) -> bool {
        self.thickness > 0
    }
}

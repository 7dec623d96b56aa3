//! Damped leapfrog update for `u_tt + 2 sigma u_t = L / rho`.
//!
//! Both time derivatives use central differences, giving
//!
//! ```text
//! u^(n+1) = (2 u^n - (1 - sigma dt) u^(n-1) + dt^2 L / rho) / (1 + sigma dt)
//! ```
//!
//! which reduces to plain leapfrog wherever `sigma == 0`.

use crate::materials::MaterialProperties;
use crate::sponge::SpongeLayer;
use crate::wavefield::Wavefield;
use ndarray::{Array2, Zip};

pub struct LeapfrogIntegrator {
    pub dt: f64,
    dt2: f64,
}

impl LeapfrogIntegrator {
    pub fn new(dt: f64) -> Self {
        Self { dt, dt2: dt * dt }
    }

    /// Fill `wavefield.next` from the two live levels and the operator output.
    /// Does not rotate; the caller decides when the step is complete.
    pub fn update(
        &self,
        wavefield: &mut Wavefield,
        laplacian: &Array2<f64>,
        materials: &MaterialProperties,
        sponge: &SpongeLayer,
    ) {
        let dt2 = self.dt2;
        let Wavefield {
            current,
            previous,
            next,
        } = wavefield;

        Zip::from(next)
            .and(&*current)
            .and(&*previous)
            .and(laplacian)
            .and(&materials.density)
            .and(&sponge.sigma_dt)
            .par_for_each(|u_next, &u, &u_prev, &l, &rho, &sdt| {
                let accel = l / rho;
                *u_next = (2.0 * u - (1.0 - sdt) * u_prev + dt2 * accel) / (1.0 + sdt);
            });
    }

    pub fn update_serial(
        &self,
        wavefield: &mut Wavefield,
        laplacian: &Array2<f64>,
        materials: &MaterialProperties,
        sponge: &SpongeLayer,
    ) {
        let dt2 = self.dt2;
        let Wavefield {
            current,
            previous,
            next,
        } = wavefield;

        Zip::from(next)
            .and(&*current)
            .and(&*previous)
            .and(laplacian)
            .and(&materials.density)
            .and(&sponge.sigma_dt)
            .for_each(|u_next, &u, &u_prev, &l, &rho, &sdt| {
                let accel = l / rho;
                *u_next = (2.0 * u - (1.0 - sdt) * u_prev + dt2 * accel) / (1.0 + sdt);
            });
    }
}

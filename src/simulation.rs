use crate::config::Config;
use crate::config_err;
use crate::error::{Result, SimError};
use crate::grid::Grid;
use crate::integrator::LeapfrogIntegrator;
use crate::materials::MaterialProperties;
use crate::operator::{BoundaryPolicy, WaveOperator};
use crate::snapshot::SnapshotSink;
use crate::sponge::{SpongeLayer, SpongeParams};
use crate::wavefield::{InitialCondition, Wavefield};
use ndarray::Array2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct SimulationParams {
    pub dt: f64,                       // Time step
    pub n_steps: usize,                // Number of time steps
    pub snapshot_every: usize,         // Snapshot cadence K
    pub divergence_check_every: usize, // Finite-value check cadence
    pub boundary: BoundaryPolicy,
}

impl SimulationParams {
    pub fn new(dt: f64, n_steps: usize) -> Self {
        Self {
            dt,
            n_steps,
            snapshot_every: 10,
            divergence_check_every: 10,
            boundary: BoundaryPolicy::Reflective,
        }
    }

    pub fn total_time(&self) -> f64 {
        self.n_steps as f64 * self.dt
    }

    fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0) {
            return config_err!("dt must be positive, got {}", self.dt);
        }
        if self.snapshot_every == 0 || self.divergence_check_every == 0 {
            return config_err!(
                "Cadences must be at least 1 (snapshot_every={}, divergence_check_every={})",
                self.snapshot_every,
                self.divergence_check_every
            );
        }
        Ok(())
    }
}

/// Cloneable flag that asks a running simulation to stop after the
/// step in progress.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps_completed: usize,
    pub snapshots_emitted: usize,
    pub sink_failures: usize,
    pub stopped: bool,
}

pub struct Simulation {
    pub grid: Grid,
    pub materials: MaterialProperties,
    pub sponge: SpongeLayer,
    pub wavefield: Wavefield,
    pub params: SimulationParams,
    operator: WaveOperator,
    integrator: LeapfrogIntegrator,
    laplacian: Array2<f64>,
    current_step: usize,
    stop: StopHandle,
}

impl Simulation {
    pub fn new(
        grid: Grid,
        materials: MaterialProperties,
        sponge: SpongeLayer,
        initial: &InitialCondition,
        params: SimulationParams,
    ) -> Result<Self> {
        params.validate()?;
        if materials.dim() != grid.shape() {
            return config_err!(
                "Material fields {:?} do not match grid {:?}",
                materials.dim(),
                grid.shape()
            );
        }
        if sponge.sigma.dim() != grid.shape() {
            return config_err!(
                "Damping field {:?} does not match grid {:?}",
                sponge.sigma.dim(),
                grid.shape()
            );
        }

        let max_dt = Self::stable_dt(&grid, &materials);
        if params.dt > max_dt {
            log::warn!(
                "dt={} exceeds the Courant limit {:.6}; expect the wavefield to diverge",
                params.dt,
                max_dt
            );
        }

        let wavefield = Wavefield::from_initial(&grid, initial);

        Ok(Self {
            operator: WaveOperator::new(&grid),
            integrator: LeapfrogIntegrator::new(params.dt),
            laplacian: Array2::zeros(grid.shape()),
            grid,
            materials,
            sponge,
            wavefield,
            params,
            current_step: 0,
            stop: StopHandle::default(),
        })
    }

    /// Build grid, medium, sponge and initial field from a validated config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let grid = config.grid.build()?;
        let materials = MaterialProperties::with_regions(
            &grid,
            config.materials.density,
            config.materials.stiffness,
            &config.materials.regions(),
        )?;

        let sim = &config.simulation;
        let sponge = match &config.sponge {
            Some(sponge) => Self::build_sponge(&grid, &materials, &sponge.params(), sim.dt)?,
            None => SpongeLayer::disabled(&grid),
        };

        let params = SimulationParams {
            dt: sim.dt,
            n_steps: sim.n_steps,
            snapshot_every: sim.snapshot_every,
            divergence_check_every: sim.divergence_check_every,
            boundary: sim.boundary,
        };

        Self::new(
            grid,
            materials,
            sponge,
            &config.initial.to_initial_condition(),
            params,
        )
    }

    /// Sponge tuned to the median wave speed of the medium.
    pub fn build_sponge(
        grid: &Grid,
        materials: &MaterialProperties,
        params: &SpongeParams,
        dt: f64,
    ) -> Result<SpongeLayer> {
        let c0 = materials.representative_speed();
        let sponge = SpongeLayer::build(grid, params, c0, dt)?;
        log::info!(
            "Sponge: depth={} cells, c0={:.4}, sigma_max={:.4e}",
            sponge.thickness,
            c0,
            sponge.sigma_max
        );
        Ok(sponge)
    }

    /// Largest dt for which undamped leapfrog stays bounded:
    /// 1 / (c_max sqrt(1/dx^2 + 1/dy^2)).
    pub fn stable_dt(grid: &Grid, materials: &MaterialProperties) -> f64 {
        let c_max = materials.max_speed();
        let inv_h2 = 1.0 / (grid.dx * grid.dx) + 1.0 / (grid.dy * grid.dy);
        1.0 / (c_max * inv_h2.sqrt())
    }

    pub fn max_stable_dt(&self) -> f64 {
        Self::stable_dt(&self.grid, &self.materials)
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn current_time(&self) -> f64 {
        self.current_step as f64 * self.params.dt
    }

    pub fn is_finished(&self) -> bool {
        self.current_step >= self.params.n_steps
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn field(&self) -> &Array2<f64> {
        &self.wavefield.current
    }

    /// Operator output from the most recent step.
    pub fn laplacian(&self) -> &Array2<f64> {
        &self.laplacian
    }

    /// Discrete energy at the half step between the two live levels:
    /// kinetic `1/2 sum rho ((u^n - u^(n-1)) / dt)^2` plus strain
    /// `1/2 sum K_f (du^n)(du^(n-1)) / h^2`. Undamped leapfrog keeps this
    /// constant up to rounding.
    pub fn energy(&self) -> f64 {
        let velocity = self.wavefield.velocity(self.params.dt);
        let kinetic: f64 = velocity
            .iter()
            .zip(self.materials.density.iter())
            .map(|(v, rho)| rho * v * v)
            .sum();
        let strain = self.operator.strain(
            &self.wavefield.current,
            &self.wavefield.previous,
            &self.materials,
        );
        0.5 * (kinetic + strain)
    }

    /// Advance one step, parallel within the step.
    pub fn step(&mut self) {
        self.operator
            .apply(&self.wavefield.current, &self.materials, &mut self.laplacian);
        self.integrator
            .update(&mut self.wavefield, &self.laplacian, &self.materials, &self.sponge);
        self.finish_step();
    }

    pub fn step_serial(&mut self) {
        self.operator
            .apply_serial(&self.wavefield.current, &self.materials, &mut self.laplacian);
        self.integrator
            .update_serial(&mut self.wavefield, &self.laplacian, &self.materials, &self.sponge);
        self.finish_step();
    }

    fn finish_step(&mut self) {
        self.params.boundary.apply(&mut self.wavefield.next);
        self.wavefield.rotate();
        self.current_step += 1;
    }

    /// Error if the live levels hold a non-finite value.
    pub fn check_divergence(&self) -> Result<()> {
        match self.wavefield.first_non_finite() {
            Some(value) => Err(SimError::NumericalDivergence {
                step: self.current_step,
                value,
            }),
            None => Ok(()),
        }
    }

    /// Run the remaining steps, emitting a snapshot after every step whose
    /// index is a multiple of the cadence. Sink failures are logged and
    /// counted; divergence aborts the run.
    pub fn run<S: SnapshotSink + ?Sized>(&mut self, sink: &mut S) -> Result<RunSummary> {
        log::info!(
            "Starting simulation: {}x{}, dt={}, {} steps (t_end={:.3})",
            self.grid.nx,
            self.grid.ny,
            self.params.dt,
            self.params.n_steps,
            self.params.total_time()
        );

        let mut summary = RunSummary::default();
        let progress_every = (self.params.n_steps / 20).max(1);

        while !self.is_finished() {
            if self.stop.is_stopped() {
                log::info!("Stop requested after step {}", self.current_step);
                summary.stopped = true;
                break;
            }

            let step_index = self.current_step;
            self.step();
            summary.steps_completed += 1;

            if self.current_step % self.params.divergence_check_every == 0 || self.is_finished() {
                self.check_divergence()?;
            }

            if step_index % self.params.snapshot_every == 0 {
                match sink.emit(step_index, self.wavefield.snapshot()) {
                    Ok(()) => summary.snapshots_emitted += 1,
                    Err(e) => {
                        summary.sink_failures += 1;
                        log::warn!("Snapshot at step {} not delivered: {}", step_index, e);
                    }
                }
            }

            if self.current_step % progress_every == 0 {
                log::info!(
                    "Step {}/{} (t={:.3}, max|u|={:.4e})",
                    self.current_step,
                    self.params.n_steps,
                    self.current_time(),
                    self.wavefield.max_abs()
                );
            }
        }

        log::info!(
            "Simulation complete: {} steps, {} snapshots, {} sink failures",
            summary.steps_completed,
            summary.snapshots_emitted,
            summary.sink_failures
        );
        Ok(summary)
    }
}

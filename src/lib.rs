//! Scalar wave propagation over a heterogeneous 2D medium.
//!
//! An explicit leapfrog scheme advances `rho u_tt = div(K grad u)` on a
//! uniform grid. Outgoing waves are absorbed by a polynomial sponge layer
//! along the domain edges. Snapshots of the field are handed to a
//! [`snapshot::SnapshotSink`] so the solver never depends on rendering.

pub mod error;

pub mod config;
pub mod grid;
pub mod integrator;
pub mod materials;
pub mod operator;
pub mod server;
pub mod simulation;
pub mod snapshot;
pub mod sponge;
pub mod visualisation;
pub mod wavefield;

pub use error::{Result, SimError};
pub use simulation::{RunSummary, Simulation, SimulationParams};

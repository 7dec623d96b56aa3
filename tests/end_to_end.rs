use approx::{assert_abs_diff_eq, assert_relative_eq};
use sponge_wave::config::Config;
use sponge_wave::grid::Grid;
use sponge_wave::materials::{MaterialProperties, Region};
use sponge_wave::snapshot::{CollectingSink, NullSink};
use sponge_wave::sponge::{SpongeLayer, SpongeParams};
use sponge_wave::wavefield::InitialCondition;
use sponge_wave::{SimError, Simulation, SimulationParams};

fn unit_medium(n: usize) -> (Grid, MaterialProperties) {
    let grid = Grid::new(n, n, 1.0, 1.0).unwrap();
    let materials = MaterialProperties::uniform(&grid, 1.0, 1.0).unwrap();
    (grid, materials)
}

fn centred_gaussian(n: usize, spread: f64) -> InitialCondition {
    InitialCondition::Gaussian {
        center_x: n as f64 / 2.0,
        center_y: n as f64 / 2.0,
        spread,
        amplitude: 1.0,
    }
}

#[test]
fn single_step_from_point_source() {
    let (grid, materials) = unit_medium(50);
    let dt = 0.3;
    let initial = InitialCondition::Point {
        i: 25,
        j: 25,
        amplitude: 1.0,
    };
    let mut sim = Simulation::new(
        grid,
        materials,
        SpongeLayer::disabled(&grid),
        &initial,
        SimulationParams::new(dt, 1),
    )
    .unwrap();
    sim.run(&mut NullSink).unwrap();

    let u = sim.field();
    let center = 2.0 * 1.0 - 1.0 + dt * dt * (-4.0);
    let neighbour = 2.0 * 0.0 - 0.0 + dt * dt * 1.0;
    assert_abs_diff_eq!(u[[25, 25]], center, epsilon = 1e-15);
    for (i, j) in [(24, 25), (26, 25), (25, 24), (25, 26)] {
        assert_abs_diff_eq!(u[[i, j]], neighbour, epsilon = 1e-15);
    }
    let touched = [(25, 25), (24, 25), (26, 25), (25, 24), (25, 26)];
    for ((i, j), &v) in u.indexed_iter() {
        if !touched.contains(&(i, j)) {
            assert_eq!(v, 0.0, "cell ({}, {})", i, j);
        }
    }
    assert_eq!(sim.laplacian()[[25, 25]], -4.0);
    assert_eq!(sim.laplacian()[[25, 26]], 1.0);
    // Previous level is the initial condition
    assert_eq!(sim.wavefield.previous[[25, 25]], 1.0);
}

#[test]
fn undamped_energy_is_conserved() {
    let n = 60;
    let (grid, materials) = unit_medium(n);
    let mut sim = Simulation::new(
        grid,
        materials,
        SpongeLayer::disabled(&grid),
        &centred_gaussian(n, 4.0),
        SimulationParams::new(0.3, 600),
    )
    .unwrap();

    let initial = sim.energy();
    assert!(initial > 0.0);
    for _ in 0..600 {
        sim.step();
        assert_relative_eq!(sim.energy(), initial, max_relative = 1e-8);
    }
}

#[test]
fn heterogeneous_energy_is_conserved() {
    let n = 48;
    let grid = Grid::new(n, n, 1.0, 1.0).unwrap();
    let disk = Region {
        center_x: 30.0,
        center_y: 24.0,
        radius: 8.0,
        density: Some(4.5),
        stiffness: Some(2.0),
    };
    let materials = MaterialProperties::with_regions(&grid, 1.0, 1.0, &[disk]).unwrap();
    let dt = 0.8 * Simulation::stable_dt(&grid, &materials);
    let mut sim = Simulation::new(
        grid,
        materials,
        SpongeLayer::disabled(&grid),
        &InitialCondition::Gaussian {
            center_x: 16.0,
            center_y: 24.0,
            spread: 3.0,
            amplitude: 1.0,
        },
        SimulationParams::new(dt, 400),
    )
    .unwrap();

    let initial = sim.energy();
    sim.run(&mut NullSink).unwrap();
    assert_relative_eq!(sim.energy(), initial, max_relative = 1e-8);
}

#[test]
fn exceeding_courant_limit_is_detected() {
    let n = 20;
    let (grid, materials) = unit_medium(n);
    let dt = 2.0 * Simulation::stable_dt(&grid, &materials);
    let params = SimulationParams {
        divergence_check_every: 1,
        ..SimulationParams::new(dt, 2000)
    };
    let initial = InitialCondition::Point {
        i: 10,
        j: 10,
        amplitude: 1.0,
    };
    let mut sim =
        Simulation::new(grid, materials, SpongeLayer::disabled(&grid), &initial, params).unwrap();

    match sim.run(&mut NullSink) {
        Err(SimError::NumericalDivergence { step, value }) => {
            assert!(step < 2000);
            assert!(!value.is_finite());
        }
        other => panic!("expected divergence, got {:?}", other.map(|s| s.steps_completed)),
    }
}

#[test]
fn stable_dt_stays_bounded() {
    let n = 20;
    let (grid, materials) = unit_medium(n);
    let dt = 0.9 * Simulation::stable_dt(&grid, &materials);
    let initial = InitialCondition::Point {
        i: 10,
        j: 10,
        amplitude: 1.0,
    };
    let params = SimulationParams {
        divergence_check_every: 1,
        ..SimulationParams::new(dt, 2000)
    };
    let mut sim =
        Simulation::new(grid, materials, SpongeLayer::disabled(&grid), &initial, params).unwrap();

    let summary = sim.run(&mut NullSink).unwrap();
    assert_eq!(summary.steps_completed, 2000);
    assert!(sim.wavefield.max_abs() < 10.0);
}

#[test]
fn sponge_absorbs_outgoing_waves() {
    let n = 80;
    let dt = 0.3;
    let steps = 600;

    let run = |sponge: Option<SpongeParams>| {
        let (grid, materials) = unit_medium(n);
        let layer = match sponge {
            Some(p) => Simulation::build_sponge(&grid, &materials, &p, dt).unwrap(),
            None => SpongeLayer::disabled(&grid),
        };
        let mut sim = Simulation::new(
            grid,
            materials,
            layer,
            &centred_gaussian(n, 3.0),
            SimulationParams::new(dt, steps),
        )
        .unwrap();
        let initial = sim.energy();
        sim.run(&mut NullSink).unwrap();
        (initial, sim.energy())
    };

    let (closed_start, closed_end) = run(None);
    let (open_start, open_end) = run(Some(SpongeParams {
        thickness: 20,
        order: 2,
        reflection: 1e-5,
    }));

    assert_relative_eq!(closed_start, open_start);
    assert_relative_eq!(closed_end, closed_start, max_relative = 1e-8);
    assert!(
        open_end < 0.1 * open_start,
        "sponge kept {:.3e} of {:.3e}",
        open_end,
        open_start
    );
}

#[test]
fn runs_from_toml() {
    let text = r#"
        [grid]
        nx = 40
        ny = 30

        [[materials.regions]]
        center_x = 30.0
        center_y = 15.0
        radius = 5.0
        density = 4.5

        [simulation]
        dt = 0.3
        n_steps = 45
        snapshot_every = 15

        [initial]
        kind = "gaussian"
        center_x = 13.0
        center_y = 15.0
        spread = 3.0

        [sponge]
        thickness = 8
    "#;
    let config = Config::from_toml(text).unwrap();
    let mut sim = Simulation::from_config(&config).unwrap();
    assert!(sim.sponge.is_active());
    assert_eq!(sim.materials.density[[30, 15]], 4.5);
    assert_eq!(sim.sponge.sigma[[20, 15]], 0.0);
    assert!(sim.sponge.sigma[[0, 15]] > 0.0);

    let mut sink = CollectingSink::default();
    let summary = sim.run(&mut sink).unwrap();
    assert_eq!(summary.steps_completed, 45);
    let steps: Vec<usize> = sink.frames.iter().map(|(s, _)| *s).collect();
    assert_eq!(steps, vec![0, 15, 30]);
    assert!(sink.frames.iter().all(|(_, f)| f.dim() == (40, 30)));
}

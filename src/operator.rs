//! Flux-conservative discretisation of div(K grad u).
//!
//! Along each axis the operator is the difference of two face fluxes,
//! `K_{i+1/2} (u_{i+1} - u_i) - K_{i-1/2} (u_i - u_{i-1})`, divided by the
//! squared spacing. Face stiffness is the arithmetic mean of the two cells
//! sharing the face. Faces outside the grid carry no flux.

use crate::grid::Grid;
use crate::materials::MaterialProperties;
use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

/// What happens at the raw domain edge, before any sponge damping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Missing outer flux is dropped: zero normal flux, waves reflect.
    #[default]
    Reflective,
    /// Edge cells are clamped to zero after every update.
    Fixed,
}

impl BoundaryPolicy {
    /// Enforce the policy on a freshly computed time level.
    pub fn apply(&self, field: &mut Array2<f64>) {
        if let BoundaryPolicy::Fixed = self {
            let (nx, ny) = field.dim();
            for j in 0..ny {
                field[[0, j]] = 0.0;
                field[[nx - 1, j]] = 0.0;
            }
            for i in 0..nx {
                field[[i, 0]] = 0.0;
                field[[i, ny - 1]] = 0.0;
            }
        }
    }
}

/// Operator value at a single cell.
#[inline]
fn flux_divergence(
    u: &ArrayView2<f64>,
    kx: &ArrayView2<f64>,
    ky: &ArrayView2<f64>,
    dx2: f64,
    dy2: f64,
    i: usize,
    j: usize,
) -> f64 {
    let (nx, ny) = u.dim();
    let center = u[[i, j]];

    let mut fx = 0.0;
    if i + 1 < nx {
        fx += kx[[i, j]] * (u[[i + 1, j]] - center);
    }
    if i > 0 {
        fx -= kx[[i - 1, j]] * (center - u[[i - 1, j]]);
    }

    let mut fy = 0.0;
    if j + 1 < ny {
        fy += ky[[i, j]] * (u[[i, j + 1]] - center);
    }
    if j > 0 {
        fy -= ky[[i, j - 1]] * (center - u[[i, j - 1]]);
    }

    fx / dx2 + fy / dy2
}

pub struct WaveOperator {
    dx2: f64,
    dy2: f64,
}

impl WaveOperator {
    pub fn new(grid: &Grid) -> Self {
        Self {
            dx2: grid.dx * grid.dx,
            dy2: grid.dy * grid.dy,
        }
    }

    /// Evaluate the operator on `u` into `out`, rows split across the rayon pool.
    pub fn apply(&self, u: &Array2<f64>, materials: &MaterialProperties, out: &mut Array2<f64>) {
        let u = u.view();
        let kx = materials.stiffness_x.view();
        let ky = materials.stiffness_y.view();
        let (dx2, dy2) = (self.dx2, self.dy2);

        Zip::indexed(out).par_for_each(|(i, j), o| {
            *o = flux_divergence(&u, &kx, &ky, dx2, dy2, i, j);
        });
    }

    pub fn apply_serial(
        &self,
        u: &Array2<f64>,
        materials: &MaterialProperties,
        out: &mut Array2<f64>,
    ) {
        let u = u.view();
        let kx = materials.stiffness_x.view();
        let ky = materials.stiffness_y.view();
        let (nx, ny) = u.dim();

        for i in 0..nx {
            for j in 0..ny {
                out[[i, j]] = flux_divergence(&u, &kx, &ky, self.dx2, self.dy2, i, j);
            }
        }
    }

    pub fn evaluate(&self, u: &Array2<f64>, materials: &MaterialProperties) -> Array2<f64> {
        let mut out = Array2::zeros(u.dim());
        self.apply(u, materials, &mut out);
        out
    }

    /// Sum over internal faces of K_f (da)(db) / h^2.
    ///
    /// This is the bilinear form of minus the operator, so `strain(u, u)`
    /// is the potential energy of `u`.
    pub fn strain(&self, a: &Array2<f64>, b: &Array2<f64>, materials: &MaterialProperties) -> f64 {
        let (nx, ny) = a.dim();
        let mut total = 0.0;

        for i in 0..nx.saturating_sub(1) {
            for j in 0..ny {
                let da = a[[i + 1, j]] - a[[i, j]];
                let db = b[[i + 1, j]] - b[[i, j]];
                total += materials.stiffness_x[[i, j]] * da * db / self.dx2;
            }
        }
        for i in 0..nx {
            for j in 0..ny.saturating_sub(1) {
                let da = a[[i, j + 1]] - a[[i, j]];
                let db = b[[i, j + 1]] - b[[i, j]];
                total += materials.stiffness_y[[i, j]] * da * db / self.dy2;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn layered_medium(grid: &Grid) -> MaterialProperties {
        let rho = Array2::from_shape_fn(grid.shape(), |(i, _)| 1.0 + i as f64);
        let k = Array2::from_shape_fn(grid.shape(), |(i, j)| 0.5 + ((i * 7 + j * 3) % 5) as f64);
        MaterialProperties::new(rho, k).unwrap()
    }

    #[test]
    fn flat_field_has_no_sources() {
        let grid = Grid::new(9, 7, 0.5, 2.0).unwrap();
        let materials = layered_medium(&grid);
        let op = WaveOperator::new(&grid);
        let u = Array2::from_elem(grid.shape(), 3.25);

        let l = op.evaluate(&u, &materials);
        assert!(l.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn point_source_stencil() {
        let grid = Grid::new(5, 5, 1.0, 1.0).unwrap();
        let materials = MaterialProperties::uniform(&grid, 1.0, 1.0).unwrap();
        let op = WaveOperator::new(&grid);
        let mut u = Array2::zeros(grid.shape());
        u[[2, 2]] = 1.0;

        let l = op.evaluate(&u, &materials);
        assert_eq!(l[[2, 2]], -4.0);
        assert_eq!(l[[1, 2]], 1.0);
        assert_eq!(l[[3, 2]], 1.0);
        assert_eq!(l[[2, 1]], 1.0);
        assert_eq!(l[[2, 3]], 1.0);
        assert_eq!(l.iter().filter(|&&v| v != 0.0).count(), 5);
    }

    #[test]
    fn edge_cells_are_one_sided() {
        // 1D along x: only the interior face of an edge cell contributes
        let grid = Grid::new(3, 1, 0.5, 1.0).unwrap();
        let materials = MaterialProperties::new(Array2::ones((3, 1)), array![[2.0], [4.0], [6.0]]).unwrap();
        let op = WaveOperator::new(&grid);
        let u = array![[1.0], [0.0], [0.0]];

        let l = op.evaluate(&u, &materials);
        // Face stiffness: 3 between cells 0-1, 5 between 1-2; dx^2 = 1/4
        assert_abs_diff_eq!(l[[0, 0]], 3.0 * (0.0 - 1.0) * 4.0);
        assert_abs_diff_eq!(l[[1, 0]], (5.0 * 0.0 - 3.0 * (0.0 - 1.0)) * 4.0);
        assert_abs_diff_eq!(l[[2, 0]], 0.0);
    }

    #[test]
    fn parallel_matches_serial() {
        let grid = Grid::new(23, 17, 1.0, 0.7).unwrap();
        let materials = layered_medium(&grid);
        let op = WaveOperator::new(&grid);
        let u = Array2::from_shape_fn(grid.shape(), |(i, j)| ((i * j) as f64).sin());

        let mut par = Array2::zeros(grid.shape());
        let mut ser = Array2::zeros(grid.shape());
        op.apply(&u, &materials, &mut par);
        op.apply_serial(&u, &materials, &mut ser);
        assert_eq!(par, ser);
    }

    #[test]
    fn operator_is_negative_of_strain_form() {
        let grid = Grid::new(8, 6, 1.0, 1.5).unwrap();
        let materials = layered_medium(&grid);
        let op = WaveOperator::new(&grid);
        let a = Array2::from_shape_fn(grid.shape(), |(i, j)| (i as f64 * 0.3).cos() + j as f64);
        let b = Array2::from_shape_fn(grid.shape(), |(i, j)| (j as f64 * 0.8).sin() * i as f64);

        let la = op.evaluate(&a, &materials);
        let inner: f64 = la.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        assert_abs_diff_eq!(-inner, op.strain(&a, &b, &materials), epsilon = 1e-9);
        assert!(op.strain(&a, &a, &materials) > 0.0);
    }

    #[test]
    fn fixed_policy_clamps_edges() {
        let mut field = Array2::ones((4, 5));
        BoundaryPolicy::Reflective.apply(&mut field);
        assert!(field.iter().all(|&v| v == 1.0));

        BoundaryPolicy::Fixed.apply(&mut field);
        assert_eq!(field.sum(), 6.0);
        assert_eq!(field[[1, 1]], 1.0);
        assert_eq!(field[[3, 2]], 0.0);
    }
}

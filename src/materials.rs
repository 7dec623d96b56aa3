use crate::config_err;
use crate::error::Result;
use crate::grid::Grid;
use ndarray::{s, Array2, Zip};

/// Disk-shaped override of the background medium.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub density: Option<f64>,
    pub stiffness: Option<f64>,
}

impl Region {
    pub fn contains(&self, grid: &Grid, i: usize, j: usize) -> bool {
        grid.index_distance_sq(i, j, self.center_x, self.center_y) < self.radius * self.radius
    }
}

pub struct MaterialProperties {
    // Cell-centred storage
    pub density: Array2<f64>,
    pub stiffness: Array2<f64>,

    // Stiffness averaged onto internal faces
    pub stiffness_x: Array2<f64>, // Face (i+1/2, j), shape (nx-1, ny)
    pub stiffness_y: Array2<f64>, // Face (i, j+1/2), shape (nx, ny-1)
}

impl MaterialProperties {
    pub fn new(density: Array2<f64>, stiffness: Array2<f64>) -> Result<Self> {
        if density.dim() != stiffness.dim() {
            return config_err!(
                "Density {:?} and stiffness {:?} must have the same shape",
                density.dim(),
                stiffness.dim()
            );
        }
        if let Some(bad) = density.iter().chain(stiffness.iter()).find(|v| !(**v > 0.0)) {
            return config_err!("Material values must be positive, found {}", bad);
        }

        let stiffness_x = Self::average_to_x_faces(&stiffness);
        let stiffness_y = Self::average_to_y_faces(&stiffness);

        Ok(Self {
            density,
            stiffness,
            stiffness_x,
            stiffness_y,
        })
    }

    pub fn uniform(grid: &Grid, density: f64, stiffness: f64) -> Result<Self> {
        Self::new(
            Array2::from_elem(grid.shape(), density),
            Array2::from_elem(grid.shape(), stiffness),
        )
    }

    /// Background medium with each region painted on top, in order.
    pub fn with_regions(grid: &Grid, density: f64, stiffness: f64, regions: &[Region]) -> Result<Self> {
        let mut rho = Array2::from_elem(grid.shape(), density);
        let mut k = Array2::from_elem(grid.shape(), stiffness);

        for region in regions {
            Zip::indexed(&mut rho).and(&mut k).for_each(|(i, j), rho, k| {
                if region.contains(grid, i, j) {
                    if let Some(value) = region.density {
                        *rho = value;
                    }
                    if let Some(value) = region.stiffness {
                        *k = value;
                    }
                }
            });
        }

        Self::new(rho, k)
    }

    pub fn dim(&self) -> (usize, usize) {
        self.density.dim()
    }

    fn average_to_x_faces(k: &Array2<f64>) -> Array2<f64> {
        let (nx, _) = k.dim();
        if nx < 2 {
            return Array2::zeros((0, k.ncols()));
        }
        let left = k.slice(s![..nx - 1, ..]);
        let right = k.slice(s![1.., ..]);
        Zip::from(left).and(right).map_collect(|&a, &b| 0.5 * (a + b))
    }

    fn average_to_y_faces(k: &Array2<f64>) -> Array2<f64> {
        let (_, ny) = k.dim();
        if ny < 2 {
            return Array2::zeros((k.nrows(), 0));
        }
        let below = k.slice(s![.., ..ny - 1]);
        let above = k.slice(s![.., 1..]);
        Zip::from(below).and(above).map_collect(|&a, &b| 0.5 * (a + b))
    }

    fn squared_speeds(&self) -> Vec<f64> {
        Zip::from(&self.stiffness)
            .and(&self.density)
            .map_collect(|&k, &rho| k / rho)
            .into_raw_vec()
    }

    /// sqrt(max(stiffness / density))
    pub fn max_speed(&self) -> f64 {
        self.squared_speeds()
            .into_iter()
            .fold(0.0_f64, f64::max)
            .sqrt()
    }

    /// sqrt(median(stiffness / density)), used to tune the sponge.
    pub fn representative_speed(&self) -> f64 {
        let mut c2 = self.squared_speeds();
        c2.sort_by(|a, b| a.total_cmp(b));
        let n = c2.len();
        let median = if n % 2 == 0 {
            0.5 * (c2[n / 2 - 1] + c2[n / 2])
        } else {
            c2[n / 2]
        };
        median.sqrt()
    }
}

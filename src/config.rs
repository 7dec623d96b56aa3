use crate::grid::Grid;
use crate::materials::Region;
use crate::operator::BoundaryPolicy;
use crate::sponge::SpongeParams;
use crate::wavefield::InitialCondition;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    #[serde(default = "default_spacing")]
    pub dx: f64,
    #[serde(default = "default_spacing")]
    pub dy: f64,
}

fn default_spacing() -> f64 {
    1.0
}

impl GridConfig {
    fn validate(&self) -> Result<()> {
        self.build()?;
        Ok(())
    }

    pub fn build(&self) -> crate::error::Result<Grid> {
        Grid::new(self.nx, self.ny, self.dx, self.dy)
    }
}

/// Disk of altered material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f64>,
}

impl RegionConfig {
    fn validate(&self, idx: usize) -> Result<()> {
        if !(self.radius > 0.0) {
            return Err(anyhow!("Region {} radius must be positive, got {}", idx, self.radius));
        }
        for (name, value) in [("density", self.density), ("stiffness", self.stiffness)] {
            if let Some(v) = value {
                if !(v > 0.0) {
                    return Err(anyhow!("Region {} {} must be positive, got {}", idx, name, v));
                }
            }
        }
        if self.density.is_none() && self.stiffness.is_none() {
            log::warn!("Region {} overrides neither density nor stiffness", idx);
        }
        Ok(())
    }

    pub fn to_region(&self) -> Region {
        Region {
            center_x: self.center_x,
            center_y: self.center_y,
            radius: self.radius,
            density: self.density,
            stiffness: self.stiffness,
        }
    }
}

/// Background medium plus overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    #[serde(default = "default_material")]
    pub density: f64,
    #[serde(default = "default_material")]
    pub stiffness: f64,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
}

fn default_material() -> f64 {
    1.0
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            density: default_material(),
            stiffness: default_material(),
            regions: Vec::new(),
        }
    }
}

impl MaterialConfig {
    fn validate(&self) -> Result<()> {
        if !(self.density > 0.0) || !(self.stiffness > 0.0) {
            return Err(anyhow!(
                "Material properties must be positive (density={}, stiffness={})",
                self.density,
                self.stiffness
            ));
        }
        for (idx, region) in self.regions.iter().enumerate() {
            region.validate(idx)?;
        }
        Ok(())
    }

    pub fn regions(&self) -> Vec<Region> {
        self.regions.iter().map(RegionConfig::to_region).collect()
    }
}

/// Time stepping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub dt: f64,
    pub n_steps: usize,
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: usize,
    #[serde(default = "default_divergence_check_every")]
    pub divergence_check_every: usize,
    #[serde(default)]
    pub boundary: BoundaryPolicy,
}

fn default_snapshot_every() -> usize {
    10
}

fn default_divergence_check_every() -> usize {
    10
}

impl SimulationConfig {
    fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0) {
            return Err(anyhow!("dt must be positive, got {}", self.dt));
        }
        if self.snapshot_every == 0 {
            return Err(anyhow!("snapshot_every must be at least 1"));
        }
        if self.divergence_check_every == 0 {
            return Err(anyhow!("divergence_check_every must be at least 1"));
        }
        Ok(())
    }

    pub fn total_time(&self) -> f64 {
        self.n_steps as f64 * self.dt
    }
}

/// Initial displacement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InitialConfig {
    Gaussian {
        center_x: f64,
        center_y: f64,
        #[serde(default = "default_spread")]
        spread: f64,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
    },
    Point {
        i: usize,
        j: usize,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
    },
}

fn default_spread() -> f64 {
    10.0
}

fn default_amplitude() -> f64 {
    1.0
}

impl InitialConfig {
    fn validate(&self, nx: usize, ny: usize) -> Result<()> {
        match *self {
            InitialConfig::Gaussian {
                center_x,
                center_y,
                spread,
                ..
            } => {
                if !(spread > 0.0) {
                    return Err(anyhow!("Initial spread must be positive, got {}", spread));
                }
                if !(0.0..nx as f64).contains(&center_x) || !(0.0..ny as f64).contains(&center_y) {
                    return Err(anyhow!(
                        "Initial centre ({}, {}) is outside grid bounds ({}, {})",
                        center_x,
                        center_y,
                        nx,
                        ny
                    ));
                }
            }
            InitialConfig::Point { i, j, .. } => {
                if i >= nx || j >= ny {
                    return Err(anyhow!(
                        "Initial point ({}, {}) is outside grid bounds ({}, {})",
                        i,
                        j,
                        nx,
                        ny
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn to_initial_condition(&self) -> InitialCondition {
        match *self {
            InitialConfig::Gaussian {
                center_x,
                center_y,
                spread,
                amplitude,
            } => InitialCondition::Gaussian {
                center_x,
                center_y,
                spread,
                amplitude,
            },
            InitialConfig::Point { i, j, amplitude } => InitialCondition::Point { i, j, amplitude },
        }
    }
}

/// Absorbing layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpongeConfig {
    pub thickness: usize,
    #[serde(default = "default_order")]
    pub order: u32,
    #[serde(default = "default_reflection")]
    pub reflection: f64,
}

fn default_order() -> u32 {
    2
}

fn default_reflection() -> f64 {
    1e-5
}

impl SpongeConfig {
    pub fn params(&self) -> SpongeParams {
        SpongeParams {
            thickness: self.thickness,
            order: self.order,
            reflection: self.reflection,
        }
    }

    fn validate(&self) -> Result<()> {
        self.params().validate()?;
        Ok(())
    }
}

/// Visualization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_image_size")]
    pub image_width: u32,
    #[serde(default = "default_image_size")]
    pub image_height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_limit: Option<f64>,
}

fn default_enabled() -> bool {
    true
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_image_size() -> u32 {
    800
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            output_dir: default_output_dir(),
            image_width: default_image_size(),
            image_height: default_image_size(),
            color_limit: None,
        }
    }
}

impl VisualizationConfig {
    fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(anyhow!(
                "Image dimensions must be positive (width={}, height={})",
                self.image_width,
                self.image_height
            ));
        }
        if let Some(limit) = self.color_limit {
            if !(limit > 0.0) {
                return Err(anyhow!("color_limit must be positive, got {}", limit));
            }
        }
        Ok(())
    }
}

/// Toy request server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    50007
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    #[serde(default)]
    pub materials: MaterialConfig,
    pub simulation: SimulationConfig,
    pub initial: InitialConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponge: Option<SpongeConfig>,
    #[serde(default)]
    pub visualization: VisualizationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;

        // Validate before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.materials.validate()?;
        self.simulation.validate()?;
        self.initial.validate(self.grid.nx, self.grid.ny)?;
        self.visualization.validate()?;

        if let Some(sponge) = &self.sponge {
            sponge.validate()?;
        }

        Ok(())
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Grid: {}x{} (dx={}, dy={})",
                self.grid.nx, self.grid.ny, self.grid.dx, self.grid.dy
            ),
            format!(
                "Materials: density={}, stiffness={}, {} region(s)",
                self.materials.density,
                self.materials.stiffness,
                self.materials.regions.len()
            ),
            format!(
                "Simulation: dt={}, n_steps={}, total_time={}, boundary={:?}",
                self.simulation.dt,
                self.simulation.n_steps,
                self.simulation.total_time(),
                self.simulation.boundary
            ),
            format!("Initial condition: {:?}", self.initial),
        ];
        match &self.sponge {
            Some(s) => lines.push(format!(
                "Sponge: thickness={} cells, order={}, R={}",
                s.thickness, s.order, s.reflection
            )),
            None => lines.push("Sponge: disabled".to_string()),
        }
        lines.push(format!(
            "Snapshots: every {} steps{}",
            self.simulation.snapshot_every,
            if self.visualization.enabled {
                format!(" -> {}/", self.visualization.output_dir)
            } else {
                String::new()
            }
        ));
        lines.join("\n")
    }
}

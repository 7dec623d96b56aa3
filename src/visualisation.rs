use crate::error::{Result, SimError};
use crate::snapshot::SnapshotSink;
use ndarray::Array2;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

pub struct WavefieldVisualiser {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    color_limit: Option<f64>, // Fixed symmetric scale; per-frame max |u| otherwise
    subtitle: String,
    gradient: Box<dyn colorgrad::Gradient + Send>,
}

impl WavefieldVisualiser {
    pub fn new(output_dir: impl AsRef<Path>, width: u32, height: u32) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            SimError::Sink(format!(
                "cannot create output directory '{}': {}",
                output_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            output_dir,
            width,
            height,
            color_limit: None,
            subtitle: String::new(),
            gradient: Box::new(colorgrad::preset::viridis()),
        })
    }

    pub fn with_color_limit(mut self, limit: Option<f64>) -> Self {
        self.color_limit = limit;
        self
    }

    /// Extra text appended to every frame title.
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn frame_path(&self, step: usize) -> PathBuf {
        self.output_dir.join(format!("u_{:06}.png", step))
    }

    pub fn plot_field(
        &self,
        data: &Array2<f64>,
        step: usize,
    ) -> std::result::Result<PathBuf, Box<dyn std::error::Error>> {
        let path = self.frame_path(step);
        self.draw(data, step, &path)?;
        Ok(path)
    }

    fn draw(
        &self,
        data: &Array2<f64>,
        step: usize,
        path: &Path,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (nx, ny) = data.dim();
        let max_val = self
            .color_limit
            .unwrap_or_else(|| data.iter().map(|&v| v.abs()).fold(0.0_f64, f64::max));
        let min_val = -max_val;

        let title = if self.subtitle.is_empty() {
            format!("Step {}", step)
        } else {
            format!("Step {}  ({})", step, self.subtitle)
        };
        let mut chart = ChartBuilder::on(&root)
            .caption(&title, ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(40)
            .build_cartesian_2d(0..nx, 0..ny)?;

        chart
            .configure_mesh()
            .x_desc("i")
            .y_desc("j")
            .disable_mesh()
            .draw()?;

        chart.draw_series(data.indexed_iter().map(|((i, j), &value)| {
            let color = self.value_to_color(value, min_val, max_val);
            Rectangle::new([(i, j), (i + 1, j + 1)], color.filled())
        }))?;

        root.present()?;
        Ok(())
    }

    fn value_to_color(&self, value: f64, min_val: f64, max_val: f64) -> RGBColor {
        let normalized = if max_val > min_val {
            (value - min_val) / (max_val - min_val)
        } else {
            0.5
        };
        let normalized = if normalized.is_finite() {
            normalized.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let color_rgba = self.gradient.at(normalized as f32).to_rgba8();
        RGBColor(color_rgba[0], color_rgba[1], color_rgba[2])
    }
}

impl SnapshotSink for WavefieldVisualiser {
    fn emit(&mut self, step: usize, field: Array2<f64>) -> Result<()> {
        let path = self
            .plot_field(&field, step)
            .map_err(|e| SimError::Sink(format!("failed to render step {}: {}", step, e)))?;
        log::debug!("Saved frame: {}", path.display());
        Ok(())
    }
}

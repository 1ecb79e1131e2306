pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod output;
pub mod plan;
pub mod plate;

pub use color::{Channel, ConversionPolicy};
pub use config::{OutputConfig, PlateConfig};
pub use error::{Error, Result, ValidationError};
pub use grid::{Grid, Sample};
pub use plan::{convert, ConversionSettings, VolumeUnit, WellVolumePlan, WellVolumes};
pub use plate::{LabelScheme, PlateLayout, WellId};

use log::debug;
use std::path;

/// Loads `filename`, resamples it to the plate and converts it to volumes.
pub fn plan_image(filename: &path::Path, config: &PlateConfig) -> Result<WellVolumePlan> {
    config.validate()?;

    let grid = Grid::load(filename, config.plate.rows, config.plate.cols)?;
    debug!(
        "Sampled {} to {}x{} wells",
        filename.display(),
        grid.rows(),
        grid.cols()
    );

    plan_grid(&grid, config)
}

/// Converts an already sampled grid, which must match the configured plate.
pub fn plan_grid(grid: &Grid, config: &PlateConfig) -> Result<WellVolumePlan> {
    config.validate()?;

    if grid.rows() != config.plate.rows || grid.cols() != config.plate.cols {
        return Err(ValidationError::GridMismatch {
            grid_rows: grid.rows(),
            grid_cols: grid.cols(),
            rows: config.plate.rows,
            cols: config.plate.cols,
        }
        .into());
    }

    convert(grid, config.plate.labels, &config.conversion)
}

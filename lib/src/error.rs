use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any conversion took place.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to load image {}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "xlsx")]
    #[error(transparent)]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("grid has no samples")]
    EmptyGrid,

    #[error("row {row} has {found} samples, expected {expected}")]
    JaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{channel} intensity {value} at row {row}, column {col} is outside [0, 1]")]
    IntensityOutOfRange {
        row: usize,
        col: usize,
        channel: &'static str,
        value: f64,
    },

    #[error("maximum volume must be a non-negative number, got {0}")]
    MaxVolume(f64),

    #[error("precision must be at most {max} decimal places, got {found}")]
    Precision { found: u32, max: u32 },

    #[error("channel {0} is not part of the plan")]
    MissingChannel(&'static str),

    #[error("plate dimensions must be non-zero, got {rows}x{cols}")]
    PlateDimensions { rows: usize, cols: usize },

    #[error("grid is {grid_rows}x{grid_cols} but the plate is {rows}x{cols}")]
    GridMismatch {
        grid_rows: usize,
        grid_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("label scheme {scheme} can address at most {capacity} rows, plate has {rows}")]
    LabelCapacity {
        scheme: &'static str,
        capacity: usize,
        rows: usize,
    },

    #[error("unknown {kind} {value:?}")]
    UnknownOption { kind: &'static str, value: String },
}

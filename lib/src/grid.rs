use crate::error::{Error, Result, ValidationError};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::path::Path;

/// Normalized RGB color of one well.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Sample {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Sample { red, green, blue }
    }

    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Sample::new(
            rgb[0] as f64 / 255.0,
            rgb[1] as f64 / 255.0,
            rgb[2] as f64 / 255.0,
        )
    }

    fn validate(&self, row: usize, col: usize) -> Result<()> {
        for (channel, value) in [("red", self.red), ("green", self.green), ("blue", self.blue)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::IntensityOutOfRange {
                    row,
                    col,
                    channel,
                    value,
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Rectangular, row-major samples with every intensity in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    samples: Vec<Sample>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Sample>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);

        if cols == 0 {
            return Err(ValidationError::EmptyGrid.into());
        }

        let mut samples = Vec::with_capacity(rows.len() * cols);

        for (row, values) in rows.iter().enumerate() {
            if values.len() != cols {
                return Err(ValidationError::JaggedRow {
                    row,
                    expected: cols,
                    found: values.len(),
                }
                .into());
            }

            for (col, sample) in values.iter().enumerate() {
                sample.validate(row, col)?;
            }

            samples.extend_from_slice(values);
        }

        Ok(Grid {
            rows: rows.len(),
            cols,
            samples,
        })
    }

    /// Resamples `img` to exactly `rows` x `cols` with a Lanczos filter.
    pub fn from_image(img: &DynamicImage, rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(ValidationError::PlateDimensions { rows, cols }.into());
        }

        let (width, height) = img.dimensions();

        if width == 0 || height == 0 {
            return Err(ValidationError::EmptyGrid.into());
        }

        let resized = img
            .resize_exact(cols as u32, rows as u32, FilterType::Lanczos3)
            .to_rgb8();

        let samples = resized
            .rows()
            .flat_map(|row| row.map(|pixel| Sample::from_rgb8(pixel.0)))
            .collect();

        Ok(Grid {
            rows,
            cols,
            samples,
        })
    }

    pub fn load(path: &Path, rows: usize, cols: usize) -> Result<Self> {
        let img = image::ImageReader::open(path)
            .map_err(|e| Error::Image {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(e),
            })?
            .with_guessed_format()
            .map_err(|e| Error::Image {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(e),
            })?
            .decode()
            .map_err(|source| Error::Image {
                path: path.to_path_buf(),
                source,
            })?;

        Grid::from_image(&img, rows, cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Sample> {
        if row < self.rows && col < self.cols {
            self.samples.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// `(row, col, sample)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Sample)> + '_ {
        self.samples
            .iter()
            .enumerate()
            .map(move |(i, s)| (i / self.cols, i % self.cols, s))
    }
}

use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const SYMBOLS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789#@";

/// How plate rows are named.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelScheme {
    /// `A` to `Z`, nothing beyond.
    Alphabetic,
    /// `A` to `Z`, then `AA`, `AB`, ... like spreadsheet columns.
    #[default]
    Excel,
    /// One character per row from a 64 symbol table: upper case, lower case,
    /// digits, `#` and `@`.
    Symbol64,
}

impl LabelScheme {
    /// Number of rows the scheme can name, `None` if unbounded.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            LabelScheme::Alphabetic => Some(ALPHABET.len()),
            LabelScheme::Excel => None,
            LabelScheme::Symbol64 => Some(SYMBOLS.len()),
        }
    }

    pub fn check(&self, rows: usize) -> Result<()> {
        match self.capacity() {
            Some(capacity) if rows > capacity => Err(ValidationError::LabelCapacity {
                scheme: self.name(),
                capacity,
                rows,
            }
            .into()),
            _ => Ok(()),
        }
    }

    pub fn row_label(&self, row: usize) -> Result<String> {
        self.check(row + 1)?;

        Ok(match self {
            LabelScheme::Alphabetic => (ALPHABET[row] as char).to_string(),
            LabelScheme::Excel => excel_label(row),
            LabelScheme::Symbol64 => (SYMBOLS[row] as char).to_string(),
        })
    }

    pub fn well(&self, row: usize, col: usize) -> Result<WellId> {
        Ok(WellId {
            row: self.row_label(row)?,
            col: col + 1,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            LabelScheme::Alphabetic => "alphabetic",
            LabelScheme::Excel => "excel",
            LabelScheme::Symbol64 => "symbol64",
        }
    }
}

impl fmt::Display for LabelScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LabelScheme {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alphabetic" | "alpha" => Ok(LabelScheme::Alphabetic),
            "excel" => Ok(LabelScheme::Excel),
            "symbol64" | "symbol-64" => Ok(LabelScheme::Symbol64),
            _ => Err(ValidationError::UnknownOption {
                kind: "label scheme",
                value: s.to_string(),
            }),
        }
    }
}

fn excel_label(row: usize) -> String {
    let mut label = Vec::new();
    let mut x = row + 1;

    while x > 0 {
        x -= 1;
        label.push(ALPHABET[x % 26]);
        x /= 26;
    }

    label.iter().rev().map(|&b| b as char).collect()
}

/// Well address such as `B7`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WellId {
    pub row: String,
    /// 1-based.
    pub col: usize,
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateLayout {
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub labels: LabelScheme,
}

impl Default for PlateLayout {
    fn default() -> Self {
        PlateLayout::new(16, 24)
    }
}

impl PlateLayout {
    pub fn new(rows: usize, cols: usize) -> Self {
        PlateLayout {
            rows,
            cols,
            labels: LabelScheme::default(),
        }
    }

    /// Standard SBS footprints.
    pub fn from_well_count(wells: usize) -> Result<Self> {
        match wells {
            96 => Ok(PlateLayout::new(8, 12)),
            384 => Ok(PlateLayout::new(16, 24)),
            1536 => Ok(PlateLayout::new(32, 48)),
            _ => Err(ValidationError::UnknownOption {
                kind: "plate format",
                value: wells.to_string(),
            }
            .into()),
        }
    }

    pub fn wells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ValidationError::PlateDimensions {
                rows: self.rows,
                cols: self.cols,
            }
            .into());
        }

        self.labels.check(self.rows)
    }
}

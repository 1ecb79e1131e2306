use crate::error::{Result, ValidationError};
use crate::plan::ConversionSettings;
use crate::plate::PlateLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn enabled() -> bool {
    true
}

/// Which files are written for a plan.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Long-form `Well,Channel,Volume` list.
    #[serde(default = "enabled")]
    pub records: bool,

    /// Per-channel plate matrices, with and without headers.
    #[serde(default = "enabled")]
    pub matrices: bool,

    /// Spreadsheet with one sheet per channel.
    #[serde(default)]
    pub workbook: bool,

    #[serde(default)]
    pub json: bool,

    /// Number channels like the dispenser does instead of using letters.
    #[serde(default)]
    pub dispense_ids: bool,

    /// Leave zero volumes out of the long-form list.
    #[serde(default)]
    pub skip_zero: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            records: true,
            matrices: true,
            workbook: false,
            json: false,
            dispense_ids: false,
            skip_zero: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlateConfig {
    #[serde(default)]
    pub plate: PlateLayout,

    #[serde(default)]
    pub conversion: ConversionSettings,

    #[serde(default)]
    pub output: OutputConfig,
}

impl PlateConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let fh = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(fh))?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.plate.validate()?;
        self.conversion.validate()?;

        if self.output.workbook && !cfg!(feature = "xlsx") {
            return Err(ValidationError::UnknownOption {
                kind: "output format",
                value: "workbook".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, error, info};
use platedrop::{ConversionPolicy, LabelScheme, PlateConfig, PlateLayout, VolumeUnit};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about = "Turn images into per-well dispense volumes")]
pub struct Options {
    /// Images to convert, one plan each.
    #[arg(long, short, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Directory for the generated files.
    #[arg(long, short)]
    output: PathBuf,

    /// JSON plate configuration, overridden by the flags below.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Standard plate format (96, 384 or 1536 wells).
    #[arg(long, conflicts_with_all = ["rows", "cols"])]
    wells: Option<usize>,

    #[arg(long)]
    rows: Option<usize>,

    #[arg(long)]
    cols: Option<usize>,

    #[arg(long)]
    labels: Option<LabelScheme>,

    /// Total volume per well.
    #[arg(long)]
    max_volume: Option<f64>,

    /// uL or nL.
    #[arg(long)]
    unit: Option<VolumeUnit>,

    /// standard or derived-blue.
    #[arg(long)]
    policy: Option<ConversionPolicy>,

    /// Decimal places, omit rounding with --full-precision.
    #[arg(long, conflicts_with = "full_precision")]
    precision: Option<u32>,

    #[arg(long)]
    full_precision: bool,

    /// Also write a spreadsheet workbook.
    #[arg(long)]
    workbook: bool,

    /// Also write the plan as JSON.
    #[arg(long)]
    json: bool,

    /// Number channels 1 to 5 in the dispense list and leave out empty entries.
    #[arg(long)]
    dispense_ids: bool,
}

impl Options {
    fn plate_config(&self) -> Result<PlateConfig> {
        let mut config = match &self.config {
            Some(path) => PlateConfig::from_json_file(path)
                .with_context(|| format!("Could not read configuration {}", path.display()))?,
            None => PlateConfig::default(),
        };

        if let Some(wells) = self.wells {
            let labels = config.plate.labels;
            config.plate = PlateLayout::from_well_count(wells)?;
            config.plate.labels = labels;
        }

        if let Some(rows) = self.rows {
            config.plate.rows = rows;
        }

        if let Some(cols) = self.cols {
            config.plate.cols = cols;
        }

        if let Some(labels) = self.labels {
            config.plate.labels = labels;
        }

        if let Some(max_volume) = self.max_volume {
            config.conversion.max_volume = max_volume;
        }

        if let Some(unit) = self.unit {
            config.conversion.unit = unit;
        }

        if let Some(policy) = self.policy {
            config.conversion.policy = policy;
        }

        if self.precision.is_some() || self.full_precision {
            config.conversion.precision = self.precision;
        }

        config.output.workbook |= self.workbook;
        config.output.json |= self.json;

        if self.dispense_ids {
            config.output.dispense_ids = true;
            config.output.skip_zero = true;
        }

        config.validate()?;

        Ok(config)
    }
}

fn output_stem(input: &Path) -> Result<&str> {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", input.display()))
}

/// Output files are named after the input stem, so two inputs sharing one
/// would write over each other.
fn check_unique_stems(inputs: &[PathBuf]) -> Result<()> {
    let mut seen: HashMap<&str, &PathBuf> = HashMap::new();

    for input in inputs {
        let stem = output_stem(input)?;

        if let Some(previous) = seen.insert(stem, input) {
            return Err(anyhow!(
                "{} and {} would both write {}_* files",
                previous.display(),
                input.display(),
                stem
            ));
        }
    }

    Ok(())
}

fn process(input: &Path, output: &Path, config: &PlateConfig) -> Result<usize> {
    let stem = output_stem(input)?;

    let plan = platedrop::plan_image(input, config)
        .with_context(|| format!("Could not convert {}", input.display()))?;

    if plan.degenerate_wells() > 0 {
        info!(
            "{}: {} of {} wells have no ink",
            stem,
            plan.degenerate_wells(),
            plan.wells.len()
        );
    }

    let written = platedrop::output::write_plan(&plan, output, stem, &config.output)
        .with_context(|| format!("Could not write plan for {}", input.display()))?;

    Ok(written.len())
}

fn main() -> Result<()> {
    env_logger::init();

    let opt = Options::parse();
    let config = opt.plate_config()?;
    check_unique_stems(&opt.input)?;

    debug!("Configuration: {}", serde_json::to_string(&config)?);

    info!(
        "Converting {} image(s) to {}x{} plates, {} {} per well",
        opt.input.len(),
        config.plate.rows,
        config.plate.cols,
        config.conversion.max_volume,
        config.conversion.unit
    );

    let results: Vec<(&PathBuf, Result<usize>)> = opt
        .input
        .par_iter()
        .map(|input| (input, process(input, &opt.output, &config)))
        .collect();

    let mut failures = 0;

    for (input, result) in results {
        match result {
            Ok(files) => info!("{}: wrote {} files", input.display(), files),
            Err(err) => {
                error!("{:#}", err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} images failed", failures, opt.input.len()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Options {
        let mut argv = vec!["platedrop", "-i", "in.png", "-o", "out"];
        argv.extend_from_slice(args);
        Options::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_flags() {
        let config = parse(&[]).plate_config().unwrap();
        assert_eq!(config, PlateConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--wells",
            "1536",
            "--max-volume",
            "300",
            "--unit",
            "nL",
            "--policy",
            "derived-blue",
            "--full-precision",
        ])
        .plate_config()
        .unwrap();

        assert_eq!((config.plate.rows, config.plate.cols), (32, 48));
        assert_eq!(config.conversion.max_volume, 300.0);
        assert_eq!(config.conversion.unit, VolumeUnit::Nanoliters);
        assert_eq!(config.conversion.policy, ConversionPolicy::DerivedBlue);
        assert_eq!(config.conversion.precision, None);
    }

    #[test]
    fn flags_override_the_config_file() {
        let path = std::env::temp_dir().join(format!("platedrop-cli-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{
                "plate": { "rows": 32, "cols": 48 },
                "conversion": { "max_volume": 300, "unit": "nanoliters", "precision": 1 },
                "output": { "json": true }
            }"#,
        )
        .unwrap();

        let config = parse(&["--config", path.to_str().unwrap(), "--max-volume", "250"])
            .plate_config();
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert_eq!(config.conversion.max_volume, 250.0);
        assert_eq!((config.plate.rows, config.plate.cols), (32, 48));
        assert_eq!(config.conversion.unit, VolumeUnit::Nanoliters);
        assert_eq!(config.conversion.precision, Some(1));
        assert!(config.output.json);
    }

    #[test]
    fn missing_config_file_is_reported() {
        assert!(parse(&["--config", "does/not/exist.json"])
            .plate_config()
            .is_err());
    }

    #[test]
    fn inputs_sharing_a_stem_are_rejected() {
        let inputs = |paths: &[&str]| paths.iter().map(PathBuf::from).collect::<Vec<_>>();

        assert!(check_unique_stems(&inputs(&["a/logo.png", "b/logo.png"])).is_err());
        assert!(check_unique_stems(&inputs(&["logo.png", "logo.jpg"])).is_err());
        assert!(check_unique_stems(&inputs(&["logo.png", "wave.png"])).is_ok());
    }

    #[test]
    fn invalid_plate_is_rejected() {
        assert!(parse(&["--rows", "40", "--labels", "alphabetic"])
            .plate_config()
            .is_err());
        assert!(Options::try_parse_from(["platedrop", "-i", "a.png", "-o", "out", "--unit", "pints"]).is_err());
    }
}

use crate::color::{Channel, ConversionPolicy};
use crate::error::{Result, ValidationError};
use crate::grid::Grid;
use crate::plate::{LabelScheme, WellId};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeUnit {
    #[default]
    Microliters,
    Nanoliters,
}

impl VolumeUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            VolumeUnit::Microliters => "uL",
            VolumeUnit::Nanoliters => "nL",
        }
    }
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for VolumeUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ul" | "microliters" | "microliter" => Ok(VolumeUnit::Microliters),
            "nl" | "nanoliters" | "nanoliter" => Ok(VolumeUnit::Nanoliters),
            _ => Err(ValidationError::UnknownOption {
                kind: "volume unit",
                value: s.to_string(),
            }),
        }
    }
}

/// More decimals than an f64 carries significant digits.
pub const MAX_PRECISION: u32 = 15;

fn default_precision() -> Option<u32> {
    Some(3)
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Total volume across all channels of a non-empty well.
    pub max_volume: f64,

    #[serde(default)]
    pub unit: VolumeUnit,

    #[serde(default)]
    pub policy: ConversionPolicy,

    /// Decimal places kept in the output, `None` keeps full precision.
    #[serde(default = "default_precision")]
    pub precision: Option<u32>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        ConversionSettings {
            max_volume: 40.0,
            unit: VolumeUnit::default(),
            policy: ConversionPolicy::default(),
            precision: default_precision(),
        }
    }
}

impl ConversionSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.max_volume.is_finite() || self.max_volume < 0.0 {
            return Err(ValidationError::MaxVolume(self.max_volume).into());
        }

        match self.precision {
            Some(found) if found > MAX_PRECISION => Err(ValidationError::Precision {
                found,
                max: MAX_PRECISION,
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn round(&self, volume: f64) -> f64 {
        match self.precision {
            Some(places) => {
                let factor = 10f64.powi(places.min(MAX_PRECISION) as i32);
                let rounded = (volume * factor).round() / factor;

                if rounded.is_finite() {
                    rounded
                } else {
                    volume
                }
            }
            None => volume,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellVolumes {
    pub well: WellId,
    /// 0-based grid position.
    pub row: usize,
    pub col: usize,
    /// One entry per channel of the plan.
    pub volumes: Vec<f64>,
    degenerate: bool,
}

impl WellVolumes {
    /// The well had no ink at all and every volume is zero.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn total(&self) -> f64 {
        self.volumes.iter().sum()
    }
}

/// Single (well, channel, volume) entry.
#[derive(Clone, Debug, PartialEq)]
pub struct DispenseRecord<'a> {
    pub well: &'a WellId,
    pub channel: Channel,
    pub volume: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellVolumePlan {
    pub rows: usize,
    pub cols: usize,
    pub settings: ConversionSettings,
    pub channels: Vec<Channel>,
    /// Row-major.
    pub wells: Vec<WellVolumes>,
}

impl WellVolumePlan {
    pub fn well(&self, row: usize, col: usize) -> Option<&WellVolumes> {
        if row < self.rows && col < self.cols {
            self.wells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn channel_index(&self, channel: Channel) -> Option<usize> {
        self.channels.iter().position(|&c| c == channel)
    }

    /// Volumes of one channel laid out as the plate, `None` for channels the
    /// plan does not contain.
    pub fn channel_matrix(&self, channel: Channel) -> Option<Vec<Vec<f64>>> {
        let index = self.channel_index(channel)?;

        Some(
            self.wells
                .chunks(self.cols)
                .map(|row| row.iter().map(|w| w.volumes[index]).collect())
                .collect(),
        )
    }

    pub fn records(&self) -> impl Iterator<Item = DispenseRecord<'_>> + '_ {
        self.wells.iter().flat_map(move |w| {
            self.channels
                .iter()
                .zip(w.volumes.iter())
                .map(move |(&channel, &volume)| DispenseRecord {
                    well: &w.well,
                    channel,
                    volume,
                })
        })
    }

    pub fn degenerate_wells(&self) -> usize {
        self.wells.iter().filter(|w| w.is_degenerate()).count()
    }
}

/// Converts every sample to channel intensities and scales each well so its
/// channels add up to `settings.max_volume`.
pub fn convert(
    grid: &Grid,
    labels: LabelScheme,
    settings: &ConversionSettings,
) -> Result<WellVolumePlan> {
    settings.validate()?;
    labels.check(grid.rows())?;

    let row_labels = (0..grid.rows())
        .map(|row| labels.row_label(row))
        .collect::<Result<Vec<_>>>()?;

    let wells = grid
        .iter()
        .map(|(row, col, sample)| {
            let intensities = settings
                .policy
                .intensities(sample.red, sample.green, sample.blue);
            let total: f64 = intensities.iter().sum();
            let degenerate = total <= 0.0;

            let volumes = if degenerate {
                vec![0.0; intensities.len()]
            } else {
                // i <= total, so the share stays in [0, 1] for any finite max volume
                intensities
                    .iter()
                    .map(|i| {
                        let volume = settings.max_volume * (i / total);
                        settings.round(volume).clamp(0.0, settings.max_volume)
                    })
                    .collect()
            };

            WellVolumes {
                well: WellId {
                    row: row_labels[row].clone(),
                    col: col + 1,
                },
                row,
                col,
                volumes,
                degenerate,
            }
        })
        .collect::<Vec<_>>();

    let plan = WellVolumePlan {
        rows: grid.rows(),
        cols: grid.cols(),
        settings: *settings,
        channels: settings.policy.channels().to_vec(),
        wells,
    };

    debug!(
        "Converted {}x{} grid with {} policy, {} degenerate wells",
        plan.rows,
        plan.cols,
        settings.policy,
        plan.degenerate_wells()
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::grid::Sample;

    fn grid(samples: Vec<Vec<(f64, f64, f64)>>) -> Grid {
        Grid::from_rows(
            samples
                .into_iter()
                .map(|row| row.into_iter().map(|(r, g, b)| Sample::new(r, g, b)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn settings(max_volume: f64, policy: ConversionPolicy) -> ConversionSettings {
        ConversionSettings {
            max_volume,
            policy,
            ..Default::default()
        }
    }

    #[test]
    fn white_well_is_degenerate() {
        let plan = convert(
            &grid(vec![vec![(1.0, 1.0, 1.0)]]),
            LabelScheme::Excel,
            &settings(40.0, ConversionPolicy::Standard),
        )
        .unwrap();

        let well = plan.well(0, 0).unwrap();
        assert!(well.is_degenerate());
        assert_eq!(well.volumes, vec![0.0; 4]);
        assert_eq!(plan.degenerate_wells(), 1);
    }

    #[test]
    fn black_well_is_all_key() {
        let plan = convert(
            &grid(vec![vec![(0.0, 0.0, 0.0)]]),
            LabelScheme::Excel,
            &settings(40.0, ConversionPolicy::Standard),
        )
        .unwrap();

        let well = plan.well(0, 0).unwrap();
        assert!(!well.is_degenerate());
        assert_eq!(well.volumes, vec![0.0, 0.0, 0.0, 40.0]);
    }

    #[test]
    fn black_well_is_spread_without_key() {
        let plan = convert(
            &grid(vec![vec![(0.0, 0.0, 0.0)]]),
            LabelScheme::Excel,
            &settings(2.0, ConversionPolicy::DerivedBlue),
        )
        .unwrap();

        assert_eq!(
            plan.channels,
            vec![Channel::Blue, Channel::Cyan, Channel::Magenta, Channel::Yellow]
        );
        assert_eq!(plan.well(0, 0).unwrap().volumes, vec![0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn white_well_is_degenerate_without_key() {
        let plan = convert(
            &grid(vec![vec![(1.0, 1.0, 1.0)]]),
            LabelScheme::Excel,
            &settings(2.0, ConversionPolicy::DerivedBlue),
        )
        .unwrap();

        assert!(plan.well(0, 0).unwrap().is_degenerate());
    }

    #[test]
    fn volumes_add_up_to_max_volume() {
        let plan = convert(
            &grid(vec![
                vec![(0.1, 0.7, 0.3), (0.9, 0.2, 0.4), (0.33, 0.33, 0.8)],
                vec![(0.5, 0.5, 0.5), (0.0, 1.0, 0.25), (0.6, 0.1, 0.95)],
            ]),
            LabelScheme::Excel,
            &settings(40.0, ConversionPolicy::Standard),
        )
        .unwrap();

        for well in &plan.wells {
            assert!((well.total() - 40.0).abs() <= 4.0 * 0.0005 + 1e-9);
            assert!(well.volumes.iter().all(|v| (0.0..=40.0).contains(v)));
        }
    }

    #[test]
    fn rounding_keeps_three_decimals() {
        let plan = convert(
            &grid(vec![vec![(0.1, 0.7, 0.3)]]),
            LabelScheme::Excel,
            &settings(100.0, ConversionPolicy::Standard),
        )
        .unwrap();

        for v in &plan.well(0, 0).unwrap().volumes {
            assert_eq!((v * 1000.0).round() / 1000.0, *v);
        }
    }

    #[test]
    fn zero_max_volume_gives_zero_volumes() {
        let plan = convert(
            &grid(vec![vec![(0.2, 0.4, 0.6)]]),
            LabelScheme::Excel,
            &settings(0.0, ConversionPolicy::Standard),
        )
        .unwrap();

        assert_eq!(plan.well(0, 0).unwrap().total(), 0.0);
    }

    #[test]
    fn negative_max_volume_is_rejected() {
        let err = convert(
            &grid(vec![vec![(0.2, 0.4, 0.6)]]),
            LabelScheme::Excel,
            &settings(-1.0, ConversionPolicy::Standard),
        )
        .unwrap_err();

        assert!(err.is_validation());
    }

    #[test]
    fn excessive_precision_is_rejected() {
        let settings = ConversionSettings {
            precision: Some(400),
            ..settings(40.0, ConversionPolicy::Standard)
        };

        let err = convert(&grid(vec![vec![(0.2, 0.4, 0.6)]]), LabelScheme::Excel, &settings)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::Precision { found: 400, .. })
        ));

        let settings = ConversionSettings {
            precision: Some(MAX_PRECISION),
            ..settings
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn huge_max_volume_stays_finite() {
        for precision in [None, Some(3)] {
            let settings = ConversionSettings {
                precision,
                ..settings(1e308, ConversionPolicy::Standard)
            };

            let plan = convert(
                &grid(vec![vec![(0.5, 0.5, 0.5), (0.2, 0.4, 0.6)]]),
                LabelScheme::Excel,
                &settings,
            )
            .unwrap();

            assert_eq!(plan.well(0, 0).unwrap().volumes, vec![0.0, 0.0, 0.0, 1e308]);

            for well in &plan.wells {
                assert!(well
                    .volumes
                    .iter()
                    .all(|v| v.is_finite() && (0.0..=1e308).contains(v)));
            }
        }
    }

    #[test]
    fn too_many_rows_for_labels() {
        let rows = vec![vec![(0.5, 0.5, 0.5)]; 27];
        let err = convert(
            &grid(rows),
            LabelScheme::Alphabetic,
            &settings(1.0, ConversionPolicy::Standard),
        )
        .unwrap_err();

        assert!(err.is_validation());
    }

    #[test]
    fn records_follow_wells_then_channels() {
        let plan = convert(
            &grid(vec![vec![(0.0, 0.0, 0.0), (1.0, 1.0, 1.0)]]),
            LabelScheme::Excel,
            &settings(10.0, ConversionPolicy::Standard),
        )
        .unwrap();

        let records = plan
            .records()
            .map(|r| format!("{}:{}:{}", r.well, r.channel, r.volume))
            .collect::<Vec<_>>();

        assert_eq!(
            records,
            vec![
                "A1:C:0", "A1:M:0", "A1:Y:0", "A1:K:10", "A2:C:0", "A2:M:0", "A2:Y:0", "A2:K:0"
            ]
        );
    }

    #[test]
    fn channel_matrix_layout() {
        let plan = convert(
            &grid(vec![
                vec![(0.0, 0.0, 0.0), (1.0, 1.0, 1.0)],
                vec![(1.0, 1.0, 1.0), (0.0, 0.0, 0.0)],
            ]),
            LabelScheme::Excel,
            &settings(5.0, ConversionPolicy::Standard),
        )
        .unwrap();

        assert_eq!(
            plan.channel_matrix(Channel::Black),
            Some(vec![vec![5.0, 0.0], vec![0.0, 5.0]])
        );
        assert_eq!(plan.channel_matrix(Channel::Blue), None);
    }

    #[test]
    fn unit_names() {
        assert_eq!("nL".parse::<VolumeUnit>(), Ok(VolumeUnit::Nanoliters));
        assert_eq!(VolumeUnit::Microliters.to_string(), "uL");
        assert!("gallons".parse::<VolumeUnit>().is_err());
    }
}

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keeps the chroma denominator positive for pure black.
const EPSILON: f64 = 1e-8;

/// One dispensable reagent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Cyan,
    Magenta,
    Yellow,
    Black,
    /// Heuristic average of cyan and magenta, only produced by
    /// [`ConversionPolicy::DerivedBlue`].
    Blue,
}

impl Channel {
    pub fn letter(&self) -> &'static str {
        match self {
            Channel::Cyan => "C",
            Channel::Magenta => "M",
            Channel::Yellow => "Y",
            Channel::Black => "K",
            Channel::Blue => "B",
        }
    }

    /// Channel number used by the dispenser software.
    pub fn dispenser_id(&self) -> u8 {
        match self {
            Channel::Cyan => 1,
            Channel::Magenta => 2,
            Channel::Yellow => 3,
            Channel::Black => 4,
            Channel::Blue => 5,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionPolicy {
    /// Subtractive CMYK with black separation.
    #[default]
    Standard,
    /// Inverted RGB without black plus a synthetic blue channel.
    DerivedBlue,
}

const STANDARD_CHANNELS: [Channel; 4] = [
    Channel::Cyan,
    Channel::Magenta,
    Channel::Yellow,
    Channel::Black,
];

const DERIVED_BLUE_CHANNELS: [Channel; 4] = [
    Channel::Blue,
    Channel::Cyan,
    Channel::Magenta,
    Channel::Yellow,
];

impl ConversionPolicy {
    /// Output channels, in the order [`ConversionPolicy::intensities`] returns them.
    pub fn channels(&self) -> &'static [Channel] {
        match self {
            ConversionPolicy::Standard => &STANDARD_CHANNELS,
            ConversionPolicy::DerivedBlue => &DERIVED_BLUE_CHANNELS,
        }
    }

    /// Channel intensities in [0, 1] for one normalized RGB sample. Inputs
    /// outside [0, 1] are clamped first.
    pub fn intensities(&self, r: f64, g: f64, b: f64) -> Vec<f64> {
        let (r, g, b) = (clamp_unit(r), clamp_unit(g), clamp_unit(b));

        match self {
            ConversionPolicy::Standard => {
                let (c, m, y, k) = to_cmyk(r, g, b);
                vec![c, m, y, k]
            }
            ConversionPolicy::DerivedBlue => {
                let (c, m, y, blue) = to_cmy_blue(r, g, b);
                vec![blue, c, m, y]
            }
        }
    }
}

impl fmt::Display for ConversionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionPolicy::Standard => f.write_str("standard"),
            ConversionPolicy::DerivedBlue => f.write_str("derived-blue"),
        }
    }
}

impl FromStr for ConversionPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "cmyk" => Ok(ConversionPolicy::Standard),
            "derived-blue" | "blue" | "bcmy" => Ok(ConversionPolicy::DerivedBlue),
            _ => Err(ValidationError::UnknownOption {
                kind: "conversion policy",
                value: s.to_string(),
            }),
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Fraction of black ink needed for a normalized RGB triple.
pub fn to_black(r: f64, g: f64, b: f64) -> f64 {
    1.0 - r.max(g.max(b))
}

/// Subtractive CMYK. Pure black ends up as (0, 0, 0, 1), pure white as all zero.
pub fn to_cmyk(r: f64, g: f64, b: f64) -> (f64, f64, f64, f64) {
    let black = to_black(r, g, b);
    let white = 1.0 - black + EPSILON;

    (
        clamp_unit((1.0 - r - black) / white),
        clamp_unit((1.0 - g - black) / white),
        clamp_unit((1.0 - b - black) / white),
        clamp_unit(black),
    )
}

/// Plain inversion plus `blue = (cyan + magenta) / 2`.
pub fn to_cmy_blue(r: f64, g: f64, b: f64) -> (f64, f64, f64, f64) {
    let c = clamp_unit(1.0 - r);
    let m = clamp_unit(1.0 - g);
    let y = clamp_unit(1.0 - b);

    (c, m, y, (c + m) / 2.0)
}

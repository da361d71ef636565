//! # Units
//!
//! 長さ・時間の単位と換算

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::ValidationError;

/// Feet per metre.
pub const FEET_PER_METRE: f64 = 3.28084;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    M,
    Ft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    S,
    Min,
    H,
}

impl LengthUnit {
    /// この単位の1単位をメートルで表した値
    pub fn in_metres(self) -> f64 {
        match self {
            LengthUnit::M => 1.0,
            LengthUnit::Ft => 1.0 / FEET_PER_METRE,
        }
    }

    pub fn convert(self, value: f64, to: LengthUnit) -> f64 {
        if self == to {
            return value;
        }
        value * self.in_metres() / to.in_metres()
    }
}

impl TimeUnit {
    /// この単位の1単位を秒で表した値
    pub fn in_seconds(self) -> f64 {
        match self {
            TimeUnit::S => 1.0,
            TimeUnit::Min => 60.0,
            TimeUnit::H => 3600.0,
        }
    }

    pub fn convert(self, value: f64, to: TimeUnit) -> f64 {
        if self == to {
            return value;
        }
        value * self.in_seconds() / to.in_seconds()
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthUnit::M => write!(f, "m"),
            LengthUnit::Ft => write!(f, "ft"),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::S => write!(f, "s"),
            TimeUnit::Min => write!(f, "min"),
            TimeUnit::H => write!(f, "h"),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "meter" | "metre" | "meters" | "metres" => Ok(LengthUnit::M),
            "ft" | "feet" | "foot" => Ok(LengthUnit::Ft),
            other => Err(ValidationError::UnsupportedConversion {
                from: other.to_string(),
                to: "length unit".to_string(),
            }),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Ok(TimeUnit::S),
            "min" | "minute" | "minutes" => Ok(TimeUnit::Min),
            "h" | "hr" | "hour" | "hours" => Ok(TimeUnit::H),
            other => Err(ValidationError::UnsupportedConversion {
                from: other.to_string(),
                to: "time unit".to_string(),
            }),
        }
    }
}

/// 単位名の文字列同士で値を換算する
///
/// 長さ同士または時間同士のみ許可され、長さと時間の混在はエラーになる。
///
/// ```
/// use slugfit::domain::entities::units::harmonize;
///
/// let ft = harmonize(1.0, "m", "ft").unwrap();
/// assert!((ft - 3.28084).abs() < 1e-12);
///
/// assert_eq!(harmonize(2.0, "min", "s").unwrap(), 120.0);
/// assert!(harmonize(1.0, "m", "s").is_err());
/// ```
pub fn harmonize(value: f64, from: &str, to: &str) -> Result<f64, ValidationError> {
    if from == to {
        return Ok(value);
    }

    if let (Ok(a), Ok(b)) = (from.parse::<LengthUnit>(), to.parse::<LengthUnit>()) {
        return Ok(a.convert(value, b));
    }
    if let (Ok(a), Ok(b)) = (from.parse::<TimeUnit>(), to.parse::<TimeUnit>()) {
        return Ok(a.convert(value, b));
    }

    Err(ValidationError::UnsupportedConversion {
        from: from.to_string(),
        to: to.to_string(),
    })
}

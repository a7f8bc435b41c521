//! Measurement and rating units
//!
//! Metrics are measured in one of three raw units and rated in one of three
//! billing units. The set is closed: anything else is a configuration error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit a metric is measured in at the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricUnit {
    #[serde(rename = "core-seconds")]
    CoreSeconds,
    #[serde(rename = "byte-seconds")]
    ByteSeconds,
    #[serde(rename = "byte")]
    Byte,
}

impl MetricUnit {
    pub const ALL: [MetricUnit; 3] = [
        MetricUnit::CoreSeconds,
        MetricUnit::ByteSeconds,
        MetricUnit::Byte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::CoreSeconds => "core-seconds",
            MetricUnit::ByteSeconds => "byte-seconds",
            MetricUnit::Byte => "byte",
        }
    }

    /// Rating unit used when no rule supplies one
    pub fn canonical_rating_unit(&self) -> RatingUnit {
        match self {
            MetricUnit::CoreSeconds => RatingUnit::CoreHours,
            MetricUnit::ByteSeconds => RatingUnit::GibHours,
            MetricUnit::Byte => RatingUnit::Gib,
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Unit a rule prices in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingUnit {
    #[serde(rename = "core-hours")]
    CoreHours,
    #[serde(rename = "GiB-hours")]
    GibHours,
    #[serde(rename = "GiB")]
    Gib,
}

impl RatingUnit {
    pub const ALL: [RatingUnit; 3] = [RatingUnit::CoreHours, RatingUnit::GibHours, RatingUnit::Gib];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingUnit::CoreHours => "core-hours",
            RatingUnit::GibHours => "GiB-hours",
            RatingUnit::Gib => "GiB",
        }
    }
}

impl fmt::Display for RatingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

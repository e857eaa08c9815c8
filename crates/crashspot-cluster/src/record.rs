//! Read-only accident rows handed to the engine by the ingestion layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Worst outcome among the victims of an accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VictimCondition {
    #[serde(rename = "Without victims")]
    WithoutVictims,
    #[serde(rename = "With injured victims")]
    Injured,
    #[serde(rename = "With dead victims")]
    Fatal,
}

impl VictimCondition {
    /// Severity rank used by hotspot scoring: none 0, injured 1, fatal 2.
    #[must_use]
    pub fn rank(self) -> u32 {
        match self {
            Self::WithoutVictims => 0,
            Self::Injured => 1,
            Self::Fatal => 2,
        }
    }

    /// The label used in the cleaned dataset.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WithoutVictims => "Without victims",
            Self::Injured => "With injured victims",
            Self::Fatal => "With dead victims",
        }
    }
}

impl fmt::Display for VictimCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown victim condition label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown victim condition `{0}`")]
pub struct UnknownVictimCondition(pub String);

impl FromStr for VictimCondition {
    type Err = UnknownVictimCondition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Without victims" => Ok(Self::WithoutVictims),
            "With injured victims" => Ok(Self::Injured),
            "With dead victims" => Ok(Self::Fatal),
            other => Err(UnknownVictimCondition(other.to_string())),
        }
    }
}

/// One cleaned accident row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccidentRecord {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    pub victim_condition: VictimCondition,
    /// Federal road identifier.
    pub road_id: String,
    /// Kilometre marker along the road.
    pub km: f64,
    pub city: String,
    pub state: String,
    /// General accident cause.
    pub cause: String,
}

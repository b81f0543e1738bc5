//! Flight role of an aircraft.

use std::str::FromStr;

use crate::GmError;

/// Whether an aircraft enters the simulation airborne (arrival) or parked on
/// a stand ready for turnaround (departure).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FlightRole {
    #[default]
    Arrival,
    Departure,
}

impl FlightRole {
    /// Lower-case label used in CSV columns and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            FlightRole::Arrival   => "arrival",
            FlightRole::Departure => "departure",
        }
    }
}

impl FromStr for FlightRole {
    type Err = GmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrival" | "arr"   => Ok(FlightRole::Arrival),
            "departure" | "dep" => Ok(FlightRole::Departure),
            other => Err(GmError::Parse(format!(
                "invalid flight role {other:?}: expected \"arrival\" or \"departure\""
            ))),
        }
    }
}

impl std::fmt::Display for FlightRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Data types flowing between the pipeline stages.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PipelineError, Result};

/// Identifies one physical turnstile counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnstileKey {
    pub control_area: String,
    pub unit: String,
    pub scp: String,
    pub station: String,
}

impl TurnstileKey {
    pub fn new(control_area: &str, unit: &str, scp: &str, station: &str) -> Self {
        Self {
            control_area: control_area.to_string(),
            unit: unit.to_string(),
            scp: scp.to_string(),
            station: station.to_string(),
        }
    }

    /// Builds a key from the leading columns of a raw record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidKey`] unless exactly four fields are given.
    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        match fields {
            [control_area, unit, scp, station] => {
                Ok(Self::new(control_area, unit, scp, station))
            }
            _ => Err(PipelineError::InvalidKey {
                fields: fields.iter().map(|f| f.to_string()).collect(),
            }),
        }
    }

    /// Drops the `scp` component, yielding the station this turnstile belongs to.
    pub fn station_key(&self) -> StationKey {
        StationKey {
            control_area: self.control_area.clone(),
            unit: self.unit.clone(),
            station: self.station.clone(),
        }
    }
}

/// Identifies a station; several turnstiles share one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationKey {
    pub control_area: String,
    pub unit: String,
    pub station: String,
}

impl fmt::Display for StationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.control_area, self.unit, self.station)
    }
}

/// One raw observation of a turnstile's cumulative counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeReading {
    pub timestamp: NaiveDateTime,
    pub entries: i64,
    pub exits: i64,
}

/// Activity between two adjacent readings, stamped with the earlier reading's time.
///
/// Widened to `i128` so the difference of any two `i64` counters is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalDelta {
    pub timestamp: NaiveDateTime,
    pub entries: i128,
    pub exits: i128,
}

pub type ReadingSeriesMap = BTreeMap<TurnstileKey, Vec<CumulativeReading>>;

/// Per-turnstile deltas; the output of reading plus delta computation and the unit of caching.
pub type RawSeriesMap = BTreeMap<TurnstileKey, Vec<IntervalDelta>>;

/// Station → scp → deltas.
pub type PerStationSeries = BTreeMap<StationKey, BTreeMap<String, Vec<IntervalDelta>>>;

/// Daily window sums for one turnstile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindowSum {
    pub evening: BTreeMap<NaiveDate, i128>,
    pub morning: BTreeMap<NaiveDate, i128>,
}

/// Station → scp → daily window sums.
pub type PerStationSums = BTreeMap<StationKey, BTreeMap<String, DailyWindowSum>>;

/// Weekday averages for one station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StationAverages {
    pub evening_avg: f64,
    pub morning_avg: f64,
}

pub type StationAveragesMap = BTreeMap<StationKey, StationAverages>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fields_requires_four() {
        let key = TurnstileKey::from_fields(&["A001", "R001", "02-00-00", "59 ST"]).unwrap();
        assert_eq!(key.scp, "02-00-00");

        let err = TurnstileKey::from_fields(&["A001", "R001", "02-00-00"]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidKey { ref fields } if fields.len() == 3));
    }

    #[test]
    fn test_station_key_drops_scp() {
        let key = TurnstileKey::new("A001", "R001", "02-00-00", "59 ST");
        let station = key.station_key();
        assert_eq!(station.to_string(), "A001-R001-59 ST");
    }
}

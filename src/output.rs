//! Output formatting and persistence for pipeline results.
//!
//! Supports pretty-printing, CSV export of station averages and JSON dumps of
//! the intermediate per-station stages.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::pipeline::types::{StationAveragesMap, StationKey};

/// One row of `station_averages.csv`.
#[derive(Debug, Serialize)]
pub struct StationAveragesRow<'a> {
    pub control_area: &'a str,
    pub unit: &'a str,
    pub station: &'a str,
    pub evening_avg: f64,
    pub morning_avg: f64,
}

#[derive(Serialize)]
struct StationEntry<'a, T> {
    station: &'a StationKey,
    turnstiles: &'a T,
}

/// Logs station averages using Rust's debug pretty-print format.
pub fn print_pretty(averages: &StationAveragesMap) {
    for (station, avg) in averages {
        debug!("{station}: {avg:#?}");
    }
}

/// Writes serializable records to a CSV file with a header row, replacing the file.
pub fn write_records<T: Serialize>(path: &Path, records: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut count = 0usize;
    for record in records {
        writer.serialize(record)?;
        count += 1;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = count, "CSV written");
    Ok(())
}

/// Writes one row per station with its evening and morning weekday averages.
pub fn write_station_averages(path: &Path, averages: &StationAveragesMap) -> Result<()> {
    let rows = averages.iter().map(|(key, avg)| StationAveragesRow {
        control_area: &key.control_area,
        unit: &key.unit,
        station: &key.station,
        evening_avg: avg.evening_avg,
        morning_avg: avg.morning_avg,
    });
    write_records(path, rows)?;

    info!(path = %path.display(), stations = averages.len(), "Station averages written");
    Ok(())
}

/// Dumps a station-keyed map as a JSON array of `{ station, turnstiles }` objects.
pub fn write_station_json<T: Serialize>(path: &Path, map: &BTreeMap<StationKey, T>) -> Result<()> {
    let entries: Vec<_> = map
        .iter()
        .map(|(station, turnstiles)| StationEntry {
            station,
            turnstiles,
        })
        .collect();

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &entries)?;
    writer.flush()?;

    info!(path = %path.display(), stations = map.len(), "Stage dump written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{DailyWindowSum, StationAverages};
    use chrono::NaiveDate;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn station(name: &str) -> StationKey {
        StationKey {
            control_area: "A001".into(),
            unit: "R001".into(),
            station: name.into(),
        }
    }

    fn averages() -> StationAveragesMap {
        let mut map = StationAveragesMap::new();
        map.insert(
            station("59 ST"),
            StationAverages {
                evening_avg: 12.5,
                morning_avg: 3.0,
            },
        );
        map.insert(station("5 AVE"), StationAverages::default());
        map
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&averages());
    }

    #[test]
    fn test_write_station_averages() {
        let path = temp_path("turnstile_rater_test_averages.csv");
        let _ = fs::remove_file(&path);

        write_station_averages(&path, &averages()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "control_area,unit,station,evening_avg,morning_avg");
        assert!(lines.contains(&"A001,R001,59 ST,12.5,3.0"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_records_replaces_file() {
        let path = temp_path("turnstile_rater_test_replace.csv");

        write_station_averages(&path, &averages()).unwrap();
        write_station_averages(&path, &StationAveragesMap::new()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_station_json() {
        let path = temp_path("turnstile_rater_test_sums.json");
        let date = NaiveDate::from_ymd_opt(2015, 6, 8).unwrap();

        let mut turnstiles = BTreeMap::new();
        turnstiles.insert(
            "02-00-00".to_string(),
            DailyWindowSum {
                evening: [(date, 7)].into_iter().collect(),
                morning: [(date, 0)].into_iter().collect(),
            },
        );
        let mut sums = BTreeMap::new();
        sums.insert(station("59 ST"), turnstiles);

        write_station_json(&path, &sums).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["station"]["station"], "59 ST");
        assert_eq!(value[0]["turnstiles"]["02-00-00"]["evening"]["2015-06-08"], 7);

        fs::remove_file(&path).unwrap();
    }
}

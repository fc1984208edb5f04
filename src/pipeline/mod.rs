//! Turnstile data transformation pipeline.
//!
//! Raw readings are turned into interval deltas, regrouped by station,
//! summed within the morning and evening windows, and averaged over weekdays.

pub mod average;
pub mod delta;
pub mod station;
pub mod types;
pub mod window;

use std::io::Read;
use tracing::info;

use crate::error::Result;
use crate::parser::read_turnstile_data;
use average::average_stations;
use delta::compute_all_deltas;
use station::group_by_station;
use types::{PerStationSeries, PerStationSums, RawSeriesMap, StationAveragesMap};
use window::sum_station_windows;

/// Outputs of the station-level stages, kept together so each can be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub per_station: PerStationSeries,
    pub sums: PerStationSums,
    pub averages: StationAveragesMap,
}

/// Reads raw records and computes per-turnstile deltas.
pub fn build_raw_series<R: Read>(reader: R) -> Result<RawSeriesMap> {
    let readings = read_turnstile_data(reader)?;
    Ok(compute_all_deltas(&readings))
}

/// Runs the station-level stages on an already computed (or cached) series map.
pub fn run_from_series(series: &RawSeriesMap) -> PipelineOutput {
    let per_station = group_by_station(series);
    let sums = sum_station_windows(&per_station);
    let averages = average_stations(&sums);

    info!(
        turnstiles = series.len(),
        stations = averages.len(),
        "Pipeline complete"
    );

    PipelineOutput {
        per_station,
        sums,
        averages,
    }
}

/// Runs every stage from a raw turnstile file.
pub fn run_from_reader<R: Read>(reader: R) -> Result<PipelineOutput> {
    let series = build_raw_series(reader)?;
    Ok(run_from_series(&series))
}

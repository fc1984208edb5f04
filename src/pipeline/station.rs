use tracing::debug;

use crate::pipeline::types::{PerStationSeries, RawSeriesMap};

/// Regroups turnstile series under their station, keyed by `scp`.
///
/// Turnstiles sharing a station stay separate; nothing is summed here.
#[tracing::instrument(skip_all, fields(turnstiles = series.len()))]
pub fn group_by_station(series: &RawSeriesMap) -> PerStationSeries {
    let per_station = series
        .iter()
        .fold(PerStationSeries::new(), |mut acc, (key, deltas)| {
            acc.entry(key.station_key())
                .or_default()
                .insert(key.scp.clone(), deltas.clone());
            acc
        });

    debug!(stations = per_station.len(), "Turnstiles grouped by station");
    per_station
}

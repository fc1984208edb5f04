use chrono::Timelike;
use std::ops::Range;

use crate::pipeline::types::{DailyWindowSum, IntervalDelta, PerStationSeries, PerStationSums};

/// Hours whose entries count toward the evening sum.
pub const EVENING_HOURS: Range<u32> = 16..20;
/// Hours whose exits count toward the morning sum.
pub const MORNING_HOURS: Range<u32> = 8..12;

/// Sums evening entries and morning exits per calendar date for one turnstile.
///
/// Every date touched by any delta is present in both maps, with 0 when no
/// delta of that date fell inside the window.
pub fn sum_windows(deltas: &[IntervalDelta]) -> DailyWindowSum {
    deltas
        .iter()
        .fold(DailyWindowSum::default(), |mut sums, delta| {
            let date = delta.timestamp.date();
            let hour = delta.timestamp.hour();

            let evening = sums.evening.entry(date).or_insert(0);
            if EVENING_HOURS.contains(&hour) {
                *evening += delta.entries;
            }

            let morning = sums.morning.entry(date).or_insert(0);
            if MORNING_HOURS.contains(&hour) {
                *morning += delta.exits;
            }

            sums
        })
}

/// Runs [`sum_windows`] for every turnstile of every station.
#[tracing::instrument(skip_all, fields(stations = per_station.len()))]
pub fn sum_station_windows(per_station: &PerStationSeries) -> PerStationSums {
    per_station
        .iter()
        .map(|(station, turnstiles)| {
            let sums = turnstiles
                .iter()
                .map(|(scp, deltas)| (scp.clone(), sum_windows(deltas)))
                .collect();
            (station.clone(), sums)
        })
        .collect()
}

use tracing::debug;

use crate::pipeline::types::{CumulativeReading, IntervalDelta, RawSeriesMap, ReadingSeriesMap};

/// Turns one turnstile's cumulative readings into per-interval deltas.
///
/// Each delta carries the earlier reading's timestamp. Fewer than two readings
/// produce no deltas. Counter resets are not corrected and show up as negative
/// deltas.
pub fn compute_deltas(readings: &[CumulativeReading]) -> Vec<IntervalDelta> {
    readings
        .windows(2)
        .map(|pair| IntervalDelta {
            timestamp: pair[0].timestamp,
            entries: i128::from(pair[1].entries) - i128::from(pair[0].entries),
            exits: i128::from(pair[1].exits) - i128::from(pair[0].exits),
        })
        .collect()
}

/// Applies [`compute_deltas`] to every turnstile.
#[tracing::instrument(skip_all, fields(turnstiles = series.len()))]
pub fn compute_all_deltas(series: &ReadingSeriesMap) -> RawSeriesMap {
    let deltas: RawSeriesMap = series
        .iter()
        .map(|(key, readings)| (key.clone(), compute_deltas(readings)))
        .collect();

    debug!(
        intervals = deltas.values().map(Vec::len).sum::<usize>(),
        "Deltas computed"
    );
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::TurnstileKey;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn reading(s: &str, entries: i64, exits: i64) -> CumulativeReading {
        CumulativeReading {
            timestamp: ts(s),
            entries,
            exits,
        }
    }

    #[test]
    fn test_deltas_length_and_values() {
        let readings = vec![
            reading("2015-06-13T16:00:00", 100, 50),
            reading("2015-06-13T16:30:00", 110, 55),
            reading("2015-06-14T08:00:00", 120, 60),
        ];

        let deltas = compute_deltas(&readings);

        assert_eq!(deltas.len(), readings.len() - 1);
        for (i, d) in deltas.iter().enumerate() {
            assert_eq!(d.entries, (readings[i + 1].entries - readings[i].entries) as i128);
            assert_eq!(d.exits, (readings[i + 1].exits - readings[i].exits) as i128);
            assert_eq!(d.timestamp, readings[i].timestamp);
        }
        assert_eq!(deltas[0].timestamp, ts("2015-06-13T16:00:00"));
        assert_eq!((deltas[1].entries, deltas[1].exits), (10, 5));
    }

    #[test]
    fn test_short_series_yield_nothing() {
        assert!(compute_deltas(&[]).is_empty());
        assert!(compute_deltas(&[reading("2015-06-08T08:00:00", 1, 1)]).is_empty());
    }

    #[test]
    fn test_counter_reset_gives_negative_delta() {
        let deltas = compute_deltas(&[
            reading("2015-06-08T08:00:00", 16_777_200, 500),
            reading("2015-06-08T12:00:00", 15, 520),
        ]);
        assert_eq!(deltas[0].entries, 15 - 16_777_200);
        assert_eq!(deltas[0].exits, 20);
    }

    #[test]
    fn test_extreme_counters_do_not_overflow() {
        let deltas = compute_deltas(&[
            reading("2015-06-08T08:00:00", i64::MIN, i64::MAX),
            reading("2015-06-08T12:00:00", i64::MAX, i64::MIN),
        ]);

        assert_eq!(deltas[0].entries, i128::from(i64::MAX) - i128::from(i64::MIN));
        assert_eq!(deltas[0].exits, i128::from(i64::MIN) - i128::from(i64::MAX));
    }

    #[test]
    fn test_compute_all_keeps_every_turnstile() {
        let mut series = ReadingSeriesMap::new();
        series.insert(
            TurnstileKey::new("A001", "R001", "02-00-00", "59 ST"),
            vec![
                reading("2015-06-08T08:00:00", 0, 0),
                reading("2015-06-08T12:00:00", 5, 7),
            ],
        );
        series.insert(
            TurnstileKey::new("A001", "R001", "02-00-01", "59 ST"),
            vec![reading("2015-06-08T08:00:00", 0, 0)],
        );

        let deltas = compute_all_deltas(&series);

        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas.values().map(Vec::len).sum::<usize>(), 1);
    }
}

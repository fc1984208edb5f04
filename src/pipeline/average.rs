use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

use crate::pipeline::types::{DailyWindowSum, PerStationSums, StationAverages, StationAveragesMap};

/// Divisor applied to the weekday totals: the five weekdays of one studied week.
pub const WEEKDAY_DIVISOR: f64 = 5.0;

/// Averages one station's weekday window sums across all its turnstiles.
///
/// The divisor is fixed, not the number of weekdays observed.
pub fn average_weekdays<'a, I>(turnstiles: I) -> StationAverages
where
    I: IntoIterator<Item = &'a DailyWindowSum>,
{
    let (evening, morning) =
        turnstiles
            .into_iter()
            .fold((0i128, 0i128), |(evening, morning), sums| {
                (
                    evening + weekday_total(&sums.evening),
                    morning + weekday_total(&sums.morning),
                )
            });

    StationAverages {
        evening_avg: evening as f64 / WEEKDAY_DIVISOR,
        morning_avg: morning as f64 / WEEKDAY_DIVISOR,
    }
}

fn weekday_total(by_date: &BTreeMap<NaiveDate, i128>) -> i128 {
    by_date
        .iter()
        .filter(|(date, _)| date.weekday().number_from_monday() <= 5)
        .map(|(_, sum)| sum)
        .sum()
}

/// Computes [`StationAverages`] for every station.
#[tracing::instrument(skip_all, fields(stations = sums.len()))]
pub fn average_stations(sums: &PerStationSums) -> StationAveragesMap {
    let averages: StationAveragesMap = sums
        .iter()
        .map(|(station, turnstiles)| (station.clone(), average_weekdays(turnstiles.values())))
        .collect();

    debug!(
        with_evening = averages.values().filter(|a| a.evening_avg > 0.0).count(),
        with_morning = averages.values().filter(|a| a.morning_avg > 0.0).count(),
        "Station averages computed"
    );
    averages
}

#[cfg(test)]
mod tests {
    use super::*;
    fn day(d: u32) -> NaiveDate {
        // June 2015: the 8th is a Monday
        NaiveDate::from_ymd_opt(2015, 6, d).unwrap()
    }

    fn sums(entries: &[(u32, i128)], exits: &[(u32, i128)]) -> DailyWindowSum {
        DailyWindowSum {
            evening: entries.iter().map(|&(d, v)| (day(d), v)).collect(),
            morning: exits.iter().map(|&(d, v)| (day(d), v)).collect(),
        }
    }

    #[test]
    fn test_weekend_days_never_count() {
        let turnstile = sums(&[(13, 1000), (14, 1000)], &[(13, 500), (14, 500)]);
        let avg = average_weekdays([&turnstile]);
        assert_eq!(avg.evening_avg, 0.0);
        assert_eq!(avg.morning_avg, 0.0);
    }

    #[test]
    fn test_sums_across_turnstiles_and_divides_by_five() {
        let a = sums(&[(8, 10), (9, 20), (13, 999)], &[(8, 5)]);
        let b = sums(&[(12, 20)], &[(10, 10), (14, 999)]);

        let avg = average_weekdays([&a, &b]);

        assert_eq!(avg.evening_avg, 10.0);
        assert_eq!(avg.morning_avg, 3.0);
    }

    #[test]
    fn test_no_data_gives_zero() {
        let avg = average_weekdays(std::iter::empty::<&DailyWindowSum>());
        assert_eq!(avg, StationAverages::default());
    }
}

//! Ranked per-station chart datasets.
//!
//! Each [`Chart`] is a descending list of bars, ready for an external
//! renderer. Only every [`TICK_EVERY`]th bar carries a visible tick label.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::output::write_records;
use crate::pipeline::types::{StationAverages, StationAveragesMap};

/// Tick label cadence along the x axis.
pub const TICK_EVERY: usize = 5;

/// One bar of a ranked chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub rank: usize,
    pub label: String,
    pub tick: String,
    pub value: f64,
}

/// A titled, ranked bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub file_stem: &'static str,
    pub title: &'static str,
    pub y_label: &'static str,
    pub bars: Vec<Bar>,
}

/// Ranks stations by `value`, skipping those for which it returns `None`.
fn rank<F>(averages: &StationAveragesMap, value: F) -> Vec<Bar>
where
    F: Fn(&StationAverages) -> Option<f64>,
{
    let mut scored: Vec<_> = averages
        .iter()
        .filter_map(|(key, avg)| value(avg).map(|v| (key, v)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .enumerate()
        .map(|(rank, (key, value))| Bar {
            rank,
            label: key.to_string(),
            tick: if rank % TICK_EVERY == 0 {
                key.station.clone()
            } else {
                String::new()
            },
            value,
        })
        .collect()
}

/// Stations with evening entries, ranked by weekday evening average.
pub fn evening_chart(averages: &StationAveragesMap) -> Chart {
    Chart {
        file_stem: "evening-entries",
        title: "Avg Weekday Evening Entries per MTA Station",
        y_label: "Evening Avg",
        bars: rank(averages, |a| (a.evening_avg > 0.0).then_some(a.evening_avg)),
    }
}

/// Stations with morning exits, ranked by the log of the weekday morning average.
pub fn morning_chart(averages: &StationAveragesMap) -> Chart {
    Chart {
        file_stem: "morning-exits",
        title: "Avg Weekday (Log) Morning Exits per MTA Station",
        y_label: "Log of the Morning Avg",
        bars: rank(averages, |a| (a.morning_avg > 0.0).then(|| a.morning_avg.ln())),
    }
}

/// Stations ranked by the log of morning plus evening averages.
pub fn total_chart(averages: &StationAveragesMap) -> Chart {
    Chart {
        file_stem: "total-exits",
        title: "Avg Weekday (Log) Totals per MTA Station",
        y_label: "Log of the Total Avg",
        bars: rank(averages, |a| {
            let total = a.morning_avg + a.evening_avg;
            (total > 0.0).then(|| total.ln())
        }),
    }
}

pub fn all_charts(averages: &StationAveragesMap) -> Vec<Chart> {
    vec![
        evening_chart(averages),
        morning_chart(averages),
        total_chart(averages),
    ]
}

/// Writes each chart to `<dir>/<file_stem>.csv`.
pub fn write_charts(dir: &Path, charts: &[Chart]) -> Result<()> {
    for chart in charts {
        let path = dir.join(format!("{}.csv", chart.file_stem));
        write_records(&path, &chart.bars)?;
        info!(
            chart = chart.title,
            y_label = chart.y_label,
            bars = chart.bars.len(),
            path = %path.display(),
            "Chart data written"
        );
    }
    Ok(())
}

//! Raw turnstile file parser.
//!
//! Each record is `control_area, unit, scp, station` followed by one or more
//! `date, time, description, entries, exits` groups. Every group becomes one
//! [`CumulativeReading`] under the record's [`TurnstileKey`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{CumulativeReading, ReadingSeriesMap, TurnstileKey};

const KEY_FIELDS: usize = 4;
const GROUP_FIELDS: usize = 5;

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%y", "%Y-%m-%d"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Accumulator threaded through the fold over raw records.
#[derive(Debug, Default)]
pub struct ReadState {
    series: ReadingSeriesMap,
    current_key: Option<TurnstileKey>,
    key_changes: usize,
    rows: usize,
}

impl ReadState {
    /// Consumes one parsed record and returns the advanced state.
    pub fn push(mut self, key: TurnstileKey, readings: Vec<CumulativeReading>) -> Self {
        if self.current_key.as_ref() != Some(&key) {
            self.key_changes += 1;
            debug!(
                key_changes = self.key_changes,
                rows = self.rows,
                control_area = %key.control_area,
                unit = %key.unit,
                scp = %key.scp,
                "New turnstile key"
            );
        }

        self.series
            .entry(key.clone())
            .or_default()
            .extend(readings);
        self.current_key = Some(key);
        self.rows += 1;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_series(self) -> ReadingSeriesMap {
        self.series
    }
}

/// Reads a raw turnstile file (header line first) into per-turnstile reading series.
///
/// Input order is preserved within each turnstile.
///
/// # Errors
///
/// Returns [`PipelineError::MalformedRecord`] for the first record that cannot be
/// transcribed, and [`PipelineError::Csv`] for lower-level read failures.
#[tracing::instrument(skip(reader))]
pub fn read_turnstile_data<R: Read>(reader: R) -> Result<ReadingSeriesMap> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let state = rdr
        .records()
        .try_fold(ReadState::default(), |state, result| {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let (key, readings) = parse_record(&record, line)?;
            Ok::<_, PipelineError>(state.push(key, readings))
        })?;

    info!(
        rows = state.rows(),
        turnstiles = state.series.len(),
        "Raw turnstile data loaded"
    );

    Ok(state.into_series())
}

/// Splits one raw record into its key and the readings embedded in it.
pub fn parse_record(
    record: &StringRecord,
    line: u64,
) -> Result<(TurnstileKey, Vec<CumulativeReading>)> {
    let fields: Vec<&str> = record.iter().collect();

    if fields.len() < KEY_FIELDS + GROUP_FIELDS {
        return Err(PipelineError::malformed(
            line,
            format!(
                "expected at least {} fields, found {}",
                KEY_FIELDS + GROUP_FIELDS,
                fields.len()
            ),
        ));
    }

    let key = TurnstileKey::from_fields(&fields[..KEY_FIELDS])?;

    // Padding at the end of short lines
    let end = fields
        .iter()
        .rposition(|f| !f.is_empty())
        .map_or(KEY_FIELDS, |i| (i + 1).max(KEY_FIELDS));

    let mut readings = Vec::new();
    for group in fields[KEY_FIELDS..end].chunks(GROUP_FIELDS) {
        let [date, time, _description, entries, exits] = group else {
            return Err(PipelineError::malformed(
                line,
                format!("incomplete reading group: {group:?}"),
            ));
        };

        readings.push(CumulativeReading {
            timestamp: parse_timestamp(date, time, line)?,
            entries: parse_counter(entries, "entries", line)?,
            exits: parse_counter(exits, "exits", line)?,
        });
    }

    Ok((key, readings))
}

/// Combines a date field and a time field into one timestamp.
pub fn parse_timestamp(date: &str, time: &str, line: u64) -> Result<NaiveDateTime> {
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
        .ok_or_else(|| PipelineError::malformed(line, format!("unparseable date '{date}'")))?;

    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())
        .ok_or_else(|| PipelineError::malformed(line, format!("unparseable time '{time}'")))?;

    Ok(date.and_time(time))
}

fn parse_counter(value: &str, name: &str, line: u64) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|e| PipelineError::malformed(line, format!("{name} '{value}': {e}")))
}

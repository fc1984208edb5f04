//! On-disk snapshot of the per-turnstile delta series.
//!
//! Loading a snapshot lets a run skip parsing the raw file. The snapshot is a
//! JSON document, optionally gzip-compressed.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pipeline::types::{IntervalDelta, RawSeriesMap, TurnstileKey};

const SCHEMA_VERSION: u8 = 1;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Serialize, Deserialize)]
struct Snapshot {
    schema_version: u8,
    turnstiles: Vec<TurnstileSeries>,
}

#[derive(Serialize, Deserialize)]
struct TurnstileSeries {
    key: TurnstileKey,
    deltas: Vec<IntervalDelta>,
}

/// A single snapshot file holding a [`RawSeriesMap`].
///
/// `gzip` only selects how [`SnapshotCache::save`] writes; loading detects
/// compression from the file itself.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
    gzip: bool,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>, gzip: bool) -> Self {
        Self {
            path: path.into(),
            gzip,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot.
    ///
    /// Returns `None` when there is no snapshot, when it is empty, or when it
    /// cannot be decoded; the caller then recomputes from the raw file.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Option<RawSeriesMap> {
        if !self.path.exists() {
            debug!("No snapshot found");
            return None;
        }

        match self.read_snapshot() {
            Ok(series) if series.is_empty() => {
                debug!("Snapshot is empty");
                None
            }
            Ok(series) => {
                info!(turnstiles = series.len(), "Loaded snapshot");
                Some(series)
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable snapshot");
                None
            }
        }
    }

    fn read_snapshot(&self) -> Result<RawSeriesMap> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let compressed = file.fill_buf()?.starts_with(&GZIP_MAGIC);
        debug!(compressed, "Reading snapshot");

        let reader: Box<dyn Read> = if compressed {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        if snapshot.schema_version != SCHEMA_VERSION {
            warn!(
                found = snapshot.schema_version,
                expected = SCHEMA_VERSION,
                "Snapshot schema version mismatch"
            );
            return Ok(RawSeriesMap::new());
        }

        Ok(snapshot
            .turnstiles
            .into_iter()
            .map(|t| (t.key, t.deltas))
            .collect())
    }

    /// Writes `series` to the snapshot file, replacing any previous snapshot.
    #[tracing::instrument(skip(self, series), fields(path = %self.path.display(), turnstiles = series.len()))]
    pub fn save(&self, series: &RawSeriesMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let snapshot = Snapshot {
            schema_version: SCHEMA_VERSION,
            turnstiles: series
                .iter()
                .map(|(key, deltas)| TurnstileSeries {
                    key: key.clone(),
                    deltas: deltas.clone(),
                })
                .collect(),
        };

        let file = BufWriter::new(File::create(&self.path)?);
        if self.gzip {
            let mut encoder = GzEncoder::new(file, Compression::default());
            serde_json::to_writer(&mut encoder, &snapshot)?;
            encoder.finish()?.flush()?;
        } else {
            let mut file = file;
            serde_json::to_writer(&mut file, &snapshot)?;
            file.flush()?;
        }

        info!("Snapshot saved");
        Ok(())
    }
}

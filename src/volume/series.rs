use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    case::rundata::Case,
    foundation::{
        core::{FrameIndex, Level},
        error::{AmrError, AmrResult},
    },
    frame::model::FrameReader,
    volume::aggregate::VolumeAggregator,
};

/// Per-level volumes of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeRecord {
    pub frame: FrameIndex,
    pub time: f64,
    pub volumes: Vec<f64>,
}

/// Ordered per-frame volumes of one case.
///
/// Rows are appended in frame order and simulation time must strictly increase; a decrease means
/// the checkpoints are corrupt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    records: Vec<VolumeRecord>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[VolumeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of level columns, if any row exists.
    pub fn levels(&self) -> Option<usize> {
        self.records.first().map(|r| r.volumes.len())
    }

    /// `(time, volume)` pairs of one level column.
    pub fn column(&self, level: Level) -> AmrResult<Vec<(f64, f64)>> {
        let levels = self.levels().unwrap_or(0);
        if level.0 == 0 || level.slot() >= levels {
            return Err(AmrError::validation(format!(
                "level {level} requested from a series with {levels} level columns"
            )));
        }
        Ok(self
            .records
            .iter()
            .map(|r| (r.time, r.volumes[level.slot()]))
            .collect())
    }

    pub fn push(&mut self, record: VolumeRecord) -> AmrResult<()> {
        if !record.time.is_finite() {
            return Err(AmrError::decode(format!(
                "frame {} has non-finite time {}",
                record.frame, record.time
            )));
        }
        if let Some(last) = self.records.last() {
            if record.frame <= last.frame {
                return Err(AmrError::validation(format!(
                    "frame {} appended after frame {}",
                    record.frame, last.frame
                )));
            }
            if record.time <= last.time {
                return Err(AmrError::decode(format!(
                    "time does not increase: frame {} at t={} follows frame {} at t={}",
                    record.frame, record.time, last.frame, last.time
                )));
            }
            if record.volumes.len() != last.volumes.len() {
                return Err(AmrError::validation(format!(
                    "frame {} has {} levels, previous rows have {}",
                    record.frame,
                    record.volumes.len(),
                    last.volumes.len()
                )));
            }
        }
        self.records.push(record);
        Ok(())
    }

    /// Comma-delimited rows `time,level_1,...,level_L`, no header.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for r in &self.records {
            let _ = write!(out, "{:.18e}", r.time);
            for v in &r.volumes {
                let _ = write!(out, ",{v:.18e}");
            }
            out.push('\n');
        }
        out
    }

    pub fn parse_csv(text: &str) -> AmrResult<Self> {
        let mut series = Self::new();
        for (row, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut cols = line.split(',').map(|c| {
                c.trim().parse::<f64>().map_err(|e| {
                    AmrError::decode(format!("row {row}: bad value '{}': {e}", c.trim()))
                })
            });
            let time = cols
                .next()
                .ok_or_else(|| AmrError::decode(format!("row {row} is empty")))??;
            let volumes = cols.collect::<AmrResult<Vec<f64>>>()?;
            series.push(VolumeRecord {
                frame: FrameIndex(series.len() as u64),
                time,
                volumes,
            })?;
        }
        Ok(series)
    }

    pub fn load(path: &Path) -> AmrResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read volume series '{}'", path.display()))?;
        Self::parse_csv(&text)
    }

    /// Write next to `path` first and rename into place, so a reader never sees a partial file.
    pub fn write(&self, path: &Path) -> AmrResult<()> {
        let partial = partial_path(path);
        std::fs::write(&partial, self.to_csv())
            .with_context(|| format!("write '{}'", partial.display()))?;
        std::fs::rename(&partial, path)
            .with_context(|| format!("rename '{}' into place", partial.display()))?;
        Ok(())
    }
}

pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

#[derive(Clone, Debug, PartialEq)]
pub enum BuildOutcome {
    /// A series was already persisted; nothing was read.
    Skipped { path: PathBuf },
    Written { path: PathBuf, rows: usize },
}

/// Builds and persists the per-level volume series of one case.
pub struct TimeSeriesBuilder<'a> {
    case: &'a Case,
    aggregator: VolumeAggregator,
}

impl<'a> TimeSeriesBuilder<'a> {
    pub fn new(case: &'a Case) -> AmrResult<Self> {
        Ok(Self {
            case,
            aggregator: VolumeAggregator::new(case.max_level)?,
        })
    }

    /// Read every frame in order and aggregate it. Any failing frame aborts the whole build.
    pub fn collect(&self, reader: &mut dyn FrameReader) -> AmrResult<TimeSeries> {
        let mut series = TimeSeries::new();
        for index in self.case.frames().iter() {
            let frame = reader.read_frame(index)?;
            if frame.index != index {
                return Err(AmrError::decode(format!(
                    "reader returned frame {} for requested frame {index}",
                    frame.index
                )));
            }
            let volumes = self.aggregator.aggregate(&frame.patches)?;
            series.push(VolumeRecord {
                frame: index,
                time: frame.time,
                volumes,
            })?;
        }
        Ok(series)
    }

    /// Skip if the case already has a persisted series, otherwise build and write it.
    #[tracing::instrument(skip(self, reader), fields(case = %self.case.name))]
    pub fn build(&self, reader: &mut dyn FrameReader) -> AmrResult<BuildOutcome> {
        let path = self.case.volume_path();
        if path.is_file() {
            tracing::warn!(path = %path.display(), "volume series exists, skipping");
            return Ok(BuildOutcome::Skipped { path });
        }

        tracing::info!(
            frames = self.case.frame_count,
            levels = self.case.max_level.0,
            "creating volume series"
        );
        let series = self.collect(reader)?;
        series.write(&path)?;

        tracing::info!(path = %path.display(), rows = series.len(), "done creating volume series");
        Ok(BuildOutcome::Written {
            path,
            rows: series.len(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/volume/series.rs"]
mod tests;

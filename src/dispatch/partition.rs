use std::path::{Path, PathBuf};

use crate::foundation::{
    core::FrameIndex,
    error::{AmrError, AmrResult},
};

/// Environment variable read as the default parallelism hint.
pub const PARALLELISM_ENV: &str = "OMP_NUM_THREADS";

/// The frames one worker process renders, and where its output goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub worker: usize,
    /// Strictly ascending.
    pub frames: Vec<FrameIndex>,
    pub log_path: PathBuf,
}

impl WorkerAssignment {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Round-robin striding: frame `k` goes to worker `k % workers`.
///
/// Returns exactly `workers` lists; when `workers > total_frames` the surplus lists are empty.
pub fn partition_frames(total_frames: u64, workers: usize) -> AmrResult<Vec<Vec<FrameIndex>>> {
    if workers == 0 {
        return Err(AmrError::validation("worker count must be >= 1"));
    }
    let per_worker = (total_frames as usize).div_ceil(workers);
    let mut out = vec![Vec::with_capacity(per_worker); workers];
    for k in 0..total_frames {
        out[(k % workers as u64) as usize].push(FrameIndex(k));
    }
    Ok(out)
}

/// `<dir>/stdout.<WW>.txt`.
pub fn worker_log_path(dir: &Path, worker: usize) -> PathBuf {
    dir.join(format!("stdout.{worker:02}.txt"))
}

/// Partition `[0, total_frames)` and attach a per-worker log file under `log_dir`.
pub fn assign_workers(
    total_frames: u64,
    workers: usize,
    log_dir: &Path,
) -> AmrResult<Vec<WorkerAssignment>> {
    Ok(partition_frames(total_frames, workers)?
        .into_iter()
        .enumerate()
        .map(|(worker, frames)| WorkerAssignment {
            worker,
            frames,
            log_path: worker_log_path(log_dir, worker),
        })
        .collect())
}

/// Parse an optional parallelism hint. Present-but-invalid hints are errors, not ignored.
pub fn parse_parallelism_hint(raw: Option<&str>) -> AmrResult<Option<usize>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(AmrError::setup(format!(
            "parallelism hint must be >= 1, got '{raw}'"
        ))),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(AmrError::setup(format!(
            "parallelism hint '{raw}' is not a positive integer: {e}"
        ))),
    }
}

/// Worker count: the hint when given, otherwise half the detected hardware parallelism
/// (at least one). The hint must already be validated.
pub fn default_worker_count(hint: Option<usize>) -> usize {
    if let Some(n) = hint {
        return n;
    }
    let cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    (cpus / 2).max(1)
}

/// An explicit count wins over the environment hint; either one must be >= 1.
pub fn resolve_worker_count(explicit: Option<usize>, env_hint: Option<&str>) -> AmrResult<usize> {
    let hint = match explicit {
        Some(0) => return Err(AmrError::setup("worker count must be >= 1, got 0")),
        Some(n) => Some(n),
        None => parse_parallelism_hint(env_hint)?,
    };
    Ok(default_worker_count(hint))
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/partition.rs"]
mod tests;

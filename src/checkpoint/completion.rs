use std::path::Path;

use anyhow::Context as _;

use crate::foundation::{core::FrameIndex, error::AmrResult};

/// The four per-frame checkpoint categories a solver run persists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckpointKind {
    /// `fort.t`: per-frame metadata (time, equation counts, grid count).
    Time,
    /// `fort.a`: auxiliary arrays (topography, ...).
    Aux,
    /// `fort.b`: binary field data.
    Binary,
    /// `fort.q`: per-patch headers.
    Field,
}

impl CheckpointKind {
    pub const ALL: [CheckpointKind; 4] = [Self::Time, Self::Aux, Self::Binary, Self::Field];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Time => "fort.t",
            Self::Aux => "fort.a",
            Self::Binary => "fort.b",
            Self::Field => "fort.q",
        }
    }

    pub fn file_name(self, frame: FrameIndex) -> String {
        format!("{}{}", self.prefix(), frame.suffix())
    }

    /// `true` for `<prefix>` followed by exactly four ASCII digits.
    pub fn matches(self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.prefix())
            .is_some_and(|rest| rest.len() == 4 && rest.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Per-category checkpoint file counts of one output folder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckpointCounts {
    pub time: u64,
    pub aux: u64,
    pub binary: u64,
    pub field: u64,
}

impl CheckpointCounts {
    pub fn get(&self, kind: CheckpointKind) -> u64 {
        match kind {
            CheckpointKind::Time => self.time,
            CheckpointKind::Aux => self.aux,
            CheckpointKind::Binary => self.binary,
            CheckpointKind::Field => self.field,
        }
    }

    fn bump(&mut self, kind: CheckpointKind) {
        match kind {
            CheckpointKind::Time => self.time += 1,
            CheckpointKind::Aux => self.aux += 1,
            CheckpointKind::Binary => self.binary += 1,
            CheckpointKind::Field => self.field += 1,
        }
    }

    /// Count checkpoint files directly inside `dir`. A missing folder counts as empty.
    pub fn scan(dir: &Path) -> AmrResult<Self> {
        let mut counts = Self::default();
        if !dir.is_dir() {
            return Ok(counts);
        }

        let entries =
            std::fs::read_dir(dir).with_context(|| format!("list '{}'", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("list '{}'", dir.display()))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(kind) = CheckpointKind::ALL.into_iter().find(|k| k.matches(name)) {
                counts.bump(kind);
            }
        }
        Ok(counts)
    }
}

/// Result of comparing an output folder against the expected frame count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Complete,
    Incomplete {
        expected: u64,
        found: CheckpointCounts,
    },
}

impl Completion {
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// A run is complete iff every checkpoint category holds exactly `expected_frames` files.
pub fn check_completion(output_dir: &Path, expected_frames: u64) -> AmrResult<Completion> {
    let found = CheckpointCounts::scan(output_dir)?;
    let complete = CheckpointKind::ALL
        .into_iter()
        .all(|k| found.get(k) == expected_frames);

    tracing::debug!(
        dir = %output_dir.display(),
        expected_frames,
        ?found,
        complete,
        "checked checkpoint completion"
    );

    if complete {
        Ok(Completion::Complete)
    } else {
        Ok(Completion::Incomplete {
            expected: expected_frames,
            found,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/checkpoint/completion.rs"]
mod tests;

use crate::foundation::error::{AmrError, AmrResult};

pub use kurbo::{Affine, Point, Rect};

/// Zero-based output frame number of a run.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// Four-digit, zero-padded suffix used by checkpoint and image file names.
    pub fn suffix(self) -> String {
        format!("{:04}", self.0)
    }
}

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// `[0, n)`.
    pub fn first(n: u64) -> Self {
        Self {
            start: FrameIndex(0),
            end: FrameIndex(n),
        }
    }

    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }
}

/// One-based AMR refinement level.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Level(pub u32);

impl Level {
    pub fn new(level: u32) -> AmrResult<Self> {
        if level == 0 {
            return Err(AmrError::validation("refinement levels are 1-based"));
        }
        Ok(Self(level))
    }

    /// Position of this level in a per-level vector.
    pub fn slot(self) -> usize {
        self.0.saturating_sub(1) as usize
    }

    /// Figure sub-directory name, e.g. `level02`.
    pub fn dir_name(self) -> String {
        format!("level{:02}", self.0)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Uniform cell spacing of one patch.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CellSize {
    pub dx: f64,
    pub dy: f64,
}

impl CellSize {
    pub fn area(self) -> f64 {
        self.dx * self.dy
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

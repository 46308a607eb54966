use crate::{
    foundation::{
        core::Level,
        error::{AmrError, AmrResult},
    },
    frame::model::Patch,
};

/// Reduces one frame's patches into a per-level volume vector.
///
/// Entry `i` holds the sum over level `i + 1` patches of `dx * dy * sum(field)`. Levels are
/// accumulated independently: area refined at level `k + 1` is still counted at level `k`, so the
/// entries are a level-wise decomposition and do not add up to a single conserved total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeAggregator {
    max_level: Level,
}

impl VolumeAggregator {
    pub fn new(max_level: Level) -> AmrResult<Self> {
        if max_level.0 == 0 {
            return Err(AmrError::validation("max level must be >= 1"));
        }
        Ok(Self { max_level })
    }

    pub fn max_level(&self) -> Level {
        self.max_level
    }

    pub fn aggregate<'a>(
        &self,
        patches: impl IntoIterator<Item = &'a Patch>,
    ) -> AmrResult<Vec<f64>> {
        let mut volumes = vec![0.0f64; self.max_level.0 as usize];
        for p in patches {
            if p.level.0 == 0 || p.level > self.max_level {
                return Err(AmrError::decode(format!(
                    "patch {} is at level {} outside 1..={}",
                    p.grid_number, p.level, self.max_level
                )));
            }
            volumes[p.level.slot()] += p.volume();
        }
        Ok(volumes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/volume/aggregate.rs"]
mod tests;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::foundation::{
    core::{FrameRange, Level},
    error::{AmrError, AmrResult},
};

/// Name of the solver output folder inside a case folder.
pub const OUTPUT_DIR: &str = "_output";
/// Name of the persisted per-level volume series inside a case folder.
pub const VOLUME_FILE: &str = "volume.csv";

/// Key/value pairs parsed from a Clawpack `*.data` file.
///
/// Only lines of the form `<value> =: <name>` carry data; everything else (banner comments,
/// blank lines) is ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataFile {
    entries: BTreeMap<String, String>,
}

impl DataFile {
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let Some((value, name)) = line.split_once("=:") else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            entries.insert(name.to_string(), value.to_string());
        }
        Self { entries }
    }

    pub fn read(path: &Path) -> AmrResult<Self> {
        if !path.is_file() {
            return Err(AmrError::setup(format!(
                "run configuration '{}' not found",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read run configuration '{}'", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn raw(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// First whitespace-separated token of `name`, parsed as an unsigned integer.
    pub fn get_u64(&self, name: &str) -> AmrResult<u64> {
        let raw = self
            .raw(name)
            .ok_or_else(|| AmrError::setup(format!("run configuration lacks '{name}'")))?;
        let token = raw.split_whitespace().next().unwrap_or(raw);
        token.parse::<u64>().map_err(|e| {
            AmrError::setup(format!(
                "run configuration '{name}' = '{raw}' is not an integer: {e}"
            ))
        })
    }
}

/// The subset of a case's run configuration post-processing depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunData {
    pub num_output_times: u64,
    pub amr_levels_max: u32,
}

impl RunData {
    /// Read `claw.data` and `amr.data` from a case folder.
    pub fn load(case_root: &Path) -> AmrResult<Self> {
        let claw = DataFile::read(&case_root.join("claw.data"))?;
        let amr = DataFile::read(&case_root.join("amr.data"))?;

        let num_output_times = claw.get_u64("num_output_times")?;
        let levels = amr.get_u64("amr_levels_max")?;
        let amr_levels_max = u32::try_from(levels)
            .ok()
            .filter(|&l| l >= 1)
            .ok_or_else(|| AmrError::setup(format!("amr_levels_max = {levels} is out of range")))?;

        Ok(Self {
            num_output_times,
            amr_levels_max,
        })
    }

    /// Output times plus the initial condition.
    pub fn frame_count(self) -> u64 {
        self.num_output_times + 1
    }
}

/// One simulation configuration and its outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Case {
    pub name: String,
    pub root: PathBuf,
    pub frame_count: u64,
    pub max_level: Level,
}

impl Case {
    /// Resolve a case folder and its run configuration.
    pub fn load(name: impl Into<String>, root: impl Into<PathBuf>) -> AmrResult<Self> {
        let name = name.into();
        let root = root.into();
        if !root.is_dir() {
            return Err(AmrError::setup(format!(
                "case folder '{}' not found",
                root.display()
            )));
        }
        let run = RunData::load(&root)?;
        Ok(Self {
            name,
            root,
            frame_count: run.frame_count(),
            max_level: Level(run.amr_levels_max),
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn volume_path(&self) -> PathBuf {
        self.root.join(VOLUME_FILE)
    }

    pub fn frames(&self) -> FrameRange {
        FrameRange::first(self.frame_count)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/case/rundata.rs"]
mod tests;

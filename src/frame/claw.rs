//! Decoder for Clawpack's binary checkpoint layout.
//!
//! One frame is spread across four files sharing a four-digit suffix:
//!
//! - `fort.tNNNN`: ASCII `<value> <name>` lines (`time`, `meqn`, `ngrids`, `naux`, `ndim`,
//!   optionally `nghost`).
//! - `fort.qNNNN`: one ASCII header block per patch (`grid_number`, `AMR_level`, `mx`, `my`,
//!   `xlow`, `ylow`, `dx`, `dy`).
//! - `fort.bNNNN` / `fort.aNNNN`: little-endian `f64` solution / auxiliary arrays, patch after
//!   patch in header order, each `neqn x (mx + 2g) x (my + 2g)` in Fortran order.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    checkpoint::completion::CheckpointKind,
    foundation::{
        core::{CellSize, FrameIndex, Level},
        error::{AmrError, AmrResult},
    },
    frame::model::{Frame, FrameReader, Patch},
};

const DEFAULT_NGHOST: usize = 2;
/// Water depth `h` in GeoClaw's solution vector.
const DEPTH_EQN: usize = 0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TimeHeader {
    pub time: f64,
    pub meqn: usize,
    pub ngrids: usize,
    pub naux: usize,
    pub nghost: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PatchHeader {
    pub grid_number: u32,
    pub level: u32,
    pub mx: usize,
    pub my: usize,
    pub xlow: f64,
    pub ylow: f64,
    pub dx: f64,
    pub dy: f64,
}

impl PatchHeader {
    /// Row length including ghosts, `None` on overflow.
    fn padded_row(&self, nghost: usize) -> Option<usize> {
        self.mx.checked_add(nghost.checked_mul(2)?)
    }

    /// `(mx + 2g) * (my + 2g)`, `None` on overflow.
    fn padded_cells(&self, nghost: usize) -> Option<usize> {
        let rows = self.my.checked_add(nghost.checked_mul(2)?)?;
        self.padded_row(nghost)?.checked_mul(rows)
    }
}

/// Reads frames from a solver `_output` folder.
#[derive(Clone, Debug)]
pub struct ClawBinaryReader {
    output_dir: PathBuf,
    read_aux: bool,
    aux_eqn: usize,
}

impl ClawBinaryReader {
    /// Reader for the depth field (`q[0]`) without auxiliary arrays.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            read_aux: false,
            aux_eqn: 0,
        }
    }

    /// Also decode `fort.aNNNN` and attach aux equation `aux_eqn` to every patch.
    pub fn with_aux(mut self, aux_eqn: usize) -> Self {
        self.read_aux = true;
        self.aux_eqn = aux_eqn;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn path(&self, kind: CheckpointKind, index: FrameIndex) -> PathBuf {
        self.output_dir.join(kind.file_name(index))
    }

    fn read_text(&self, kind: CheckpointKind, index: FrameIndex) -> AmrResult<String> {
        let path = self.path(kind, index);
        if !path.is_file() {
            return Err(AmrError::decode(format!(
                "checkpoint '{}' not found",
                path.display()
            )));
        }
        Ok(std::fs::read_to_string(&path).with_context(|| format!("read '{}'", path.display()))?)
    }

    fn read_values(&self, kind: CheckpointKind, index: FrameIndex) -> AmrResult<Vec<f64>> {
        let path = self.path(kind, index);
        if !path.is_file() {
            return Err(AmrError::decode(format!(
                "checkpoint '{}' not found",
                path.display()
            )));
        }
        let bytes = std::fs::read(&path).with_context(|| format!("read '{}'", path.display()))?;
        decode_f64_le(&bytes).map_err(|e| AmrError::decode(format!("'{}': {e}", path.display())))
    }
}

impl FrameReader for ClawBinaryReader {
    #[tracing::instrument(skip(self), fields(dir = %self.output_dir.display()))]
    fn read_frame(&mut self, index: FrameIndex) -> AmrResult<Frame> {
        let header = parse_time_header(&self.read_text(CheckpointKind::Time, index)?)?;
        let patches = parse_patch_headers(&self.read_text(CheckpointKind::Field, index)?)?;
        if patches.len() != header.ngrids {
            return Err(AmrError::decode(format!(
                "frame {index}: fort.t announces {} patches, fort.q describes {}",
                header.ngrids,
                patches.len()
            )));
        }

        let q = self.read_values(CheckpointKind::Binary, index)?;
        let fields = split_patches(&q, &patches, header.meqn, header.nghost, DEPTH_EQN)
            .map_err(|e| AmrError::decode(format!("frame {index} fort.b: {e}")))?;

        let mut auxes = if self.read_aux && header.naux > 0 {
            let a = self.read_values(CheckpointKind::Aux, index)?;
            let aux = split_patches(&a, &patches, header.naux, header.nghost, self.aux_eqn)
                .map_err(|e| AmrError::decode(format!("frame {index} fort.a: {e}")))?;
            aux.into_iter().map(Some).collect()
        } else {
            vec![None; patches.len()]
        };

        let mut out = Vec::with_capacity(patches.len());
        for (i, (h, field)) in patches.iter().zip(fields).enumerate() {
            let level = Level::new(h.level).map_err(|_| {
                AmrError::decode(format!(
                    "frame {index}: patch {} has AMR_level 0",
                    h.grid_number
                ))
            })?;
            out.push(Patch {
                grid_number: h.grid_number,
                level,
                dims: (h.mx, h.my),
                lower: (h.xlow, h.ylow),
                cell: CellSize { dx: h.dx, dy: h.dy },
                field,
                aux: auxes[i].take(),
            });
        }

        tracing::debug!(time = header.time, patches = out.len(), "decoded frame");
        Ok(Frame {
            index,
            time: header.time,
            patches: out,
        })
    }
}

/// `<value> <name...>` pairs; lines whose second token is numeric (ASCII data rows) are skipped.
fn header_pairs(text: &str) -> Vec<(&str, String)> {
    let mut out = Vec::new();
    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let Some(value) = tokens.next() else {
            continue;
        };
        let name: Vec<&str> = tokens.collect();
        if name.is_empty() || parse_f64(name[0]).is_ok() {
            continue;
        }
        out.push((value, name.join(" ")));
    }
    out
}

fn parse_f64(raw: &str) -> Result<f64, std::num::ParseFloatError> {
    // Fortran may emit `1.0D+00`.
    raw.replace(['D', 'd'], "E").parse::<f64>()
}

fn parse_usize(raw: &str, name: &str) -> AmrResult<usize> {
    raw.parse::<usize>()
        .map_err(|e| AmrError::decode(format!("header '{name}' = '{raw}': {e}")))
}

fn lookup<'a>(map: &'a BTreeMap<String, &'a str>, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|n| map.get(*n).copied())
}

pub(crate) fn parse_time_header(text: &str) -> AmrResult<TimeHeader> {
    let map: BTreeMap<String, &str> = header_pairs(text)
        .into_iter()
        .map(|(v, n)| (n, v))
        .collect();

    let required = |names: &[&str]| {
        lookup(&map, names)
            .ok_or_else(|| AmrError::decode(format!("fort.t lacks '{}'", names[0])))
    };

    let time_raw = required(&["time"])?;
    let time = parse_f64(time_raw)
        .map_err(|e| AmrError::decode(format!("fort.t time '{time_raw}': {e}")))?;
    let meqn = parse_usize(required(&["meqn", "num_eqn"])?, "meqn")?;
    let ngrids = parse_usize(required(&["ngrids", "num_patches"])?, "ngrids")?;
    let naux = parse_usize(required(&["naux", "num_aux"])?, "naux")?;
    let ndim = parse_usize(required(&["ndim", "num_dim"])?, "ndim")?;
    let nghost = match lookup(&map, &["nghost", "num_ghost"]) {
        Some(raw) => parse_usize(raw, "nghost")?,
        None => DEFAULT_NGHOST,
    };

    if ndim != 2 {
        return Err(AmrError::decode(format!(
            "only 2-D checkpoints are supported, fort.t says ndim = {ndim}"
        )));
    }
    if meqn == 0 {
        return Err(AmrError::decode("fort.t announces zero equations"));
    }

    Ok(TimeHeader {
        time,
        meqn,
        ngrids,
        naux,
        nghost,
    })
}

pub(crate) fn parse_patch_headers(text: &str) -> AmrResult<Vec<PatchHeader>> {
    let mut blocks: Vec<BTreeMap<String, &str>> = Vec::new();
    for (value, name) in header_pairs(text) {
        if name == "grid_number" || name == "patch_number" {
            blocks.push(BTreeMap::new());
        }
        let Some(block) = blocks.last_mut() else {
            return Err(AmrError::decode(format!(
                "fort.q entry '{name}' precedes the first grid_number"
            )));
        };
        block.insert(name, value);
    }

    blocks
        .iter()
        .map(|b| {
            let get = |names: &[&str]| {
                lookup(b, names)
                    .ok_or_else(|| AmrError::decode(format!("fort.q block lacks '{}'", names[0])))
            };
            let float = |names: &[&str]| -> AmrResult<f64> {
                let raw = get(names)?;
                parse_f64(raw)
                    .map_err(|e| AmrError::decode(format!("fort.q '{}' = '{raw}': {e}", names[0])))
            };

            let grid_number = parse_usize(get(&["grid_number", "patch_number"])?, "grid_number")?;
            let level = parse_usize(get(&["AMR_level"])?, "AMR_level")?;
            let header = PatchHeader {
                grid_number: u32::try_from(grid_number)
                    .map_err(|_| AmrError::decode("grid_number out of range"))?,
                level: u32::try_from(level)
                    .map_err(|_| AmrError::decode("AMR_level out of range"))?,
                mx: parse_usize(get(&["mx"])?, "mx")?,
                my: parse_usize(get(&["my"])?, "my")?,
                xlow: float(&["xlow"])?,
                ylow: float(&["ylow"])?,
                dx: float(&["dx"])?,
                dy: float(&["dy"])?,
            };
            if !(header.dx > 0.0 && header.dy > 0.0) {
                return Err(AmrError::decode(format!(
                    "patch {} has non-positive cell size",
                    header.grid_number
                )));
            }
            Ok(header)
        })
        .collect()
}

pub(crate) fn decode_f64_le(bytes: &[u8]) -> Result<Vec<f64>, String> {
    if !bytes.len().is_multiple_of(8) {
        return Err(format!(
            "length {} is not a multiple of 8 bytes",
            bytes.len()
        ));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            f64::from_le_bytes(b)
        })
        .collect())
}

/// Slice a flat array into per-patch interiors of equation `eqn`.
pub(crate) fn split_patches(
    values: &[f64],
    patches: &[PatchHeader],
    neqn: usize,
    nghost: usize,
    eqn: usize,
) -> Result<Vec<Vec<f64>>, String> {
    if eqn >= neqn {
        return Err(format!("equation {eqn} requested but only {neqn} present"));
    }

    let mut offset = 0usize;
    let mut out = Vec::with_capacity(patches.len());
    for h in patches {
        let overflow = || {
            format!(
                "patch {} dimensions {} x {} overflow",
                h.grid_number, h.mx, h.my
            )
        };
        let len = h
            .padded_cells(nghost)
            .and_then(|cells| cells.checked_mul(neqn))
            .ok_or_else(overflow)?;
        let end = offset.checked_add(len).ok_or_else(overflow)?;
        let Some(block) = values.get(offset..end) else {
            return Err(format!(
                "patch {} needs {len} values at offset {offset}, only {} available",
                h.grid_number,
                values.len()
            ));
        };

        // The padded block fits in `values`, so these products cannot overflow.
        let row = h.mx + 2 * nghost;
        let mut interior = Vec::with_capacity(h.mx * h.my);
        for j in 0..h.my {
            for i in 0..h.mx {
                interior.push(block[eqn + neqn * ((i + nghost) + row * (j + nghost))]);
            }
        }
        out.push(interior);
        offset = end;
    }

    if offset != values.len() {
        return Err(format!(
            "{} trailing values after the last patch",
            values.len() - offset
        ));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/frame/claw.rs"]
mod tests;

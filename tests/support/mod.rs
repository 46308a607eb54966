//! Synthetic Clawpack checkpoint sets for tests.
#![allow(dead_code)]

use std::{fmt::Write as _, path::Path};

/// Ghost value written around every patch; must never leak into decoded fields.
pub const GHOST: f64 = 99.0;
pub const NGHOST: usize = 2;

#[derive(Clone, Debug)]
pub struct FixturePatch {
    pub grid_number: u32,
    pub level: u32,
    pub mx: usize,
    pub my: usize,
    pub xlow: f64,
    pub ylow: f64,
    pub dx: f64,
    pub dy: f64,
    /// Interior depth values, `x` fastest.
    pub depth: Vec<f64>,
    /// Interior topography values, `x` fastest.
    pub topo: Vec<f64>,
}

impl FixturePatch {
    /// A patch with a constant depth and flat topography.
    pub fn uniform(
        grid_number: u32,
        level: u32,
        mx: usize,
        my: usize,
        dx: f64,
        depth: f64,
    ) -> Self {
        Self {
            grid_number,
            level,
            mx,
            my,
            xlow: 0.0,
            ylow: 0.0,
            dx,
            dy: dx,
            depth: vec![depth; mx * my],
            topo: vec![10.0; mx * my],
        }
    }

    pub fn at(mut self, xlow: f64, ylow: f64) -> Self {
        self.xlow = xlow;
        self.ylow = ylow;
        self
    }
}

pub fn write_case_data(case_root: &Path, num_output_times: u64, amr_levels_max: u32) {
    std::fs::write(
        case_root.join("claw.data"),
        format!(
            "2                    =: num_dim\n\
             {num_output_times}                    =: num_output_times\n"
        ),
    )
    .unwrap();
    std::fs::write(
        case_root.join("amr.data"),
        format!("{amr_levels_max}                    =: amr_levels_max\n"),
    )
    .unwrap();
}

fn padded(mx: usize, my: usize, neqn: usize, eqn0: &[f64]) -> Vec<f64> {
    let row = mx + 2 * NGHOST;
    let rows = my + 2 * NGHOST;
    let mut out = vec![GHOST; neqn * row * rows];
    for jj in 0..rows {
        for ii in 0..row {
            let interior = ii >= NGHOST && ii < mx + NGHOST && jj >= NGHOST && jj < my + NGHOST;
            if !interior {
                continue;
            }
            let (i, j) = (ii - NGHOST, jj - NGHOST);
            let base = neqn * (ii + row * jj);
            out[base] = eqn0[i + mx * j];
            for m in 1..neqn {
                out[base + m] = 0.5;
            }
        }
    }
    out
}

fn to_le_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Write `fort.{t,q,b,a}NNNN` for one frame with three equations and one aux field.
pub fn write_frame(output_dir: &Path, frame: u64, time: f64, patches: &[FixturePatch]) {
    std::fs::create_dir_all(output_dir).unwrap();
    let meqn = 3;
    let naux = 1;

    let mut t = String::new();
    writeln!(t, "{time:>18.8E}    time").unwrap();
    writeln!(t, "{meqn:>6}                 meqn").unwrap();
    writeln!(t, "{:>6}                 ngrids", patches.len()).unwrap();
    writeln!(t, "{naux:>6}                 naux").unwrap();
    writeln!(t, "     2                 ndim").unwrap();
    writeln!(t, "{NGHOST:>6}                 nghost").unwrap();
    writeln!(t).unwrap();
    std::fs::write(output_dir.join(format!("fort.t{frame:04}")), t).unwrap();

    let mut q = String::new();
    let mut b = Vec::new();
    let mut a = Vec::new();
    for p in patches {
        writeln!(q, "{:>6}                 grid_number", p.grid_number).unwrap();
        writeln!(q, "{:>6}                 AMR_level", p.level).unwrap();
        writeln!(q, "{:>6}                 mx", p.mx).unwrap();
        writeln!(q, "{:>6}                 my", p.my).unwrap();
        writeln!(q, "{:>26.16E}    xlow", p.xlow).unwrap();
        writeln!(q, "{:>26.16E}    ylow", p.ylow).unwrap();
        writeln!(q, "{:>26.16E}    dx", p.dx).unwrap();
        writeln!(q, "{:>26.16E}    dy", p.dy).unwrap();
        writeln!(q).unwrap();
        b.extend(padded(p.mx, p.my, meqn, &p.depth));
        a.extend(padded(p.mx, p.my, naux, &p.topo));
    }
    std::fs::write(output_dir.join(format!("fort.q{frame:04}")), q).unwrap();
    std::fs::write(output_dir.join(format!("fort.b{frame:04}")), to_le_bytes(&b)).unwrap();
    std::fs::write(output_dir.join(format!("fort.a{frame:04}")), to_le_bytes(&a)).unwrap();
}

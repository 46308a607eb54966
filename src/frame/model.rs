use crate::foundation::{
    core::{CellSize, FrameIndex, Level, Rect},
    error::AmrResult,
};

/// One rectangular sub-grid of a refinement level, ghost cells already stripped.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    pub grid_number: u32,
    pub level: Level,
    /// Interior cell counts `(mx, my)`.
    pub dims: (usize, usize),
    /// Lower-left corner in world coordinates.
    pub lower: (f64, f64),
    pub cell: CellSize,
    /// Aggregated field, `mx * my` values with `x` varying fastest.
    pub field: Vec<f64>,
    /// Optional auxiliary field in the same layout (topography for GeoClaw runs).
    pub aux: Option<Vec<f64>>,
}

impl Patch {
    pub fn field_sum(&self) -> f64 {
        self.field.iter().sum()
    }

    /// `dx * dy * sum(field)`.
    pub fn volume(&self) -> f64 {
        self.cell.area() * self.field_sum()
    }

    /// World-space bounds of the patch interior.
    pub fn extent(&self) -> Rect {
        let (x0, y0) = self.lower;
        Rect::new(
            x0,
            y0,
            x0 + self.dims.0 as f64 * self.cell.dx,
            y0 + self.dims.1 as f64 * self.cell.dy,
        )
    }

    /// World-space bounds of cell `(i, j)`.
    pub fn cell_rect(&self, i: usize, j: usize) -> Rect {
        let x0 = self.lower.0 + i as f64 * self.cell.dx;
        let y0 = self.lower.1 + j as f64 * self.cell.dy;
        Rect::new(x0, y0, x0 + self.cell.dx, y0 + self.cell.dy)
    }
}

/// A decoded, time-indexed snapshot. Produced per use and dropped afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub index: FrameIndex,
    pub time: f64,
    pub patches: Vec<Patch>,
}

impl Frame {
    pub fn patches_at(&self, level: Level) -> impl Iterator<Item = &Patch> {
        self.patches.iter().filter(move |p| p.level == level)
    }
}

/// Source of decoded frames for one case.
pub trait FrameReader {
    /// Decode frame `index`. A missing or malformed frame is an error, never an empty frame.
    fn read_frame(&mut self, index: FrameIndex) -> AmrResult<Frame>;
}

impl<R: FrameReader + ?Sized> FrameReader for &mut R {
    fn read_frame(&mut self, index: FrameIndex) -> AmrResult<Frame> {
        (**self).read_frame(index)
    }
}

//! Default frame renderer: topography under a water-depth overlay.
//!
//! Cells are filled as axis-aligned rectangles in a fixed world viewport. Topography comes from
//! aux equation 0 of every level up to the job's max level, coarse levels first so finer patches
//! overwrite them. Depth is drawn for the max level only, and cells shallower than the dry
//! tolerance are left transparent so the topography shows through.
//!
//! Below the map a strip holds two colour bars: topography on the left, depth on the right, each
//! running from the low to the high end of its ramp. The frame title (simulation time and the
//! job's subtitle) is logged, not rasterised.

use image::{Rgba, RgbaImage};

use crate::{
    foundation::{
        core::{Affine, Point, Rect},
        error::{AmrError, AmrResult},
    },
    frame::model::{Frame, Patch},
    render::job::{FrameRenderer, RenderJob},
};

/// Linear map from `[lo, hi]` onto a two-stop RGB gradient; values outside are clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRamp {
    pub lo: f64,
    pub hi: f64,
    pub from: [u8; 3],
    pub to: [u8; 3],
}

impl ColorRamp {
    pub fn color(&self, v: f64) -> Rgba<u8> {
        let t = if self.hi > self.lo {
            ((v - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgba([
            mix(self.from[0], self.to[0]),
            mix(self.from[1], self.to[1]),
            mix(self.from[2], self.to[2]),
            255,
        ])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepthStyle {
    /// World region shown; everything outside is clipped.
    pub world: Rect,
    /// Map size in pixels; the colour-bar strip is added below.
    pub width: u32,
    pub height: u32,
    pub legend_height: u32,
    pub background: [u8; 4],
    pub topo: ColorRamp,
    pub depth: ColorRamp,
    pub dry_tolerance: f64,
}

impl Default for DepthStyle {
    fn default() -> Self {
        Self {
            world: Rect::new(0.0, 0.0, 152.0, 60.0),
            width: 912,
            height: 360,
            legend_height: 24,
            background: [255, 255, 255, 255],
            topo: ColorRamp {
                lo: 9.0,
                hi: 30.0,
                from: [40, 40, 40],
                to: [235, 235, 235],
            },
            depth: ColorRamp {
                lo: 0.0,
                hi: 0.2,
                from: [198, 219, 239],
                to: [8, 48, 107],
            },
            dry_tolerance: 1e-4,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DepthRenderer {
    style: DepthStyle,
}

impl DepthRenderer {
    pub fn new(style: DepthStyle) -> AmrResult<Self> {
        let w = style.world;
        if style.width == 0 || style.height == 0 {
            return Err(AmrError::validation("image dimensions must be non-zero"));
        }
        if !(w.width() > 0.0 && w.height() > 0.0) {
            return Err(AmrError::validation("world viewport must have positive area"));
        }
        Ok(Self { style })
    }

    pub fn style(&self) -> &DepthStyle {
        &self.style
    }

    /// World to pixel mapping; world `y` points up, pixel `y` points down.
    pub fn world_to_pixel(&self) -> Affine {
        let w = self.style.world;
        let sx = self.style.width as f64 / w.width();
        let sy = self.style.height as f64 / w.height();
        Affine::new([sx, 0.0, 0.0, -sy, -w.x0 * sx, w.y1 * sy])
    }

    fn fill_cells(
        &self,
        img: &mut RgbaImage,
        xf: Affine,
        map: Rect,
        patch: &Patch,
        values: &[f64],
        mut color: impl FnMut(f64) -> Option<Rgba<u8>>,
    ) {
        let (mx, my) = patch.dims;
        if values.len() != mx * my || !overlaps(patch.extent(), self.style.world) {
            return;
        }
        for j in 0..my {
            for i in 0..mx {
                let v = values[j * mx + i];
                if !v.is_finite() {
                    continue;
                }
                let Some(c) = color(v) else {
                    continue;
                };
                let px = xf.transform_rect_bbox(patch.cell_rect(i, j)).intersect(map);
                fill_rect(img, px, c);
            }
        }
    }
}

impl DepthRenderer {
    /// Horizontal ramps in the strip below the map: topography left, depth right.
    fn draw_colorbars(&self, img: &mut RgbaImage) {
        let s = &self.style;
        if s.legend_height < 3 {
            return;
        }
        let half = s.width / 2;
        let pad = (half / 10).max(1);
        let y0 = s.height + s.legend_height / 3;
        let y1 = s.height + 2 * s.legend_height / 3;
        for (ramp, x0) in [(&s.topo, 0), (&s.depth, half)] {
            let (a, b) = (x0 + pad, x0 + half - pad);
            if b <= a {
                continue;
            }
            for x in a..b {
                let t = (x - a) as f64 / (b - a - 1).max(1) as f64;
                let c = ramp.color(ramp.lo + t * (ramp.hi - ramp.lo));
                for y in y0..y1 {
                    img.put_pixel(x, y, c);
                }
            }
        }
    }
}

impl FrameRenderer for DepthRenderer {
    fn render(&mut self, frame: &Frame, job: &RenderJob) -> AmrResult<RgbaImage> {
        let s = &self.style;
        let mut img =
            RgbaImage::from_pixel(s.width, s.height + s.legend_height, Rgba(s.background));
        let xf = self.world_to_pixel();
        let map = Rect::new(0.0, 0.0, s.width as f64, s.height as f64);

        let mut topo: Vec<&Patch> = frame
            .patches
            .iter()
            .filter(|p| p.level <= job.max_level)
            .collect();
        topo.sort_by_key(|p| p.level);
        for p in topo {
            if let Some(aux) = &p.aux {
                self.fill_cells(&mut img, xf, map, p, aux, |v| Some(s.topo.color(v)));
            }
        }

        let mut wet = 0usize;
        for p in frame.patches_at(job.max_level) {
            self.fill_cells(&mut img, xf, map, p, &p.field, |v| {
                (v >= s.dry_tolerance).then(|| {
                    wet += 1;
                    s.depth.color(v)
                })
            });
        }

        self.draw_colorbars(&mut img);

        let title = format!(
            "Topography and depth, T={}s ({})",
            (frame.time + 0.5).floor(),
            job.subtitle
        );
        tracing::debug!(frame = %frame.index, wet_cells = wet, %title, "drew depth");
        Ok(img)
    }
}

fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Fill pixels whose centres fall inside `r` (pixel coordinates).
fn fill_rect(img: &mut RgbaImage, r: Rect, c: Rgba<u8>) {
    let clamp = |v: f64, max: u32| v.round().clamp(0.0, max as f64) as u32;
    let (x0, x1) = (clamp(r.x0, img.width()), clamp(r.x1, img.width()));
    let (y0, y1) = (clamp(r.y0, img.height()), clamp(r.y1, img.height()));
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, c);
        }
    }
}

/// Pixel containing world point `p`, if inside the image.
pub fn pixel_at(renderer: &DepthRenderer, p: Point) -> Option<(u32, u32)> {
    let q = renderer.world_to_pixel() * p;
    let s = renderer.style();
    if q.x < 0.0 || q.y < 0.0 || q.x >= s.width as f64 || q.y >= s.height as f64 {
        return None;
    }
    Some((q.x as u32, q.y as u32))
}

#[cfg(test)]
#[path = "../../tests/unit/render/depth.rs"]
mod tests;

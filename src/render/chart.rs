//! Volume-versus-time line charts drawn straight into an RGBA raster.
//!
//! Axis labels, the title and curve labels are not rasterised; they are logged when a chart is
//! written. The legend is a row of colour swatches below the plot in curve order.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use crate::{
    case::{
        config::{Campaign, VolumePlotSpec},
        rundata::VOLUME_FILE,
    },
    foundation::{
        core::{Affine, Level, Point, Rect},
        error::{AmrError, AmrResult},
    },
    render::job::write_png,
    volume::series::TimeSeries,
};

/// One line of a chart: a level column of a case's series.
#[derive(Clone, Debug)]
pub struct ChartCurve {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl ChartCurve {
    pub fn from_series(
        label: impl Into<String>,
        series: &TimeSeries,
        level: Level,
    ) -> AmrResult<Self> {
        Ok(Self {
            label: label.into(),
            points: series.column(level)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    /// Blank border around the plot area, in pixels.
    pub margin: u32,
    pub legend_height: u32,
    pub background: [u8; 4],
    pub axis: [u8; 4],
    pub grid: [u8; 4],
    /// Grid divisions per axis.
    pub divisions: u32,
    pub line_width: f64,
    /// Fixed vertical range; `None` fits `[0, max]` of the data.
    pub y_range: Option<(f64, f64)>,
    pub palette: Vec<[u8; 3]>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 600,
            height: 600,
            margin: 40,
            legend_height: 40,
            background: [255, 255, 255, 255],
            axis: [0, 0, 0, 255],
            grid: [220, 220, 220, 255],
            divisions: 5,
            line_width: 2.0,
            y_range: None,
            palette: vec![
                [31, 119, 180],
                [255, 127, 14],
                [44, 160, 44],
                [214, 39, 40],
                [148, 103, 189],
                [140, 86, 75],
            ],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct VolumeChart {
    style: ChartStyle,
}

impl VolumeChart {
    pub fn new(style: ChartStyle) -> AmrResult<Self> {
        let s = &style;
        if s.width <= 2 * s.margin || s.height <= 2 * s.margin + s.legend_height {
            return Err(AmrError::validation("chart is too small for its margins"));
        }
        if s.palette.is_empty() || s.divisions == 0 {
            return Err(AmrError::validation("chart needs a palette and grid divisions"));
        }
        if let Some((lo, hi)) = s.y_range
            && !(lo.is_finite() && hi.is_finite() && hi > lo)
        {
            return Err(AmrError::validation(format!(
                "invalid vertical range [{lo}, {hi}]"
            )));
        }
        Ok(Self { style })
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    /// Pixel rectangle holding the data area.
    pub fn plot_area(&self) -> Rect {
        let s = &self.style;
        let m = s.margin as f64;
        Rect::new(
            m,
            m,
            s.width as f64 - m,
            (s.height - s.legend_height) as f64 - m,
        )
    }

    pub fn curve_color(&self, index: usize) -> Rgba<u8> {
        let [r, g, b] = self.style.palette[index % self.style.palette.len()];
        Rgba([r, g, b, 255])
    }

    /// Data range shown: time span of all curves by the configured or fitted volume range.
    pub fn data_bounds(&self, curves: &[ChartCurve]) -> AmrResult<Rect> {
        let mut t0 = f64::INFINITY;
        let mut t1 = f64::NEG_INFINITY;
        let mut vmax = f64::NEG_INFINITY;
        for (t, v) in curves.iter().flat_map(|c| c.points.iter().copied()) {
            t0 = t0.min(t);
            t1 = t1.max(t);
            vmax = vmax.max(v);
        }
        if !t0.is_finite() {
            return Err(AmrError::validation("chart has no data points"));
        }
        if t1 <= t0 {
            t1 = t0 + 1.0;
        }
        let (y0, y1) = match self.style.y_range {
            Some(r) => r,
            None if vmax > 0.0 && vmax.is_finite() => (0.0, vmax * 1.05),
            None => (0.0, 1.0),
        };
        Ok(Rect::new(t0, y0, t1, y1))
    }

    /// Data to pixel mapping for `bounds`; volume points up.
    pub fn data_to_pixel(&self, bounds: Rect) -> Affine {
        let area = self.plot_area();
        let sx = area.width() / bounds.width();
        let sy = area.height() / bounds.height();
        Affine::new([
            sx,
            0.0,
            0.0,
            -sy,
            area.x0 - bounds.x0 * sx,
            area.y1 + bounds.y0 * sy,
        ])
    }

    pub fn render(&self, curves: &[ChartCurve]) -> AmrResult<RgbaImage> {
        let s = &self.style;
        let bounds = self.data_bounds(curves)?;
        let xf = self.data_to_pixel(bounds);
        let area = self.plot_area();
        let mut img = RgbaImage::from_pixel(s.width, s.height, Rgba(s.background));

        let grid = Rgba(s.grid);
        let frame = area.inflate(1.0, 1.0);
        for k in 0..=s.divisions {
            let f = k as f64 / s.divisions as f64;
            let x = area.x0 + f * area.width();
            let y = area.y0 + f * area.height();
            let (top, bottom) = (Point::new(x, area.y0), Point::new(x, area.y1));
            let (left, right) = (Point::new(area.x0, y), Point::new(area.x1, y));
            stroke(&mut img, top, bottom, 1.0, grid, frame);
            stroke(&mut img, left, right, 1.0, grid, frame);
        }

        let clip = area.inflate(s.line_width, s.line_width);
        for (i, curve) in curves.iter().enumerate() {
            let color = self.curve_color(i);
            let mut prev: Option<Point> = None;
            for &(t, v) in &curve.points {
                if !(t.is_finite() && v.is_finite()) {
                    prev = None;
                    continue;
                }
                let p = xf * Point::new(t, v);
                if let Some(q) = prev {
                    stroke(&mut img, q, p, s.line_width, color, clip);
                }
                prev = Some(p);
            }
        }

        let axis = Rgba(s.axis);
        let origin = Point::new(area.x0, area.y1);
        stroke(&mut img, origin, Point::new(area.x1, area.y1), 1.0, axis, frame);
        stroke(&mut img, origin, Point::new(area.x0, area.y0), 1.0, axis, frame);

        self.draw_legend(&mut img, curves.len());
        Ok(img)
    }

    fn draw_legend(&self, img: &mut RgbaImage, n: usize) {
        if n == 0 || self.style.legend_height == 0 {
            return;
        }
        let s = &self.style;
        let top = (s.height - s.legend_height) as f64;
        let slot = (s.width - 2 * s.margin) as f64 / n as f64;
        let h = s.legend_height as f64;
        for i in 0..n {
            let x0 = s.margin as f64 + i as f64 * slot;
            let swatch = Rect::new(
                x0 + slot * 0.2,
                top + h * 0.3,
                x0 + slot * 0.8,
                top + h * 0.7,
            );
            fill(img, swatch, self.curve_color(i));
        }
    }
}

/// Stamp a square brush along `a -> b`, clipped to `clip`.
fn stroke(img: &mut RgbaImage, a: Point, b: Point, width: f64, c: Rgba<u8>, clip: Rect) {
    let steps = (a.distance(b).ceil() as usize).max(1);
    let half = width / 2.0;
    for k in 0..=steps {
        let p = a.lerp(b, k as f64 / steps as f64);
        if !clip.contains(p) {
            continue;
        }
        fill(img, Rect::new(p.x - half, p.y - half, p.x + half, p.y + half), c);
    }
}

fn fill(img: &mut RgbaImage, r: Rect, c: Rgba<u8>) {
    let clamp = |v: f64, max: u32| v.round().clamp(0.0, max as f64) as u32;
    let (x0, x1) = (clamp(r.x0, img.width()), clamp(r.x1, img.width()));
    let (y0, y1) = (clamp(r.y0, img.height()), clamp(r.y1, img.height()));
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, c);
        }
    }
}

/// `<figs_root>/<file>`.
pub fn volume_plot_path(figs_root: &Path, plot: &VolumePlotSpec) -> PathBuf {
    figs_root.join(&plot.file)
}

/// Load every curve's `volume.csv` and write the chart. A missing series is a setup error.
#[tracing::instrument(skip_all, fields(plot = %plot.file))]
pub fn render_volume_plot(campaign: &Campaign, plot: &VolumePlotSpec) -> AmrResult<PathBuf> {
    let mut curves = Vec::with_capacity(plot.curves.len());
    for spec in &plot.curves {
        let case = campaign.case(&spec.case)?;
        let path = case.path.join(VOLUME_FILE);
        if !path.is_file() {
            return Err(AmrError::setup(format!(
                "couldn't find '{}' for curve '{}'",
                path.display(),
                spec.label
            )));
        }
        let series = TimeSeries::load(&path)?;
        curves.push(ChartCurve::from_series(&spec.label, &series, spec.level)?);
    }

    let style = ChartStyle {
        y_range: plot.y_max.map(|y| (0.0, y)),
        ..ChartStyle::default()
    };
    let chart = VolumeChart::new(style)?;
    let img = chart.render(&curves)?;
    let out = volume_plot_path(&campaign.figs_root, plot);
    write_png(&img, &out)?;

    for (i, c) in curves.iter().enumerate() {
        let [r, g, b, _] = chart.curve_color(i).0;
        let color = format!("#{r:02x}{g:02x}{b:02x}");
        tracing::debug!(label = %c.label, color = %color, "curve");
    }
    tracing::info!(title = %plot.title, out = %out.display(), "done creating figure");
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/render/chart.rs"]
mod tests;

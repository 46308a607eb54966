use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    foundation::{
        core::{FrameIndex, Level},
        error::{AmrError, AmrResult},
    },
    frame::model::{Frame, FrameReader},
    volume::series::partial_path,
};

/// `<figs_root>/<case_name>/level<NN>/depth<FFFF>.png`.
pub fn depth_image_path(
    figs_root: &Path,
    case_name: &str,
    level: Level,
    frame: FrameIndex,
) -> PathBuf {
    figs_root
        .join(case_name)
        .join(level.dir_name())
        .join(format!("depth{}.png", frame.suffix()))
}

pub fn ensure_parent_dir(path: &Path) -> AmrResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// One frame image to produce. Re-running a job whose output exists is a no-op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderJob {
    pub case_path: PathBuf,
    pub frame: FrameIndex,
    /// Finest level drawn; depth is shown for this level only.
    pub max_level: Level,
    pub subtitle: String,
    pub out_path: PathBuf,
}

impl RenderJob {
    /// Job writing to the standard gallery location for `case_name`.
    pub fn in_gallery(
        case_path: &Path,
        case_name: &str,
        figs_root: &Path,
        max_level: Level,
        subtitle: &str,
        frame: FrameIndex,
    ) -> Self {
        Self {
            case_path: case_path.to_path_buf(),
            frame,
            max_level,
            subtitle: subtitle.to_string(),
            out_path: depth_image_path(figs_root, case_name, max_level, frame),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Output already present; the frame was not decoded.
    Skipped,
    Rendered,
}

/// Turns a decoded frame into an image.
pub trait FrameRenderer {
    fn render(&mut self, frame: &Frame, job: &RenderJob) -> AmrResult<image::RgbaImage>;
}

impl<R: FrameRenderer + ?Sized> FrameRenderer for &mut R {
    fn render(&mut self, frame: &Frame, job: &RenderJob) -> AmrResult<image::RgbaImage> {
        (**self).render(frame, job)
    }
}

/// Render one job, skipping it when its image already exists.
#[tracing::instrument(skip_all, fields(frame = %job.frame, out = %job.out_path.display()))]
pub fn run_render_job(
    job: &RenderJob,
    reader: &mut dyn FrameReader,
    renderer: &mut dyn FrameRenderer,
) -> AmrResult<RenderOutcome> {
    if job.out_path.exists() {
        tracing::info!("figure exists, skipping");
        return Ok(RenderOutcome::Skipped);
    }

    let frame = reader.read_frame(job.frame)?;
    let img = renderer.render(&frame, job)?;
    write_png(&img, &job.out_path)?;

    tracing::info!(time = frame.time, subtitle = %job.subtitle, "rendered frame");
    Ok(RenderOutcome::Rendered)
}

/// Encode to a `.partial` sibling and rename into place.
pub fn write_png(img: &image::RgbaImage, path: &Path) -> AmrResult<()> {
    ensure_parent_dir(path)?;
    let partial = partial_path(path);
    image::save_buffer_with_format(
        &partial,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|e| AmrError::render(format!("write png '{}': {e}", partial.display())))?;
    std::fs::rename(&partial, path)
        .with_context(|| format!("rename '{}' into place", partial.display()))?;
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderTally {
    pub rendered: usize,
    pub skipped: usize,
}

/// Run jobs in order, stopping at the first failure.
pub fn run_render_jobs(
    jobs: impl IntoIterator<Item = RenderJob>,
    reader: &mut dyn FrameReader,
    renderer: &mut dyn FrameRenderer,
) -> AmrResult<RenderTally> {
    let mut tally = RenderTally::default();
    for job in jobs {
        match run_render_job(&job, reader, renderer)? {
            RenderOutcome::Skipped => tally.skipped += 1,
            RenderOutcome::Rendered => tally.rendered += 1,
        }
    }
    Ok(tally)
}

#[cfg(test)]
#[path = "../../tests/unit/render/job.rs"]
mod tests;

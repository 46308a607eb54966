use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    case::rundata::Case,
    dispatch::{
        dispatcher::{BatchReport, ParallelDispatcher, WorkerLauncher},
        partition::{WorkerAssignment, assign_workers},
    },
    foundation::{
        core::Level,
        error::{AmrError, AmrResult},
    },
};

/// Every frame of one case at one level, split across worker processes.
///
/// Images and worker logs share `<figs_root>/<case>/level<NN>/`.
#[derive(Clone, Debug, PartialEq)]
pub struct GalleryPlan {
    pub case_name: String,
    pub case_path: PathBuf,
    pub level: Level,
    pub subtitle: String,
    pub figs_root: PathBuf,
    pub target_dir: PathBuf,
    pub assignments: Vec<WorkerAssignment>,
}

impl GalleryPlan {
    pub fn new(
        case: &Case,
        level: Level,
        subtitle: impl Into<String>,
        figs_root: impl Into<PathBuf>,
        workers: usize,
    ) -> AmrResult<Self> {
        if level > case.max_level {
            return Err(AmrError::validation(format!(
                "case '{}' has {} levels, gallery asks for level {level}",
                case.name, case.max_level
            )));
        }
        let figs_root = figs_root.into();
        let target_dir = figs_root.join(&case.name).join(level.dir_name());
        let assignments = assign_workers(case.frame_count, workers, &target_dir)?;
        Ok(Self {
            case_name: case.name.clone(),
            case_path: case.root.clone(),
            level,
            subtitle: subtitle.into(),
            figs_root,
            target_dir,
            assignments,
        })
    }

    /// Dispatch all workers and fail if any of them did.
    #[tracing::instrument(skip_all, fields(case = %self.case_name, level = %self.level))]
    pub fn run<L: WorkerLauncher>(
        &self,
        dispatcher: &ParallelDispatcher<L>,
    ) -> AmrResult<BatchReport> {
        tracing::info!(
            workers = self.assignments.len(),
            target = %self.target_dir.display(),
            "rendering gallery"
        );
        let report = dispatcher.dispatch(&self.assignments)?;
        report.ensure_success()?;
        tracing::info!(elapsed = ?report.elapsed, "gallery complete");
        Ok(report)
    }
}

/// Launches `<exe> render ...` for each assignment of a [`GalleryPlan`].
#[derive(Clone, Debug)]
pub struct RenderWorkerLauncher {
    exe: PathBuf,
    case_name: String,
    case_path: PathBuf,
    level: Level,
    subtitle: String,
    figs_root: PathBuf,
}

impl RenderWorkerLauncher {
    pub fn new(exe: impl Into<PathBuf>, plan: &GalleryPlan) -> Self {
        Self {
            exe: exe.into(),
            case_name: plan.case_name.clone(),
            case_path: plan.case_path.clone(),
            level: plan.level,
            subtitle: plan.subtitle.clone(),
            figs_root: plan.figs_root.clone(),
        }
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }
}

impl WorkerLauncher for RenderWorkerLauncher {
    fn command(&self, a: &WorkerAssignment) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.arg("render")
            .arg("--case-path")
            .arg(&self.case_path)
            .arg("--case-name")
            .arg(&self.case_name)
            .arg("--level")
            .arg(self.level.0.to_string())
            .arg("--subtitle")
            .arg(&self.subtitle)
            .arg("--figs-root")
            .arg(&self.figs_root)
            .arg("--frames");
        cmd.args(a.frames.iter().map(|f| f.0.to_string()));
        cmd
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/gallery.rs"]
mod tests;

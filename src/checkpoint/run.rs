use std::{
    fs::File,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    case::rundata::Case,
    checkpoint::completion::{Completion, check_completion},
    foundation::error::{AmrError, AmrResult},
};

/// Lines of solver stderr echoed into the log when a run fails.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every checkpoint category already holds the expected frame count.
    AlreadyComplete,
    /// The solver ran to a successful exit.
    Ran,
}

/// Runs an external solver inside a case folder, skipping runs whose output is complete.
///
/// Checkpoint sets cannot be resumed, so an incomplete `_output` folder is removed before the
/// rerun. An optional setup command regenerates the case's `*.data` files first.
#[derive(Clone, Debug)]
pub struct CaseRunner {
    solver: PathBuf,
    setup: Option<Vec<String>>,
}

impl CaseRunner {
    pub fn new(solver: impl Into<PathBuf>) -> Self {
        Self {
            solver: solver.into(),
            setup: None,
        }
    }

    /// Program and arguments run in the case folder before anything else, e.g.
    /// `["python", "setrun.py"]`.
    pub fn with_setup(mut self, command: Vec<String>) -> Self {
        self.setup = Some(command);
        self
    }

    pub fn solver(&self) -> &Path {
        &self.solver
    }

    pub fn stdout_path(case: &Case) -> PathBuf {
        case.root.join("stdout.txt")
    }

    pub fn stderr_path(case: &Case) -> PathBuf {
        case.root.join("stderr.txt")
    }

    /// Run the setup command (if any) in `root`, then load the case it configured.
    #[tracing::instrument(skip_all, fields(case = %name))]
    pub fn prepare(&self, name: &str, root: &Path) -> AmrResult<Case> {
        if let Some(command) = &self.setup {
            let Some((program, args)) = command.split_first() else {
                return Err(AmrError::validation("setup command is empty"));
            };
            if !root.is_dir() {
                return Err(AmrError::setup(format!(
                    "case folder '{}' not found",
                    root.display()
                )));
            }
            tracing::info!(command = ?command, "creating run configuration");
            let mut cmd = Command::new(program);
            cmd.args(args).current_dir(root);
            run_logged(
                &mut cmd,
                &root.join("setup.stdout.txt"),
                &root.join("setup.stderr.txt"),
                &format!("setup command '{program}' for case '{name}'"),
            )?;
        }
        Case::load(name, root)
    }

    /// [`prepare`](Self::prepare) followed by [`run`](Self::run).
    pub fn prepare_and_run(&self, name: &str, root: &Path) -> AmrResult<RunOutcome> {
        let case = self.prepare(name, root)?;
        self.run(&case)
    }

    #[tracing::instrument(skip(self, case), fields(case = %case.name))]
    pub fn run(&self, case: &Case) -> AmrResult<RunOutcome> {
        let out_dir = case.output_dir();

        if out_dir.is_dir() {
            match check_completion(&out_dir, case.frame_count)? {
                Completion::Complete => {
                    tracing::warn!(
                        case = %case.root.display(),
                        "case seems to be already done, skipping"
                    );
                    return Ok(RunOutcome::AlreadyComplete);
                }
                Completion::Incomplete { expected, found } => {
                    tracing::warn!(
                        case = %case.root.display(),
                        expected,
                        ?found,
                        "case is not complete, removing outputs and re-running"
                    );
                    std::fs::remove_dir_all(&out_dir)
                        .with_context(|| format!("remove '{}'", out_dir.display()))?;
                }
            }
        }

        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("create output dir '{}'", out_dir.display()))?;
        copy_data_files(&case.root, &out_dir)?;

        tracing::info!(solver = %self.solver.display(), "running case");
        let mut cmd = Command::new(&self.solver);
        cmd.current_dir(&out_dir);
        run_logged(
            &mut cmd,
            &Self::stdout_path(case),
            &Self::stderr_path(case),
            &format!("solver '{}' for case '{}'", self.solver.display(), case.name),
        )?;

        tracing::info!("finished case");
        Ok(RunOutcome::Ran)
    }
}

/// Run `cmd` to completion with stdout and stderr captured in files.
///
/// A spawn failure or unsuccessful exit is an [`AmrError::ExternalTool`] carrying the stderr tail.
fn run_logged(
    cmd: &mut Command,
    stdout_path: &Path,
    stderr_path: &Path,
    what: &str,
) -> AmrResult<()> {
    let stdout = File::create(stdout_path)
        .with_context(|| format!("create '{}'", stdout_path.display()))?;
    let stderr = File::create(stderr_path)
        .with_context(|| format!("create '{}'", stderr_path.display()))?;

    tracing::debug!(
        stdout = %stdout_path.display(),
        stderr = %stderr_path.display(),
        "{what}"
    );

    let status = cmd
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .status()
        .map_err(|e| AmrError::external_tool(format!("failed to spawn {what}: {e}")))?;

    if !status.success() {
        let tail = read_tail(stderr_path, STDERR_TAIL_LINES);
        tracing::error!(stderr = %tail, "{what} failed");
        return Err(AmrError::external_tool(format!(
            "{what} exited with status {status}: {}",
            tail.trim()
        )));
    }
    Ok(())
}

/// Copy `*.data` files from the case folder into the solver's working directory.
fn copy_data_files(case_root: &Path, out_dir: &Path) -> AmrResult<usize> {
    let entries = std::fs::read_dir(case_root)
        .with_context(|| format!("list '{}'", case_root.display()))?;

    let mut copied = 0usize;
    for entry in entries {
        let path = entry
            .with_context(|| format!("list '{}'", case_root.display()))?
            .path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("data") {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        std::fs::copy(&path, out_dir.join(name))
            .with_context(|| format!("copy '{}'", path.display()))?;
        copied += 1;
    }
    Ok(copied)
}

fn read_tail(path: &Path, lines: usize) -> String {
    let Ok(bytes) = std::fs::read(path) else {
        return String::new();
    };
    let text = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
#[path = "../../tests/unit/checkpoint/run.rs"]
mod tests;

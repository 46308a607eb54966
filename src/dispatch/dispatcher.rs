use std::{
    fs::File,
    path::PathBuf,
    process::{Child, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};

use anyhow::Context as _;

use crate::{
    dispatch::partition::WorkerAssignment,
    foundation::error::{AmrError, AmrResult},
};

/// Builds the OS command a worker process runs for its assignment.
///
/// The dispatcher owns stdio redirection; implementations only set program, arguments and
/// working directory.
pub trait WorkerLauncher {
    fn command(&self, assignment: &WorkerAssignment) -> Command;
}

impl<F> WorkerLauncher for F
where
    F: Fn(&WorkerAssignment) -> Command,
{
    fn command(&self, assignment: &WorkerAssignment) -> Command {
        self(assignment)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchOpts {
    /// Interval between completion polls.
    pub poll_interval: Duration,
    /// Upper bound on the whole batch; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for DispatchOpts {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Exited with status zero.
    Succeeded,
    /// Nothing assigned; no process was started.
    Idle,
    /// Exited unsuccessfully; `code` is `None` when terminated by a signal.
    Failed { code: Option<i32> },
    /// Still running when the batch timeout elapsed; killed.
    TimedOut,
}

impl WorkerStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Idle)
    }

    fn from_exit(status: ExitStatus) -> Self {
        if status.success() {
            Self::Succeeded
        } else {
            Self::Failed {
                code: status.code(),
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub worker: usize,
    pub frames: usize,
    pub log_path: PathBuf,
    pub status: WorkerStatus,
}

/// Joined status of one dispatched batch, in worker order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<WorkerOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_success())
    }

    /// Turn any failed or timed-out worker into an [`AmrError::Render`].
    pub fn ensure_success(&self) -> AmrResult<()> {
        let failed: Vec<String> = self
            .failures()
            .map(|o| {
                let what = match &o.status {
                    WorkerStatus::Failed { code: Some(c) } => format!("exit code {c}"),
                    WorkerStatus::Failed { code: None } => "killed by signal".to_string(),
                    WorkerStatus::TimedOut => "timed out".to_string(),
                    WorkerStatus::Succeeded | WorkerStatus::Idle => "ok".to_string(),
                };
                format!("worker {:02} {what} (log: {})", o.worker, o.log_path.display())
            })
            .collect();

        if failed.is_empty() {
            return Ok(());
        }
        Err(AmrError::render(format!(
            "{} of {} workers failed: {}",
            failed.len(),
            self.outcomes.len(),
            failed.join("; ")
        )))
    }
}

struct Running {
    index: usize,
    child: Child,
}

/// Runs one OS process per [`WorkerAssignment`] and joins them by polling.
///
/// Every worker's stdout and stderr go to its own log file. Workers do not share mutable state;
/// correctness of concurrent output relies on assignments targeting disjoint paths.
pub struct ParallelDispatcher<L> {
    launcher: L,
    opts: DispatchOpts,
}

impl<L: WorkerLauncher> ParallelDispatcher<L> {
    pub fn new(launcher: L, opts: DispatchOpts) -> Self {
        Self { launcher, opts }
    }

    pub fn opts(&self) -> DispatchOpts {
        self.opts
    }

    /// Start all workers, wait for every one to terminate, and report per-worker status.
    ///
    /// A non-zero exit is reported in the returned [`BatchReport`]; call
    /// [`BatchReport::ensure_success`] to surface it. `Err` is reserved for failures of the
    /// dispatcher itself (log file creation, spawn).
    pub fn dispatch(&self, assignments: &[WorkerAssignment]) -> AmrResult<BatchReport> {
        let started = Instant::now();
        let mut outcomes: Vec<WorkerOutcome> = assignments
            .iter()
            .map(|a| WorkerOutcome {
                worker: a.worker,
                frames: a.frames.len(),
                log_path: a.log_path.clone(),
                status: WorkerStatus::Idle,
            })
            .collect();

        let mut running = Vec::with_capacity(assignments.len());
        for (index, a) in assignments.iter().enumerate() {
            match self.spawn_one(a) {
                Ok(Some(child)) => running.push(Running { index, child }),
                Ok(None) => {}
                Err(e) => {
                    kill_all(&mut running);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            workers = assignments.len(),
            spawned = running.len(),
            "dispatched render workers"
        );

        while !running.is_empty() {
            let mut i = 0;
            while i < running.len() {
                match running[i].child.try_wait() {
                    Ok(Some(status)) => {
                        let r = running.swap_remove(i);
                        let outcome = &mut outcomes[r.index];
                        outcome.status = WorkerStatus::from_exit(status);
                        if outcome.status.is_success() {
                            tracing::debug!(worker = outcome.worker, "worker finished");
                        } else {
                            tracing::error!(
                                worker = outcome.worker,
                                %status,
                                log = %outcome.log_path.display(),
                                "worker failed"
                            );
                        }
                    }
                    Ok(None) => i += 1,
                    Err(e) => {
                        kill_all(&mut running);
                        return Err(AmrError::Other(
                            anyhow::Error::new(e).context("poll worker status"),
                        ));
                    }
                }
            }
            if running.is_empty() {
                break;
            }

            if let Some(limit) = self.opts.timeout
                && started.elapsed() >= limit
            {
                for r in &running {
                    tracing::error!(
                        worker = outcomes[r.index].worker,
                        ?limit,
                        "worker exceeded batch timeout, killing"
                    );
                    outcomes[r.index].status = WorkerStatus::TimedOut;
                }
                kill_all(&mut running);
                break;
            }

            std::thread::sleep(self.opts.poll_interval);
        }

        Ok(BatchReport {
            outcomes,
            elapsed: started.elapsed(),
        })
    }

    fn spawn_one(&self, a: &WorkerAssignment) -> AmrResult<Option<Child>> {
        if let Some(parent) = a.log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create log dir '{}'", parent.display()))?;
        }
        let log = File::create(&a.log_path)
            .with_context(|| format!("create worker log '{}'", a.log_path.display()))?;

        if a.is_empty() {
            tracing::debug!(worker = a.worker, "no frames assigned, not spawning");
            return Ok(None);
        }

        let err_log = log
            .try_clone()
            .with_context(|| format!("clone worker log '{}'", a.log_path.display()))?;

        let mut cmd = self.launcher.command(a);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(err_log));

        let child = cmd.spawn().map_err(|e| {
            AmrError::render(format!(
                "failed to spawn worker {:02} ({:?}): {e}",
                a.worker,
                cmd.get_program()
            ))
        })?;

        tracing::info!(
            worker = a.worker,
            frames = a.frames.len(),
            log = %a.log_path.display(),
            "spawned worker"
        );
        Ok(Some(child))
    }
}

fn kill_all(running: &mut Vec<Running>) {
    for r in running.iter_mut() {
        let _ = r.child.kill();
        let _ = r.child.wait();
    }
    running.clear();
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/dispatcher.rs"]
mod tests;

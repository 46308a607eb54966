#![forbid(unsafe_code)]
//! Post-processing for adaptive-mesh-refinement shallow-water runs.
//!
//! - [`checkpoint`] decides whether a case's solver output is complete and reruns it if not.
//! - [`volume`] turns every frame of a case into per-level water volumes, persisted as
//!   `volume.csv`.
//! - [`dispatch`] and [`render`] split frame rendering across worker processes, each with its own
//!   log file, and draw volume-versus-time charts from the persisted series.
//!
//! Frames are decoded through the [`FrameReader`] trait; [`ClawBinaryReader`] reads Clawpack
//! binary checkpoint sets.

pub mod case;
pub mod checkpoint;
pub mod dispatch;
pub mod foundation;
pub mod frame;
pub mod render;
pub mod volume;

pub use case::{
    config::{Campaign, CaseSpec, DispatchSpec, GallerySpec, VolumeCurveSpec, VolumePlotSpec},
    rundata::{Case, DataFile, OUTPUT_DIR, RunData, VOLUME_FILE},
};
pub use checkpoint::{
    completion::{CheckpointCounts, CheckpointKind, Completion, check_completion},
    run::{CaseRunner, RunOutcome},
};
pub use dispatch::{
    dispatcher::{
        BatchReport, DispatchOpts, ParallelDispatcher, WorkerLauncher, WorkerOutcome, WorkerStatus,
    },
    partition::{
        PARALLELISM_ENV, WorkerAssignment, assign_workers, default_worker_count,
        parse_parallelism_hint, partition_frames, resolve_worker_count, worker_log_path,
    },
};
pub use foundation::{
    core::{CellSize, FrameIndex, FrameRange, Level},
    error::{AmrError, AmrResult},
};
pub use frame::{
    claw::ClawBinaryReader,
    model::{Frame, FrameReader, Patch},
};
pub use render::{
    chart::{ChartCurve, ChartStyle, VolumeChart, render_volume_plot, volume_plot_path},
    depth::{ColorRamp, DepthRenderer, DepthStyle},
    gallery::{GalleryPlan, RenderWorkerLauncher},
    job::{
        FrameRenderer, RenderJob, RenderOutcome, RenderTally, depth_image_path, run_render_job,
        run_render_jobs,
    },
};
pub use volume::{
    aggregate::VolumeAggregator,
    series::{BuildOutcome, TimeSeries, TimeSeriesBuilder, VolumeRecord},
};

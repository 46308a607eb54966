use std::{
    fs::File,
    io::IsTerminal as _,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser, Debug)]
#[command(name = "amrpost", version)]
struct Cli {
    /// Also write logs (without colour) to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the solver for every case whose checkpoint set is incomplete.
    Run(CampaignArgs),
    /// Report checkpoint completeness per case.
    Check(CampaignArgs),
    /// Build `volume.csv` for every case that lacks one.
    Volume(CampaignArgs),
    /// Print the final per-level volumes of each case.
    Summary(CampaignArgs),
    /// Draw the configured volume-versus-time charts from each case's `volume.csv`.
    Plots(PlotsArgs),
    /// Render every configured gallery with parallel worker processes.
    Gallery(GalleryArgs),
    /// Render a list of frames of one case (worker entry point).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct CampaignArgs {
    /// Campaign JSON file.
    #[arg(long)]
    campaign: PathBuf,

    /// Restrict to these case names (repeatable).
    #[arg(long = "case")]
    cases: Vec<String>,
}

#[derive(Parser, Debug)]
struct PlotsArgs {
    /// Campaign JSON file.
    #[arg(long)]
    campaign: PathBuf,

    /// Restrict to these output file names (repeatable).
    #[arg(long = "plot")]
    plots: Vec<String>,
}

#[derive(Parser, Debug)]
struct GalleryArgs {
    #[command(flatten)]
    campaign: CampaignArgs,

    /// Worker processes per gallery. Defaults to `OMP_NUM_THREADS`, else half the CPUs.
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Case folder containing `_output/`.
    #[arg(long)]
    case_path: PathBuf,

    /// Figure sub-directory name.
    #[arg(long)]
    case_name: String,

    /// Finest level drawn.
    #[arg(long)]
    level: u32,

    #[arg(long, default_value = "")]
    subtitle: String,

    #[arg(long, default_value = "figs")]
    figs_root: PathBuf,

    /// Frame indices to render, in order.
    #[arg(long, num_args = 1.., required = true)]
    frames: Vec<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Check(args) => cmd_check(args),
        Command::Volume(args) => cmd_volume(args),
        Command::Summary(args) => cmd_summary(args),
        Command::Plots(args) => cmd_plots(args),
        Command::Gallery(args) => cmd_gallery(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("amrpost=info"));

    let file_layer = match log_file {
        Some(path) => {
            amrpost::render::job::ensure_parent_dir(path)?;
            let f = File::create(path)
                .with_context(|| format!("create log file '{}'", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(f)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(())
}

fn load_campaign(args: &CampaignArgs) -> anyhow::Result<amrpost::Campaign> {
    let campaign = amrpost::Campaign::from_path(&args.campaign)?;
    for name in &args.cases {
        campaign.case(name)?;
    }
    Ok(campaign)
}

fn selected<'a>(
    campaign: &'a amrpost::Campaign,
    args: &CampaignArgs,
) -> impl Iterator<Item = &'a amrpost::CaseSpec> {
    let only = args.cases.clone();
    campaign
        .cases
        .iter()
        .filter(move |c| only.is_empty() || only.contains(&c.name))
}

/// Apply `f` to every selected case; failures are logged and reported once all cases ran.
fn for_each_case(
    args: &CampaignArgs,
    mut f: impl FnMut(&amrpost::CaseSpec) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let campaign = load_campaign(args)?;
    let mut total = 0usize;
    let mut failed = Vec::new();
    for spec in selected(&campaign, args) {
        total += 1;
        if let Err(e) = f(spec) {
            tracing::error!(case = %spec.name, error = %format!("{e:#}"), "case failed");
            failed.push(spec.name.clone());
        }
    }
    if !failed.is_empty() {
        anyhow::bail!(
            "{} of {total} cases failed: {}",
            failed.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

fn cmd_run(args: CampaignArgs) -> anyhow::Result<()> {
    for_each_case(&args, |spec| {
        let Some(solver) = &spec.solver else {
            tracing::warn!(case = %spec.name, "no solver configured, skipping");
            return Ok(());
        };
        let mut runner = amrpost::CaseRunner::new(solver);
        if let Some(setup) = &spec.setup {
            runner = runner.with_setup(setup.clone());
        }
        runner.prepare_and_run(&spec.name, &spec.path)?;
        Ok(())
    })
}

fn cmd_check(args: CampaignArgs) -> anyhow::Result<()> {
    for_each_case(&args, |spec| {
        let case = amrpost::Case::load(&spec.name, &spec.path)?;
        match amrpost::check_completion(&case.output_dir(), case.frame_count)? {
            amrpost::Completion::Complete => {
                println!("{}: complete ({} frames)", case.name, case.frame_count);
            }
            amrpost::Completion::Incomplete { expected, found } => {
                println!(
                    "{}: incomplete, expected {expected} of each, found t={} a={} b={} q={}",
                    case.name, found.time, found.aux, found.binary, found.field
                );
            }
        }
        Ok(())
    })
}

fn cmd_volume(args: CampaignArgs) -> anyhow::Result<()> {
    for_each_case(&args, |spec| {
        let case = amrpost::Case::load(&spec.name, &spec.path)?;
        let mut reader = amrpost::ClawBinaryReader::new(case.output_dir());
        amrpost::TimeSeriesBuilder::new(&case)?.build(&mut reader)?;
        Ok(())
    })
}

fn cmd_summary(args: CampaignArgs) -> anyhow::Result<()> {
    for_each_case(&args, |spec| {
        let path = spec.path.join(amrpost::VOLUME_FILE);
        if !path.is_file() {
            tracing::warn!(case = %spec.name, "no volume series yet, run `amrpost volume`");
            return Ok(());
        }
        let series = amrpost::TimeSeries::load(&path)?;
        let Some(last) = series.records().last() else {
            println!("{}: empty volume series", spec.name);
            return Ok(());
        };
        let total: f64 = last.volumes.iter().sum();
        println!(
            "{}: {} frames, t_final = {:.6e}, total volume = {:.6e}",
            spec.name,
            series.len(),
            last.time,
            total
        );
        for (slot, v) in last.volumes.iter().enumerate() {
            println!("  level {:02}: {v:.6e}", slot + 1);
        }
        Ok(())
    })
}

fn cmd_plots(args: PlotsArgs) -> anyhow::Result<()> {
    let campaign = amrpost::Campaign::from_path(&args.campaign)?;
    for name in &args.plots {
        if !campaign.volume_plots.iter().any(|p| &p.file == name) {
            anyhow::bail!("unknown volume plot '{name}'");
        }
    }

    for plot in &campaign.volume_plots {
        if !args.plots.is_empty() && !args.plots.contains(&plot.file) {
            continue;
        }
        let out = amrpost::render_volume_plot(&campaign, plot)?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn cmd_gallery(args: GalleryArgs) -> anyhow::Result<()> {
    let raw_hint = std::env::var(amrpost::PARALLELISM_ENV).ok();
    let workers = amrpost::resolve_worker_count(args.workers, raw_hint.as_deref())?;
    let campaign = load_campaign(&args.campaign)?;
    let opts = campaign.dispatch.to_opts()?;
    let exe = std::env::current_exe().context("locate amrpost executable")?;
    let only = &args.campaign.cases;

    for gallery in &campaign.galleries {
        if !only.is_empty() && !only.contains(&gallery.case) {
            continue;
        }
        let spec = campaign.case(&gallery.case)?;
        let case = amrpost::Case::load(&spec.name, &spec.path)?;
        let plan = amrpost::GalleryPlan::new(
            &case,
            gallery.level,
            &gallery.subtitle,
            &campaign.figs_root,
            workers,
        )?;
        let launcher = amrpost::RenderWorkerLauncher::new(&exe, &plan);
        plan.run(&amrpost::ParallelDispatcher::new(launcher, opts))?;
        eprintln!("wrote {}", plan.target_dir.display());
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let level = amrpost::Level::new(args.level)?;
    let mut reader =
        amrpost::ClawBinaryReader::new(args.case_path.join(amrpost::OUTPUT_DIR)).with_aux(0);
    let mut renderer = amrpost::DepthRenderer::default();

    let jobs = args.frames.iter().map(|&f| {
        amrpost::RenderJob::in_gallery(
            &args.case_path,
            &args.case_name,
            &args.figs_root,
            level,
            &args.subtitle,
            amrpost::FrameIndex(f),
        )
    });
    let tally = amrpost::run_render_jobs(jobs, &mut reader, &mut renderer)?;
    tracing::info!(
        rendered = tally.rendered,
        skipped = tally.skipped,
        "worker done"
    );
    Ok(())
}

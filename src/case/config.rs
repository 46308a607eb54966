use std::{
    collections::BTreeSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;

use crate::{
    dispatch::dispatcher::DispatchOpts,
    foundation::{
        core::Level,
        error::{AmrError, AmrResult},
    },
};

/// A batch of cases plus the figure galleries to produce from them.
///
/// Relative paths are resolved against the directory containing the campaign file.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Campaign {
    #[serde(default = "default_figs_root")]
    pub figs_root: PathBuf,
    pub cases: Vec<CaseSpec>,
    #[serde(default)]
    pub galleries: Vec<GallerySpec>,
    #[serde(default)]
    pub volume_plots: Vec<VolumePlotSpec>,
    #[serde(default)]
    pub dispatch: DispatchSpec,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CaseSpec {
    /// Stable name; also the figure sub-directory.
    pub name: String,
    pub path: PathBuf,
    /// Solver executable. Cases without one can be post-processed but not run.
    #[serde(default)]
    pub solver: Option<PathBuf>,
    /// Command run in the case folder before the solver to (re)write its `*.data` files.
    #[serde(default)]
    pub setup: Option<Vec<String>>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GallerySpec {
    pub subtitle: String,
    /// Name of a [`CaseSpec`].
    pub case: String,
    pub level: Level,
}

/// A volume-versus-time chart comparing level columns of several cases.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct VolumePlotSpec {
    pub title: String,
    /// Output file name under `figs_root`, e.g. `volume_AMR_level_1.png`.
    pub file: String,
    /// Upper end of the volume axis; fitted to the data when absent.
    #[serde(default)]
    pub y_max: Option<f64>,
    pub curves: Vec<VolumeCurveSpec>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct VolumeCurveSpec {
    pub label: String,
    /// Name of a [`CaseSpec`].
    pub case: String,
    /// Level column of the case's `volume.csv`.
    pub level: Level,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DispatchSpec {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: f64,
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

impl Default for DispatchSpec {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: None,
        }
    }
}

impl DispatchSpec {
    pub fn to_opts(&self) -> AmrResult<DispatchOpts> {
        let poll_interval =
            secs_to_duration("dispatch.poll_interval_secs", self.poll_interval_secs)?;
        let timeout = self
            .timeout_secs
            .map(|s| secs_to_duration("dispatch.timeout_secs", s))
            .transpose()?;
        Ok(DispatchOpts {
            poll_interval,
            timeout,
        })
    }
}

fn secs_to_duration(field: &str, secs: f64) -> AmrResult<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(AmrError::validation(format!(
            "{field} must be a positive number of seconds"
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn default_figs_root() -> PathBuf {
    PathBuf::from("figs")
}

fn default_poll_interval_secs() -> f64 {
    5.0
}

impl Campaign {
    /// Load, validate and resolve a campaign file.
    pub fn from_path(path: &Path) -> AmrResult<Self> {
        let f = File::open(path).with_context(|| format!("open campaign '{}'", path.display()))?;
        let r = BufReader::new(f);
        let campaign: Campaign =
            serde_json::from_reader(r).with_context(|| "parse campaign JSON")?;
        campaign.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(campaign.resolved_against(base))
    }

    pub fn validate(&self) -> AmrResult<()> {
        let mut names = BTreeSet::new();
        for case in &self.cases {
            if case.name.trim().is_empty() {
                return Err(AmrError::validation("case name must be non-empty"));
            }
            if case.setup.as_ref().is_some_and(|c| c.is_empty()) {
                return Err(AmrError::validation(format!(
                    "case '{}' has an empty setup command",
                    case.name
                )));
            }
            if !names.insert(case.name.as_str()) {
                return Err(AmrError::validation(format!(
                    "duplicate case name '{}'",
                    case.name
                )));
            }
        }

        for g in &self.galleries {
            if !names.contains(g.case.as_str()) {
                return Err(AmrError::validation(format!(
                    "gallery '{}' references unknown case '{}'",
                    g.subtitle, g.case
                )));
            }
            if g.level.0 == 0 {
                return Err(AmrError::validation(format!(
                    "gallery '{}' level must be >= 1",
                    g.subtitle
                )));
            }
        }

        let mut files = BTreeSet::new();
        for p in &self.volume_plots {
            let plain = Path::new(&p.file).file_name().and_then(|n| n.to_str());
            if p.file.trim().is_empty() || plain != Some(p.file.as_str()) {
                return Err(AmrError::validation(format!(
                    "volume plot '{}' needs a plain file name, got '{}'",
                    p.title, p.file
                )));
            }
            if !files.insert(p.file.as_str()) {
                return Err(AmrError::validation(format!(
                    "duplicate volume plot file '{}'",
                    p.file
                )));
            }
            if p.curves.is_empty() {
                return Err(AmrError::validation(format!(
                    "volume plot '{}' has no curves",
                    p.title
                )));
            }
            if let Some(y) = p.y_max
                && !(y.is_finite() && y > 0.0)
            {
                return Err(AmrError::validation(format!(
                    "volume plot '{}' y_max must be positive",
                    p.title
                )));
            }
            for c in &p.curves {
                if !names.contains(c.case.as_str()) {
                    return Err(AmrError::validation(format!(
                        "volume plot '{}' references unknown case '{}'",
                        p.title, c.case
                    )));
                }
                if c.level.0 == 0 {
                    return Err(AmrError::validation(format!(
                        "volume plot '{}' curve '{}' level must be >= 1",
                        p.title, c.label
                    )));
                }
            }
        }

        self.dispatch.to_opts()?;
        Ok(())
    }

    pub fn case(&self, name: &str) -> AmrResult<&CaseSpec> {
        self.cases
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| AmrError::validation(format!("unknown case '{name}'")))
    }

    fn resolved_against(mut self, base: &Path) -> Self {
        self.figs_root = base.join(&self.figs_root);
        for case in &mut self.cases {
            case.path = base.join(&case.path);
            if let Some(solver) = case.solver.as_mut() {
                *solver = base.join(&*solver);
            }
        }
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/case/config.rs"]
mod tests;

use super::*;

const CAMPAIGN: &str = r#"
{
  "cases": [
    {
      "name": "amr-tests/original",
      "path": "amr-tests/original",
      "solver": "bin/xgeoclaw.original",
      "setup": ["python", "setrun.py"]
    },
    { "name": "single-mesh-tests/dx=4", "path": "single-mesh-tests/dx=4" }
  ],
  "galleries": [
    { "subtitle": "AMR/original/level 2", "case": "amr-tests/original", "level": 2 }
  ],
  "volume_plots": [
    {
      "title": "AMR level 2 (dx=1)",
      "file": "volume_AMR_level_2.png",
      "y_max": 20,
      "curves": [
        { "label": "single mesh, dx = 4", "case": "single-mesh-tests/dx=4", "level": 1 },
        { "label": "original", "case": "amr-tests/original", "level": 2 }
      ]
    }
  ],
  "dispatch": { "timeout_secs": 3600 }
}
"#;

#[test]
fn loads_and_resolves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("campaign.json");
    std::fs::write(&path, CAMPAIGN).unwrap();

    let c = Campaign::from_path(&path).unwrap();
    assert_eq!(c.figs_root, dir.path().join("figs"));
    assert_eq!(c.cases[0].path, dir.path().join("amr-tests/original"));
    assert_eq!(
        c.cases[0].solver.as_deref(),
        Some(dir.path().join("bin/xgeoclaw.original").as_path())
    );
    assert!(c.cases[1].solver.is_none());
    assert_eq!(
        c.cases[0].setup.as_deref(),
        Some(&["python".to_string(), "setrun.py".to_string()][..])
    );
    assert!(c.cases[1].setup.is_none());
    assert_eq!(c.galleries[0].level, Level(2));

    let opts = c.dispatch.to_opts().unwrap();
    assert_eq!(opts.poll_interval, Duration::from_secs(5));
    assert_eq!(opts.timeout, Some(Duration::from_secs(3600)));
}

#[test]
fn gallery_must_reference_known_case() {
    let mut c: Campaign = serde_json::from_str(CAMPAIGN).unwrap();
    c.galleries[0].case = "amr-tests/fix_update".to_string();
    assert!(matches!(c.validate(), Err(AmrError::Validation(_))));
}

#[test]
fn duplicate_case_names_are_rejected() {
    let mut c: Campaign = serde_json::from_str(CAMPAIGN).unwrap();
    c.cases[1].name = c.cases[0].name.clone();
    assert!(c.validate().is_err());
}

#[test]
fn non_positive_intervals_are_rejected() {
    let mut c: Campaign = serde_json::from_str(CAMPAIGN).unwrap();
    c.dispatch.poll_interval_secs = 0.0;
    assert!(c.validate().is_err());

    c.dispatch.poll_interval_secs = 1.0;
    c.dispatch.timeout_secs = Some(-1.0);
    assert!(c.validate().is_err());
}

#[test]
fn case_lookup_by_name() {
    let c: Campaign = serde_json::from_str(CAMPAIGN).unwrap();
    assert_eq!(
        c.case("single-mesh-tests/dx=4").unwrap().path,
        PathBuf::from("single-mesh-tests/dx=4")
    );
    assert!(c.case("missing").is_err());
}

#[test]
fn empty_setup_command_is_rejected() {
    let mut c: Campaign = serde_json::from_str(CAMPAIGN).unwrap();
    c.cases[1].setup = Some(Vec::new());
    assert!(matches!(c.validate(), Err(AmrError::Validation(_))));
}

#[test]
fn volume_plots_are_validated() {
    let c: Campaign = serde_json::from_str(CAMPAIGN).unwrap();
    c.validate().unwrap();
    assert_eq!(c.volume_plots[0].curves[1].level, Level(2));
    assert_eq!(c.volume_plots[0].y_max, Some(20.0));

    let mut bad = c.clone();
    bad.volume_plots[0].curves[0].case = "amr-tests/fix_update".to_string();
    assert!(matches!(bad.validate(), Err(AmrError::Validation(_))));

    let mut bad = c.clone();
    bad.volume_plots[0].file = "../volume.png".to_string();
    assert!(bad.validate().is_err());

    let mut bad = c.clone();
    bad.volume_plots[0].curves.clear();
    assert!(bad.validate().is_err());

    let mut bad = c.clone();
    bad.volume_plots[0].y_max = Some(0.0);
    assert!(bad.validate().is_err());

    let mut bad = c;
    let dup = bad.volume_plots[0].clone();
    bad.volume_plots.push(dup);
    assert!(bad.validate().is_err());
}

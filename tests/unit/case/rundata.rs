use super::*;

const CLAW_DATA: &str = "\
########################################################
### DO NOT EDIT THIS FILE:  GENERATED AUTOMATICALLY ####
########################################################

2                    =: num_dim
0.000000e+00 0.000000e+00 =: lower
1.520000e+02 6.000000e+01 =: upper
1                    =: output_style
360                  =: num_output_times
1.800000e+02         =: tfinal
T                    =: output_t0
";

const AMR_DATA: &str = "\
2                    =: amr_levels_max
4                    =: refinement_ratios_x
";

fn write_case(dir: &Path, claw: &str, amr: &str) {
    std::fs::write(dir.join("claw.data"), claw).unwrap();
    std::fs::write(dir.join("amr.data"), amr).unwrap();
}

#[test]
fn data_file_keeps_only_named_values() {
    let d = DataFile::parse(CLAW_DATA);
    assert_eq!(d.raw("num_dim"), Some("2"));
    assert_eq!(d.raw("lower"), Some("0.000000e+00 0.000000e+00"));
    assert_eq!(d.get_u64("num_output_times").unwrap(), 360);
    assert!(d.raw("DO NOT EDIT").is_none());
}

#[test]
fn non_integer_value_is_a_setup_error() {
    let d = DataFile::parse("1.800000e+02 =: tfinal\n");
    assert!(matches!(d.get_u64("tfinal"), Err(AmrError::Setup(_))));
    assert!(matches!(d.get_u64("absent"), Err(AmrError::Setup(_))));
}

#[test]
fn case_counts_initial_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_case(dir.path(), CLAW_DATA, AMR_DATA);

    let case = Case::load("original", dir.path()).unwrap();
    assert_eq!(case.frame_count, 361);
    assert_eq!(case.max_level, Level(2));
    assert_eq!(case.output_dir(), dir.path().join("_output"));
    assert_eq!(case.volume_path(), dir.path().join("volume.csv"));
}

#[test]
fn missing_configuration_is_fatal_setup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("claw.data"), CLAW_DATA).unwrap();

    let err = Case::load("x", dir.path()).unwrap_err();
    assert!(matches!(err, AmrError::Setup(_)));
    assert!(err.to_string().contains("amr.data"));

    let err = Case::load("x", dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, AmrError::Setup(_)));
}

#[test]
fn zero_levels_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_case(dir.path(), CLAW_DATA, "0 =: amr_levels_max\n");
    assert!(matches!(
        RunData::load(dir.path()),
        Err(AmrError::Setup(_))
    ));
}

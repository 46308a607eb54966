use std::collections::BTreeSet;

use super::*;

fn ids(v: &[FrameIndex]) -> Vec<u64> {
    v.iter().map(|f| f.0).collect()
}

#[test]
fn seven_frames_over_three_workers_stride() {
    let parts = partition_frames(7, 3).unwrap();
    assert_eq!(ids(&parts[0]), vec![0, 3, 6]);
    assert_eq!(ids(&parts[1]), vec![1, 4]);
    assert_eq!(ids(&parts[2]), vec![2, 5]);
}

#[test]
fn partitions_cover_range_exactly_once() {
    for (total, workers) in [(0u64, 1usize), (1, 1), (361, 4), (361, 7), (10, 10), (12, 5)] {
        let parts = partition_frames(total, workers).unwrap();
        assert_eq!(parts.len(), workers);

        let mut seen = BTreeSet::new();
        for p in &parts {
            assert!(p.windows(2).all(|w| w[0] < w[1]), "ascending");
            for f in p {
                assert!(seen.insert(f.0), "frame {f} assigned twice");
            }
        }
        assert_eq!(seen, (0..total).collect::<BTreeSet<_>>());
    }
}

#[test]
fn surplus_workers_get_empty_assignments() {
    let dir = Path::new("figs/case/level01");
    let a = assign_workers(2, 4, dir).unwrap();
    assert_eq!(a.len(), 4);
    assert!(!a[0].is_empty() && !a[1].is_empty());
    assert!(a[2].is_empty() && a[3].is_empty());
    assert_eq!(a[3].log_path, dir.join("stdout.03.txt"));
}

#[test]
fn zero_workers_is_invalid() {
    assert!(partition_frames(5, 0).is_err());
}

#[test]
fn log_names_are_two_digit() {
    let dir = Path::new("t");
    assert_eq!(worker_log_path(dir, 0), dir.join("stdout.00.txt"));
    assert_eq!(worker_log_path(dir, 12), dir.join("stdout.12.txt"));
}

#[test]
fn hint_parsing_and_defaults() {
    assert_eq!(parse_parallelism_hint(None).unwrap(), None);
    assert_eq!(parse_parallelism_hint(Some(" 6 ")).unwrap(), Some(6));
    assert!(matches!(
        parse_parallelism_hint(Some("0")),
        Err(AmrError::Setup(_))
    ));
    assert!(parse_parallelism_hint(Some("four")).is_err());

    assert_eq!(default_worker_count(Some(3)), 3);
    assert!(default_worker_count(None) >= 1);
}

#[test]
fn explicit_worker_count_overrides_environment_and_rejects_zero() {
    assert_eq!(resolve_worker_count(Some(3), Some("8")).unwrap(), 3);
    assert_eq!(resolve_worker_count(None, Some("8")).unwrap(), 8);
    assert!(resolve_worker_count(None, None).unwrap() >= 1);
    assert!(matches!(
        resolve_worker_count(Some(0), None),
        Err(AmrError::Setup(_))
    ));
    assert!(matches!(
        resolve_worker_count(None, Some("0")),
        Err(AmrError::Setup(_))
    ));
}

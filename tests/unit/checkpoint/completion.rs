use super::*;

fn populate(dir: &Path, frames: u64) {
    for f in 0..frames {
        for kind in CheckpointKind::ALL {
            std::fs::write(dir.join(kind.file_name(FrameIndex(f))), b"").unwrap();
        }
    }
}

#[test]
fn file_name_matching_requires_four_digits() {
    assert!(CheckpointKind::Time.matches("fort.t0000"));
    assert!(CheckpointKind::Field.matches("fort.q0360"));
    assert!(!CheckpointKind::Field.matches("fort.q360"));
    assert!(!CheckpointKind::Field.matches("fort.q03600"));
    assert!(!CheckpointKind::Aux.matches("fort.amr"));
    assert!(!CheckpointKind::Binary.matches("fort.t0001"));
    assert_eq!(CheckpointKind::Binary.file_name(FrameIndex(12)), "fort.b0012");
}

#[test]
fn complete_iff_all_four_counts_match() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), 5);
    std::fs::write(dir.path().join("fort.amr"), b"").unwrap();
    std::fs::write(dir.path().join("claw.data"), b"").unwrap();

    assert_eq!(
        check_completion(dir.path(), 5).unwrap(),
        Completion::Complete
    );
    assert!(!check_completion(dir.path(), 6).unwrap().is_complete());
}

#[test]
fn removing_any_single_category_file_flips_to_incomplete() {
    for kind in CheckpointKind::ALL {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 3);
        std::fs::remove_file(dir.path().join(kind.file_name(FrameIndex(2)))).unwrap();

        match check_completion(dir.path(), 3).unwrap() {
            Completion::Incomplete { expected, found } => {
                assert_eq!(expected, 3);
                assert_eq!(found.get(kind), 2);
                for other in CheckpointKind::ALL.into_iter().filter(|k| *k != kind) {
                    assert_eq!(found.get(other), 3);
                }
            }
            Completion::Complete => panic!("{kind:?} removal should be incomplete"),
        }
    }
}

#[test]
fn missing_folder_counts_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let counts = CheckpointCounts::scan(&dir.path().join("_output")).unwrap();
    assert_eq!(counts, CheckpointCounts::default());
    assert!(!check_completion(&dir.path().join("_output"), 1)
        .unwrap()
        .is_complete());
}

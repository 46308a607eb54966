use super::*;

#[path = "../../support/mod.rs"]
mod support;

use support::{FixturePatch, write_frame};

#[test]
fn time_header_accepts_fortran_layout() {
    let text = concat!(
        "  1.50000000E+01    time\n",
        "     4                 meqn\n",
        "     3                 ngrids\n",
        "     3                 naux\n",
        "     2                 ndim\n\n",
    );
    let h = parse_time_header(text).unwrap();
    assert_eq!(h.time, 15.0);
    assert_eq!(h.meqn, 4);
    assert_eq!(h.ngrids, 3);
    assert_eq!(h.naux, 3);
    assert_eq!(h.nghost, DEFAULT_NGHOST);
}

#[test]
fn time_header_rejects_3d_and_missing_fields() {
    let text = "0.0 time\n1 meqn\n1 ngrids\n0 naux\n3 ndim\n";
    assert!(matches!(parse_time_header(text), Err(AmrError::Decode(_))));
    assert!(parse_time_header("0.0 time\n1 meqn\n").is_err());
}

#[test]
fn patch_headers_parse_with_fortran_d_exponents() {
    let text = "\
     1                 grid_number
     2                 AMR_level
     4                 mx
     2                 my
  1.0D+01    xlow
  0.0D+00    ylow
  2.5D-01    dx
  2.5D-01    dy

";
    let hs = parse_patch_headers(text).unwrap();
    assert_eq!(hs.len(), 1);
    assert_eq!(hs[0].level, 2);
    assert_eq!((hs[0].mx, hs[0].my), (4, 2));
    assert_eq!(hs[0].xlow, 10.0);
    assert_eq!(hs[0].dx, 0.25);
}

#[test]
fn patch_headers_skip_ascii_data_rows() {
    let text = concat!(
        "1 grid_number\n1 AMR_level\n1 mx\n1 my\n",
        "0.0 xlow\n0.0 ylow\n1.0 dx\n1.0 dy\n\n",
        " 0.1 0.2 0.3\n",
    );
    assert_eq!(parse_patch_headers(text).unwrap().len(), 1);
}

#[test]
fn incomplete_patch_header_is_decode_error() {
    let text = "1 grid_number\n1 AMR_level\n1 mx\n";
    assert!(matches!(parse_patch_headers(text), Err(AmrError::Decode(_))));
}

#[test]
fn f64_decoding_requires_whole_words() {
    let bytes: Vec<u8> = [1.5f64, -2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
    assert_eq!(decode_f64_le(&bytes).unwrap(), vec![1.5, -2.0]);
    assert!(decode_f64_le(&bytes[..7]).is_err());
}

#[test]
fn split_strips_ghosts_and_selects_equation() {
    let h = PatchHeader {
        grid_number: 1,
        level: 1,
        mx: 2,
        my: 1,
        xlow: 0.0,
        ylow: 0.0,
        dx: 1.0,
        dy: 1.0,
    };
    // nghost = 1 -> 4 x 3 padded cells, 2 equations.
    let mut values = vec![-1.0; 2 * 4 * 3];
    // interior cells (1,1) and (2,1)
    values[2 * (1 + 4)] = 7.0;
    values[2 * (1 + 4) + 1] = 70.0;
    values[2 * (2 + 4)] = 8.0;
    values[2 * (2 + 4) + 1] = 80.0;

    let eq0 = split_patches(&values, &[h], 2, 1, 0).unwrap();
    assert_eq!(eq0, vec![vec![7.0, 8.0]]);
    let eq1 = split_patches(&values, &[h], 2, 1, 1).unwrap();
    assert_eq!(eq1, vec![vec![70.0, 80.0]]);

    assert!(split_patches(&values[..10], &[h], 2, 1, 0).is_err());
    assert!(split_patches(&values, &[h], 2, 1, 2).is_err());
    let mut longer = values.clone();
    longer.push(0.0);
    assert!(split_patches(&longer, &[h], 2, 1, 0).is_err());
}

#[test]
fn reader_decodes_written_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut fine = FixturePatch::uniform(2, 2, 2, 2, 0.5, 0.0).at(1.0, 1.0);
    fine.depth = vec![1.0, 2.0, 3.0, 4.0];
    let patches = [FixturePatch::uniform(1, 1, 3, 2, 1.0, 0.25), fine];
    write_frame(dir.path(), 7, 3.5, &patches);

    let mut reader = ClawBinaryReader::new(dir.path()).with_aux(0);
    let frame = reader.read_frame(FrameIndex(7)).unwrap();

    assert_eq!(frame.index, FrameIndex(7));
    assert_eq!(frame.time, 3.5);
    assert_eq!(frame.patches.len(), 2);

    let coarse = &frame.patches[0];
    assert_eq!(coarse.level, Level(1));
    assert_eq!(coarse.dims, (3, 2));
    assert_eq!(coarse.field, vec![0.25; 6]);
    assert_eq!(coarse.aux.as_deref(), Some(&[10.0; 6][..]));

    let fine = &frame.patches[1];
    assert_eq!(fine.level, Level(2));
    assert_eq!(fine.lower, (1.0, 1.0));
    assert_eq!(fine.cell, CellSize { dx: 0.5, dy: 0.5 });
    assert_eq!(fine.field, vec![1.0, 2.0, 3.0, 4.0]);
    assert!(!fine.field.contains(&support::GHOST));
}

#[test]
fn reader_skips_aux_unless_requested() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), 0, 0.0, &[FixturePatch::uniform(1, 1, 1, 1, 1.0, 1.0)]);
    std::fs::remove_file(dir.path().join("fort.a0000")).unwrap();

    let frame = ClawBinaryReader::new(dir.path())
        .read_frame(FrameIndex(0))
        .unwrap();
    assert!(frame.patches[0].aux.is_none());

    let err = ClawBinaryReader::new(dir.path())
        .with_aux(0)
        .read_frame(FrameIndex(0))
        .unwrap_err();
    assert!(matches!(err, AmrError::Decode(_)));
}

#[test]
fn missing_or_truncated_frame_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut reader = ClawBinaryReader::new(dir.path());
    assert!(matches!(
        reader.read_frame(FrameIndex(0)),
        Err(AmrError::Decode(_))
    ));

    write_frame(dir.path(), 1, 0.0, &[FixturePatch::uniform(1, 1, 2, 2, 1.0, 1.0)]);
    let b = dir.path().join("fort.b0001");
    let bytes = std::fs::read(&b).unwrap();
    std::fs::write(&b, &bytes[..bytes.len() - 8]).unwrap();
    assert!(matches!(
        reader.read_frame(FrameIndex(1)),
        Err(AmrError::Decode(_))
    ));
}

#[test]
fn grid_count_mismatch_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), 0, 0.0, &[FixturePatch::uniform(1, 1, 1, 1, 1.0, 1.0)]);
    let t = dir.path().join("fort.t0000");
    let text = std::fs::read_to_string(&t).unwrap();
    let text = text.replace("     1                 ngrids", "     2                 ngrids");
    std::fs::write(&t, text).unwrap();

    let err = ClawBinaryReader::new(dir.path())
        .read_frame(FrameIndex(0))
        .unwrap_err();
    assert!(err.to_string().contains("announces 2 patches"));
}

#[test]
fn oversized_patch_dimensions_are_decode_errors() {
    let huge = PatchHeader {
        grid_number: 1,
        level: 1,
        mx: usize::MAX,
        my: 2,
        xlow: 0.0,
        ylow: 0.0,
        dx: 1.0,
        dy: 1.0,
    };
    let err = split_patches(&[0.0; 24], &[huge], 1, 2, 0).unwrap_err();
    assert!(err.contains("overflow"), "{err}");

    let wide = PatchHeader {
        mx: usize::MAX / 4,
        ..huge
    };
    assert!(split_patches(&[0.0; 24], &[wide], 3, 0, 0).is_err());
}

#[test]
fn corrupt_dimensions_in_checkpoint_fail_the_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), 0, 0.0, &[FixturePatch::uniform(1, 1, 2, 2, 1.0, 1.0)]);
    let q = dir.path().join("fort.q0000");
    let text = std::fs::read_to_string(&q).unwrap();
    let text = text.replace("     2                 mx", "18446744073709551615 mx");
    std::fs::write(&q, text).unwrap();

    let err = ClawBinaryReader::new(dir.path())
        .read_frame(FrameIndex(0))
        .unwrap_err();
    assert!(matches!(err, AmrError::Decode(_)));
    assert!(err.to_string().contains("overflow"), "{err}");
}

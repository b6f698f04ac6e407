use bunny_finder::{
    apply::apply_results,
    config::CollisionPolicy,
    detector::{Detection, DetectionResult},
};
use std::fs;
use std::path::{Path, PathBuf};

fn hit() -> DetectionResult {
    DetectionResult {
        has_bunny: true,
        detections: vec![Detection {
            confidence: 0.87,
            bbox: None,
            class_name: Some("bunny".into()),
        }],
        ..Default::default()
    }
}

fn miss() -> DetectionResult {
    DetectionResult::default()
}

fn write(p: &Path, bytes: &[u8]) -> PathBuf {
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, bytes).unwrap();
    p.to_path_buf()
}

fn out_names(out: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn copies_exactly_the_flagged_files() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let files = vec![
        write(&src.path().join("a.jpg"), b"aaa"),
        write(&src.path().join("b.jpg"), b"bbbb"),
        write(&src.path().join("c.png"), &[0u8, 1, 2, 255]),
    ];

    let applied = apply_results(
        &files,
        &[hit(), miss(), hit()],
        out.path(),
        CollisionPolicy::Overwrite,
    )
    .unwrap();

    assert_eq!(applied.positives(), 2);
    assert_eq!(applied.flagged, 2);
    assert_eq!(out_names(out.path()), vec!["a.jpg", "c.png"]);
    assert_eq!(fs::read(out.path().join("c.png")).unwrap(), vec![0u8, 1, 2, 255]);
    assert_eq!(fs::read(out.path().join("a.jpg")).unwrap(), b"aaa");
}

#[test]
fn length_mismatch_is_rejected() {
    let out = tempfile::tempdir().unwrap();
    let files = vec![PathBuf::from("x.jpg")];
    assert!(apply_results(&files, &[], out.path(), CollisionPolicy::Overwrite).is_err());
}

#[test]
fn overwrite_keeps_the_later_file() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let files = vec![
        write(&src.path().join("one/pic.jpg"), b"first"),
        write(&src.path().join("two/pic.jpg"), b"second"),
    ];

    let applied =
        apply_results(&files, &[hit(), hit()], out.path(), CollisionPolicy::Overwrite).unwrap();

    assert_eq!(applied.positives(), 2);
    assert_eq!(out_names(out.path()), vec!["pic.jpg"]);
    assert_eq!(fs::read(out.path().join("pic.jpg")).unwrap(), b"second");
}

#[test]
fn skip_keeps_the_earlier_file() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let files = vec![
        write(&src.path().join("one/pic.jpg"), b"first"),
        write(&src.path().join("two/pic.jpg"), b"second"),
    ];

    let applied =
        apply_results(&files, &[hit(), hit()], out.path(), CollisionPolicy::Skip).unwrap();

    assert_eq!(applied.positives(), 1);
    assert_eq!(applied.skipped, 1);
    assert_eq!(fs::read(out.path().join("pic.jpg")).unwrap(), b"first");
}

#[test]
fn rename_keeps_both_and_dedups_identical_content() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let files = vec![
        write(&src.path().join("one/pic.jpg"), b"first"),
        write(&src.path().join("two/pic.jpg"), b"second"),
        write(&src.path().join("three/pic.jpg"), b"first"),
    ];

    let applied = apply_results(
        &files,
        &[hit(), hit(), hit()],
        out.path(),
        CollisionPolicy::Rename,
    )
    .unwrap();

    assert_eq!(applied.positives(), 3);
    assert_eq!(out_names(out.path()), vec!["pic-1.jpg", "pic.jpg"]);
    assert_eq!(fs::read(out.path().join("pic.jpg")).unwrap(), b"first");
    assert_eq!(fs::read(out.path().join("pic-1.jpg")).unwrap(), b"second");
}

#[test]
fn copy_failure_is_not_counted_and_does_not_abort() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let files = vec![
        src.path().join("vanished.jpg"),
        write(&src.path().join("ok.jpg"), b"ok"),
    ];

    let applied =
        apply_results(&files, &[hit(), hit()], out.path(), CollisionPolicy::Overwrite).unwrap();

    assert_eq!(applied.flagged, 2);
    assert_eq!(applied.failed, 1);
    assert_eq!(applied.positives(), 1);
    assert_eq!(out_names(out.path()), vec!["ok.jpg"]);
}

#[test]
fn item_errors_count_as_negative() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let files = vec![write(&src.path().join("broken.jpg"), b"??")];
    let res = DetectionResult {
        error: Some("cannot identify image file".into()),
        ..Default::default()
    };

    let applied = apply_results(&files, &[res], out.path(), CollisionPolicy::Overwrite).unwrap();
    assert_eq!(applied.positives(), 0);
    assert!(out_names(out.path()).is_empty());
}

#[test]
fn copying_onto_the_source_leaves_it_intact() {
    let dir = tempfile::tempdir().unwrap();
    let pic = write(&dir.path().join("pic.jpg"), b"precious bytes");

    for policy in [
        CollisionPolicy::Overwrite,
        CollisionPolicy::Skip,
        CollisionPolicy::Rename,
    ] {
        let applied = apply_results(&[pic.clone()], &[hit()], dir.path(), policy).unwrap();
        assert_eq!(applied.positives(), 1);
        assert_eq!(applied.failed, 0);
        assert_eq!(fs::read(&pic).unwrap(), b"precious bytes");
        assert_eq!(out_names(dir.path()), vec!["pic.jpg"]);
    }
}

#[test]
fn rename_reuses_any_identical_numbered_copy() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let files = vec![
        write(&src.path().join("one/pic.jpg"), b"first"),
        write(&src.path().join("two/pic.jpg"), b"second"),
        write(&src.path().join("three/pic.jpg"), b"second"),
    ];

    let applied = apply_results(
        &files,
        &[hit(), hit(), hit()],
        out.path(),
        CollisionPolicy::Rename,
    )
    .unwrap();

    assert_eq!(applied.positives(), 3);
    assert_eq!(out_names(out.path()), vec!["pic-1.jpg", "pic.jpg"]);
    assert_eq!(applied.copied[2], out.path().join("pic-1.jpg"));
}

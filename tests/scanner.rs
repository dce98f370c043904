use inntinnsic::{CancelToken, PathFilter, ScanConfig, ScanEvent, TreeWalker};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn walker(config: &ScanConfig) -> TreeWalker {
    TreeWalker::new(PathFilter::new(config))
}

fn write_bytes(path: &Path, len: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![0xABu8; len]).unwrap();
}

fn find(roots: &[PathBuf], include_system: bool) -> (Vec<PathBuf>, Vec<ScanEvent>) {
    let mut events = Vec::new();
    let found = walker(&ScanConfig::default()).find_images(
        roots,
        include_system,
        &mut |e: ScanEvent| events.push(e),
        &CancelToken::new(),
    );
    (found, events)
}

#[test]
fn size_and_extension_limits_select_one_file() {
    let dir = tempdir().unwrap();
    let small = dir.path().join("small.png");
    write_bytes(&small, 10 * 1024);

    let huge = dir.path().join("huge.png");
    let file = File::create(&huge).unwrap();
    file.set_len(60 * 1024 * 1024).unwrap();
    drop(file);

    write_bytes(&dir.path().join("notes.txt"), 1024);

    let (found, _) = find(&[dir.path().to_path_buf()], false);
    assert_eq!(found, vec![small]);
}

#[test]
fn skip_names_apply_at_every_depth() {
    let dir = tempdir().unwrap();
    write_bytes(&dir.path().join("keep/photo.jpg"), 100);
    write_bytes(&dir.path().join("node_modules/pkg/logo.png"), 100);
    write_bytes(&dir.path().join("a/b/c/node_modules/icon.png"), 100);
    write_bytes(&dir.path().join("a/b/venv/lib/img.gif"), 100);
    write_bytes(&dir.path().join("a/b/c/deep.bmp"), 100);

    let (found, _) = find(&[dir.path().to_path_buf()], false);
    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["deep.bmp", "photo.jpg"]);

    let (with_system, _) = find(&[dir.path().to_path_buf()], true);
    assert_eq!(with_system.len(), 5);
}

#[test]
fn missing_root_does_not_stop_other_roots() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write_bytes(&first.path().join("one.png"), 100);
    write_bytes(&second.path().join("two.jpeg"), 100);
    let missing = first.path().join("gone");

    let (found, events) = find(
        &[
            first.path().to_path_buf(),
            missing.clone(),
            second.path().to_path_buf(),
        ],
        false,
    );
    assert_eq!(found.len(), 2);
    assert_eq!(events, vec![ScanEvent::PathNotFound { path: missing }]);
}

#[test]
fn cancelling_mid_walk_returns_partial_results() {
    let dir = tempdir().unwrap();
    for d in 0..4 {
        for f in 0..60 {
            write_bytes(&dir.path().join(format!("d{d}/f{f:02}.png")), 64);
        }
    }

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let mut events = Vec::new();
    let found = walker(&ScanConfig::default()).find_images(
        &[dir.path().to_path_buf()],
        false,
        &mut |e: ScanEvent| {
            if matches!(e, ScanEvent::Scanning { .. }) {
                trigger.cancel();
            }
            events.push(e);
        },
        &cancel,
    );

    assert_eq!(events.len(), 1);
    assert_eq!(events[0], ScanEvent::Scanning { found: 99, checked: 100 });
    // The 100th file was still checked before the cancellation was observed.
    assert_eq!(found.len(), 100);
    assert!(found.iter().all(|p| p.starts_with(dir.path())));
}

#[cfg(unix)]
#[test]
fn unreadable_directory_is_reported_and_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    write_bytes(&locked.join("inside.png"), 64);
    write_bytes(&dir.path().join("open/outside.png"), 64);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to assert in that case.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let (found, events) = find(&[dir.path().to_path_buf()], false);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("open/outside.png"));
    assert!(events
        .iter()
        .any(|e| matches!(e, ScanEvent::AccessDenied { path } if path.ends_with("locked"))));
}

use crate::models::scan_types::ScanEvent;
use crate::services::cancel::CancelToken;
use crate::services::progress::ProgressSink;
use crate::services::scanner::path_filter::{is_hidden, PathFilter};
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Running totals are reported every this many checked files.
const PROGRESS_EVERY: usize = 100;

/// Recursive image discovery over one or more roots.
///
/// Output order is depth-first. Inside a directory, files come before
/// subdirectories and both are visited in file-name order.
pub struct TreeWalker {
    filter: PathFilter,
}

#[derive(Default)]
struct WalkState {
    images: Vec<PathBuf>,
    found: usize,
    checked: usize,
}

impl TreeWalker {
    pub fn new(filter: PathFilter) -> Self {
        Self { filter }
    }

    /// Collect every candidate image under `roots`.
    ///
    /// Missing roots and unreadable directories are reported through `sink` and
    /// skipped. Cancellation stops the walk and returns what was collected so far.
    pub fn find_images<S>(
        &self,
        roots: &[PathBuf],
        include_system_dirs: bool,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Vec<PathBuf>
    where
        S: ProgressSink<ScanEvent> + ?Sized,
    {
        let mut state = WalkState::default();

        for root in roots {
            if cancel.is_cancelled() {
                break;
            }

            let meta = match std::fs::metadata(root) {
                Ok(meta) => meta,
                Err(e) => {
                    report_io_error(root, &e, sink);
                    continue;
                }
            };

            if meta.is_file() {
                if self.filter.is_valid_image(root) {
                    state.images.push(root.clone());
                    state.found += 1;
                    sink.report(ScanEvent::Found { found: state.found });
                }
            } else if meta.is_dir() {
                self.walk_directory(root, include_system_dirs, sink, cancel, &mut state);
            } else {
                warn!("Path does not exist: {}", root.display());
                sink.report(ScanEvent::PathNotFound { path: root.clone() });
            }
        }

        info!(
            "Found {} images (checked {} files){}",
            state.found,
            state.checked,
            if cancel.is_cancelled() { ", cancelled" } else { "" }
        );
        state.images
    }

    fn walk_directory<S>(
        &self,
        root: &Path,
        include_system_dirs: bool,
        sink: &mut S,
        cancel: &CancelToken,
        state: &mut WalkState,
    ) where
        S: ProgressSink<ScanEvent> + ?Sized,
    {
        let entries = WalkDir::new(root)
            .follow_links(false)
            .sort_by(files_first)
            .into_iter()
            .filter_entry(|entry| self.should_visit(entry, include_system_dirs));

        for item in entries {
            if cancel.is_cancelled() {
                return;
            }

            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    match err.io_error() {
                        Some(io) => report_io_error(&path, io, sink),
                        None => sink.report(ScanEvent::Error {
                            path,
                            message: err.to_string(),
                        }),
                    }
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            state.checked += 1;
            if state.checked % PROGRESS_EVERY == 0 {
                sink.report(ScanEvent::Scanning {
                    found: state.found,
                    checked: state.checked,
                });
            }

            if self.filter.is_valid_image(entry.path()) {
                state.images.push(entry.into_path());
                state.found += 1;
            }
        }
    }

    fn should_visit(&self, entry: &DirEntry, include_system_dirs: bool) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let skip = if include_system_dirs {
            is_hidden(entry.path())
        } else {
            self.filter.should_skip_directory(entry.path())
        };
        if skip {
            debug!("Skipping directory {}", entry.path().display());
        }
        !skip
    }
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn report_io_error<S>(path: &Path, err: &std::io::Error, sink: &mut S)
where
    S: ProgressSink<ScanEvent> + ?Sized,
{
    let path = path.to_path_buf();
    match err.kind() {
        ErrorKind::NotFound => {
            warn!("Path does not exist: {}", path.display());
            sink.report(ScanEvent::PathNotFound { path });
        }
        ErrorKind::PermissionDenied => {
            warn!("Cannot access directory {}: {}", path.display(), err);
            sink.report(ScanEvent::AccessDenied { path });
        }
        _ => {
            warn!("Error scanning {}: {}", path.display(), err);
            sink.report(ScanEvent::Error {
                path,
                message: err.to_string(),
            });
        }
    }
}

use crate::config::ScanConfig;
use log::debug;
use std::collections::HashSet;
use std::path::{Component, Path};

const HIDDEN_MARKER: char = '.';

/// Pure predicates deciding which directories are walked and which files are scanned.
#[derive(Debug, Clone)]
pub struct PathFilter {
    extensions: HashSet<String>,
    skip_names: HashSet<String>,
    max_file_size: u64,
    skip_hidden: bool,
}

impl PathFilter {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            extensions: config
                .image_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            skip_names: config
                .skip_directories
                .iter()
                .map(|n| n.to_lowercase())
                .collect(),
            max_file_size: config.max_file_size,
            skip_hidden: config.skip_hidden,
        }
    }

    fn is_skip_name(&self, name: &str) -> bool {
        self.skip_names.contains(&name.to_lowercase())
    }

    /// True when the directory is hidden, is itself a skip name, or sits below one.
    pub fn should_skip_directory(&self, dir: &Path) -> bool {
        if is_hidden(dir) {
            return true;
        }

        let name = bare_name(dir);
        if self.is_skip_name(&name) {
            return true;
        }

        dir.components().any(|component| match component {
            Component::Normal(segment) => self.is_skip_name(&segment.to_string_lossy()),
            _ => false,
        })
    }

    pub fn has_image_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Checks name, extension and size. Stat failures count as "not an image".
    pub fn is_valid_image(&self, file: &Path) -> bool {
        if !self.passes_name_checks(file) {
            return false;
        }
        match std::fs::metadata(file) {
            Ok(meta) => meta.is_file() && self.accepts_size(meta.len()),
            Err(e) => {
                debug!("Cannot access {}: {}", file.display(), e);
                false
            }
        }
    }

    /// Name and extension checks only; used when the size is already known.
    pub fn passes_name_checks(&self, file: &Path) -> bool {
        if self.skip_hidden && is_hidden(file) {
            return false;
        }
        self.has_image_extension(file)
    }

    pub fn accepts_size(&self, len: u64) -> bool {
        len > 0 && len <= self.max_file_size
    }
}

fn bare_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn is_hidden(path: &Path) -> bool {
    bare_name(path).starts_with(HIDDEN_MARKER)
}

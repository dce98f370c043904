//! Scan and detection settings shared by the walker, the detector and the CLI.
//!
//! Settings can be read from a JSON file; any field missing from the file keeps its default.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "Inntinnsic";

/// Default detection threshold. Raise it for fewer false positives.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"];

const FLAGGED_CATEGORIES: &[&str] = &[
    "ANUS_EXPOSED",
    "BUTTOCKS_EXPOSED",
    "FEMALE_BREAST_EXPOSED",
    "FEMALE_GENITALIA_EXPOSED",
    "MALE_GENITALIA_EXPOSED",
];

const STRICT_CATEGORIES: &[&str] = &[
    "ANUS_EXPOSED",
    "ANUS_COVERED",
    "BUTTOCKS_EXPOSED",
    "BUTTOCKS_COVERED",
    "FEMALE_BREAST_EXPOSED",
    "FEMALE_BREAST_COVERED",
    "FEMALE_GENITALIA_EXPOSED",
    "FEMALE_GENITALIA_COVERED",
    "MALE_GENITALIA_EXPOSED",
    "MALE_BREAST_EXPOSED",
];

/// Categories never used for flagging or shown in reports.
pub const SILENTLY_DISABLED_CATEGORIES: &[&str] =
    &["ARMPITS_EXPOSED", "BELLY_EXPOSED", "FACE_FEMALE", "FACE_MALE"];

const SKIP_DIRECTORIES: &[&str] = &[
    "$RECYCLE.BIN",
    "System Volume Information",
    "Windows",
    "Program Files",
    "Program Files (x86)",
    "ProgramData",
    "node_modules",
    ".git",
    ".venv",
    "venv",
];

fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum confidence (0.0 - 1.0) for a flagged category to flag an image.
    pub detection_threshold: f32,
    pub flagged_categories: BTreeSet<String>,
    /// Allowed extensions, without the leading dot. Matched case-insensitively.
    pub image_extensions: BTreeSet<String>,
    /// Directory names never descended into unless system directories are included.
    pub skip_directories: BTreeSet<String>,
    pub max_file_size: u64,
    pub skip_hidden: bool,
    pub model_path: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detection_threshold: DEFAULT_THRESHOLD,
            flagged_categories: to_set(FLAGGED_CATEGORIES),
            image_extensions: to_set(IMAGE_EXTENSIONS),
            skip_directories: to_set(SKIP_DIRECTORIES),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            skip_hidden: true,
            model_path: None,
        }
    }
}

impl ScanConfig {
    /// Load settings from a JSON file. Missing fields fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::InvalidConfig(format!(
                "failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: ScanConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            return Err(AppError::InvalidConfig(format!(
                "detection threshold must be within [0, 1], got {}",
                self.detection_threshold
            )));
        }
        if self.max_file_size == 0 {
            return Err(AppError::InvalidConfig(
                "max_file_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// The broader category preset that also flags covered body parts.
    pub fn strict_categories() -> BTreeSet<String> {
        to_set(STRICT_CATEGORIES)
    }

    /// Resolved model location: the configured path or the per-user default.
    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path.clone().unwrap_or_else(default_model_path)
    }
}

/// Directory for application data (`<local data dir>/Inntinnsic`).
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn default_model_path() -> PathBuf {
    app_data_dir().join("nudenet.onnx")
}

/// Browser caches below the local data dir (Windows layout).
const LOCAL_BROWSER_CACHES: &[&str] = &[
    "Google/Chrome/User Data/Default/Cache",
    "Google/Chrome/User Data/Default/Cache/Cache_Data",
    "Microsoft/Edge/User Data/Default/Cache",
    "Microsoft/Edge/User Data/Default/Cache/Cache_Data",
    "BraveSoftware/Brave-Browser/User Data/Default/Cache",
    "Opera Software/Opera Stable/Cache",
];

/// Browser profiles below the roaming data dir.
const ROAMING_BROWSER_CACHES: &[&str] = &["Mozilla/Firefox/Profiles"];

/// Browser caches below the user cache dir (XDG and macOS layouts).
const XDG_BROWSER_CACHES: &[&str] = &[
    "google-chrome/Default/Cache",
    "microsoft-edge/Default/Cache",
    "BraveSoftware/Brave-Browser/Default/Cache",
    "mozilla/firefox",
    "opera/Cache",
];

const LOCAL_APP_LOCATIONS: &[&str] = &["Packages", "Microsoft/Windows/INetCache"];

/// Base directories that the common scan locations are resolved against.
#[derive(Debug, Clone, Default)]
pub struct LocationBases {
    pub user_folders: Vec<PathBuf>,
    pub cache: Option<PathBuf>,
    pub data_local: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub temp: Vec<PathBuf>,
}

impl LocationBases {
    /// Bases for the current user and platform.
    pub fn current() -> Self {
        let mut temp = vec![std::env::temp_dir()];
        if cfg!(windows) {
            let system_root = std::env::var_os("SystemRoot")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("C:/Windows"));
            temp.push(system_root.join("Temp"));
        }

        Self {
            user_folders: [
                dirs::download_dir(),
                dirs::picture_dir(),
                dirs::document_dir(),
                dirs::desktop_dir(),
                dirs::video_dir(),
            ]
            .into_iter()
            .flatten()
            .collect(),
            cache: dirs::cache_dir(),
            data_local: dirs::data_local_dir(),
            data: dirs::data_dir(),
            temp,
        }
    }
}

fn under(base: Option<&Path>, relative: &[&str]) -> Vec<PathBuf> {
    base.map(|base| relative.iter().map(|rel| base.join(rel)).collect::<Vec<_>>())
        .unwrap_or_default()
}

/// Keeps existing directories, dropping any that sit inside another kept one.
fn existing_roots(candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    let present: Vec<PathBuf> = candidates.into_iter().filter(|p| p.is_dir()).collect();
    let mut roots: Vec<PathBuf> = Vec::with_capacity(present.len());
    for path in &present {
        let nested = present
            .iter()
            .any(|other| other != path && path.starts_with(other));
        if !nested && !roots.contains(path) {
            roots.push(path.clone());
        }
    }
    roots
}

/// Well-known folders that commonly hold images, grouped by label.
/// Only folders that exist on this machine are returned; empty groups are omitted.
pub fn common_locations() -> BTreeMap<&'static str, Vec<PathBuf>> {
    common_locations_in(&LocationBases::current())
}

pub fn common_locations_in(bases: &LocationBases) -> BTreeMap<&'static str, Vec<PathBuf>> {
    let mut browser = under(bases.data_local.as_deref(), LOCAL_BROWSER_CACHES);
    browser.extend(under(bases.data.as_deref(), ROAMING_BROWSER_CACHES));
    browser.extend(under(bases.cache.as_deref(), XDG_BROWSER_CACHES));

    let groups = [
        ("User Folders", bases.user_folders.clone()),
        ("Browser Caches", browser),
        ("System Temp", bases.temp.clone()),
        (
            "Common App Locations",
            under(bases.data_local.as_deref(), LOCAL_APP_LOCATIONS),
        ),
    ];

    groups
        .into_iter()
        .map(|(label, candidates)| (label, existing_roots(candidates)))
        .filter(|(_, paths)| !paths.is_empty())
        .collect()
}

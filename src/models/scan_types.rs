use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Events reported by the tree walker while discovering images.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanEvent {
    /// A root given directly as a file was accepted.
    Found { found: usize },
    /// Periodic running totals.
    Scanning { found: usize, checked: usize },
    PathNotFound { path: PathBuf },
    AccessDenied { path: PathBuf },
    Error { path: PathBuf, message: String },
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::Found { found } => write!(f, "Found: {} images", found),
            ScanEvent::Scanning { found, checked } => write!(
                f,
                "Scanning... Found: {} images (checked {} files)",
                found, checked
            ),
            ScanEvent::PathNotFound { path } => write!(f, "Path not found: {}", path.display()),
            ScanEvent::AccessDenied { path } => write!(f, "Access denied: {}", path.display()),
            ScanEvent::Error { path, message } => {
                write!(f, "Error scanning {}: {}", path.display(), message)
            }
        }
    }
}

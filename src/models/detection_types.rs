use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Axis-aligned box `[x, y, w, h]` in model-input pixel space (320x320).
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds a box from a `[x, y, w, h]` slice; `None` when fewer than four values are given.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        match values {
            [x, y, w, h, ..] => Some(Self::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Detection {
    pub category: String,
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
}

impl Detection {
    /// True when this detection alone would flag an image.
    pub fn is_flagging(&self, flagged: &BTreeSet<String>, threshold: f32) -> bool {
        self.confidence >= threshold && flagged.contains(&self.category)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct DetectionResult {
    pub file_path: PathBuf,
    pub is_flagged: bool,
    pub detections: Vec<Detection>,
    pub scanned_at: DateTime<Local>,
    pub error_message: Option<String>,
}

impl DetectionResult {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            is_flagged: false,
            detections: Vec::new(),
            scanned_at: Local::now(),
            error_message: None,
        }
    }

    pub fn failed(file_path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::new(file_path)
        }
    }

    /// Attaches detections and derives `is_flagged` from them.
    pub fn with_detections(
        mut self,
        detections: Vec<Detection>,
        flagged: &BTreeSet<String>,
        threshold: f32,
    ) -> Self {
        self.is_flagged = detections.iter().any(|d| d.is_flagging(flagged, threshold));
        self.detections = detections;
        self
    }

    pub fn flagging_detections<'a>(
        &'a self,
        flagged: &'a BTreeSet<String>,
        threshold: f32,
    ) -> impl Iterator<Item = &'a Detection> + 'a {
        self.detections
            .iter()
            .filter(move |d| d.is_flagging(flagged, threshold))
    }
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct ScanProgress {
    pub current_index: usize,
    pub total_files: usize,
    pub current_file: Option<String>,
    pub flagged_count: usize,
}

impl ScanProgress {
    pub fn progress_percentage(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.current_index as f64 / self.total_files as f64 * 100.0
        }
    }
}

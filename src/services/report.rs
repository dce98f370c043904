//! Scan summaries and exported result reports.

use crate::config::{APP_NAME, SILENTLY_DISABLED_CATEGORIES};
use crate::error::AppError;
use crate::models::detection_types::DetectionResult;
use crate::services::detector::labels::display_name;
use chrono::Local;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct ScanSummary {
    pub total_scanned: usize,
    pub flagged: usize,
    pub clean: usize,
    pub errors: usize,
    /// Flagging detections per category, across flagged images.
    pub categories: BTreeMap<String, usize>,
}

impl ScanSummary {
    pub fn from_results(
        results: &[DetectionResult],
        flagged_categories: &BTreeSet<String>,
        threshold: f32,
    ) -> Self {
        let mut summary = ScanSummary {
            total_scanned: results.len(),
            ..Default::default()
        };

        for result in results {
            if result.error_message.is_some() {
                summary.errors += 1;
            }
            if result.is_flagged {
                summary.flagged += 1;
                for detection in result.flagging_detections(flagged_categories, threshold) {
                    *summary
                        .categories
                        .entry(detection.category.clone())
                        .or_insert(0) += 1;
                }
            }
        }

        summary.clean = summary
            .total_scanned
            .saturating_sub(summary.flagged)
            .saturating_sub(summary.errors);
        summary
    }
}

/// Write a human-readable report listing flagged files and their qualifying detections.
pub fn write_text_report(
    path: &Path,
    results: &[DetectionResult],
    flagged_categories: &BTreeSet<String>,
    threshold: f32,
) -> Result<(), AppError> {
    let mut out = BufWriter::new(File::create(path)?);
    render_text_report(&mut out, results, flagged_categories, threshold)?;
    out.flush()?;
    Ok(())
}

pub fn render_text_report<W: Write>(
    out: &mut W,
    results: &[DetectionResult],
    flagged_categories: &BTreeSet<String>,
    threshold: f32,
) -> Result<(), AppError> {
    writeln!(out, "{} - Scan Results", APP_NAME)?;
    writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "{}", "=".repeat(80))?;
    writeln!(out)?;

    for result in results.iter().filter(|r| r.is_flagged) {
        writeln!(out, "\nFile: {}", result.file_path.display())?;
        for detection in result
            .flagging_detections(flagged_categories, threshold)
            .filter(|d| !SILENTLY_DISABLED_CATEGORIES.contains(&d.category.as_str()))
        {
            writeln!(
                out,
                "  - {}: {:.1}% confidence",
                display_name(&detection.category),
                detection.confidence * 100.0
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Write every result, including clean and failed ones, as pretty-printed JSON.
pub fn write_json_report(path: &Path, results: &[DetectionResult]) -> Result<(), AppError> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, results)?;
    out.flush()?;
    Ok(())
}

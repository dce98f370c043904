use crate::models::detection_types::{DetectionResult, ScanProgress};
use crate::services::cancel::CancelToken;
use crate::services::detector::image_detector::Detector;
use crate::services::detector::model::InferenceBackend;
use crate::services::progress::ProgressSink;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

/// Drives a [`Detector`] over a list of files, one at a time.
pub struct BatchPipeline<B: InferenceBackend> {
    detector: Detector<B>,
}

impl<B: InferenceBackend> BatchPipeline<B> {
    pub fn new(detector: Detector<B>) -> Self {
        Self { detector }
    }

    pub fn into_detector(self) -> Detector<B> {
        self.detector
    }

    /// Analyze `paths` in order, reporting progress after every file.
    ///
    /// Per-file failures are captured in each result. Cancellation is checked
    /// before each file and ends the run early with the results produced so far.
    pub fn run<S>(
        &mut self,
        paths: &[PathBuf],
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Vec<DetectionResult>
    where
        S: ProgressSink<ScanProgress> + ?Sized,
    {
        let total = paths.len();
        let start = Instant::now();
        let mut results = Vec::with_capacity(total);
        let mut flagged_count = 0;

        for (i, path) in paths.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Scan cancelled after {} of {} files", i, total);
                break;
            }

            let result = self.detector.analyze(path);
            if result.is_flagged {
                flagged_count += 1;
            }
            results.push(result);

            sink.report(ScanProgress {
                current_index: i + 1,
                total_files: total,
                current_file: Some(path.to_string_lossy().into_owned()),
                flagged_count,
            });
        }

        info!(
            "Analyzed {} images in {:.2?} ({} flagged)",
            results.len(),
            start.elapsed(),
            flagged_count
        );
        results
    }
}

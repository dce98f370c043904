use crate::config::ScanConfig;
use crate::error::AppError;
use crate::models::detection_types::{Detection, DetectionResult};
use crate::services::detector::model::InferenceBackend;
use crate::services::detector::tensor_codec::{self, INPUT_SIZE};
use image::{DynamicImage, ImageReader};
use log::{error, info};
use std::collections::BTreeSet;
use std::path::Path;

/// Classifies single images with an owned inference backend.
pub struct Detector<B: InferenceBackend> {
    backend: B,
    threshold: f32,
    flagged_categories: BTreeSet<String>,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, threshold: f32, flagged_categories: BTreeSet<String>) -> Self {
        Self {
            backend,
            threshold,
            flagged_categories,
        }
    }

    pub fn from_config(backend: B, config: &ScanConfig) -> Self {
        Self::new(
            backend,
            config.detection_threshold,
            config.flagged_categories.clone(),
        )
    }

    /// Give back the backend, e.g. to release the model explicitly.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Analyze one image. Failures are recorded in `error_message`, never returned.
    pub fn analyze(&mut self, path: &Path) -> DetectionResult {
        let file_path = path.to_path_buf();

        if !path.is_file() {
            return DetectionResult::failed(file_path, "File not found");
        }

        let img = match load_image(path) {
            Ok(img) => img,
            Err(_) => return DetectionResult::failed(file_path, "Invalid image file"),
        };

        match self.detect(&img) {
            Ok(detections) => {
                let result = DetectionResult::new(file_path).with_detections(
                    detections,
                    &self.flagged_categories,
                    self.threshold,
                );
                if result.is_flagged {
                    let summary: Vec<String> = result
                        .flagging_detections(&self.flagged_categories, self.threshold)
                        .map(|d| format!("{}({:.3})", d.category, d.confidence))
                        .collect();
                    info!("FLAGGED: {} - {}", path.display(), summary.join(", "));
                }
                result
            }
            Err(e) => {
                error!("ERROR analyzing {}: {}", path.display(), e);
                DetectionResult::failed(file_path, e.to_string())
            }
        }
    }

    /// Encode, infer and decode an already decoded image.
    pub fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>, AppError> {
        let tensor = tensor_codec::encode_image(img, INPUT_SIZE)?;
        let outputs = self.backend.run(tensor)?;
        Ok(tensor_codec::decode_outputs(&outputs, self.threshold))
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, AppError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detector::tensor_codec::NamedTensor;
    use ndarray::Array4;
    use std::fs;
    use tempfile::tempdir;

    struct FixedBackend {
        outputs: Vec<NamedTensor>,
        calls: usize,
    }

    impl InferenceBackend for FixedBackend {
        fn run(&mut self, input: Array4<f32>) -> Result<Vec<NamedTensor>, AppError> {
            assert_eq!(input.shape(), &[1, 3, 320, 320]);
            self.calls += 1;
            Ok(self.outputs.clone())
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn run(&mut self, _input: Array4<f32>) -> Result<Vec<NamedTensor>, AppError> {
            Err(AppError::Inference("device lost".into()))
        }
    }

    fn separate(score: f32, label: i64) -> Vec<NamedTensor> {
        vec![
            NamedTensor::f32("boxes", vec![1, 4], vec![1.0, 2.0, 3.0, 4.0]),
            NamedTensor::f32("scores", vec![1], vec![score]),
            NamedTensor::i64("labels", vec![1], vec![label]),
        ]
    }

    fn write_png(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        image::RgbImage::new(16, 16).save(&path).unwrap();
        path
    }

    fn detector<B: InferenceBackend>(backend: B) -> Detector<B> {
        Detector::from_config(backend, &ScanConfig::default())
    }

    #[test]
    fn missing_file_is_reported() {
        let mut d = detector(FixedBackend { outputs: Vec::new(), calls: 0 });
        let result = d.analyze(Path::new("/no/such/image.png"));
        assert_eq!(result.error_message.as_deref(), Some("File not found"));
        assert_eq!(d.into_backend().calls, 0);
    }

    #[test]
    fn undecodable_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();

        let mut d = detector(FixedBackend { outputs: Vec::new(), calls: 0 });
        let result = d.analyze(&path);
        assert_eq!(result.error_message.as_deref(), Some("Invalid image file"));
        assert!(!result.is_flagged);
    }

    #[test]
    fn flags_listed_category_above_threshold() {
        let dir = tempdir().unwrap();
        let path = write_png(dir.path(), "a.png");

        let mut d = detector(FixedBackend { outputs: separate(0.9, 2), calls: 0 });
        let result = d.analyze(&path);
        assert!(result.error_message.is_none());
        assert!(result.is_flagged);
        assert_eq!(result.detections[0].category, "BUTTOCKS_EXPOSED");
    }

    #[test]
    fn keeps_sub_threshold_detection_without_flagging() {
        let dir = tempdir().unwrap();
        let path = write_png(dir.path(), "a.png");

        // 0.4 passes the 0.3 intake but not the 0.6 flag threshold.
        let mut d = detector(FixedBackend { outputs: separate(0.4, 2), calls: 0 });
        let result = d.analyze(&path);
        assert!(!result.is_flagged);
        assert_eq!(result.detections.len(), 1);
    }

    #[test]
    fn inference_errors_become_result_messages() {
        let dir = tempdir().unwrap();
        let path = write_png(dir.path(), "a.png");

        let mut d = detector(FailingBackend);
        let result = d.analyze(&path);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Inference failed: device lost")
        );
    }

    #[test]
    fn malformed_output_yields_clean_result() {
        let dir = tempdir().unwrap();
        let path = write_png(dir.path(), "a.png");
        let outputs = vec![NamedTensor::f32("output0", vec![1, 20, 100], vec![0.9; 2000])];

        let mut d = detector(FixedBackend { outputs, calls: 0 });
        let result = d.analyze(&path);
        assert!(result.error_message.is_none());
        assert!(result.detections.is_empty());
        assert!(!result.is_flagged);
    }
}

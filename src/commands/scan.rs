use crate::config::ScanConfig;
use crate::error::AppError;
use crate::models::detection_types::{DetectionResult, ScanProgress};
use crate::models::scan_types::ScanEvent;
use crate::services::cancel::CancelToken;
use crate::services::detector::image_detector::Detector;
use crate::services::detector::model::{InferenceBackend, OnnxModel};
use crate::services::detector::pipeline::BatchPipeline;
use crate::services::report::ScanSummary;
use crate::services::scanner::path_filter::PathFilter;
use crate::services::scanner::walker::TreeWalker;
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub roots: Vec<PathBuf>,
    pub include_system_dirs: bool,
    pub config: ScanConfig,
}

#[derive(Debug, Serialize, Clone)]
pub struct ScanOutcome {
    pub images_found: usize,
    pub results: Vec<DetectionResult>,
    pub summary: ScanSummary,
    pub cancelled: bool,
}

fn join_error(e: tokio::task::JoinError) -> AppError {
    AppError::Message(format!("Task join failed: {}", e))
}

/// Load the ONNX model on a blocking thread. A missing model file is a fatal precondition.
pub async fn load_model(config: &ScanConfig) -> Result<OnnxModel, AppError> {
    let model_path = config.resolved_model_path();
    tokio::task::spawn_blocking(move || OnnxModel::load(&model_path))
        .await
        .map_err(join_error)?
}

/// Discover images on a blocking thread, forwarding walker events to `events`.
pub async fn find_images_async(
    roots: Vec<PathBuf>,
    include_system_dirs: bool,
    config: ScanConfig,
    events: UnboundedSender<ScanEvent>,
    cancel: CancelToken,
) -> Result<Vec<PathBuf>, AppError> {
    tokio::task::spawn_blocking(move || {
        let walker = TreeWalker::new(PathFilter::new(&config));
        walker.find_images(
            &roots,
            include_system_dirs,
            &mut |event: ScanEvent| {
                let _ = events.send(event);
            },
            &cancel,
        )
    })
    .await
    .map_err(join_error)
}

/// Walk the roots and analyze every image found, all on one blocking thread.
///
/// The backend is consumed and dropped before this returns, whether the scan
/// completed or was cancelled.
pub async fn run_scan<B>(
    request: ScanRequest,
    backend: B,
    events: UnboundedSender<ScanEvent>,
    progress: UnboundedSender<ScanProgress>,
    cancel: CancelToken,
) -> Result<ScanOutcome, AppError>
where
    B: InferenceBackend + Send + 'static,
{
    request.config.validate()?;

    tokio::task::spawn_blocking(move || {
        let ScanRequest {
            roots,
            include_system_dirs,
            config,
        } = request;

        let walker = TreeWalker::new(PathFilter::new(&config));
        let images = walker.find_images(
            &roots,
            include_system_dirs,
            &mut |event: ScanEvent| {
                let _ = events.send(event);
            },
            &cancel,
        );
        info!("Found {} images. Analyzing...", images.len());

        let mut pipeline = BatchPipeline::new(Detector::from_config(backend, &config));
        let results = pipeline.run(
            &images,
            &mut |step: ScanProgress| {
                let _ = progress.send(step);
            },
            &cancel,
        );
        pipeline.into_detector().into_backend().release();

        let summary = ScanSummary::from_results(
            &results,
            &config.flagged_categories,
            config.detection_threshold,
        );
        ScanOutcome {
            images_found: images.len(),
            results,
            summary,
            cancelled: cancel.is_cancelled(),
        }
    })
    .await
    .map_err(join_error)
}

//! Image safety scanner.
//!
//! Finds image files under a set of roots and classifies each one with an
//! 18-class ONNX body-part detector, flagging images that contain configured
//! categories above a confidence threshold.
//!
//! The pipeline is sequential: [`TreeWalker`] discovers candidates,
//! [`BatchPipeline`] runs the [`Detector`] on each, one file at a time.
//! [`commands::scan`] moves that work onto a blocking thread for async callers.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

use log::LevelFilter;

pub use config::ScanConfig;
pub use error::AppError;
pub use models::detection_types::{BoundingBox, Detection, DetectionResult, ScanProgress};
pub use models::scan_types::ScanEvent;
pub use services::cancel::CancelToken;
pub use services::detector::image_detector::Detector;
pub use services::detector::model::{InferenceBackend, OnnxModel};
pub use services::detector::pipeline::BatchPipeline;
pub use services::progress::ProgressSink;
pub use services::report::ScanSummary;
pub use services::scanner::path_filter::PathFilter;
pub use services::scanner::walker::TreeWalker;

/// Initialize logging. `RUST_LOG` wins over `default_filter` when set.
///
/// Calling it again is harmless; the first logger stays installed.
pub fn init_logging(default_filter: LevelFilter) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.format_timestamp_millis();

    if let Err(e) = builder.try_init() {
        log::debug!("Logger already initialized: {}", e);
    }
}

use crate::error::AppError;
use crate::services::detector::tensor_codec::NamedTensor;
use log::{debug, info};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};

/// Runs one forward pass over a `[1, 3, H, W]` input and returns every named output.
///
/// Implementations are not assumed to be safe for concurrent use; the detector
/// calls them one image at a time.
pub trait InferenceBackend {
    fn run(&mut self, input: Array4<f32>) -> Result<Vec<NamedTensor>, AppError>;

    /// Free whatever the backend holds. Dropping the backend has the same effect.
    fn release(self)
    where
        Self: Sized,
    {
    }
}

/// An ONNX Runtime session for the body-part detector.
///
/// The session is released when the model is dropped, so every exit path of a
/// scan (completion, cancellation, failure) frees it.
pub struct OnnxModel {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
    path: PathBuf,
}

impl OnnxModel {
    /// Load the model from `path`. A missing file is reported as [`AppError::ModelNotFound`].
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.is_file() {
            return Err(AppError::ModelNotFound(path.to_path_buf()));
        }

        let _ = ort::init().with_name("inntinnsic").commit();

        let session = Session::builder()
            .map_err(|e| AppError::Inference(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::Inference(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| AppError::Inference(format!("Failed to set intra threads: {}", e)))?
            .with_execution_providers([
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| {
                AppError::Inference(format!("Failed to register CPU execution provider: {}", e))
            })?
            .commit_from_file(path)
            .map_err(|e| AppError::Inference(format!("Failed to load ONNX model: {}", e)))?;

        // The input name differs between exports, so it is read from the model itself.
        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| AppError::Inference("Model declares no inputs".into()))?;
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();

        info!(
            "Loaded model {} (input: {}, outputs: {})",
            path.display(),
            input_name,
            output_names.join(", ")
        );

        Ok(Self {
            session,
            input_name,
            output_names,
            path: path.to_path_buf(),
        })
    }
}

impl InferenceBackend for OnnxModel {
    fn run(&mut self, input: Array4<f32>) -> Result<Vec<NamedTensor>, AppError> {
        let input_tensor = Value::from_array(input)
            .map_err(|e| AppError::Inference(format!("Failed to create tensor value: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| AppError::Inference(format!("Inference failed: {}", e)))?;

        let mut tensors = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let Some(value) = outputs.get(name.as_str()) else {
                continue;
            };

            let tensor = if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                NamedTensor::f32(name.as_str(), to_dims(shape.iter()), data.to_vec())
            } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
                NamedTensor::i64(name.as_str(), to_dims(shape.iter()), data.to_vec())
            } else {
                debug!("Skipping output '{}' with unsupported element type", name);
                continue;
            };

            debug!("Model output {}{:?}", tensor.name, tensor.shape);
            tensors.push(tensor);
        }

        Ok(tensors)
    }

    fn release(self) {
        info!("Releasing model {}", self.path.display());
    }
}

impl Drop for OnnxModel {
    fn drop(&mut self) {
        debug!("Releasing model session {}", self.path.display());
    }
}

fn to_dims<'a>(shape: impl Iterator<Item = &'a i64>) -> Vec<usize> {
    shape.map(|&d| usize::try_from(d).unwrap_or(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_a_precondition_error() {
        let err = OnnxModel::load(Path::new("/definitely/not/here/nudenet.onnx"))
            .err()
            .expect("loading a missing model must fail");
        assert!(matches!(err, AppError::ModelNotFound(_)));
    }

    #[test]
    fn negative_dims_clamp_to_zero() {
        assert_eq!(to_dims([1i64, -1, 22].iter()), vec![1, 0, 22]);
    }
}

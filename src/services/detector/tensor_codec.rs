use crate::error::AppError;
use crate::models::detection_types::{BoundingBox, Detection};
use crate::services::detector::labels::{category_for_index, NUM_CLASSES};
use crate::services::detector::nms;
use image::DynamicImage;
use log::{debug, warn};
use ndarray::Array4;

/// Model input resolution (square).
pub const INPUT_SIZE: u32 = 320;

/// Rows per anchor in the combined layout: 4 box coordinates + one score per class.
pub const COMBINED_ROWS: usize = 4 + NUM_CLASSES;

pub const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Intake factor for the separate layout, whose producer already deduplicated.
pub const SEPARATE_INTAKE_FACTOR: f32 = 0.5;

/// Looser intake factor for the combined layout, which is deduplicated here.
pub const COMBINED_INTAKE_FACTOR: f32 = 0.3;

/// Stretch-resize to `size`x`size` and lay out as a `[1, 3, size, size]` RGB tensor in `[0, 1]`.
pub fn encode_image(img: &DynamicImage, size: u32) -> Result<Array4<f32>, AppError> {
    let resized = img.resize_exact(size, size, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let hw = (size * size) as usize;
    let mut data = vec![0f32; 3 * hw];
    for (i, pixel) in rgb.as_raw().chunks_exact(3).enumerate() {
        data[i] = pixel[0] as f32 / 255.0;
        data[hw + i] = pixel[1] as f32 / 255.0;
        data[2 * hw + i] = pixel[2] as f32 / 255.0;
    }

    Array4::from_shape_vec((1, 3, size as usize, size as usize), data)
        .map_err(|e| AppError::Inference(format!("Failed to create tensor: {}", e)))
}

#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    I64(Vec<i64>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(v) => v.len(),
            TensorData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_f32(&self, index: usize) -> Option<f32> {
        match self {
            TensorData::F32(v) => v.get(index).copied(),
            TensorData::I64(v) => v.get(index).map(|&x| x as f32),
        }
    }

    /// Integer view; float values are truncated toward zero.
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        match self {
            TensorData::F32(v) => v.get(index).map(|&x| x as i64),
            TensorData::I64(v) => v.get(index).copied(),
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            TensorData::F32(v) => Some(v),
            TensorData::I64(_) => None,
        }
    }
}

/// One named output of an inference call, copied out of the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: TensorData,
}

impl NamedTensor {
    pub fn f32(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            shape,
            data: TensorData::F32(data),
        }
    }

    pub fn i64(name: impl Into<String>, shape: Vec<usize>, data: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            shape,
            data: TensorData::I64(data),
        }
    }
}

/// The two raw output conventions the detector understands.
#[derive(Debug, Clone, Copy)]
pub enum OutputLayout<'a> {
    /// `boxes [N,4]`, `scores [N]`, `labels [N]` as separate outputs.
    Separate {
        boxes: &'a NamedTensor,
        scores: &'a NamedTensor,
        labels: &'a NamedTensor,
    },
    /// A single `[1, 22, P]` tensor with one column per anchor.
    Combined(&'a NamedTensor),
}

impl<'a> OutputLayout<'a> {
    /// Separate when `boxes`, `scores` and `labels` are all present, otherwise the first output.
    pub fn select(outputs: &'a [NamedTensor]) -> Option<Self> {
        let find = |name: &str| outputs.iter().find(|t| t.name == name);
        match (find("boxes"), find("scores"), find("labels")) {
            (Some(boxes), Some(scores), Some(labels)) => Some(OutputLayout::Separate {
                boxes,
                scores,
                labels,
            }),
            _ => outputs.first().map(OutputLayout::Combined),
        }
    }

    pub fn decode(self, threshold: f32) -> Vec<Detection> {
        match self {
            OutputLayout::Separate {
                boxes,
                scores,
                labels,
            } => decode_separate(boxes, scores, labels, threshold),
            OutputLayout::Combined(tensor) => decode_combined(tensor, threshold),
        }
    }
}

/// Decode raw model outputs into detections. Never fails: unusable outputs yield no detections.
pub fn decode_outputs(outputs: &[NamedTensor], threshold: f32) -> Vec<Detection> {
    match OutputLayout::select(outputs) {
        Some(layout) => layout.decode(threshold),
        None => {
            warn!("Model produced no outputs");
            Vec::new()
        }
    }
}

pub fn decode_separate(
    boxes: &NamedTensor,
    scores: &NamedTensor,
    labels: &NamedTensor,
    threshold: f32,
) -> Vec<Detection> {
    let intake = threshold * SEPARATE_INTAKE_FACTOR;
    let count = scores.data.len();
    debug!("Processing {} raw detections from model", count);

    let mut detections = Vec::new();
    for i in 0..count {
        let Some(score) = scores.data.get_f32(i) else {
            continue;
        };
        if score < intake {
            continue;
        }
        let Some(label) = labels.data.get_i64(i) else {
            warn!("labels output is shorter than scores ({} < {})", labels.data.len(), count);
            break;
        };

        let bounding_box = boxes
            .data
            .as_f32()
            .and_then(|b| b.get(i * 4..i * 4 + 4))
            .and_then(BoundingBox::from_slice);

        detections.push(Detection {
            category: category_for_index(label).into_owned(),
            confidence: score,
            bounding_box,
        });
    }

    debug!("Returned {} detections after filtering", detections.len());
    detections
}

pub fn decode_combined(tensor: &NamedTensor, threshold: f32) -> Vec<Detection> {
    let anchors = match tensor.shape.as_slice() {
        [1, rows, anchors] if *rows == COMBINED_ROWS => *anchors,
        other => {
            warn!(
                "Unexpected tensor shape for '{}'. Expected [1, {}, N], got {:?}",
                tensor.name, COMBINED_ROWS, other
            );
            return Vec::new();
        }
    };

    let Some(data) = tensor.data.as_f32() else {
        warn!("Combined output '{}' is not a float tensor", tensor.name);
        return Vec::new();
    };
    if data.len() < COMBINED_ROWS * anchors {
        warn!(
            "Combined output '{}' holds {} values, expected {}",
            tensor.name,
            data.len(),
            COMBINED_ROWS * anchors
        );
        return Vec::new();
    }

    let at = |row: usize, anchor: usize| data[row * anchors + anchor];
    let intake = threshold * COMBINED_INTAKE_FACTOR;

    let mut detections = Vec::new();
    for j in 0..anchors {
        let mut max_score = 0f32;
        let mut max_index: i64 = -1;
        for class in 0..NUM_CLASSES {
            let score = at(4 + class, j);
            if score > max_score {
                max_score = score;
                max_index = class as i64;
            }
        }

        if max_score < intake {
            continue;
        }

        detections.push(Detection {
            category: category_for_index(max_index).into_owned(),
            confidence: max_score,
            bounding_box: Some(BoundingBox::new(at(0, j), at(1, j), at(2, j), at(3, j))),
        });
    }

    debug!(
        "Found {} detections above threshold {:.3}",
        detections.len(),
        intake
    );
    let detections = nms::suppress(detections, NMS_IOU_THRESHOLD);
    debug!("After NMS: {} detections remaining", detections.len());
    detections
}

use crate::models::detection_types::{BoundingBox, Detection};
use std::cmp::Ordering;

/// Intersection over union of two `[x, y, w, h]` boxes.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = (a.x + a.width).min(b.x + b.width);
    let bottom = (a.y + a.height).min(b.y + b.height);

    if right < left || bottom < top {
        return 0.0;
    }

    let intersection = (right - left) * (bottom - top);
    let union = a.area() + b.area() - intersection;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Greedy class-agnostic non-maximum suppression.
///
/// Detections are taken in descending confidence order; each one is kept unless
/// its IoU with an already kept detection exceeds `iou_threshold`. Detections
/// without a box are always kept.
pub fn suppress(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let overlaps = candidate.bounding_box.as_ref().is_some_and(|cb| {
            kept.iter()
                .filter_map(|k| k.bounding_box.as_ref())
                .any(|kb| iou(kb, cb) > iou_threshold)
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(category: &str, confidence: f32, b: [f32; 4]) -> Detection {
        Detection {
            category: category.to_string(),
            confidence,
            bounding_box: Some(BoundingBox::new(b[0], b[1], b[2], b[3])),
        }
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let b = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert!((iou(&b, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let beside = BoundingBox::new(20.0, 0.0, 10.0, 10.0);
        let below = BoundingBox::new(0.0, 20.0, 10.0, 10.0);
        assert_eq!(iou(&a, &beside), 0.0);
        assert_eq!(iou(&a, &below), 0.0);
    }

    #[test]
    fn iou_of_degenerate_boxes_is_zero() {
        let point = BoundingBox::new(5.0, 5.0, 0.0, 0.0);
        assert_eq!(iou(&point, &point), 0.0);
    }

    #[test]
    fn heavy_overlap_collapses_to_higher_confidence() {
        // 100x100 vs 100x90 sharing the top-left corner: IoU = 0.9.
        let low = det("BUTTOCKS_EXPOSED", 0.7, [0.0, 0.0, 100.0, 90.0]);
        let high = det("BUTTOCKS_EXPOSED", 0.9, [0.0, 0.0, 100.0, 100.0]);
        assert!((iou(&low.bounding_box.unwrap(), &high.bounding_box.unwrap()) - 0.9).abs() < 1e-6);

        let kept = suppress(vec![low, high], 0.45);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn suppression_ignores_category() {
        let a = det("FACE_MALE", 0.8, [0.0, 0.0, 50.0, 50.0]);
        let b = det("FACE_FEMALE", 0.6, [1.0, 1.0, 50.0, 50.0]);
        assert_eq!(suppress(vec![a, b], 0.45).len(), 1);
    }

    #[test]
    fn keeps_separate_objects_sorted_by_confidence() {
        let a = det("FEET_EXPOSED", 0.5, [0.0, 0.0, 10.0, 10.0]);
        let b = det("FEET_EXPOSED", 0.9, [100.0, 100.0, 10.0, 10.0]);
        let kept = suppress(vec![a, b], 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn detections_without_boxes_survive() {
        let boxed = det("FACE_MALE", 0.9, [0.0, 0.0, 10.0, 10.0]);
        let unboxed = Detection {
            category: "FACE_MALE".into(),
            confidence: 0.8,
            bounding_box: None,
        };
        assert_eq!(suppress(vec![boxed, unboxed], 0.0).len(), 2);
    }

    #[test]
    fn suppression_is_idempotent() {
        let input = vec![
            det("A", 0.9, [0.0, 0.0, 10.0, 10.0]),
            det("B", 0.85, [2.0, 2.0, 10.0, 10.0]),
            det("C", 0.8, [6.0, 6.0, 10.0, 10.0]),
            det("D", 0.8, [30.0, 0.0, 10.0, 10.0]),
            det("E", 0.3, [31.0, 1.0, 9.0, 9.0]),
        ];
        for threshold in [0.0, 0.1, 0.3, 0.45, 0.7, 1.0] {
            let once = suppress(input.clone(), threshold);
            let twice = suppress(once.clone(), threshold);
            assert_eq!(once, twice, "threshold {threshold}");
        }
    }
}

//! Detection post-processing: output decoding, score filtering, NMS.
//!
//! Two interchangeable output layouts are supported. The general-purpose
//! many-class detector emits a single anchor-free tensor of box rows plus
//! per-class scores; lightweight few-class detectors emit darknet-style
//! per-scale grids with anchor priors. Both decode to the same
//! `(label, confidence, box)` triples in source image coordinates.

use anyhow::Result;
use tract_onnx::prelude::Tensor;

use redact_utils::config::DetectionSettings;

use crate::{detection::Detection, geometry::BoundingBox, preprocess::InputSize};

/// Parameters controlling how raw model outputs are filtered and refined.
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    /// Decode-stage score floor; user-facing confidence filtering happens in
    /// the normalizer.
    pub score_threshold: f32,
    /// Threshold for non-maximum suppression to merge overlapping boxes.
    pub nms_threshold: f32,
    /// The maximum number of detections to keep after sorting by score.
    pub top_k: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.25,
            nms_threshold: 0.45,
            top_k: 300,
        }
    }
}

impl From<&DetectionSettings> for PostprocessConfig {
    fn from(settings: &DetectionSettings) -> Self {
        Self {
            score_threshold: settings.score_threshold,
            nms_threshold: settings.nms_threshold,
            top_k: settings.top_k,
        }
    }
}

/// Output tensor layout of the plugged-in detection model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelLayout {
    /// Single tensor `[1, 4+C, N]` (or transposed): rows of cx,cy,w,h plus
    /// per-class scores, already activated.
    AnchorFree,
    /// One tensor per scale, `[1, A*(5+C), gh, gw]`: darknet grid offsets
    /// with anchor priors, raw logits.
    GridAnchors {
        /// Anchor (width, height) priors per output scale, in input pixels.
        anchors: Vec<Vec<(f32, f32)>>,
    },
}

impl ModelLayout {
    /// Default anchor priors for darknet-tiny style two-scale models at a
    /// 416x416 input.
    pub fn darknet_tiny_default() -> Self {
        Self::GridAnchors {
            anchors: vec![
                vec![(81.0, 82.0), (135.0, 169.0), (344.0, 319.0)],
                vec![(10.0, 14.0), (23.0, 27.0), (37.0, 58.0)],
            ],
        }
    }
}

/// Decode raw model outputs into filtered detections.
///
/// Applies, in order: layout-specific decoding, score filtering at the
/// decode floor, coordinate scaling into source image space, and class-aware
/// non-maximum suppression.
///
/// # Arguments
///
/// * `outputs` - The raw output tensors from the model.
/// * `layout` - The model's output layout.
/// * `labels` - Class labels in model index order.
/// * `input_size` - The model input resolution (grid decoding only).
/// * `scale_x` - Horizontal factor mapping input space to source space.
/// * `scale_y` - Vertical factor mapping input space to source space.
/// * `config` - The post-processing parameters.
pub fn decode_outputs(
    outputs: &[Tensor],
    layout: &ModelLayout,
    labels: &[String],
    input_size: InputSize,
    scale_x: f32,
    scale_y: f32,
    config: &PostprocessConfig,
) -> Result<Vec<Detection>> {
    anyhow::ensure!(!labels.is_empty(), "decode requires at least one label");

    let detections = match layout {
        ModelLayout::AnchorFree => {
            anyhow::ensure!(
                outputs.len() == 1,
                "anchor-free decode expects 1 output tensor, got {}",
                outputs.len()
            );
            decode_anchor_free(&outputs[0], labels, scale_x, scale_y, config.score_threshold)?
        }
        ModelLayout::GridAnchors { anchors } => decode_grid(
            outputs,
            anchors,
            labels,
            input_size,
            scale_x,
            scale_y,
            config.score_threshold,
        )?,
    };

    Ok(nms(detections, config.nms_threshold, config.top_k))
}

fn decode_anchor_free(
    output: &Tensor,
    labels: &[String],
    scale_x: f32,
    scale_y: f32,
    score_threshold: f32,
) -> Result<Vec<Detection>> {
    let dims = output.shape().to_vec();
    anyhow::ensure!(
        dims.len() == 3 && dims[0] == 1,
        "anchor-free output must have shape [1, attrs, boxes], got {dims:?}"
    );
    let slice = output
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("anchor-free output not f32: {e}"))?;

    let attrs = 4 + labels.len();
    let (boxes, attr_major) = if dims[1] == attrs {
        (dims[2], true)
    } else if dims[2] == attrs {
        (dims[1], false)
    } else {
        anyhow::bail!(
            "anchor-free output shape {dims:?} does not match {} classes",
            labels.len()
        );
    };

    let at = |attr: usize, i: usize| {
        if attr_major {
            slice[attr * boxes + i]
        } else {
            slice[i * attrs + attr]
        }
    };

    let mut detections = Vec::new();
    for i in 0..boxes {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for class in 0..labels.len() {
            let score = at(4 + class, i);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        if !best_score.is_finite() || best_score < score_threshold {
            continue;
        }

        let cx = at(0, i);
        let cy = at(1, i);
        let w = at(2, i);
        let h = at(3, i);

        detections.push(Detection {
            label: labels[best_class].clone(),
            confidence: best_score,
            bbox: BoundingBox::new(
                (cx - w * 0.5) * scale_x,
                (cy - h * 0.5) * scale_y,
                (cx + w * 0.5) * scale_x,
                (cy + h * 0.5) * scale_y,
            ),
        });
    }
    Ok(detections)
}

fn decode_grid(
    outputs: &[Tensor],
    anchors: &[Vec<(f32, f32)>],
    labels: &[String],
    input_size: InputSize,
    scale_x: f32,
    scale_y: f32,
    score_threshold: f32,
) -> Result<Vec<Detection>> {
    anyhow::ensure!(
        outputs.len() == anchors.len(),
        "grid decode expects {} output tensors (one per scale), got {}",
        anchors.len(),
        outputs.len()
    );

    let per_anchor = 5 + labels.len();
    let mut detections = Vec::new();

    for (output, scale_anchors) in outputs.iter().zip(anchors) {
        let dims = output.shape().to_vec();
        anyhow::ensure!(
            dims.len() == 4 && dims[0] == 1,
            "grid output must have shape [1, channels, rows, cols], got {dims:?}"
        );
        anyhow::ensure!(
            dims[1] == scale_anchors.len() * per_anchor,
            "grid output channels {} do not match {} anchors x {} attributes",
            dims[1],
            scale_anchors.len(),
            per_anchor
        );
        let rows = dims[2];
        let cols = dims[3];
        let slice = output
            .as_slice::<f32>()
            .map_err(|e| anyhow::anyhow!("grid output not f32: {e}"))?;

        let stride_x = input_size.width as f32 / cols as f32;
        let stride_y = input_size.height as f32 / rows as f32;

        let at = |anchor: usize, attr: usize, row: usize, col: usize| {
            slice[((anchor * per_anchor + attr) * rows + row) * cols + col]
        };

        for (anchor_index, &(anchor_w, anchor_h)) in scale_anchors.iter().enumerate() {
            for row in 0..rows {
                for col in 0..cols {
                    let objectness = sigmoid(at(anchor_index, 4, row, col));

                    let mut best_class = 0usize;
                    let mut best_prob = f32::NEG_INFINITY;
                    for class in 0..labels.len() {
                        let logit = at(anchor_index, 5 + class, row, col);
                        if logit > best_prob {
                            best_prob = logit;
                            best_class = class;
                        }
                    }
                    let score = objectness * sigmoid(best_prob);
                    if !score.is_finite() || score < score_threshold {
                        continue;
                    }

                    let bx = (sigmoid(at(anchor_index, 0, row, col)) + col as f32) * stride_x;
                    let by = (sigmoid(at(anchor_index, 1, row, col)) + row as f32) * stride_y;
                    let bw = anchor_w * at(anchor_index, 2, row, col).exp();
                    let bh = anchor_h * at(anchor_index, 3, row, col).exp();

                    detections.push(Detection {
                        label: labels[best_class].clone(),
                        confidence: score,
                        bbox: BoundingBox::new(
                            (bx - bw * 0.5) * scale_x,
                            (by - bh * 0.5) * scale_y,
                            (bx + bw * 0.5) * scale_x,
                            (by + bh * 0.5) * scale_y,
                        ),
                    });
                }
            }
        }
    }

    Ok(detections)
}

/// Class-aware greedy non-maximum suppression.
///
/// Detections are sorted by confidence, truncated to `top_k`, then
/// overlapping boxes of the same class are suppressed.
fn nms(mut detections: Vec<Detection>, threshold: f32, top_k: usize) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    detections.truncate(top_k);

    let mut keep = Vec::new();
    while !detections.is_empty() {
        let det = detections.remove(0);
        detections
            .retain(|other| other.label != det.label || det.bbox.iou(&other.bbox) < threshold);
        keep.push(det);
    }
    keep
}

fn sigmoid(value: f32) -> f32 {
    1.0 / (1.0 + (-value).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn det(label: &str, confidence: f32, bbox: BoundingBox) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox,
        }
    }

    /// Build an attr-major anchor-free tensor [1, attrs, boxes].
    fn anchor_free_tensor(rows: &[Vec<f32>]) -> Tensor {
        let attrs = rows[0].len();
        let boxes = rows.len();
        let mut data = vec![0f32; attrs * boxes];
        for (i, row) in rows.iter().enumerate() {
            for (attr, value) in row.iter().enumerate() {
                data[attr * boxes + i] = *value;
            }
        }
        Tensor::from_shape(&[1, attrs, boxes], &data).expect("tensor")
    }

    #[test]
    fn anchor_free_decode_picks_best_class_and_scales_boxes() {
        // attrs = cx, cy, w, h, cat, dog
        let tensor = anchor_free_tensor(&[
            vec![20.0, 20.0, 10.0, 10.0, 0.9, 0.1],
            vec![5.0, 5.0, 4.0, 4.0, 0.1, 0.05],
            vec![40.0, 30.0, 8.0, 6.0, 0.2, 0.8],
        ]);
        let config = PostprocessConfig::default();
        let detections = decode_outputs(
            &[tensor],
            &ModelLayout::AnchorFree,
            &labels(&["cat", "dog"]),
            InputSize::new(64, 64),
            2.0,
            1.0,
            &config,
        )
        .expect("decode");

        assert_eq!(detections.len(), 2);
        // NMS sorts by confidence.
        assert_eq!(detections[0].label, "cat");
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[0].bbox, BoundingBox::new(30.0, 15.0, 50.0, 25.0));
        assert_eq!(detections[1].label, "dog");
        assert_eq!(detections[1].bbox, BoundingBox::new(72.0, 27.0, 88.0, 33.0));
    }

    #[test]
    fn anchor_free_decode_accepts_transposed_layout() {
        // [1, boxes, attrs] with one confident row.
        let data: Vec<f32> = vec![
            20.0, 20.0, 10.0, 10.0, 0.95, 0.1, // box 0
            5.0, 5.0, 2.0, 2.0, 0.01, 0.02, // box 1
        ];
        let tensor = Tensor::from_shape(&[1, 2, 6], &data).expect("tensor");
        let detections = decode_outputs(
            &[tensor],
            &ModelLayout::AnchorFree,
            &labels(&["cat", "dog"]),
            InputSize::new(64, 64),
            1.0,
            1.0,
            &PostprocessConfig::default(),
        )
        .expect("decode");

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "cat");
        assert_eq!(detections[0].bbox, BoundingBox::new(15.0, 15.0, 25.0, 25.0));
    }

    #[test]
    fn anchor_free_decode_rejects_mismatched_shape() {
        let tensor = Tensor::from_shape(&[1usize, 7, 3], &vec![0f32; 21]).expect("tensor");
        let result = decode_outputs(
            &[tensor],
            &ModelLayout::AnchorFree,
            &labels(&["cat", "dog"]),
            InputSize::new(64, 64),
            1.0,
            1.0,
            &PostprocessConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn grid_decode_recovers_cell_anchored_box() {
        // One scale, one anchor (16x16), one class, 2x2 grid, 32x32 input.
        // Cell (0, 1) carries a confident hit with zero offsets.
        let per_anchor = 6;
        let (rows, cols) = (2usize, 2usize);
        let mut data = vec![0f32; per_anchor * rows * cols];
        let at = |attr: usize, row: usize, col: usize| (attr * rows + row) * cols + col;
        // Strongly negative objectness everywhere, except the hit cell.
        for row in 0..rows {
            for col in 0..cols {
                data[at(4, row, col)] = -20.0;
            }
        }
        data[at(4, 0, 1)] = 20.0; // objectness ~1
        data[at(5, 0, 1)] = 20.0; // class prob ~1
        let tensor = Tensor::from_shape(&[1, per_anchor, rows, cols], &data).expect("tensor");

        let layout = ModelLayout::GridAnchors {
            anchors: vec![vec![(16.0, 16.0)]],
        };
        let detections = decode_outputs(
            &[tensor],
            &layout,
            &labels(&["plate"]),
            InputSize::new(32, 32),
            1.0,
            1.0,
            &PostprocessConfig::default(),
        )
        .expect("decode");

        assert_eq!(detections.len(), 1);
        let detection = &detections[0];
        assert_eq!(detection.label, "plate");
        assert!(detection.confidence > 0.99);
        // bx = (sigmoid(0) + 1) * 16 = 24, by = 8, box 16x16.
        assert!((detection.bbox.x1 - 16.0).abs() < 1e-3);
        assert!((detection.bbox.y1 - 0.0).abs() < 1e-3);
        assert!((detection.bbox.x2 - 32.0).abs() < 1e-3);
        assert!((detection.bbox.y2 - 16.0).abs() < 1e-3);
    }

    #[test]
    fn grid_decode_rejects_scale_count_mismatch() {
        let tensor = Tensor::from_shape(&[1usize, 6, 2, 2], &vec![0f32; 24]).expect("tensor");
        let layout = ModelLayout::darknet_tiny_default();
        let result = decode_outputs(
            &[tensor],
            &layout,
            &labels(&["plate"]),
            InputSize::new(416, 416),
            1.0,
            1.0,
            &PostprocessConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn nms_suppresses_same_class_overlap_only() {
        let detections = vec![
            det("car", 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            det("car", 0.8, BoundingBox::new(1.0, 1.0, 11.0, 11.0)),
            det("person", 0.7, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
        ];
        let kept = nms(detections, 0.45, 300);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].label, "car");
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].label, "person");
    }

    #[test]
    fn nms_truncates_to_top_k() {
        let detections = (0..5)
            .map(|i| {
                det(
                    "car",
                    0.5 + i as f32 * 0.05,
                    BoundingBox::new(i as f32 * 50.0, 0.0, i as f32 * 50.0 + 10.0, 10.0),
                )
            })
            .collect();
        let kept = nms(detections, 0.45, 2);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].confidence > kept[1].confidence);
    }

    #[test]
    fn sigmoid_is_bounded_and_centered() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }
}

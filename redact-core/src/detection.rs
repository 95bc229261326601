//! Detection records, normalization, and category matching.

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// A single detected object.
///
/// Produced fresh on every detection pass and never mutated afterwards; the
/// label string is whatever the oracle returned, verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label as returned by the oracle.
    pub label: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box in source image coordinates (unclamped).
    pub bbox: BoundingBox,
}

/// Filter raw oracle output down to the user-facing detection list.
///
/// Detections with `confidence >= confidence_threshold` survive, in the
/// oracle's original order. No re-sorting happens here: selection indices
/// shown to the user must stay stable for the duration of one pass.
pub fn normalize_detections(raw: Vec<Detection>, confidence_threshold: f32) -> Vec<Detection> {
    raw.into_iter()
        .filter(|d| d.confidence >= confidence_threshold)
        .collect()
}

/// A set of class labels targeted by a global edit.
///
/// Matching is ASCII case-insensitive so that `Person` from one model and
/// `person` from another hit the same filter; label strings themselves are
/// never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    labels: Vec<String>,
}

impl CategoryFilter {
    /// Build a filter from explicit labels. Empty labels are discarded.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.trim().is_empty())
                .collect(),
        }
    }

    /// Preset for "blur all faces": the general detector has no face class,
    /// so whole `person` boxes are targeted.
    pub fn faces() -> Self {
        Self::new(["person"])
    }

    /// Preset for "blur all number plates": whole vehicle boxes are targeted.
    pub fn plates() -> Self {
        Self::new(["car", "truck", "bus", "motorcycle"])
    }

    /// Parse a filter specification: a preset name (`faces`, `plates`) or a
    /// comma-separated label list.
    pub fn parse(spec: &str) -> Self {
        match spec.trim().to_ascii_lowercase().as_str() {
            "faces" => Self::faces(),
            "plates" => Self::plates(),
            _ => Self::new(spec.split(',').map(str::trim).filter(|s| !s.is_empty())),
        }
    }

    /// Returns `true` when the label belongs to this category.
    pub fn matches(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    /// Returns `true` when the filter contains no labels (matches nothing).
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The labels in this filter.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// The 80 COCO class labels used by the general-purpose detector, in model
/// index order.
pub fn coco_labels() -> Vec<String> {
    const LABELS: [&str; 80] = [
        "person",
        "bicycle",
        "car",
        "motorcycle",
        "airplane",
        "bus",
        "train",
        "truck",
        "boat",
        "traffic light",
        "fire hydrant",
        "stop sign",
        "parking meter",
        "bench",
        "bird",
        "cat",
        "dog",
        "horse",
        "sheep",
        "cow",
        "elephant",
        "bear",
        "zebra",
        "giraffe",
        "backpack",
        "umbrella",
        "handbag",
        "tie",
        "suitcase",
        "frisbee",
        "skis",
        "snowboard",
        "sports ball",
        "kite",
        "baseball bat",
        "baseball glove",
        "skateboard",
        "surfboard",
        "tennis racket",
        "bottle",
        "wine glass",
        "cup",
        "fork",
        "knife",
        "spoon",
        "bowl",
        "banana",
        "apple",
        "sandwich",
        "orange",
        "broccoli",
        "carrot",
        "hot dog",
        "pizza",
        "donut",
        "cake",
        "chair",
        "couch",
        "potted plant",
        "bed",
        "dining table",
        "toilet",
        "tv",
        "laptop",
        "mouse",
        "remote",
        "keyboard",
        "cell phone",
        "microwave",
        "oven",
        "toaster",
        "sink",
        "refrigerator",
        "book",
        "clock",
        "vase",
        "scissors",
        "teddy bear",
        "hair drier",
        "toothbrush",
    ];
    LABELS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    #[test]
    fn normalize_filters_below_threshold_in_order() {
        let raw = vec![det("dog", 0.3), det("person", 0.6), det("car", 0.9)];
        let kept = normalize_detections(raw, 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].label, "person");
        assert_eq!(kept[1].label, "car");
    }

    #[test]
    fn normalize_keeps_exact_threshold() {
        let kept = normalize_detections(vec![det("cat", 0.5)], 0.5);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn normalize_preserves_oracle_order_without_sorting() {
        let raw = vec![det("a", 0.6), det("b", 0.9), det("c", 0.7)];
        let kept = normalize_detections(raw, 0.5);
        let labels: Vec<_> = kept.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["a", "b", "c"]);
    }

    #[test]
    fn category_matching_is_case_insensitive() {
        let filter = CategoryFilter::faces();
        assert!(filter.matches("person"));
        assert!(filter.matches("Person"));
        assert!(!filter.matches("car"));
    }

    #[test]
    fn plates_preset_covers_vehicles() {
        let filter = CategoryFilter::plates();
        for label in ["car", "truck", "bus", "motorcycle"] {
            assert!(filter.matches(label), "expected {label} to match");
        }
        assert!(!filter.matches("bicycle"));
    }

    #[test]
    fn parse_accepts_presets_and_lists() {
        assert_eq!(CategoryFilter::parse("FACES"), CategoryFilter::faces());
        assert_eq!(CategoryFilter::parse("plates"), CategoryFilter::plates());
        let custom = CategoryFilter::parse("dog, cat");
        assert!(custom.matches("dog"));
        assert!(custom.matches("CAT"));
        assert!(!custom.matches("person"));
    }

    #[test]
    fn parse_of_blank_spec_matches_nothing() {
        let filter = CategoryFilter::parse("  ,, ");
        assert!(filter.is_empty());
        assert!(!filter.matches("person"));
    }

    #[test]
    fn detections_deserialize_from_fixture() {
        let detections: Vec<Detection> =
            redact_utils::load_fixture_json("detections/street_scene.json")
                .expect("fixture should parse");
        assert_eq!(detections.len(), 5);
        assert_eq!(detections[0].label, "person");
        let kept = normalize_detections(detections, 0.5);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn coco_labels_expose_expected_classes() {
        let labels = coco_labels();
        assert_eq!(labels.len(), 80);
        assert_eq!(labels[0], "person");
        assert_eq!(labels[2], "car");
        assert_eq!(labels[79], "toothbrush");
    }
}

//! Core region-edit primitives.
//!
//! This crate ties object detection to region-level image edits: it loads an
//! ONNX detection model with `tract-onnx`, normalizes raw detections into a
//! stable list, and applies blur/mask/delete/crop transforms to detection
//! boxes through an edit policy.

/// Detection records, normalization, and category matching.
pub mod detection;
/// High-level detection runner wrapping model, preprocess, and postprocess.
pub mod detector;
/// Typed engine errors.
pub mod error;
/// Bounding boxes and clamped pixel regions.
pub mod geometry;
/// ONNX model loading and execution.
pub mod model;
/// Capability trait for detection backends and the lazy process-wide handle.
pub mod oracle;
/// Edit directives and the policy that applies them to an image.
pub mod policy;
/// Detection post-processing (output decoding, score filtering, NMS).
pub mod postprocess;
/// Image pre-processing (resizing, tensor conversion).
pub mod preprocess;
/// Pure region transforms: blur, mask, delete-fill, crop.
pub mod transforms;

pub use detection::{CategoryFilter, Detection, coco_labels, normalize_detections};
pub use detector::OnnxDetector;
pub use error::EditError;
pub use geometry::{BoundingBox, Region};
pub use model::OnnxModel;
pub use oracle::{LazyDetector, ObjectDetector};
pub use policy::{EditDirective, EditOptions, EditOutcome, Tool, apply_directive};
pub use postprocess::{ModelLayout, PostprocessConfig, decode_outputs};
pub use preprocess::{
    InputSize, PreprocessConfig, PreprocessOutput, preprocess_dynamic_image, preprocess_image,
};
pub use transforms::{blur_region, crop_region, delete_region, mask_region};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

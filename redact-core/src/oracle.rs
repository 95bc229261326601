//! Capability trait for detection backends and the lazy process-wide handle.

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::Result;
use image::DynamicImage;

use crate::{
    detection::Detection,
    detector::OnnxDetector,
    error::EditError,
    postprocess::{ModelLayout, PostprocessConfig},
    preprocess::PreprocessConfig,
};

/// A pluggable detection backend.
///
/// The engine is agnostic to the concrete implementation as long as it
/// yields `(label, confidence, box)` triples. An oracle that finds nothing
/// returns an empty list, never an error.
pub trait ObjectDetector {
    /// Run detection over a decoded image.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Process-lifetime detection handle with init-once semantics.
///
/// The underlying model loads on first use and is never torn down.
/// Initialization failure is remembered: every subsequent call reports the
/// backend as unavailable instead of retrying the load.
pub struct LazyDetector {
    model_path: PathBuf,
    preprocess: PreprocessConfig,
    postprocess: PostprocessConfig,
    layout: ModelLayout,
    labels: Vec<String>,
    cell: OnceLock<Result<OnnxDetector, String>>,
}

impl LazyDetector {
    /// Create a handle without touching the model file yet.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        preprocess: PreprocessConfig,
        postprocess: PostprocessConfig,
        layout: ModelLayout,
        labels: Vec<String>,
    ) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            preprocess,
            postprocess,
            layout,
            labels,
            cell: OnceLock::new(),
        }
    }

    /// The configured model path.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns `true` once the model has been loaded (or has failed to).
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Borrow the underlying detector, loading the model on first call.
    pub fn detector(&self) -> Result<&OnnxDetector, EditError> {
        let slot = self.cell.get_or_init(|| {
            OnnxDetector::new(
                &self.model_path,
                self.preprocess.clone(),
                self.postprocess.clone(),
                self.layout.clone(),
                self.labels.clone(),
            )
            .map_err(|e| format!("{e:#}"))
        });
        match slot {
            Ok(detector) => Ok(detector),
            Err(message) => Err(EditError::OracleUnavailable(message.clone())),
        }
    }
}

impl ObjectDetector for LazyDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let detector = self.detector()?;
        detector.detect_image(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::coco_labels;
    use image::RgbImage;

    fn missing_model_handle() -> LazyDetector {
        LazyDetector::new(
            "does/not/exist.onnx",
            PreprocessConfig::default(),
            PostprocessConfig::default(),
            ModelLayout::AnchorFree,
            coco_labels(),
        )
    }

    #[test]
    fn handle_does_not_load_until_first_use() {
        let handle = missing_model_handle();
        assert!(!handle.is_initialized());
        let _ = handle.detector();
        assert!(handle.is_initialized());
    }

    #[test]
    fn missing_model_reports_oracle_unavailable() {
        let handle = missing_model_handle();
        let err = handle.detector().expect_err("load should fail");
        assert!(matches!(err, EditError::OracleUnavailable(_)));
    }

    #[test]
    fn init_failure_is_remembered_not_retried() {
        let handle = missing_model_handle();
        let first = format!("{}", handle.detector().unwrap_err());
        let second = format!("{}", handle.detector().unwrap_err());
        assert_eq!(first, second);
    }

    #[test]
    fn detect_surfaces_unavailable_backend() {
        let handle = missing_model_handle();
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let err = handle.detect(&image).expect_err("detect should fail");
        assert!(format!("{err}").contains("detection backend unavailable"));
    }
}

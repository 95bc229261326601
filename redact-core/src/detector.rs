use std::path::Path;

use anyhow::Result;
use image::DynamicImage;
use log::debug;

use redact_utils::telemetry::timing_guard;

use crate::detection::Detection;
use crate::model::OnnxModel;
use crate::oracle::ObjectDetector;
use crate::postprocess::{ModelLayout, PostprocessConfig, decode_outputs};
use crate::preprocess::{
    PreprocessConfig, PreprocessOutput, preprocess_dynamic_image, preprocess_image,
};

/// Convenience wrapper that couples a detection model with preprocessing and
/// postprocessing settings.
///
/// This is the main entry point for running object detection. The engine
/// only sees it through the [`ObjectDetector`] trait, so backends with
/// different output layouts are interchangeable.
#[derive(Debug)]
pub struct OnnxDetector {
    model: OnnxModel,
    preprocess: PreprocessConfig,
    postprocess: PostprocessConfig,
    layout: ModelLayout,
    labels: Vec<String>,
}

impl OnnxDetector {
    /// Construct a detector from a model path and configuration.
    ///
    /// # Arguments
    ///
    /// * `model_path` - The path to the ONNX model file.
    /// * `preprocess` - The configuration for image preprocessing.
    /// * `postprocess` - The configuration for detection postprocessing.
    /// * `layout` - The model's output tensor layout.
    /// * `labels` - Class labels in model index order.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        preprocess: PreprocessConfig,
        postprocess: PostprocessConfig,
        layout: ModelLayout,
        labels: Vec<String>,
    ) -> Result<Self> {
        anyhow::ensure!(
            !labels.is_empty(),
            "detector requires at least one class label"
        );
        let model = OnnxModel::load(model_path, preprocess.input_size)?;
        Ok(Self {
            model,
            preprocess,
            postprocess,
            layout,
            labels,
        })
    }

    /// Run detection on an image file path.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the image file.
    pub fn detect_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Detection>> {
        let _guard = timing_guard("redact_core::detect_path", log::Level::Debug);
        let prep = preprocess_image(path, &self.preprocess)?;
        self.run_preprocessed(prep)
    }

    /// Run detection on an in-memory dynamic image.
    ///
    /// # Arguments
    ///
    /// * `image` - The dynamic image to process.
    pub fn detect_image(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let _guard = timing_guard("redact_core::detect_image", log::Level::Debug);
        let prep = preprocess_dynamic_image(image, &self.preprocess)?;
        self.run_preprocessed(prep)
    }

    /// Class labels known to this detector.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Access the underlying postprocess configuration.
    pub fn postprocess_config(&self) -> &PostprocessConfig {
        &self.postprocess
    }

    /// Access the preprocessing configuration.
    pub fn preprocess_config(&self) -> &PreprocessConfig {
        &self.preprocess
    }

    /// Run the model on a preprocessed tensor and return scaled detections.
    fn run_preprocessed(&self, prep: PreprocessOutput) -> Result<Vec<Detection>> {
        let outputs = {
            let _guard = timing_guard("redact_core::onnx_inference", log::Level::Debug);
            self.model.run(prep.tensor)?
        };

        let detections = {
            let _guard = timing_guard("redact_core::postprocess", log::Level::Debug);
            decode_outputs(
                &outputs,
                &self.layout,
                &self.labels,
                self.preprocess.input_size,
                prep.scale_x,
                prep.scale_y,
                &self.postprocess,
            )?
        };

        debug!(
            "{} detection(s) above the decode score floor",
            detections.len()
        );
        Ok(detections)
    }
}

impl ObjectDetector for OnnxDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        self.detect_image(image)
    }
}

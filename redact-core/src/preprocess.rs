//! Preprocessing utilities for preparing images for detector inference.
//!
//! The helpers in this module resize images, convert them into the expected
//! tensor layout, and return the scale factors necessary to map detections
//! back to the source image.

use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, imageops::FilterType};
use tract_onnx::prelude::Tensor;

use redact_utils::telemetry::timing_guard;
use redact_utils::{
    compute_resize_scales,
    config::{InputDimensions, ResizeQuality},
    load_image, resize_image, rgb_to_chw,
};

/// Desired input resolution for the detection model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    /// The width of the input tensor.
    pub width: u32,
    /// The height of the input tensor.
    pub height: u32,
}

impl InputSize {
    /// Creates a new `InputSize`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
        }
    }
}

/// Configuration for preprocessing an image before inference.
#[derive(Debug, Clone, Default)]
pub struct PreprocessConfig {
    /// The target input size for the model.
    pub input_size: InputSize,
    /// Resize filter preference controlling the quality vs speed trade-off.
    pub resize_quality: ResizeQuality,
}

impl PreprocessConfig {
    fn resize_filter(&self) -> FilterType {
        match self.resize_quality {
            ResizeQuality::Quality => FilterType::Triangle,
            ResizeQuality::Speed => FilterType::Nearest,
        }
    }
}

/// Output of preprocessing: tensor plus metadata for rescaling detections.
#[derive(Debug)]
pub struct PreprocessOutput {
    /// The preprocessed image tensor, ready for inference.
    pub tensor: Tensor,
    /// The horizontal scale factor to convert detection coordinates to the original image space.
    pub scale_x: f32,
    /// The vertical scale factor to convert detection coordinates to the original image space.
    pub scale_y: f32,
    /// The original dimensions of the input image.
    pub original_size: (u32, u32),
}

/// Preprocess an image file into a detector-ready tensor in `[1, 3, H, W]`
/// (CHW) RGB format with values scaled to `[0, 1]`.
///
/// # Arguments
///
/// * `path` - The path to the image file.
/// * `config` - The configuration for preprocessing.
pub fn preprocess_image<P: AsRef<Path>>(
    path: P,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput> {
    let _guard = timing_guard("redact_core::preprocess_image", log::Level::Debug);
    let path_ref = path.as_ref();
    anyhow::ensure!(
        path_ref.exists(),
        "input image does not exist: {}",
        path_ref.display()
    );

    let image = load_image(path_ref)
        .with_context(|| format!("failed to load image from {}", path_ref.display()))?;
    preprocess_dynamic_image(&image, config)
}

/// Preprocess an in-memory image (useful for tests).
///
/// # Arguments
///
/// * `image` - The dynamic image to process.
/// * `config` - The configuration for preprocessing.
pub fn preprocess_dynamic_image(
    image: &DynamicImage,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput> {
    let input_size = config.input_size;
    let original_size = image.dimensions();
    let (scale_x, scale_y) = compute_resize_scales(
        original_size,
        (input_size.width, input_size.height),
    )?;

    let resized = resize_image(
        image,
        input_size.width,
        input_size.height,
        config.resize_filter(),
    );
    let chw = rgb_to_chw(&resized);
    let data = chw.into_raw_vec();
    let tensor = Tensor::from_shape(
        &[1, 3, input_size.height as usize, input_size.width as usize],
        &data,
    )
    .map_err(|e| anyhow::anyhow!("failed to build input tensor: {e}"))?;

    Ok(PreprocessOutput {
        tensor,
        scale_x,
        scale_y,
        original_size,
    })
}

impl From<InputDimensions> for InputSize {
    fn from(dimensions: InputDimensions) -> Self {
        InputSize::new(dimensions.width, dimensions.height)
    }
}

impl From<&InputDimensions> for InputSize {
    fn from(dimensions: &InputDimensions) -> Self {
        (*dimensions).into()
    }
}

impl From<InputDimensions> for PreprocessConfig {
    fn from(dimensions: InputDimensions) -> Self {
        let InputDimensions {
            width,
            height,
            resize_quality,
        } = dimensions;
        PreprocessConfig {
            input_size: InputSize::new(width, height),
            resize_quality,
        }
    }
}

impl From<&InputDimensions> for PreprocessConfig {
    fn from(dimensions: &InputDimensions) -> Self {
        PreprocessConfig {
            input_size: (*dimensions).into(),
            resize_quality: dimensions.resize_quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redact_utils::fixtures::solid_image;

    #[test]
    fn preprocess_produces_expected_tensor_shape_and_scales() {
        let image = DynamicImage::ImageRgb8(solid_image(128, 64, [255, 0, 0]));
        let config = PreprocessConfig {
            input_size: InputSize::new(32, 32),
            resize_quality: ResizeQuality::Speed,
        };

        let prep = preprocess_dynamic_image(&image, &config).expect("preprocess");
        assert_eq!(prep.tensor.shape(), &[1, 3, 32, 32]);
        assert_eq!(prep.scale_x, 4.0);
        assert_eq!(prep.scale_y, 2.0);
        assert_eq!(prep.original_size, (128, 64));

        // Red channel saturated, green/blue empty.
        let slice = prep.tensor.as_slice::<f32>().expect("f32 tensor");
        assert_eq!(slice.len(), 3 * 32 * 32);
        assert!(slice[..32 * 32].iter().all(|v| (*v - 1.0).abs() < 1e-6));
        assert!(slice[32 * 32..].iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn preprocess_rejects_missing_file() {
        let config = PreprocessConfig::default();
        assert!(preprocess_image("does/not/exist.png", &config).is_err());
    }
}

//! Helpers for saving processed images with flexible encoding.
//!
//! This module centralizes output-format selection, encoding, high-resolution
//! upscaling, and the flat-directory naming scheme for processed files.

use crate::config::OutputSettings;

use anyhow::{Context, Result};
use image::{
    DynamicImage, ExtendedColorType, ImageEncoder,
    codecs::{jpeg::JpegEncoder, png::PngEncoder, webp::WebPEncoder},
    imageops::FilterType,
};
use log::debug;
use std::{
    fs,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Canonical image formats supported by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormatHint {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormatHint {
    /// Determine format from a filesystem extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.parse().ok()
    }
}

impl Default for ImageFormatHint {
    fn default() -> Self {
        Self::Png
    }
}

impl std::str::FromStr for ImageFormatHint {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            other => Err(format!("unknown image format '{other}'")),
        }
    }
}

/// Immutable encoding configuration derived from the output settings.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: Option<ImageFormatHint>,
    pub auto_detect: bool,
    pub jpeg_quality: u8,
}

impl OutputOptions {
    /// Build `OutputOptions` from persistent output settings.
    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self {
            format: settings.format.parse().ok(),
            auto_detect: settings.auto_detect_format,
            jpeg_quality: settings.jpeg_quality.clamp(1, 100),
        }
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::from_settings(&OutputSettings::default())
    }
}

/// Save an image using the provided options.
///
/// The format is resolved from the destination extension when auto-detection
/// is enabled, falling back to the configured format (PNG by default).
pub fn save_dynamic_image(
    image: &DynamicImage,
    destination: &Path,
    options: &OutputOptions,
) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.exists() && !p.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let format = determine_format(destination, options);
    debug!(
        "Saving image to {} using {:?} format",
        destination.display(),
        format
    );

    let encoded = match format {
        ImageFormatHint::Png => encode_png(image)?,
        ImageFormatHint::Jpeg => encode_jpeg(image, options.jpeg_quality)?,
        ImageFormatHint::Webp => encode_webp(image)?,
    };

    write_bytes(destination, &encoded)?;
    Ok(())
}

/// Upscale an image uniformly using high-quality Lanczos resampling.
///
/// A factor of 1 returns a plain clone; the high-resolution export path uses
/// factor 2.
pub fn upscale(image: &DynamicImage, factor: u32) -> DynamicImage {
    if factor <= 1 {
        return image.clone();
    }
    let width = image.width().saturating_mul(factor).max(1);
    let height = image.height().saturating_mul(factor).max(1);
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Flat-directory name for a processed image: `processed_<original name>`.
pub fn processed_file_name(name: &str) -> String {
    format!("processed_{name}")
}

/// Append a suffix to a filename, preserving the existing extension.
pub fn append_suffix_to_filename(name: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return name.to_string();
    }
    if let Some(idx) = name.rfind('.') {
        let (base, ext) = name.split_at(idx);
        format!("{base}{suffix}{ext}")
    } else {
        format!("{name}{suffix}")
    }
}

fn determine_format(path: &Path, options: &OutputOptions) -> ImageFormatHint {
    if !options.auto_detect {
        return options.format.unwrap_or_default();
    }

    if let Some(fmt) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormatHint::from_extension)
    {
        fmt
    } else {
        options.format.unwrap_or_default()
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    {
        let encoder = PngEncoder::new(&mut buffer);
        encoder
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .context("failed to encode PNG")?;
    }
    Ok(buffer)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    {
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .context("failed to encode JPEG")?;
    }
    Ok(buffer)
}

fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let mut buffer = Vec::new();
    {
        let encoder = WebPEncoder::new_lossless(&mut buffer);
        encoder
            .write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )
            .context("failed to encode WebP")?;
    }
    Ok(buffer)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer.flush().ok();
    Ok(())
}

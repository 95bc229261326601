//! Detection preview rendering: boxes drawn onto a copy of the image.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use image::{DynamicImage, Rgba};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use redact_core::Detection;

/// Draw detection boxes on an image and save the preview to a directory.
///
/// The source image is untouched; the preview carries one green rectangle
/// per detection whose box survives clamping.
pub fn annotate_image(
    image: &DynamicImage,
    image_path: &Path,
    detections: &[Detection],
    output_dir: &Path,
) -> Result<std::path::PathBuf> {
    let mut preview = image.to_rgba8();
    let (img_w, img_h) = preview.dimensions();

    if img_w == 0 || img_h == 0 {
        anyhow::bail!(
            "cannot annotate image with zero dimensions: {}",
            image_path.display()
        );
    }

    let box_color = Rgba([0, 255, 0, 255]);
    for detection in detections {
        if let Some(region) = detection.bbox.clamp_to(img_w, img_h) {
            let rect =
                Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
            draw_hollow_rect_mut(&mut preview, rect, box_color);
        }
    }

    let file_name = image_path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("frame.png"));
    let output_path = output_dir.join(file_name);

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    preview
        .save(&output_path)
        .with_context(|| format!("failed to save preview image {}", output_path.display()))?;

    Ok(output_path)
}

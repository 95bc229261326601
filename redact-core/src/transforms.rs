//! Pure region transforms: blur, mask, delete-fill, crop.
//!
//! Every transform takes the current image by reference and a [`Region`]
//! already clamped to that image's bounds, and returns a new buffer. The
//! input is never mutated; for blur/mask/delete the output has identical
//! dimensions and only pixels inside the region change.

use image::{Rgb, RgbImage, imageops};

use crate::geometry::Region;

/// Smallest legal Gaussian kernel.
const MIN_KERNEL: u32 = 3;

/// Smooth the pixels inside `region` with a separable Gaussian kernel.
///
/// The kernel size is clamped to >= 3 and forced odd; sigma is derived from
/// the kernel size with the OpenCV formula `0.3*((k-1)*0.5 - 1) + 0.8`.
/// Sampling at the region border replicates the region's own edge pixels, so
/// no pixel outside the region influences (or is influenced by) the result.
///
/// # Arguments
///
/// * `image` - The source buffer.
/// * `region` - Target rectangle, clamped to `image`.
/// * `kernel_size` - Requested kernel size before clamping.
pub fn blur_region(image: &RgbImage, region: Region, kernel_size: u32) -> RgbImage {
    let size = normalize_kernel_size(kernel_size);
    let kernel = gaussian_kernel(size);
    let half = (size / 2) as i64;

    let rw = region.width as usize;
    let rh = region.height as usize;

    // Extract the region into float planes.
    let mut src = vec![0f32; rw * rh * 3];
    for ry in 0..rh {
        for rx in 0..rw {
            let pixel = image.get_pixel(region.x + rx as u32, region.y + ry as u32);
            let base = (ry * rw + rx) * 3;
            src[base] = pixel[0] as f32;
            src[base + 1] = pixel[1] as f32;
            src[base + 2] = pixel[2] as f32;
        }
    }

    // Horizontal pass.
    let mut tmp = vec![0f32; rw * rh * 3];
    for ry in 0..rh {
        for rx in 0..rw {
            let mut acc = [0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (rx as i64 + k as i64 - half).clamp(0, rw as i64 - 1) as usize;
                let base = (ry * rw + sx) * 3;
                acc[0] += weight * src[base];
                acc[1] += weight * src[base + 1];
                acc[2] += weight * src[base + 2];
            }
            let base = (ry * rw + rx) * 3;
            tmp[base] = acc[0];
            tmp[base + 1] = acc[1];
            tmp[base + 2] = acc[2];
        }
    }

    // Vertical pass, written back into the output buffer.
    let mut out = image.clone();
    for ry in 0..rh {
        for rx in 0..rw {
            let mut acc = [0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (ry as i64 + k as i64 - half).clamp(0, rh as i64 - 1) as usize;
                let base = (sy * rw + rx) * 3;
                acc[0] += weight * tmp[base];
                acc[1] += weight * tmp[base + 1];
                acc[2] += weight * tmp[base + 2];
            }
            out.put_pixel(
                region.x + rx as u32,
                region.y + ry as u32,
                Rgb([
                    acc[0].round().clamp(0.0, 255.0) as u8,
                    acc[1].round().clamp(0.0, 255.0) as u8,
                    acc[2].round().clamp(0.0, 255.0) as u8,
                ]),
            );
        }
    }

    out
}

/// Set every pixel inside `region` to opaque black.
///
/// Fully occludes the region; the operation is idempotent and irreversible.
pub fn mask_region(image: &RgbImage, region: Region) -> RgbImage {
    let mut out = image.clone();
    for y in region.y..region.bottom() {
        for x in region.x..region.right() {
            out.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    out
}

/// Replace `region` with the flat mean color of its surroundings.
///
/// The mean is computed over the region inflated by `margin` pixels on each
/// side (clamped to the buffer) — including the region's own interior, which
/// matches the observed behavior this engine reproduces. When the inflated
/// rectangle covers the whole buffer the mean is taken over the entire
/// image. This is a crude removal approximation, not inpainting.
pub fn delete_region(image: &RgbImage, region: Region, margin: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let window = region.expand(margin, width, height);

    let mut sums = [0u64; 3];
    for y in window.y..window.bottom() {
        for x in window.x..window.right() {
            let pixel = image.get_pixel(x, y);
            sums[0] += pixel[0] as u64;
            sums[1] += pixel[1] as u64;
            sums[2] += pixel[2] as u64;
        }
    }
    let count = (window.width as u64) * (window.height as u64);
    let mean = Rgb([
        ((sums[0] as f64 / count as f64).round() as u64).min(255) as u8,
        ((sums[1] as f64 / count as f64).round() as u64).min(255) as u8,
        ((sums[2] as f64 / count as f64).round() as u64).min(255) as u8,
    ]);

    let mut out = image.clone();
    for y in region.y..region.bottom() {
        for x in region.x..region.right() {
            out.put_pixel(x, y, mean);
        }
    }
    out
}

/// Return a new buffer containing exactly the pixels of `region`.
///
/// The source image is left untouched; the result has the region's
/// dimensions.
pub fn crop_region(image: &RgbImage, region: Region) -> RgbImage {
    imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image()
}

/// Clamp a requested kernel size to the legal odd range.
fn normalize_kernel_size(requested: u32) -> u32 {
    let size = requested.max(MIN_KERNEL);
    if size % 2 == 0 { size + 1 } else { size }
}

/// Normalized 1-D Gaussian kernel with sigma derived from the kernel size.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i64;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for value in &mut kernel {
        *value /= sum;
    }
    kernel
}

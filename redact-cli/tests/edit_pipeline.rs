//! Full detect-and-edit runs against a real ONNX model.
//!
//! These tests are gated on the model file being present; they skip
//! gracefully on checkouts without the weights.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use serde::Deserialize;
use tempfile::tempdir;
use redact_utils::normalize_path;

const MODEL_REL_PATH: &str = "../models/yolov8n.onnx";

#[derive(Debug, Deserialize)]
struct ImageReport {
    image: String,
    detections: Vec<DetectionRecord>,
    #[serde(default)]
    processed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetectionRecord {
    label: String,
    confidence: f32,
    bbox: [f32; 4],
}

fn ensure_model_path() -> Option<PathBuf> {
    let path = Path::new(MODEL_REL_PATH);
    if !path.exists() {
        eprintln!(
            "skipping test because detection model is missing at {}",
            path.display()
        );
        return None;
    }
    Some(normalize_path(path).expect("normalize_path should succeed"))
}

fn sample_image(path: &Path) -> Result<(), Box<dyn Error>> {
    let img = RgbImage::from_fn(320, 240, |x, y| {
        let r = ((x + y) % 255) as u8;
        Rgb([r, 128, 255u8.saturating_sub(r)])
    });
    img.save(path)?;
    Ok(())
}

#[test]
fn listing_run_produces_json_report() -> Result<(), Box<dyn Error>> {
    let Some(model) = ensure_model_path() else {
        return Ok(());
    };

    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("sample.png");
    let json_path = work_dir.path().join("out.json");
    sample_image(&image_path)?;

    Command::cargo_bin("redact-cli")?
        .arg("--input")
        .arg(&image_path)
        .arg("--model")
        .arg(&model)
        .arg("--json")
        .arg(&json_path)
        .assert()
        .success();

    let payload = fs::read_to_string(&json_path)?;
    let reports: Vec<ImageReport> = serde_json::from_str(&payload)?;
    assert_eq!(reports.len(), 1, "expected exactly one report entry");
    let expected_image_path = image_path.canonicalize()?.display().to_string();
    assert_eq!(
        reports[0].image, expected_image_path,
        "CLI should echo the image path"
    );
    assert!(reports[0].processed.is_none(), "no tool, no processed file");
    for record in &reports[0].detections {
        assert!(!record.label.is_empty());
        assert!((0.0..=1.0).contains(&record.confidence));
        assert!(record.bbox[0] <= record.bbox[2]);
    }
    Ok(())
}

#[test]
fn global_blur_saves_processed_image_of_same_size() -> Result<(), Box<dyn Error>> {
    let Some(model) = ensure_model_path() else {
        return Ok(());
    };

    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("street.png");
    let output_dir = work_dir.path().join("out");
    let json_path = work_dir.path().join("out.json");
    sample_image(&image_path)?;

    Command::cargo_bin("redact-cli")?
        .arg("--input")
        .arg(&image_path)
        .arg("--model")
        .arg(&model)
        .arg("--tool")
        .arg("blur")
        .arg("--category")
        .arg("faces")
        .arg("--output")
        .arg(&output_dir)
        .arg("--json")
        .arg(&json_path)
        .assert()
        .success();

    let processed_path = output_dir.join("processed_street.png");
    assert!(
        processed_path.exists(),
        "processed image missing at {}",
        processed_path.display()
    );
    let processed = image::open(&processed_path)?;
    assert_eq!((processed.width(), processed.height()), (320, 240));
    Ok(())
}

#[test]
fn hires_export_doubles_dimensions() -> Result<(), Box<dyn Error>> {
    let Some(model) = ensure_model_path() else {
        return Ok(());
    };

    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("street.png");
    let output_dir = work_dir.path().join("out");
    sample_image(&image_path)?;

    Command::cargo_bin("redact-cli")?
        .arg("--input")
        .arg(&image_path)
        .arg("--model")
        .arg(&model)
        .arg("--tool")
        .arg("mask")
        .arg("--category")
        .arg("plates")
        .arg("--output")
        .arg(&output_dir)
        .arg("--hires")
        .assert()
        .success();

    let hires_path = output_dir.join("processed_street_hires.png");
    assert!(
        hires_path.exists(),
        "high-resolution copy missing at {}",
        hires_path.display()
    );
    let hires = image::open(&hires_path)?;
    assert_eq!((hires.width(), hires.height()), (640, 480));
    Ok(())
}

#[test]
fn annotate_writes_preview_with_source_dimensions() -> Result<(), Box<dyn Error>> {
    let Some(model) = ensure_model_path() else {
        return Ok(());
    };

    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("scene.png");
    let annotate_dir = work_dir.path().join("previews");
    sample_image(&image_path)?;

    Command::cargo_bin("redact-cli")?
        .arg("--input")
        .arg(&image_path)
        .arg("--model")
        .arg(&model)
        .arg("--annotate")
        .arg(&annotate_dir)
        .assert()
        .success();

    let preview_path = annotate_dir.join("scene.png");
    assert!(
        preview_path.exists(),
        "preview missing at {}",
        preview_path.display()
    );
    let preview = image::open(&preview_path)?;
    assert_eq!((preview.width(), preview.height()), (320, 240));
    Ok(())
}

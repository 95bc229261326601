use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use image::DynamicImage;
use log::{LevelFilter, info};
use serde::Serialize;

use redact_core::{
    CategoryFilter, Detection, EditDirective, EditOptions, LazyDetector, ModelLayout,
    ObjectDetector, PostprocessConfig, PreprocessConfig, Tool, apply_directive, coco_labels,
    normalize_detections,
};
use redact_utils::{
    config::AppSettings,
    configure_telemetry, init_logging, load_image, normalize_path,
    output::{
        OutputOptions, append_suffix_to_filename, processed_file_name, save_dynamic_image, upscale,
    },
};

mod annotate;
mod args;
mod config;
mod input;

use args::RedactArgs;

#[derive(Debug, Serialize)]
struct SizeRecord {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    label: String,
    confidence: f32,
    bbox: [f32; 4],
    size: SizeRecord,
}

#[derive(Debug, Serialize)]
struct ImageReport {
    image: String,
    detections: Vec<DetectionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    processed: Option<String>,
}

fn main() -> Result<()> {
    init_logging(LevelFilter::Info)?;
    let args = RedactArgs::parse();

    // Cheap validations before any filesystem or model work.
    let tool = args.tool.as_deref().map(str::parse::<Tool>).transpose()?;
    let filter = args.category.as_deref().map(CategoryFilter::parse);
    let layout = parse_layout(&args.layout)?;
    if tool.is_some() && filter.is_none() && args.target.is_none() {
        anyhow::bail!("--tool requires either --target <index> or --category <spec>");
    }

    let mut settings = config::load_settings(args.config.as_ref())?;
    config::apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        parse_level(&settings.telemetry.level),
    );

    let input_path = normalize_path(&args.input)?;
    let labels = load_labels(args.labels.as_ref())?;

    let annotate_dir = if let Some(dir) = args.annotate.as_ref() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create preview directory {}", dir.display()))?;
        Some(normalize_path(dir)?)
    } else {
        None
    };

    let preprocess: PreprocessConfig = (&settings.input).into();
    let postprocess: PostprocessConfig = (&settings.detection).into();
    info!(
        "Using detection model {} at resolution {}x{}",
        args.model.display(),
        settings.input.width,
        settings.input.height
    );
    let oracle = LazyDetector::new(&args.model, preprocess, postprocess, layout, labels);

    let images = input::collect_images(&input_path)?;
    anyhow::ensure!(
        !images.is_empty(),
        "no images found at {} (supported extensions: jpg, jpeg, png, bmp, webp)",
        input_path.display()
    );
    anyhow::ensure!(
        args.target.is_none() || images.len() == 1,
        "--target addresses one detection listing; pass a single image, not {} of them",
        images.len()
    );

    let edit_options = EditOptions {
        blur_kernel: settings.edit.blur_kernel,
        delete_margin: settings.edit.delete_margin,
    };
    let output_options = OutputOptions::from_settings(&settings.output);

    info!("Processing {} image(s)...", images.len());
    let multiple = images.len() > 1;
    let mut reports = Vec::with_capacity(images.len());
    for image_path in &images {
        let report = process_image(ProcessRequest {
            image_path,
            oracle: &oracle,
            tool,
            filter: filter.as_ref(),
            target: args.target,
            output: args.output.as_deref(),
            hires: args.hires,
            multiple,
            settings: &settings,
            edit_options: &edit_options,
            output_options: &output_options,
            annotate_dir: annotate_dir.as_deref(),
        })?;
        reports.push(report);
    }

    let payload = serde_json::to_string_pretty(&reports)?;
    match args.json.as_ref() {
        Some(path) => {
            fs::write(path, &payload)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote detection listing to {}", path.display());
        }
        None => println!("{payload}"),
    }

    Ok(())
}

struct ProcessRequest<'a> {
    image_path: &'a Path,
    oracle: &'a LazyDetector,
    tool: Option<Tool>,
    filter: Option<&'a CategoryFilter>,
    target: Option<usize>,
    output: Option<&'a Path>,
    hires: bool,
    multiple: bool,
    settings: &'a AppSettings,
    edit_options: &'a EditOptions,
    output_options: &'a OutputOptions,
    annotate_dir: Option<&'a Path>,
}

fn process_image(request: ProcessRequest<'_>) -> Result<ImageReport> {
    let image = load_image(request.image_path)?;
    let raw = request.oracle.detect(&image)?;
    let detections =
        normalize_detections(raw, request.settings.detection.confidence_threshold);
    info!(
        "{}: {} detection(s) at or above confidence {:.2}",
        request.image_path.display(),
        detections.len(),
        request.settings.detection.confidence_threshold
    );
    for (index, detection) in detections.iter().enumerate() {
        info!(
            "  [{index}] {} ({:.2})",
            detection.label, detection.confidence
        );
    }

    let annotated = match request.annotate_dir {
        Some(dir) => Some(
            annotate::annotate_image(&image, request.image_path, &detections, dir)?
                .display()
                .to_string(),
        ),
        None => None,
    };

    let mut processed = None;
    if let Some(tool) = request.tool {
        let directive = build_directive(tool, request.filter, request.target, &detections)?;
        let outcome = apply_directive(
            image.to_rgb8(),
            &detections,
            &directive,
            request.edit_options,
        )?;
        info!("Applied {} {} edit(s)", outcome.applied, tool);

        let destination =
            resolve_output_path(request.image_path, request.output, request.multiple)?;
        let edited = DynamicImage::ImageRgb8(outcome.image);
        save_dynamic_image(&edited, &destination, request.output_options)?;
        info!("Saved processed image to {}", destination.display());

        if request.hires {
            let hires_name = destination
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| append_suffix_to_filename(n, "_hires"))
                .unwrap_or_else(|| "processed_hires.png".to_string());
            let hires_path = destination.with_file_name(hires_name);
            let upscaled = upscale(&edited, request.settings.output.hires_scale);
            save_dynamic_image(&upscaled, &hires_path, request.output_options)?;
            info!("Saved high-resolution copy to {}", hires_path.display());
        }

        processed = Some(destination.display().to_string());
    }

    Ok(ImageReport {
        image: request.image_path.display().to_string(),
        detections: detections.iter().map(detection_record).collect(),
        annotated,
        processed,
    })
}

fn detection_record(detection: &Detection) -> DetectionRecord {
    DetectionRecord {
        label: detection.label.clone(),
        confidence: detection.confidence,
        bbox: [
            detection.bbox.x1,
            detection.bbox.y1,
            detection.bbox.x2,
            detection.bbox.y2,
        ],
        size: SizeRecord {
            width: detection.bbox.width(),
            height: detection.bbox.height(),
        },
    }
}

fn build_directive(
    tool: Tool,
    filter: Option<&CategoryFilter>,
    target: Option<usize>,
    detections: &[Detection],
) -> Result<EditDirective> {
    if let Some(filter) = filter {
        return Ok(EditDirective::GlobalCategory {
            filter: filter.clone(),
            tool,
        });
    }
    let index = target.context("--tool requires either --target or --category")?;
    let detection = detections.get(index).cloned().with_context(|| {
        format!(
            "no detection at index {index} ({} available)",
            detections.len()
        )
    })?;
    Ok(EditDirective::SingleObject { detection, tool })
}

fn resolve_output_path(
    image_path: &Path,
    output: Option<&Path>,
    multiple: bool,
) -> Result<PathBuf> {
    let name = image_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image.png");
    let processed = processed_file_name(name);

    match output {
        None => Ok(image_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(processed)),
        Some(path) => {
            let treat_as_dir = multiple || path.is_dir() || path.extension().is_none();
            if treat_as_dir {
                fs::create_dir_all(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Ok(path.join(processed))
            } else {
                if let Some(parent) = path.parent().filter(|p| !p.exists() && !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                Ok(path.to_path_buf())
            }
        }
    }
}

fn parse_layout(token: &str) -> Result<ModelLayout> {
    match token.trim().to_ascii_lowercase().as_str() {
        "anchor-free" | "anchor_free" | "anchorfree" => Ok(ModelLayout::AnchorFree),
        "grid" | "darknet" => Ok(ModelLayout::darknet_tiny_default()),
        other => anyhow::bail!("unknown model layout '{other}' (supported: anchor-free, grid)"),
    }
}

fn load_labels(path: Option<&PathBuf>) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(coco_labels());
    };
    let resolved = normalize_path(path)?;
    let contents = fs::read_to_string(&resolved)
        .with_context(|| format!("failed to read labels from {}", resolved.display()))?;
    let labels: Vec<String> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse labels from {}", resolved.display()))?;
    anyhow::ensure!(
        !labels.is_empty(),
        "label file {} contains no class names",
        resolved.display()
    );
    Ok(labels)
}

fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Debug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redact_core::BoundingBox;

    fn detection(label: &str) -> Detection {
        Detection {
            label: label.to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(10.0, 20.0, 40.0, 80.0),
        }
    }

    #[test]
    fn directive_prefers_category_over_target() {
        let filter = CategoryFilter::faces();
        let directive =
            build_directive(Tool::Blur, Some(&filter), Some(0), &[detection("person")]).unwrap();
        assert!(matches!(directive, EditDirective::GlobalCategory { .. }));
    }

    #[test]
    fn directive_by_index_selects_detection() {
        let detections = vec![detection("person"), detection("car")];
        let directive = build_directive(Tool::Crop, None, Some(1), &detections).unwrap();
        match directive {
            EditDirective::SingleObject { detection, tool } => {
                assert_eq!(detection.label, "car");
                assert_eq!(tool, Tool::Crop);
            }
            other => panic!("unexpected directive {other:?}"),
        }
    }

    #[test]
    fn directive_with_out_of_range_index_fails() {
        let err = build_directive(Tool::Blur, None, Some(3), &[detection("person")]).unwrap_err();
        assert!(format!("{err}").contains("no detection at index 3"));
    }

    #[test]
    fn detection_record_mirrors_bbox_and_size() {
        let record = detection_record(&detection("person"));
        assert_eq!(record.bbox, [10.0, 20.0, 40.0, 80.0]);
        assert_eq!(record.size.width, 30.0);
        assert_eq!(record.size.height, 60.0);
    }

    #[test]
    fn layout_parses_both_families() {
        assert_eq!(parse_layout("anchor-free").unwrap(), ModelLayout::AnchorFree);
        assert!(matches!(
            parse_layout("grid").unwrap(),
            ModelLayout::GridAnchors { .. }
        ));
        assert!(parse_layout("transformer").is_err());
    }

    #[test]
    fn default_output_lands_beside_input() {
        let path = resolve_output_path(Path::new("/photos/street.png"), None, false).unwrap();
        assert_eq!(path, Path::new("/photos/processed_street.png"));
    }
}

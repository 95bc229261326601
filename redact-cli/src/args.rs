//! Command-line argument definitions for redact-cli.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Detect objects in images and apply region edits to them.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct RedactArgs {
    /// Path to an image file or a directory containing images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to the detection ONNX model.
    #[arg(short, long, default_value = "models/yolov8n.onnx")]
    pub model: PathBuf,

    /// Model output layout: `anchor-free` (many-class) or `grid` (darknet-style).
    #[arg(long, default_value = "anchor-free", value_name = "LAYOUT")]
    pub layout: String,

    /// JSON array of class labels for the model (defaults to the built-in COCO set).
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Optional settings JSON. Defaults to `config/redact_settings.json` when present, otherwise built-in parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Edit to apply: blur, mask, delete, or crop.
    #[arg(short, long)]
    pub tool: Option<String>,

    /// Index of the detection to edit, from the printed listing. Requires a single input image.
    #[arg(long, requires = "tool", conflicts_with = "category")]
    pub target: Option<usize>,

    /// Category to edit globally: `faces`, `plates`, or a comma-separated label list.
    #[arg(long, requires = "tool")]
    pub category: Option<String>,

    /// Write the detection listing to a JSON file instead of stdout.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Directory to write preview images with detection boxes overlaid.
    #[arg(long)]
    pub annotate: Option<PathBuf>,

    /// Output file or directory for processed images (default: `processed_<name>` beside each input).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Additionally save an upscaled high-resolution copy of each processed image.
    #[arg(long, action = ArgAction::SetTrue)]
    pub hires: bool,

    /// Override the user-facing confidence threshold.
    #[arg(long)]
    pub confidence_threshold: Option<f32>,

    /// Override the decode-stage score floor.
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Override the NMS threshold.
    #[arg(long)]
    pub nms_threshold: Option<f32>,

    /// Override the top_k limit.
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Override model input width (pixels).
    #[arg(long)]
    pub width: Option<u32>,

    /// Override model input height (pixels).
    #[arg(long)]
    pub height: Option<u32>,

    /// Resize quality mode: `quality` (Triangle) or `speed` (fast Nearest).
    #[arg(long, value_name = "MODE")]
    pub resize_quality: Option<redact_utils::config::ResizeQuality>,

    /// Override the Gaussian kernel size for blur edits.
    #[arg(long)]
    pub blur_kernel: Option<u32>,

    /// Override the border margin for delete-fill averaging.
    #[arg(long)]
    pub delete_margin: Option<u32>,

    /// Enable telemetry timing logs (defaults to the settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,
}

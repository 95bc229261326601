//! Shared configuration types consumed across the redact workspace.
//!
//! These structures provide a common representation for detection, model
//! input, edit, and output settings that can be serialized to disk and
//! overridden from the command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Detection parameters shared by the oracle adapter and the normalizer.
///
/// `score_threshold` controls the decode-stage filtering of raw model rows;
/// `confidence_threshold` is the user-facing cut applied when detections are
/// normalized for selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum user-facing confidence for a detection to be listed.
    pub confidence_threshold: f32,
    /// Decode-stage score floor applied before non-maximum suppression.
    pub score_threshold: f32,
    /// Threshold for non-maximum suppression to merge overlapping boxes.
    pub nms_threshold: f32,
    /// The maximum number of detections to keep after sorting by score.
    pub top_k: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            score_threshold: 0.25,
            nms_threshold: 0.45,
            top_k: 300,
        }
    }
}

/// Resize filter preference when preparing model input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeQuality {
    /// Preserve visual quality when resizing (Triangle filter).
    Quality,
    /// Prioritize throughput for batch inference (default, Nearest filter).
    #[default]
    Speed,
}

impl fmt::Display for ResizeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ResizeQuality::Quality => "quality",
                ResizeQuality::Speed => "speed",
            }
        )
    }
}

impl FromStr for ResizeQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(ResizeQuality::Quality),
            "speed" => Ok(ResizeQuality::Speed),
            other => Err(format!(
                "invalid resize quality '{other}'; expected 'quality' or 'speed'"
            )),
        }
    }
}

/// Inference input resolution in pixels (width x height).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputDimensions {
    pub width: u32,
    pub height: u32,
    /// Choose between quality-focused or speed-focused resizing.
    pub resize_quality: ResizeQuality,
}

impl Default for InputDimensions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            resize_quality: ResizeQuality::Speed,
        }
    }
}

/// Default parameters for the region transforms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditSettings {
    /// Gaussian kernel size for blur edits (clamped to >= 3, forced odd).
    pub blur_kernel: u32,
    /// Border margin in pixels for delete-fill averaging.
    pub delete_margin: u32,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            blur_kernel: 31,
            delete_margin: 5,
        }
    }
}

/// Settings for saving processed images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Output format: "png", "jpeg", or "webp".
    pub format: String,
    /// JPEG quality (1-100, only used when format is jpeg).
    pub jpeg_quality: u8,
    /// Automatically detect output format from the file extension.
    pub auto_detect_format: bool,
    /// Uniform upscale factor for high-resolution export.
    pub hires_scale: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            jpeg_quality: 90,
            auto_detect_format: true,
            hires_scale: 2,
        }
    }
}

/// Telemetry preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Emit timing logs for pipeline stages.
    pub enabled: bool,
    /// Maximum level for telemetry entries (error..trace, or "off").
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

/// Top-level application settings persisted as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub detection: DetectionSettings,
    pub input: InputDimensions,
    pub edit: EditSettings,
    pub output: OutputSettings,
    pub telemetry: TelemetrySettings,
}

impl AppSettings {
    /// Load settings from a JSON file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let mut settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings from {}", path.display()))?;
        settings.sanitize();
        Ok(settings)
    }

    /// Persist settings to a JSON file, creating parent directories as needed.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        Ok(())
    }

    /// Clamp values to sensible ranges.
    pub fn sanitize(&mut self) {
        self.detection.confidence_threshold = self.detection.confidence_threshold.clamp(0.0, 1.0);
        self.detection.score_threshold = self.detection.score_threshold.clamp(0.0, 1.0);
        self.detection.nms_threshold = self.detection.nms_threshold.clamp(0.0, 1.0);
        self.detection.top_k = self.detection.top_k.max(1);
        self.input.width = self.input.width.max(32);
        self.input.height = self.input.height.max(32);
        self.edit.blur_kernel = self.edit.blur_kernel.max(3);
        self.output.jpeg_quality = self.output.jpeg_quality.clamp(1, 100);
        self.output.hires_scale = self.output.hires_scale.clamp(1, 8);
    }
}

/// Default location of the persisted settings file.
pub fn default_settings_path() -> PathBuf {
    PathBuf::from("config").join("redact_settings.json")
}

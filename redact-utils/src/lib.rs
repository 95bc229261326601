//! Common helpers shared across the redact crates.

/// Application configuration and settings management.
pub mod config;
/// Test fixture loading, path resolution, and synthetic image builders.
pub mod fixtures;
/// Image loading, resizing, and tensor conversion.
pub mod image_utils;
/// Image output helpers (encoding, saving, upscaling, naming).
pub mod output;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use fixtures::{
    fixture_path, fixtures_dir, gradient_image, load_fixture_image, load_fixture_json, solid_image,
};
pub use image_utils::{compute_resize_scales, load_image, resize_image, rgb_to_chw};
pub use output::{
    ImageFormatHint, OutputOptions, append_suffix_to_filename, processed_file_name,
    save_dynamic_image, upscale,
};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    telemetry_level, timing_guard, timing_guard_if,
};

/// Initialize logging once for CLI environments.
///
/// This function respects the `RUST_LOG` environment variable if it is set.
/// Otherwise, it falls back to the provided default filter level.
///
/// # Arguments
///
/// * `default_filter` - The `LevelFilter` to use if `RUST_LOG` is not set.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module("redact::telemetry", LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
///
/// # Arguments
///
/// * `path` - The path to validate and normalize.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}

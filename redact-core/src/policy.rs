//! Edit directives and the policy that applies them to an image.
//!
//! The policy is the only place that maps detections + user intent onto the
//! region transforms. State is threaded explicitly: the caller passes the
//! current buffer and the current detection set in, and receives the edited
//! buffer back — there is no ambient session state.

use std::{fmt, str::FromStr};

use image::RgbImage;
use log::{debug, warn};

use crate::{
    detection::{CategoryFilter, Detection},
    error::EditError,
    geometry::Region,
    transforms,
};

/// Region edit applied to a detection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Gaussian-smooth the box.
    Blur,
    /// Fill the box with black.
    Mask,
    /// Replace the box with the mean color of its surroundings.
    Delete,
    /// Cut the image down to the box.
    Crop,
}

impl FromStr for Tool {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blur" => Ok(Self::Blur),
            "mask" | "square" => Ok(Self::Mask),
            "delete" => Ok(Self::Delete),
            "crop" => Ok(Self::Crop),
            other => Err(EditError::InvalidTool(other.to_string())),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blur => "blur",
            Self::Mask => "mask",
            Self::Delete => "delete",
            Self::Crop => "crop",
        };
        write!(f, "{name}")
    }
}

/// What the user asked for: one selected detection, or every detection in a
/// category.
///
/// Directives reference detections by value; a detection set goes stale the
/// moment the underlying buffer changes dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum EditDirective {
    /// Apply `tool` to a single selected detection.
    SingleObject { detection: Detection, tool: Tool },
    /// Apply `tool` to every detection whose label matches `filter`.
    GlobalCategory { filter: CategoryFilter, tool: Tool },
}

/// Tunable transform parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOptions {
    /// Gaussian kernel size for blur edits.
    pub blur_kernel: u32,
    /// Border margin in pixels for delete-fill averaging.
    pub delete_margin: u32,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            blur_kernel: 31,
            delete_margin: 5,
        }
    }
}

/// Result of applying a directive.
#[derive(Debug)]
pub struct EditOutcome {
    /// The edited buffer (or the unchanged input when nothing applied).
    pub image: RgbImage,
    /// Number of boxes actually edited.
    pub applied: usize,
}

/// Apply an edit directive to an image.
///
/// For a single-object directive the detection's box is clamped to the
/// buffer and the tool dispatched; a box that degenerates after clamping is
/// a no-op for blur/mask/delete (`applied == 0`) and an
/// [`EditError::InvalidRegion`] for crop.
///
/// For a global directive every matching detection is edited in oracle
/// order, each edit building on the previous one's output — overlapping
/// boxes may partially overwrite earlier results, which is accepted. Zero
/// matches returns the buffer unchanged with `applied == 0`. Edits are not
/// transactional: a crop failure mid-sequence keeps the edits already made.
///
/// # Arguments
///
/// * `image` - The current buffer; ownership transfers to the outcome.
/// * `detections` - The normalized detection set for this buffer.
/// * `directive` - The user's intent.
/// * `options` - Transform parameters (kernel size, delete margin).
pub fn apply_directive(
    image: RgbImage,
    detections: &[Detection],
    directive: &EditDirective,
    options: &EditOptions,
) -> Result<EditOutcome, EditError> {
    match directive {
        EditDirective::SingleObject { detection, tool } => {
            apply_single(image, detection, *tool, options)
        }
        EditDirective::GlobalCategory { filter, tool } => {
            let targets: Vec<&Detection> = detections
                .iter()
                .filter(|d| filter.matches(&d.label))
                .collect();
            if targets.is_empty() {
                debug!(
                    "no detections matched category [{}]; image unchanged",
                    filter.labels().join(", ")
                );
                return Ok(EditOutcome { image, applied: 0 });
            }

            let mut current = image;
            let mut applied = 0usize;
            for detection in targets {
                let outcome = apply_single(current, detection, *tool, options)?;
                current = outcome.image;
                applied += outcome.applied;
            }
            Ok(EditOutcome {
                image: current,
                applied,
            })
        }
    }
}

fn apply_single(
    image: RgbImage,
    detection: &Detection,
    tool: Tool,
    options: &EditOptions,
) -> Result<EditOutcome, EditError> {
    let (width, height) = image.dimensions();
    let Some(region) = detection.bbox.clamp_to(width, height) else {
        if tool == Tool::Crop {
            return Err(EditError::InvalidRegion);
        }
        warn!(
            "skipping {} on '{}': box degenerates after clamping to {}x{}",
            tool, detection.label, width, height
        );
        return Ok(EditOutcome { image, applied: 0 });
    };

    let edited = dispatch_tool(&image, region, tool, options);
    Ok(EditOutcome {
        image: edited,
        applied: 1,
    })
}

fn dispatch_tool(image: &RgbImage, region: Region, tool: Tool, options: &EditOptions) -> RgbImage {
    match tool {
        Tool::Blur => transforms::blur_region(image, region, options.blur_kernel),
        Tool::Mask => transforms::mask_region(image, region),
        Tool::Delete => transforms::delete_region(image, region, options.delete_margin),
        Tool::Crop => transforms::crop_region(image, region),
    }
}

//! Typed engine errors.

use thiserror::Error;

/// Failures surfaced by the region-edit engine.
///
/// The engine never retries; every failure is returned to the caller, which
/// owns user-facing messaging. A global directive that matches zero
/// detections is not an error (it reports zero applied edits).
#[derive(Debug, Error)]
pub enum EditError {
    /// The target box is empty or fully outside the image after clamping.
    /// Fatal for crop; blur/mask/delete treat it as a logged no-op.
    #[error("region is empty or fully outside the image after clamping")]
    InvalidRegion,

    /// An unrecognized tool tag reached the parse boundary.
    #[error("unrecognized tool '{0}' (expected blur, mask, delete, or crop)")]
    InvalidTool(String),

    /// The detection backend failed to initialize or run.
    #[error("detection backend unavailable: {0}")]
    OracleUnavailable(String),
}

//! Bounding boxes and clamped pixel regions.
//!
//! Detectors emit corner-format boxes in floating-point source coordinates;
//! those may be unordered or extend past the image. Every transform operates
//! on a [`Region`], an integer rectangle guaranteed to lie inside a specific
//! buffer, produced by [`BoundingBox::clamp_to`].

use serde::{Deserialize, Serialize};

/// Axis-aligned corner-format bounding box in source image coordinates.
///
/// Coordinates are not validated on construction; clamp before indexing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// The x-coordinate of one horizontal edge (nominally the left).
    pub x1: f32,
    /// The y-coordinate of one vertical edge (nominally the top).
    pub y1: f32,
    /// The x-coordinate of the opposite horizontal edge.
    pub x2: f32,
    /// The y-coordinate of the opposite vertical edge.
    pub y2: f32,
}

impl BoundingBox {
    /// Creates a new box from corner coordinates.
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Width of the box (absolute, order-insensitive).
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).abs()
    }

    /// Height of the box (absolute, order-insensitive).
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).abs()
    }

    /// Area of the box.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Calculates the Intersection over Union (IoU) with another box.
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x1.min(self.x2).max(other.x1.min(other.x2));
        let y1 = self.y1.min(self.y2).max(other.y1.min(other.y2));
        let x2 = self.x1.max(self.x2).min(other.x1.max(other.x2));
        let y2 = self.y1.max(self.y2).min(other.y1.max(other.y2));

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }

    /// Clamp the box to a buffer of `width` x `height` pixels.
    ///
    /// Corner order is normalized first, then coordinates are clamped to the
    /// buffer bounds and truncated to integers. Returns `None` when the box
    /// degenerates to zero area after clamping (fully outside the buffer or
    /// collapsed to a line).
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        if width == 0 || height == 0 {
            return None;
        }

        let left = self.x1.min(self.x2).max(0.0);
        let top = self.y1.min(self.y2).max(0.0);
        let right = self.x1.max(self.x2).min(width as f32);
        let bottom = self.y1.max(self.y2).min(height as f32);

        let x = left.floor() as u32;
        let y = top.floor() as u32;
        let right = (right.ceil() as u32).min(width);
        let bottom = (bottom.ceil() as u32).min(height);

        if right <= x || bottom <= y {
            return None;
        }

        Some(Region {
            x,
            y,
            width: right - x,
            height: bottom - y,
        })
    }
}

/// Integer rectangle guaranteed to lie inside the buffer it was clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels (always >= 1).
    pub width: u32,
    /// Height in pixels (always >= 1).
    pub height: u32,
}

impl Region {
    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Inflate the region by `margin` pixels on each side, clamped to a
    /// buffer of `width` x `height`.
    pub fn expand(&self, margin: u32, width: u32, height: u32) -> Region {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        Region {
            x,
            y,
            width: (self.right().saturating_add(margin)).min(width) - x,
            height: (self.bottom().saturating_add(margin)).min(height) - y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_interior_box() {
        let bbox = BoundingBox::new(10.0, 10.0, 30.0, 30.0);
        let region = bbox.clamp_to(100, 100).expect("valid region");
        assert_eq!(
            region,
            Region {
                x: 10,
                y: 10,
                width: 20,
                height: 20
            }
        );
    }

    #[test]
    fn clamp_normalizes_reversed_corners() {
        let bbox = BoundingBox::new(30.0, 30.0, 10.0, 10.0);
        let region = bbox.clamp_to(100, 100).expect("valid region");
        assert_eq!(region.x, 10);
        assert_eq!(region.width, 20);
    }

    #[test]
    fn clamp_trims_overhanging_box() {
        let bbox = BoundingBox::new(-5.0, 90.0, 20.0, 130.0);
        let region = bbox.clamp_to(100, 100).expect("valid region");
        assert_eq!(
            region,
            Region {
                x: 0,
                y: 90,
                width: 20,
                height: 10
            }
        );
    }

    #[test]
    fn clamp_rejects_fully_outside_box() {
        let bbox = BoundingBox::new(120.0, 10.0, 150.0, 40.0);
        assert!(bbox.clamp_to(100, 100).is_none());
    }

    #[test]
    fn clamp_rejects_zero_area_box() {
        let bbox = BoundingBox::new(10.0, 10.0, 10.0, 40.0);
        assert!(bbox.clamp_to(100, 100).is_none());
    }

    #[test]
    fn iou_partial_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        // intersection 25, union 175
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-6);
    }

    #[test]
    fn iou_disjoint_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn expand_clamps_to_buffer_edges() {
        let region = Region {
            x: 2,
            y: 2,
            width: 10,
            height: 10,
        };
        let expanded = region.expand(5, 100, 13);
        assert_eq!(expanded.x, 0);
        assert_eq!(expanded.y, 0);
        assert_eq!(expanded.right(), 17);
        assert_eq!(expanded.bottom(), 13);
    }
}

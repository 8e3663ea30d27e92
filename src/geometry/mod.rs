//! Coordinate normalization between document space and image-pixel space.
//!
//! The extraction tool reports bounding boxes in its own page coordinate
//! system; the rendered page images live in pixel space. [`normalize_box`]
//! maps one document-space rectangle into pixel space given the page bounds
//! and the image dimensions:
//!
//! ```text
//! x_ratio = image_width  / (bounds.right  - bounds.left)
//! y_ratio = image_height / (bounds.bottom - bounds.top)
//! pixel_left = (doc_left - bounds.left) * x_ratio   (and so on per corner)
//! ```
//!
//! The mapping is a pure function with no ordering dependency. Degenerate
//! page bounds (zero or negative extent) fail with [`GeometryError`].

use crate::error::GeometryError;
use crate::extract::DocBounds;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in image-pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PixelBox {
    /// Left edge.
    #[inline]
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Top edge.
    #[inline]
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Vertical midpoint, used by the line-grouping heuristic.
    #[inline]
    pub fn mid_y(&self) -> f64 {
        (self.top() + self.bottom()) / 2.0
    }

    /// Bounding rectangle of two boxes.
    pub fn union(&self, other: &Self) -> Self {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self {
            x: left,
            y: top,
            w: right - left,
            h: bottom - top,
        }
    }
}

/// Scaling ratios for one page, computed once and applied per object.
#[derive(Debug, Clone, Copy)]
pub struct PageScale {
    bounds_left: f64,
    bounds_top: f64,
    x_ratio: f64,
    y_ratio: f64,
}

impl PageScale {
    /// Build the document-to-pixel mapping for one page.
    ///
    /// # Errors
    ///
    /// Fails when the page bounds have zero or negative extent.
    pub fn new(
        bounds: &DocBounds,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, GeometryError> {
        let width = bounds.width();
        let height = bounds.height();

        if width <= 0.0 {
            return Err(GeometryError::DegenerateWidth { width });
        }
        if height <= 0.0 {
            return Err(GeometryError::DegenerateHeight { height });
        }

        Ok(Self {
            bounds_left: bounds.left,
            bounds_top: bounds.top,
            x_ratio: f64::from(image_width) / width,
            y_ratio: f64::from(image_height) / height,
        })
    }

    /// Map one document-space rectangle into pixel space.
    pub fn normalize_box(&self, doc_box: &DocBounds) -> PixelBox {
        let left = (doc_box.left - self.bounds_left) * self.x_ratio;
        let top = (doc_box.top - self.bounds_top) * self.y_ratio;
        let right = (doc_box.right - self.bounds_left) * self.x_ratio;
        let bottom = (doc_box.bottom - self.bounds_top) * self.y_ratio;

        PixelBox {
            x: left,
            y: top,
            w: right - left,
            h: bottom - top,
        }
    }

    /// Inverse of [`normalize_box`]: map a pixel-space rectangle back into
    /// document space.
    pub fn denormalize_box(&self, pixel_box: &PixelBox) -> DocBounds {
        DocBounds {
            left: pixel_box.left() / self.x_ratio + self.bounds_left,
            top: pixel_box.top() / self.y_ratio + self.bounds_top,
            right: pixel_box.right() / self.x_ratio + self.bounds_left,
            bottom: pixel_box.bottom() / self.y_ratio + self.bounds_top,
        }
    }
}

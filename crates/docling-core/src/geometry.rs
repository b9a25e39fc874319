//! Page-coordinate geometry shared by pages and blocks.

use serde::{Deserialize, Serialize};

/// A point in page coordinates (top-left origin, points).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate in points.
    pub x: f64,
    /// Vertical coordinate in points.
    pub y: f64,
}

impl Point {
    /// Creates a new point.
    #[inline]
    #[must_use = "creates a new point"]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Four-corner bounding polygon in page coordinates, ordered clockwise from
/// the top-left corner: `[top_left, top_right, bottom_right, bottom_left]`.
///
/// Most geometry in this pipeline is axis-aligned (no rotation), so the
/// common constructors take an axis-aligned rectangle; the four-point
/// representation exists so skewed regions (rotated scans, sheared OCR
/// boxes) can still be carried without lossy normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// The four corners, clockwise from top-left.
    pub points: [Point; 4],
}

impl Polygon {
    /// Builds an axis-aligned polygon from a rectangle.
    #[must_use = "creates a new polygon"]
    pub const fn from_rect(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            points: [
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ],
        }
    }

    /// Axis-aligned bounding rectangle `(left, top, right, bottom)` that
    /// encloses the polygon, regardless of whether it is itself axis-aligned.
    #[must_use = "returns the axis-aligned bounding rectangle"]
    pub fn bounding_rect(&self) -> (f64, f64, f64, f64) {
        let xs = self.points.iter().map(|p| p.x);
        let ys = self.points.iter().map(|p| p.y);
        let left = xs.clone().fold(f64::INFINITY, f64::min);
        let right = xs.fold(f64::NEG_INFINITY, f64::max);
        let top = ys.clone().fold(f64::INFINITY, f64::min);
        let bottom = ys.fold(f64::NEG_INFINITY, f64::max);
        (left, top, right, bottom)
    }

    /// Width of the axis-aligned bounding rectangle.
    #[must_use = "returns the width"]
    pub fn width(&self) -> f64 {
        let (l, _, r, _) = self.bounding_rect();
        r - l
    }

    /// Height of the axis-aligned bounding rectangle.
    #[must_use = "returns the height"]
    pub fn height(&self) -> f64 {
        let (_, t, _, b) = self.bounding_rect();
        b - t
    }

    /// Horizontal midpoint of the bounding rectangle, used by the
    /// multi-column reading-order detector to cluster blocks into columns.
    #[must_use = "returns the x midpoint"]
    pub fn x_mid(&self) -> f64 {
        let (l, _, r, _) = self.bounding_rect();
        (l + r) / 2.0
    }

    /// Top edge of the bounding rectangle, used to sort blocks within a column.
    #[must_use = "returns the top edge"]
    pub fn y_top(&self) -> f64 {
        self.bounding_rect().1
    }

    /// Area of the axis-aligned bounding rectangle.
    #[must_use = "returns the area"]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Fraction of `self`'s area that falls within `other`'s bounding
    /// rectangle, used for geometry-consistency checks (invariant 4) and
    /// candidate-to-text overlap matching in table extraction.
    #[must_use = "returns the containment ratio"]
    pub fn containment_ratio(&self, other: &Self) -> f64 {
        let (sl, st, sr, sb) = self.bounding_rect();
        let (ol, ot, or_, ob) = other.bounding_rect();
        let ix_l = sl.max(ol);
        let ix_t = st.max(ot);
        let ix_r = sr.min(or_);
        let ix_b = sb.min(ob);
        let iw = (ix_r - ix_l).max(0.0);
        let ih = (ix_b - ix_t).max(0.0);
        let intersection = iw * ih;
        let self_area = self.area();
        if self_area <= 0.0 {
            0.0
        } else {
            intersection / self_area
        }
    }

    /// Whether `self` is contained within `parent` within the 5% tolerance
    /// required by invariant 4 (geometry consistency).
    #[must_use = "returns whether self is contained within parent"]
    pub fn is_contained_within(&self, parent: &Self, tolerance: f64) -> bool {
        self.containment_ratio(parent) >= 1.0 - tolerance
    }
}

/// Pixel dimensions of a rasterized page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

impl Size {
    /// Creates a new size.
    #[inline]
    #[must_use = "creates a new size"]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_rect_of_axis_aligned_polygon() {
        let poly = Polygon::from_rect(10.0, 20.0, 110.0, 70.0);
        assert_eq!(poly.bounding_rect(), (10.0, 20.0, 110.0, 70.0));
        assert_eq!(poly.width(), 100.0);
        assert_eq!(poly.height(), 50.0);
    }

    #[test]
    fn containment_ratio_full_containment_is_one() {
        let parent = Polygon::from_rect(0.0, 0.0, 100.0, 100.0);
        let child = Polygon::from_rect(10.0, 10.0, 50.0, 50.0);
        assert!((child.containment_ratio(&parent) - 1.0).abs() < 1e-9);
        assert!(child.is_contained_within(&parent, 0.05));
    }

    #[test]
    fn containment_ratio_partial_overlap() {
        let parent = Polygon::from_rect(0.0, 0.0, 100.0, 100.0);
        // Half of the child sticks out to the right.
        let child = Polygon::from_rect(80.0, 0.0, 120.0, 50.0);
        let ratio = child.containment_ratio(&parent);
        assert!((ratio - 0.5).abs() < 1e-9, "ratio was {ratio}");
        assert!(!child.is_contained_within(&parent, 0.05));
    }
}

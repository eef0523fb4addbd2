//! Axis-aligned rectangles in page-local pixel space.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box `(x0, y0, x1, y1)`.
///
/// Boxes built through [`BoundingBox::new`] or deserialized from JSON are
/// normalized so that `x0 <= x1` and `y0 <= y1`. The y axis points down, as
/// in image space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// Create a normalized box from two corners given in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Build a box from a coordinate slice, rejecting fewer than four values.
    ///
    /// Extra coordinates are ignored.
    pub fn from_slice(coords: &[f32]) -> crate::Result<Self> {
        match coords {
            [x0, y0, x1, y1, ..] => Ok(Self::new(*x0, *y0, *x1, *y1)),
            _ => Err(Error::InvalidBoundingBox { len: coords.len() }),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Center point `(x, y)`.
    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Midpoint of the bottom edge `(x, y1)`.
    pub fn bottom_center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, self.y1)
    }

    /// Area of the overlap with `other`, zero when disjoint.
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let w = self.x1.min(other.x1) - self.x0.max(other.x0);
        let h = self.y1.min(other.y1) - self.y0.max(other.y0);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Fraction of this box covered by `other`.
    ///
    /// Returns 0 when either box has zero area.
    pub fn intersection_pct(&self, other: &BoundingBox) -> f32 {
        let area = self.area();
        if area <= 0.0 || other.area() <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / area
    }

    /// Whether `other` lies entirely within this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Shift the box by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> BoundingBox {
        BoundingBox {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    /// Map the box from the `from` coordinate space into the `to` space.
    ///
    /// Both spaces are given by their extents; a degenerate source extent
    /// leaves the box unchanged.
    pub fn rescale(&self, from: &BoundingBox, to: &BoundingBox) -> BoundingBox {
        if from.width() <= 0.0 || from.height() <= 0.0 {
            return *self;
        }
        let sx = to.width() / from.width();
        let sy = to.height() / from.height();
        BoundingBox::new(
            to.x0 + (self.x0 - from.x0) * sx,
            to.y0 + (self.y0 - from.y0) * sy,
            to.x0 + (self.x1 - from.x0) * sx,
            to.y0 + (self.y1 - from.y0) * sy,
        )
    }

    /// Rotate a box measured in an image rotated by `angle` degrees back into
    /// the unrotated frame. `size` is the `(width, height)` of the rotated image.
    ///
    /// Angles other than 90, 180 and 270 leave the box unchanged.
    pub fn rotate(&self, angle: i32, size: (f32, f32)) -> BoundingBox {
        let (w, h) = size;
        match angle.rem_euclid(360) {
            90 => BoundingBox::new(h - self.y1, self.x0, h - self.y0, self.x1),
            180 => BoundingBox::new(w - self.x1, h - self.y1, w - self.x0, h - self.y0),
            270 => BoundingBox::new(self.y0, w - self.x1, self.y1, w - self.x0),
            _ => *self,
        }
    }
}

impl TryFrom<Vec<f32>> for BoundingBox {
    type Error = Error;

    fn try_from(coords: Vec<f32>) -> Result<Self, Self::Error> {
        BoundingBox::from_slice(&coords)
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// Overlap of two 1-D ranges relative to the shorter one.
///
/// Returns 0 for disjoint ranges or when either range is empty.
pub fn range_overlap(a: (f32, f32), b: (f32, f32)) -> f32 {
    let inter = a.1.min(b.1) - a.0.max(b.0);
    let shorter = (a.1 - a.0).min(b.1 - b.0);
    if inter <= 0.0 || shorter <= 0.0 {
        0.0
    } else {
        inter / shorter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let b = BoundingBox::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(b, BoundingBox::new(0.0, 5.0, 10.0, 20.0));
        assert_eq!(b.width(), 10.0);
        assert_eq!(b.height(), 15.0);
    }

    #[test]
    fn test_from_slice_rejects_short_input() {
        assert!(matches!(
            BoundingBox::from_slice(&[1.0, 2.0, 3.0]),
            Err(Error::InvalidBoundingBox { len: 3 })
        ));
        assert!(BoundingBox::from_slice(&[0.0, 0.0, 1.0, 1.0]).is_ok());
    }

    #[test]
    fn test_deserialize_array() {
        let b: BoundingBox = serde_json::from_str("[4, 3, 2, 1]").unwrap();
        assert_eq!(b, BoundingBox::new(2.0, 1.0, 4.0, 3.0));
        assert!(serde_json::from_str::<BoundingBox>("[1, 2]").is_err());
        assert_eq!(serde_json::to_string(&b).unwrap(), "[2.0,1.0,4.0,3.0]");
    }

    #[test]
    fn test_intersection_pct() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.intersection_pct(&b) - 0.5).abs() < 1e-6);

        let inner = BoundingBox::new(2.0, 2.0, 4.0, 4.0);
        assert!((inner.intersection_pct(&a) - 1.0).abs() < 1e-6);
        assert!(a.contains(&inner));

        let flat = BoundingBox::new(0.0, 5.0, 10.0, 5.0);
        assert_eq!(a.intersection_pct(&flat), 0.0);
        assert_eq!(flat.intersection_pct(&a), 0.0);
    }

    #[test]
    fn test_rescale() {
        let page = BoundingBox::new(0.0, 0.0, 100.0, 200.0);
        let image = BoundingBox::new(0.0, 0.0, 200.0, 400.0);
        let b = BoundingBox::new(10.0, 10.0, 20.0, 30.0);
        assert_eq!(b.rescale(&page, &image), BoundingBox::new(20.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_rotate_quarter_turns() {
        let b = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        let size = (10.0, 20.0);
        assert_eq!(b.rotate(0, size), b);
        assert_eq!(b.rotate(90, size), BoundingBox::new(16.0, 1.0, 18.0, 3.0));
        assert_eq!(b.rotate(180, size), BoundingBox::new(7.0, 16.0, 9.0, 18.0));
        assert_eq!(b.rotate(270, size), BoundingBox::new(2.0, 7.0, 4.0, 9.0));
    }

    #[test]
    fn test_range_overlap() {
        assert_eq!(range_overlap((0.0, 10.0), (20.0, 30.0)), 0.0);
        assert!((range_overlap((0.0, 10.0), (5.0, 30.0)) - 0.5).abs() < 1e-6);
        assert_eq!(range_overlap((0.0, 0.0), (0.0, 10.0)), 0.0);
    }
}

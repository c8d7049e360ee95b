//! Axis-aligned boxes in corner form.

use crate::util::math::clamp_unit;

/// Axis-aligned rectangle `(xmin, ymin, xmax, ymax)`.
///
/// Decoded boxes live in normalized image coordinates, but the type itself
/// makes no assumption about the coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BBox {
    /// Creates a box from its corners.
    pub const fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Creates a box from its center and size.
    pub fn from_center_size(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            xmin: cx - width / 2.0,
            ymin: cy - height / 2.0,
            xmax: cx + width / 2.0,
            ymax: cy + height / 2.0,
        }
    }

    /// Returns the corners as `[xmin, ymin, xmax, ymax]`.
    pub fn to_array(self) -> [f32; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// Signed width; negative for inverted boxes.
    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    /// Signed height; negative for inverted boxes.
    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Center point as `(cx, cy)`.
    pub fn center(&self) -> (f32, f32) {
        (
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    /// Area of the box; inverted boxes have zero area.
    pub fn area(&self) -> f32 {
        if self.xmax < self.xmin || self.ymax < self.ymin {
            return 0.0;
        }
        self.width() * self.height()
    }

    /// Area of the overlap with `other`, zero when disjoint.
    pub fn intersection(&self, other: &BBox) -> f32 {
        let w = self.xmax.min(other.xmax) - self.xmin.max(other.xmin);
        let h = self.ymax.min(other.ymax) - self.ymin.max(other.ymin);
        if w <= 0.0 || h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    /// Intersection-over-Union with `other`.
    ///
    /// Returns 0 for disjoint boxes and for degenerate pairs whose union has
    /// no area.
    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection(other);
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }

    /// Clamps every coordinate to `[0, 1]`.
    pub fn clip_unit(self) -> Self {
        Self {
            xmin: clamp_unit(self.xmin),
            ymin: clamp_unit(self.ymin),
            xmax: clamp_unit(self.xmax),
            ymax: clamp_unit(self.ymax),
        }
    }

    /// Scales normalized coordinates to a `width` x `height` pixel grid.
    pub fn scale(self, width: f32, height: f32) -> Self {
        Self {
            xmin: self.xmin * width,
            ymin: self.ymin * height,
            xmax: self.xmax * width,
            ymax: self.ymax * height,
        }
    }
}

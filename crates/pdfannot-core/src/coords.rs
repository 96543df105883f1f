//! Coordinate conversion between the rendered surface and PDF page space
//!
//! Device space: pixels, origin top-left, Y grows downward.
//! Document space: points, origin bottom-left, Y grows upward.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either dimension cannot be divided by.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width == 0.0
            || self.height == 0.0
    }

    pub fn scaled(&self, scale: f64) -> Size {
        Size {
            width: self.width * scale,
            height: self.height * scale,
        }
    }
}

/// Convert a device point to document space for a page rendered onto `surface`.
///
/// Returns [`Point::ZERO`] when the surface has a zero dimension.
pub fn to_document_space(device: Point, page: Size, surface: Size) -> Point {
    if surface.is_degenerate() {
        return Point::ZERO;
    }

    let x_pct = device.x / surface.width;
    let y_pct = device.y / surface.height;

    Point {
        x: x_pct * page.width,
        // Flip Y: device origin is top-left, PDF origin is bottom-left
        y: page.height - y_pct * page.height,
    }
}

/// Rectangle in device space, always with non-negative extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DeviceRect {
    /// Normalize a drag from `a` to `b`, whatever its direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    proptest! {
        /// Scaling the document point back recovers the device point
        #[test]
        fn inverse_recovers_device_point(
            surface_w in dimension(),
            surface_h in dimension(),
            page_w in dimension(),
            page_h in dimension(),
            fx in 0.0f64..=1.0,
            fy in 0.0f64..=1.0,
        ) {
            let surface = Size::new(surface_w, surface_h);
            let page = Size::new(page_w, page_h);
            let device = Point::new(fx * surface_w, fy * surface_h);

            let doc = to_document_space(device, page, surface);
            let back_x = doc.x / page.width * surface.width;
            let back_y = (page.height - doc.y) / page.height * surface.height;

            let tolerance = 1e-6;
            prop_assert!((back_x - device.x).abs() < tolerance, "X: {} vs {}", back_x, device.x);
            prop_assert!((back_y - device.y).abs() < tolerance, "Y: {} vs {}", back_y, device.y);
        }

        /// Points inside the surface land inside the page
        #[test]
        fn stays_within_page(
            surface_w in dimension(),
            surface_h in dimension(),
            page_w in dimension(),
            page_h in dimension(),
            fx in 0.0f64..=1.0,
            fy in 0.0f64..=1.0,
        ) {
            let doc = to_document_space(
                Point::new(fx * surface_w, fy * surface_h),
                Size::new(page_w, page_h),
                Size::new(surface_w, surface_h),
            );
            let eps = 1e-9;
            prop_assert!(doc.x >= -eps && doc.x <= page_w + eps);
            prop_assert!(doc.y >= -eps && doc.y <= page_h + eps);
        }

        /// Degenerate surfaces never produce NaN
        #[test]
        fn degenerate_surface_is_zero(
            x in -1000.0f64..1000.0,
            y in -1000.0f64..1000.0,
            page_w in dimension(),
            page_h in dimension(),
            other in dimension(),
        ) {
            let page = Size::new(page_w, page_h);
            let a = to_document_space(Point::new(x, y), page, Size::new(0.0, other));
            let b = to_document_space(Point::new(x, y), page, Size::new(other, 0.0));
            prop_assert_eq!(a, Point::ZERO);
            prop_assert_eq!(b, Point::ZERO);
        }
    }
}

//! Viewport geometry and UI→device coordinate mapping.

use crate::rfb::frame::{UI_HEIGHT, UI_WIDTH};

// ── Point ────────────────────────────────────────────────────────

/// A point in either UI-viewport or device-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        dx.hypot(dy)
    }
}

// ── DeviceGeometry ───────────────────────────────────────────────

/// Fixed per-session geometry: the UI viewport and the remote device
/// resolution it maps onto. Supplied once by device discovery and
/// read-only thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    pub ui_width: u32,
    pub ui_height: u32,
    pub device_width: u32,
    pub device_height: u32,
}

impl DeviceGeometry {
    /// Geometry for the standard UI viewport against the given
    /// device resolution.
    pub fn for_device(device_width: u32, device_height: u32) -> Self {
        Self {
            ui_width: UI_WIDTH,
            ui_height: UI_HEIGHT,
            device_width,
            device_height,
        }
    }

    /// Map a UI-viewport point to device pixels.
    ///
    /// Linear transform with truncating integer division; exact at
    /// the viewport corners.
    pub fn map(&self, p: Point) -> Point {
        Point {
            x: (p.x as i64 * self.device_width as i64 / self.ui_width as i64) as i32,
            y: (p.y as i64 * self.device_height as i64 / self.ui_height as i64) as i32,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_exact_at_boundaries() {
        let geom = DeviceGeometry::for_device(1080, 2400);
        assert_eq!(geom.map(Point::new(0, 0)), Point::new(0, 0));
        assert_eq!(
            geom.map(Point::new(geom.ui_width as i32, geom.ui_height as i32)),
            Point::new(1080, 2400)
        );
    }

    #[test]
    fn map_truncates() {
        // 1080/320 = 3.375, so x=3 maps to 10.125 → 10.
        let geom = DeviceGeometry::for_device(1080, 2400);
        assert_eq!(geom.map(Point::new(3, 0)).x, 10);
        // 2400/700 ≈ 3.43, so y=5 maps to 17.14 → 17.
        assert_eq!(geom.map(Point::new(0, 5)).y, 17);
    }

    #[test]
    fn distance() {
        let a = Point::new(0, 0);
        assert_eq!(a.distance_to(Point::new(3, 4)), 5.0);
        assert_eq!(a.distance_to(a), 0.0);
    }
}

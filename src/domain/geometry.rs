//! Shared pixel-space geometry primitives

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates, top-left origin.
///
/// Fractional coordinates are kept as-is; rounding happens at draw time so
/// the resolver stays exact for the preview renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect { x, y, width, height }
    }

    /// Center point of the rectangle
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Width/height ratio; zero-height rects report 0 to keep callers total
    pub fn aspect(&self) -> f32 {
        if self.height == 0.0 {
            0.0
        } else {
            self.width / self.height
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.center(), (60.0, 45.0));
    }

    #[test]
    fn test_aspect_zero_height() {
        let r = Rect::new(0.0, 0.0, 100.0, 0.0);
        assert_eq!(r.aspect(), 0.0);
        assert!(r.is_degenerate());
    }
}

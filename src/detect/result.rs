use serde::{Deserialize, Serialize};

/// Pixel coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned box in pixels: top-left corner plus size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Width over height; 0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f32 {
        if self.h > 0.0 {
            self.w / self.h
        } else {
            0.0
        }
    }

    /// Smallest box containing every point.
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// One fiducial marker as reported by a fiducial detector.
///
/// Corners are ordered top-left, top-right, bottom-right, bottom-left, the
/// usual ArUco convention.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerQuad {
    pub id: i32,
    pub corners: [Point; 4],
}

impl MarkerQuad {
    /// Axis-aligned square marker of side `side` centred on `center`.
    pub fn square(id: i32, center: Point, side: f32) -> Self {
        let half = side / 2.0;
        Self {
            id,
            corners: [
                Point::new(center.x - half, center.y - half),
                Point::new(center.x + half, center.y - half),
                Point::new(center.x + half, center.y + half),
                Point::new(center.x - half, center.y + half),
            ],
        }
    }
}

/// One recognised object as reported by an object recognizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognizedObject {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BBox,
    /// Which recognizer produced it ("yolo", "color", ...).
    pub method: String,
}

impl RecognizedObject {
    pub fn new(label: &str, confidence: f32, bbox: BBox, method: &str) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            bbox,
            method: method.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_geometry() {
        let b = BBox::new(10.0, 20.0, 40.0, 20.0);
        assert_eq!(b.area(), 800.0);
        assert_eq!(b.center(), Point::new(30.0, 30.0));
        assert_eq!(b.aspect_ratio(), 2.0);
        assert_eq!(BBox::new(0.0, 0.0, 5.0, 0.0).aspect_ratio(), 0.0);
    }

    #[test]
    fn enclosing_box_covers_all_corners() {
        let quad = MarkerQuad::square(3, Point::new(100.0, 50.0), 20.0);
        let b = BBox::enclosing(&quad.corners).unwrap();
        assert_eq!(b, BBox::new(90.0, 40.0, 20.0, 20.0));
        assert!(BBox::enclosing(&[]).is_none());
    }

    #[test]
    fn point_distance() {
        assert_eq!(Point::new(0.0, 0.0).distance(&Point::new(3.0, 4.0)), 5.0);
    }
}

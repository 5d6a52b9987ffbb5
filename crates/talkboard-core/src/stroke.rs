//! Freehand stroke model.

use crate::style::StrokeColor;
use kurbo::{BezPath, Point, Rect};

/// One continuous freehand gesture.
///
/// Points are kept in capture order and are never reordered. A stroke is
/// created from its first point, so it is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    points: Vec<Point>,
    /// Stroke color.
    pub color: StrokeColor,
}

impl Stroke {
    /// Start a stroke at `point`.
    pub fn begin(point: Point, color: StrokeColor) -> Self {
        Self {
            points: vec![point],
            color,
        }
    }

    /// Build a stroke from captured points. Returns `None` for an empty list.
    pub fn from_points(points: Vec<Point>, color: StrokeColor) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(Self { points, color })
    }

    /// Append a point to the end of the stroke.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Points in capture order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The point the stroke started at.
    pub fn first(&self) -> Point {
        self.points[0]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a stroke built through this API.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding box of all points.
    pub fn bounds(&self) -> Rect {
        let first = self.first();
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(first, first), |rect, p| rect.union_pt(*p))
    }

    /// Connected polyline through every point.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.first());
        for point in self.points.iter().skip(1) {
            path.line_to(*point);
        }
        path
    }
}

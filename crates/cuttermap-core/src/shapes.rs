//! Painted vector shapes in page (top-left origin) coordinates.

use crate::color::Rgb;
use crate::geometry::{BBox, Point};
use crate::path::{Path, PathSegment};

/// Coarse classification of a painted path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ShapeKind {
    Rectangle,
    Line,
    Circle,
}

impl ShapeKind {
    /// Classify a path: curves make a circle, a single line segment makes
    /// a line, anything else is a rectangle.
    pub fn of_path(path: &Path) -> Self {
        if path.has_curves() {
            ShapeKind::Circle
        } else if path.line_count() == 1
            && !path
                .segments
                .iter()
                .any(|s| matches!(s, PathSegment::ClosePath))
        {
            ShapeKind::Line
        } else {
            ShapeKind::Rectangle
        }
    }
}

/// A painted path with its paint colors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    pub kind: ShapeKind,
    pub bbox: BBox,
    /// Fill color, when the path was filled.
    pub fill: Option<Rgb>,
    /// Stroke color, when the path was stroked.
    pub stroke: Option<Rgb>,
    /// Raw path items, flipped to top-left origin.
    pub items: Vec<PathSegment>,
}

fn flip(p: Point, page_height: f64) -> Point {
    Point::new(p.x, page_height - p.y)
}

impl Shape {
    /// Build a shape from a device-space path (bottom-left origin).
    ///
    /// Returns `None` for paths without any points.
    pub fn from_path(
        path: &Path,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
        page_height: f64,
    ) -> Option<Shape> {
        let items: Vec<PathSegment> = path
            .segments
            .iter()
            .map(|seg| match seg {
                PathSegment::MoveTo(p) => PathSegment::MoveTo(flip(*p, page_height)),
                PathSegment::LineTo(p) => PathSegment::LineTo(flip(*p, page_height)),
                PathSegment::CurveTo { cp1, cp2, end } => PathSegment::CurveTo {
                    cp1: flip(*cp1, page_height),
                    cp2: flip(*cp2, page_height),
                    end: flip(*end, page_height),
                },
                PathSegment::ClosePath => PathSegment::ClosePath,
            })
            .collect();
        let flipped = Path { segments: items };
        let bbox = BBox::from_points(&flipped.points())?;
        Some(Shape {
            kind: ShapeKind::of_path(path),
            bbox,
            fill,
            stroke,
            items: flipped.segments,
        })
    }

    /// A filled rectangle no larger than `max_side` on either side.
    pub fn is_small_filled_rect(&self, max_side: f64) -> bool {
        self.kind == ShapeKind::Rectangle
            && self.fill.is_some()
            && self.bbox.width() > 0.0
            && self.bbox.height() > 0.0
            && self.bbox.width() <= max_side
            && self.bbox.height() <= max_side
    }
}

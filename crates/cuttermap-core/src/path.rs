use crate::geometry::{Ctm, Point};

/// A segment of a PDF path.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathSegment {
    /// Move to a new point (starts a new subpath).
    MoveTo(Point),
    /// Straight line from current point to target.
    LineTo(Point),
    /// Cubic Bezier curve with two control points and an endpoint.
    CurveTo { cp1: Point, cp2: Point, end: Point },
    /// Close the current subpath (line back to the subpath start).
    ClosePath,
}

/// A complete path consisting of segments.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

impl Path {
    /// Every point the path touches, control points included.
    pub fn points(&self) -> Vec<Point> {
        let mut pts = Vec::new();
        for seg in &self.segments {
            match seg {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => pts.push(*p),
                PathSegment::CurveTo { cp1, cp2, end } => pts.extend([*cp1, *cp2, *end]),
                PathSegment::ClosePath => {}
            }
        }
        pts
    }

    pub fn has_curves(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, PathSegment::CurveTo { .. }))
    }

    pub fn line_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PathSegment::LineTo(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Builder for constructing paths from PDF path operators.
///
/// Coordinates are transformed through the CTM before storage, so the built
/// path is in device space (PDF bottom-left origin).
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    segments: Vec<PathSegment>,
    current_point: Option<Point>,
    subpath_start: Option<Point>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `m` operator: move to a new point, starting a new subpath.
    pub fn move_to(&mut self, ctm: &Ctm, x: f64, y: f64) {
        let p = ctm.transform_point(Point::new(x, y));
        self.segments.push(PathSegment::MoveTo(p));
        self.current_point = Some(p);
        self.subpath_start = Some(p);
    }

    /// `l` operator: straight line from current point to `(x, y)`.
    pub fn line_to(&mut self, ctm: &Ctm, x: f64, y: f64) {
        let p = ctm.transform_point(Point::new(x, y));
        self.segments.push(PathSegment::LineTo(p));
        self.current_point = Some(p);
    }

    /// `c` operator: cubic Bezier curve with three coordinate pairs.
    pub fn curve_to(&mut self, ctm: &Ctm, c: [f64; 6]) {
        let cp1 = ctm.transform_point(Point::new(c[0], c[1]));
        let cp2 = ctm.transform_point(Point::new(c[2], c[3]));
        let end = ctm.transform_point(Point::new(c[4], c[5]));
        self.segments.push(PathSegment::CurveTo { cp1, cp2, end });
        self.current_point = Some(end);
    }

    /// `v` operator: first control point equals the current point.
    pub fn curve_to_v(&mut self, ctm: &Ctm, x2: f64, y2: f64, x3: f64, y3: f64) {
        let Some(cp1) = self.current_point else {
            return;
        };
        let cp2 = ctm.transform_point(Point::new(x2, y2));
        let end = ctm.transform_point(Point::new(x3, y3));
        self.segments.push(PathSegment::CurveTo { cp1, cp2, end });
        self.current_point = Some(end);
    }

    /// `y` operator: last control point equals the endpoint.
    pub fn curve_to_y(&mut self, ctm: &Ctm, x1: f64, y1: f64, x3: f64, y3: f64) {
        let cp1 = ctm.transform_point(Point::new(x1, y1));
        let end = ctm.transform_point(Point::new(x3, y3));
        self.segments
            .push(PathSegment::CurveTo { cp1, cp2: end, end });
        self.current_point = Some(end);
    }

    /// `h` operator: close the current subpath.
    pub fn close_path(&mut self) {
        self.segments.push(PathSegment::ClosePath);
        if let Some(start) = self.subpath_start {
            self.current_point = Some(start);
        }
    }

    /// `re` operator: moveto + 3 lineto + closepath.
    pub fn rectangle(&mut self, ctm: &Ctm, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(ctm, x, y);
        self.line_to(ctm, x + width, y);
        self.line_to(ctm, x + width, y + height);
        self.line_to(ctm, x, y + height);
        self.close_path();
    }

    /// Hand out the accumulated path and reset the builder.
    pub fn take(&mut self) -> Path {
        self.current_point = None;
        self.subpath_start = None;
        Path {
            segments: std::mem::take(&mut self.segments),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_produces_closed_subpath() {
        let mut b = PathBuilder::new();
        b.rectangle(&Ctm::identity(), 10.0, 20.0, 5.0, 4.0);
        let path = b.take();
        assert_eq!(path.segments.len(), 5);
        assert_eq!(path.line_count(), 3);
        assert!(!path.has_curves());
        assert!(b.is_empty());
    }

    #[test]
    fn ctm_is_applied_to_points() {
        let mut b = PathBuilder::new();
        let ctm = Ctm::new(2.0, 0.0, 0.0, 2.0, 100.0, 0.0);
        b.move_to(&ctm, 1.0, 1.0);
        b.line_to(&ctm, 2.0, 1.0);
        let path = b.take();
        assert_eq!(path.points(), vec![Point::new(102.0, 2.0), Point::new(104.0, 2.0)]);
    }

    #[test]
    fn v_without_current_point_is_ignored() {
        let mut b = PathBuilder::new();
        b.curve_to_v(&Ctm::identity(), 1.0, 1.0, 2.0, 2.0);
        assert!(b.is_empty());
        b.move_to(&Ctm::identity(), 0.0, 0.0);
        b.curve_to_v(&Ctm::identity(), 1.0, 1.0, 2.0, 2.0);
        assert!(b.take().has_curves());
    }
}

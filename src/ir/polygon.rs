//! Canonical polygon geometry.
//!
//! Every shape is reduced to a [`Polygon`] before any derived geometry is
//! computed, so bbox and area always come from the same vertex list.

use super::bbox::BBoxXYXY;
use super::coord::Point;

/// An ordered list of polygon vertices in pixel space.
///
/// The polygon is implicitly closed: the last vertex connects back to the
/// first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from vertices, preserving their order.
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Expands two opposite rectangle corners into four vertices.
    ///
    /// The corners may come in any order. The result is always clockwise in
    /// image coordinates starting at the top-left: top-left, top-right,
    /// bottom-right, bottom-left.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
        let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
        Self::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    /// Rebuilds a polygon from a COCO-style flat `[x0, y0, x1, y1, ...]` list.
    ///
    /// A trailing unpaired coordinate is dropped.
    pub fn from_flat(coords: &[f64]) -> Self {
        Self::new(
            coords
                .chunks_exact(2)
                .map(|pair| Point::new(pair[0], pair[1]))
                .collect(),
        )
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Shoelace sum over the closed ring, halved.
    ///
    /// Positive for counter-clockwise winding in a y-up frame (clockwise on
    /// screen, where y grows downward).
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let p = self.vertices[i];
                let q = self.vertices[(i + 1) % n];
                p.x * q.y - q.x * p.y
            })
            .sum();
        twice / 2.0
    }

    /// Absolute enclosed area; independent of winding direction.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Tightest axis-aligned box around the vertices.
    pub fn bbox(&self) -> BBoxXYXY {
        BBoxXYXY::enclosing(&self.vertices).unwrap_or_default()
    }

    /// Flattens vertices into `[x0, y0, x1, y1, ...]`.
    pub fn to_flat(&self) -> Vec<f64> {
        self.vertices.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(Point::is_finite)
    }

    pub fn into_vertices(self) -> Vec<Point> {
        self.vertices
    }
}

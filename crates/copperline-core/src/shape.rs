//! Copper shapes and the clearance-aware collision primitives used by both
//! the router and the connectivity builder.

use geo::{Area, BooleanOps, LineString, Polygon as GeoPolygon};
use serde::{Deserialize, Serialize};

use crate::geometry::{
    circle_polygon, polygon_contains, polygon_edges, stadium, BBox, CircularArc, Coord, Point,
    Seg,
};

/// Differences below this area (nm²) are treated as numerical noise.
const AREA_TOLERANCE: f64 = 1.0;

/// A geometric copper shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { center: Point, radius: Coord },
    Segment { seg: Seg, width: Coord },
    Arc { arc: CircularArc, width: Coord },
    Rect { bbox: BBox },
    /// Closed simple polygon.
    Polygon { outline: Vec<Point> },
    /// Open polyline without width.
    Chain { points: Vec<Point> },
    Compound(Vec<Shape>),
}

/// Result of a located collision test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    /// Separation between the shapes (0 when they overlap).
    pub actual: Coord,
    /// Where the shapes come closest.
    pub location: Point,
}

enum Prim<'a> {
    Round { seg: Seg, radius: f64 },
    Area { outline: std::borrow::Cow<'a, [Point]> },
}

impl Prim<'_> {
    /// Signed gap between the two primitives and a witness point.
    fn distance(&self, other: &Prim) -> (f64, Point) {
        match (self, other) {
            (Prim::Round { seg: a, radius: ra }, Prim::Round { seg: b, radius: rb }) => {
                let (d, p) = a.closest_approach(b);
                (d - ra - rb, p)
            }
            (Prim::Round { seg, radius }, Prim::Area { outline }) => {
                round_to_area(seg, *radius, outline)
            }
            (Prim::Area { outline }, Prim::Round { seg, radius }) => {
                round_to_area(seg, *radius, outline)
            }
            (Prim::Area { outline: a }, Prim::Area { outline: b }) => {
                if let Some(p) = a.iter().find(|p| polygon_contains(b, p)) {
                    return (0.0, *p);
                }
                if let Some(p) = b.iter().find(|p| polygon_contains(a, p)) {
                    return (0.0, *p);
                }
                let mut best = (f64::MAX, Point::default());
                for ea in polygon_edges(a) {
                    for eb in polygon_edges(b) {
                        let (d, p) = ea.closest_approach(&eb);
                        if d < best.0 {
                            best = (d, p);
                        }
                    }
                }
                best
            }
        }
    }
}

fn round_to_area(seg: &Seg, radius: f64, outline: &[Point]) -> (f64, Point) {
    if polygon_contains(outline, &seg.a) {
        return (-radius, seg.a);
    }
    if polygon_contains(outline, &seg.b) {
        return (-radius, seg.b);
    }
    let mut best = (f64::MAX, seg.a);
    for edge in polygon_edges(outline) {
        let (d, p) = seg.closest_approach(&edge);
        if d < best.0 {
            best = (d, p);
        }
    }
    (best.0 - radius, best.1)
}

impl Shape {
    pub fn bbox(&self) -> BBox {
        match self {
            Shape::Circle { center, radius } => BBox::point(*center).inflate(*radius),
            Shape::Segment { seg, width } => seg.bbox().inflate((width + 1) / 2),
            Shape::Arc { arc, width } => {
                let pts = arc.to_polyline(crate::geometry::ARC_HIGH_DEF);
                BBox::from_points(&pts)
                    .unwrap_or(BBox::point(arc.start))
                    .inflate((width + 1) / 2 + crate::geometry::ARC_HIGH_DEF)
            }
            Shape::Rect { bbox } => *bbox,
            Shape::Polygon { outline } => {
                BBox::from_points(outline).unwrap_or(BBox::point(Point::default()))
            }
            Shape::Chain { points } => {
                BBox::from_points(points).unwrap_or(BBox::point(Point::default()))
            }
            Shape::Compound(shapes) => shapes
                .iter()
                .map(Shape::bbox)
                .reduce(|a, b| a.union(&b))
                .unwrap_or(BBox::point(Point::default())),
        }
    }

    fn primitives<'a>(&'a self, out: &mut Vec<Prim<'a>>) {
        match self {
            Shape::Circle { center, radius } => out.push(Prim::Round {
                seg: Seg::new(*center, *center),
                radius: *radius as f64,
            }),
            Shape::Segment { seg, width } => out.push(Prim::Round {
                seg: *seg,
                radius: *width as f64 / 2.0,
            }),
            Shape::Arc { arc, width } => {
                let pts = arc.to_polyline(crate::geometry::ARC_HIGH_DEF);
                for w in pts.windows(2) {
                    out.push(Prim::Round {
                        seg: Seg::new(w[0], w[1]),
                        radius: *width as f64 / 2.0,
                    });
                }
            }
            Shape::Rect { bbox } => out.push(Prim::Area {
                outline: std::borrow::Cow::Owned(bbox.corners().to_vec()),
            }),
            Shape::Polygon { outline } => out.push(Prim::Area {
                outline: std::borrow::Cow::Borrowed(outline),
            }),
            Shape::Chain { points } => match points.len() {
                0 => {}
                1 => out.push(Prim::Round {
                    seg: Seg::new(points[0], points[0]),
                    radius: 0.0,
                }),
                _ => {
                    for w in points.windows(2) {
                        out.push(Prim::Round {
                            seg: Seg::new(w[0], w[1]),
                            radius: 0.0,
                        });
                    }
                }
            },
            Shape::Compound(shapes) => {
                for s in shapes {
                    s.primitives(out);
                }
            }
        }
    }

    /// Signed gap to another shape (negative or zero when overlapping) and the
    /// point of `self` where it is reached.
    pub fn distance_to(&self, other: &Shape) -> Option<(f64, Point)> {
        let mut mine = Vec::new();
        let mut theirs = Vec::new();
        self.primitives(&mut mine);
        other.primitives(&mut theirs);

        let mut best: Option<(f64, Point)> = None;
        for a in &mine {
            for b in &theirs {
                let (d, p) = a.distance(b);
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, p));
                    if d <= 0.0 {
                        return best;
                    }
                }
            }
        }
        best
    }

    /// Boolean collision test: the shapes overlap or are closer than `clearance`.
    pub fn collide(&self, other: &Shape, clearance: Coord) -> bool {
        self.collide_at(other, clearance).is_some()
    }

    /// Collision test that also reports where the shapes come closest.
    pub fn collide_at(&self, other: &Shape, clearance: Coord) -> Option<Collision> {
        let (d, location) = self.distance_to(other)?;
        if d <= 0.0 || d < clearance as f64 {
            Some(Collision {
                actual: d.max(0.0).round() as Coord,
                location,
            })
        } else {
            None
        }
    }

    /// True if `p` is inside the shape or within `accuracy` of it.
    pub fn hit_test(&self, p: &Point, accuracy: Coord) -> bool {
        let probe = Shape::Circle {
            center: *p,
            radius: 0,
        };
        match self.distance_to(&probe) {
            Some((d, _)) => d <= accuracy as f64,
            None => false,
        }
    }

    /// Closed outline approximating the shape with vertices no further than
    /// `max_error` inside the true boundary. `None` for open or compound shapes.
    pub fn to_polygon(&self, max_error: Coord) -> Option<Vec<Point>> {
        match self {
            Shape::Circle { center, radius } => Some(circle_polygon(*center, *radius, max_error)),
            Shape::Segment { seg, width } => Some(stadium(seg, *width, max_error)),
            Shape::Arc { arc, width } => Some(arc.outline(*width, max_error)),
            Shape::Rect { bbox } => Some(bbox.corners().to_vec()),
            Shape::Polygon { outline } => Some(outline.clone()),
            Shape::Chain { .. } | Shape::Compound(_) => None,
        }
    }
}

fn to_geo(outline: &[Point]) -> GeoPolygon<f64> {
    let ring: Vec<(f64, f64)> = outline.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    GeoPolygon::new(LineString::from(ring), vec![])
}

/// True when `subject` minus `clip` leaves no area, i.e. `subject` is fully
/// covered by `clip`.
pub fn polygon_difference_is_empty(subject: &[Point], clip: &[Point]) -> bool {
    if subject.len() < 3 {
        return true;
    }
    if clip.len() < 3 {
        return false;
    }
    let remainder = to_geo(subject).difference(&to_geo(clip));
    remainder.unsigned_area() <= AREA_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ARC_HIGH_DEF;

    fn circle(x: Coord, y: Coord, r: Coord) -> Shape {
        Shape::Circle {
            center: Point::new(x, y),
            radius: r,
        }
    }

    #[test]
    fn test_circle_clearance_boundary() {
        let a = circle(0, 0, 100);
        let b = circle(500, 0, 100);
        // Gap is exactly 300.
        assert!(!a.collide(&b, 300));
        assert!(a.collide(&b, 301));
        let hit = a.collide_at(&b, 400).unwrap();
        assert_eq!(hit.actual, 300);
    }

    #[test]
    fn test_overlap_always_collides() {
        let a = Shape::Segment {
            seg: Seg::new(Point::new(0, 0), Point::new(1000, 0)),
            width: 200,
        };
        let b = Shape::Rect {
            bbox: BBox::new(Point::new(400, -50), Point::new(600, 50)),
        };
        assert!(a.collide(&b, 0));
        assert!(a.collide(&b, -10));
    }

    #[test]
    fn test_hit_test_segment() {
        let s = Shape::Segment {
            seg: Seg::new(Point::new(0, 0), Point::new(1000, 0)),
            width: 200,
        };
        assert!(s.hit_test(&Point::new(500, 100), 0));
        assert!(!s.hit_test(&Point::new(500, 150), 0));
        assert!(s.hit_test(&Point::new(500, 150), 50));
    }

    #[test]
    fn test_polygon_difference() {
        let pad = Shape::Rect {
            bbox: BBox::new(Point::new(-1000, -1000), Point::new(1000, 1000)),
        };
        let inside = Shape::Segment {
            seg: Seg::new(Point::new(-200, 0), Point::new(200, 0)),
            width: 200,
        };
        let sticking_out = Shape::Segment {
            seg: Seg::new(Point::new(0, 0), Point::new(3000, 0)),
            width: 200,
        };
        let pad_poly = pad.to_polygon(ARC_HIGH_DEF).unwrap();
        assert!(polygon_difference_is_empty(
            &inside.to_polygon(ARC_HIGH_DEF).unwrap(),
            &pad_poly
        ));
        assert!(!polygon_difference_is_empty(
            &sticking_out.to_polygon(ARC_HIGH_DEF).unwrap(),
            &pad_poly
        ));
    }
}

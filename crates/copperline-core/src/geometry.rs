use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Board coordinate in nanometers.
pub type Coord = i64;

/// Maximum chord error used when curves are flattened into polygons (5 µm).
pub const ARC_HIGH_DEF: Coord = 5_000;

/// A 2D point in board coordinates (nanometers).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.squared_distance_to(other) as f64).sqrt()
    }

    pub fn squared_distance_to(&self, other: &Point) -> i128 {
        let dx = (self.x - other.x) as i128;
        let dy = (self.y - other.y) as i128;
        dx * dx + dy * dy
    }

    pub fn translate(&self, dx: Coord, dy: Coord) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    fn from_f64(x: f64, y: f64) -> Self {
        Self::new(x.round() as Coord, y.round() as Coord)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Z component of (a - o) x (b - o).
fn cross(o: &Point, a: &Point, b: &Point) -> i128 {
    let ax = (a.x - o.x) as i128;
    let ay = (a.y - o.y) as i128;
    let bx = (b.x - o.x) as i128;
    let by = (b.y - o.y) as i128;
    ax * by - ay * bx
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Degenerate box around a single point.
    pub fn point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BBox::point(*first);
        for p in &points[1..] {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn inflate(&self, amount: Coord) -> Self {
        Self {
            min: self.min.translate(-amount, -amount),
            max: self.max.translate(amount, amount),
        }
    }

    pub fn width(&self) -> Coord {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> Coord {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2,
            (self.min.y + self.max.y) / 2,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Corners in counter-clockwise order starting at `min`.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }
}

/// A straight line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seg {
    pub a: Point,
    pub b: Point,
}

impl Seg {
    pub fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance_to(&self.b)
    }

    pub fn is_null(&self) -> bool {
        self.a == self.b
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_points(&[self.a, self.b]).unwrap_or(BBox::point(self.a))
    }

    fn nearest_f64(&self, p: &Point) -> (f64, f64) {
        let (ax, ay) = (self.a.x as f64, self.a.y as f64);
        if self.is_null() {
            return (ax, ay);
        }
        let dx = (self.b.x - self.a.x) as f64;
        let dy = (self.b.y - self.a.y) as f64;
        let t = (((p.x as f64 - ax) * dx + (p.y as f64 - ay) * dy) / (dx * dx + dy * dy))
            .clamp(0.0, 1.0);
        (ax + t * dx, ay + t * dy)
    }

    /// Point of the segment closest to `p`, rounded to the grid.
    pub fn nearest_point(&self, p: &Point) -> Point {
        let (x, y) = self.nearest_f64(p);
        Point::from_f64(x, y)
    }

    pub fn distance_to_point(&self, p: &Point) -> f64 {
        let (x, y) = self.nearest_f64(p);
        ((p.x as f64 - x).powi(2) + (p.y as f64 - y).powi(2)).sqrt()
    }

    /// True if `p` lies exactly on the segment.
    pub fn contains_point(&self, p: &Point) -> bool {
        cross(&self.a, &self.b, p) == 0
            && p.x >= self.a.x.min(self.b.x)
            && p.x <= self.a.x.max(self.b.x)
            && p.y >= self.a.y.min(self.b.y)
            && p.y <= self.a.y.max(self.b.y)
    }

    /// True if the segments share at least one point (touching counts).
    pub fn intersects(&self, other: &Seg) -> bool {
        let d1 = cross(&other.a, &other.b, &self.a).signum();
        let d2 = cross(&other.a, &other.b, &self.b).signum();
        let d3 = cross(&self.a, &self.b, &other.a).signum();
        let d4 = cross(&self.a, &self.b, &other.b).signum();

        if d1 * d2 < 0 && d3 * d4 < 0 {
            return true;
        }

        (d1 == 0 && other.contains_point(&self.a))
            || (d2 == 0 && other.contains_point(&self.b))
            || (d3 == 0 && self.contains_point(&other.a))
            || (d4 == 0 && self.contains_point(&other.b))
    }

    /// A common point of both segments, if they intersect.
    pub fn intersection(&self, other: &Seg) -> Option<Point> {
        if !self.intersects(other) {
            return None;
        }

        for p in [other.a, other.b] {
            if self.contains_point(&p) {
                return Some(p);
            }
        }
        for p in [self.a, self.b] {
            if other.contains_point(&p) {
                return Some(p);
            }
        }

        // Proper crossing
        let (x1, y1) = (self.a.x as f64, self.a.y as f64);
        let (dx1, dy1) = ((self.b.x - self.a.x) as f64, (self.b.y - self.a.y) as f64);
        let (x2, y2) = (other.a.x as f64, other.a.y as f64);
        let (dx2, dy2) = ((other.b.x - other.a.x) as f64, (other.b.y - other.a.y) as f64);
        let denom = dx1 * dy2 - dy1 * dx2;
        if denom == 0.0 {
            return Some(self.a);
        }
        let t = ((x2 - x1) * dy2 - (y2 - y1) * dx2) / denom;
        Some(Point::from_f64(x1 + t * dx1, y1 + t * dy1))
    }

    /// Minimum distance between the segments together with the point of
    /// `self` where it is reached.
    pub fn closest_approach(&self, other: &Seg) -> (f64, Point) {
        if let Some(p) = self.intersection(other) {
            return (0.0, p);
        }

        let mut best = (other.distance_to_point(&self.a), self.a);
        let d = other.distance_to_point(&self.b);
        if d < best.0 {
            best = (d, self.b);
        }
        for p in [other.a, other.b] {
            let d = self.distance_to_point(&p);
            if d < best.0 {
                best = (d, self.nearest_point(&p));
            }
        }
        best
    }

    /// Distance from `p` to the infinite line through the segment.
    pub fn line_distance(&self, p: &Point) -> f64 {
        if self.is_null() {
            return self.a.distance_to(p);
        }
        cross(&self.a, &self.b, p).abs() as f64 / self.length()
    }

    /// Both ends of `other` lie within 1 nm of the line through `self`.
    pub fn approx_collinear(&self, other: &Seg) -> bool {
        self.line_distance(&other.a) <= 1.0 && self.line_distance(&other.b) <= 1.0
    }
}

/// A circular arc passing through `start`, `mid` and `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularArc {
    pub start: Point,
    pub mid: Point,
    pub end: Point,
}

impl CircularArc {
    pub fn new(start: Point, mid: Point, end: Point) -> Self {
        Self { start, mid, end }
    }

    /// Center and radius, or `None` when the three points are collinear.
    pub fn center_radius(&self) -> Option<((f64, f64), f64)> {
        let (ax, ay) = (self.start.x as f64, self.start.y as f64);
        let (bx, by) = (self.mid.x as f64, self.mid.y as f64);
        let (cx, cy) = (self.end.x as f64, self.end.y as f64);
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d.abs() < f64::EPSILON {
            return None;
        }
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        let r = ((ax - ux).powi(2) + (ay - uy).powi(2)).sqrt();
        Some(((ux, uy), r))
    }

    /// Start angle and signed sweep (positive = counter-clockwise).
    fn angles(&self, center: (f64, f64)) -> (f64, f64) {
        let ang = |p: &Point| (p.y as f64 - center.1).atan2(p.x as f64 - center.0);
        let tau = std::f64::consts::TAU;
        let a0 = ang(&self.start);
        let ccw_to_mid = (ang(&self.mid) - a0).rem_euclid(tau);
        let ccw_to_end = (ang(&self.end) - a0).rem_euclid(tau);
        if ccw_to_mid <= ccw_to_end {
            (a0, ccw_to_end)
        } else {
            (a0, ccw_to_end - tau)
        }
    }

    fn segment_count(radius: f64, sweep: f64, max_error: Coord) -> usize {
        let err = (max_error.max(1) as f64).min(radius);
        let step = 2.0 * (1.0 - err / radius).clamp(-1.0, 1.0).acos();
        if step <= 0.0 {
            return 1;
        }
        ((sweep.abs() / step).ceil() as usize).clamp(1, 360)
    }

    /// Flatten the arc into a polyline whose chord error is below `max_error`.
    pub fn to_polyline(&self, max_error: Coord) -> Vec<Point> {
        let Some((center, radius)) = self.center_radius() else {
            return vec![self.start, self.end];
        };
        let (a0, sweep) = self.angles(center);
        let n = Self::segment_count(radius, sweep, max_error);

        let mut points = Vec::with_capacity(n + 1);
        points.push(self.start);
        for i in 1..n {
            let a = a0 + sweep * i as f64 / n as f64;
            points.push(Point::from_f64(
                center.0 + radius * a.cos(),
                center.1 + radius * a.sin(),
            ));
        }
        points.push(self.end);
        points
    }

    /// Outline of the arc drawn with a round pen of the given width.
    pub fn outline(&self, width: Coord, max_error: Coord) -> Vec<Point> {
        let half = width as f64 / 2.0;
        let Some((center, radius)) = self.center_radius() else {
            return stadium(&Seg::new(self.start, self.end), width, max_error);
        };
        let (a0, sweep) = self.angles(center);
        let dir = sweep.signum();
        let n = Self::segment_count(radius + half, sweep, max_error);
        let at = |r: f64, a: f64| Point::from_f64(center.0 + r * a.cos(), center.1 + r * a.sin());

        let mut points = Vec::new();
        for i in 0..=n {
            points.push(at(radius + half, a0 + sweep * i as f64 / n as f64));
        }
        let a_end = a0 + sweep;
        let end_c = (center.0 + radius * a_end.cos(), center.1 + radius * a_end.sin());
        round_cap(&mut points, end_c, half, a_end, dir, max_error);
        if radius > half {
            for i in (0..=n).rev() {
                points.push(at(radius - half, a0 + sweep * i as f64 / n as f64));
            }
        } else {
            points.push(Point::from_f64(center.0, center.1));
        }
        let start_c = (center.0 + radius * a0.cos(), center.1 + radius * a0.sin());
        round_cap(&mut points, start_c, half, a0 + std::f64::consts::PI, dir, max_error);
        points
    }
}

/// Append the interior points of a half circle around `c`, starting at angle
/// `from` and turning in direction `dir`.
fn round_cap(out: &mut Vec<Point>, c: (f64, f64), r: f64, from: f64, dir: f64, max_error: Coord) {
    if r <= 0.0 {
        return;
    }
    let n = CircularArc::segment_count(r, std::f64::consts::PI, max_error).max(2);
    for i in 1..n {
        let a = from + dir * std::f64::consts::PI * i as f64 / n as f64;
        out.push(Point::from_f64(c.0 + r * a.cos(), c.1 + r * a.sin()));
    }
}

/// Polygon approximating a circle, vertices on the circle (error inside).
pub fn circle_polygon(center: Point, radius: Coord, max_error: Coord) -> Vec<Point> {
    let r = radius as f64;
    let n = CircularArc::segment_count(r, std::f64::consts::TAU, max_error).max(8);
    (0..n)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            Point::from_f64(center.x as f64 + r * a.cos(), center.y as f64 + r * a.sin())
        })
        .collect()
}

/// Outline of a segment drawn with a round pen of the given width.
pub fn stadium(seg: &Seg, width: Coord, max_error: Coord) -> Vec<Point> {
    let half = width as f64 / 2.0;
    if seg.is_null() {
        return circle_polygon(seg.a, width / 2, max_error);
    }
    let angle = ((seg.b.y - seg.a.y) as f64).atan2((seg.b.x - seg.a.x) as f64);
    let normal = angle + std::f64::consts::FRAC_PI_2;
    let mut points = Vec::new();

    let a = (seg.a.x as f64, seg.a.y as f64);
    let b = (seg.b.x as f64, seg.b.y as f64);
    points.push(Point::from_f64(a.0 - half * normal.cos(), a.1 - half * normal.sin()));
    points.push(Point::from_f64(b.0 - half * normal.cos(), b.1 - half * normal.sin()));
    round_cap(&mut points, b, half, normal - std::f64::consts::PI, 1.0, max_error);
    points.push(Point::from_f64(b.0 + half * normal.cos(), b.1 + half * normal.sin()));
    points.push(Point::from_f64(a.0 + half * normal.cos(), a.1 + half * normal.sin()));
    round_cap(&mut points, a, half, normal, 1.0, max_error);
    points
}

/// Point-in-polygon test; points on the boundary count as inside.
pub fn polygon_contains(outline: &[Point], p: &Point) -> bool {
    if outline.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = outline.len() - 1;
    for i in 0..outline.len() {
        let (a, b) = (&outline[i], &outline[j]);
        if Seg::new(*a, *b).contains_point(p) {
            return true;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x as f64
                + (p.y - a.y) as f64 * (b.x - a.x) as f64 / (b.y - a.y) as f64;
            if (p.x as f64) < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Closed edges of a polygon outline.
pub fn polygon_edges(outline: &[Point]) -> impl Iterator<Item = Seg> + '_ {
    let n = outline.len();
    (0..n).map(move |i| Seg::new(outline[i], outline[(i + 1) % n]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
        assert_eq!(a.squared_distance_to(&b), 25);
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BBox::new(Point::new(0, 0), Point::new(10, 10));
        let b = BBox::new(Point::new(5, 5), Point::new(15, 15));
        let c = BBox::new(Point::new(20, 20), Point::new(30, 30));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.union(&c).max, Point::new(30, 30));
    }

    #[test]
    fn test_segment_intersection() {
        let h = Seg::new(Point::new(0, 0), Point::new(10, 0));
        let v = Seg::new(Point::new(5, -5), Point::new(5, 5));
        assert_eq!(h.intersection(&v), Some(Point::new(5, 0)));

        let touching = Seg::new(Point::new(10, 0), Point::new(20, 0));
        assert_eq!(h.intersection(&touching), Some(Point::new(10, 0)));

        let apart = Seg::new(Point::new(0, 3), Point::new(10, 3));
        assert!(!h.intersects(&apart));
        let (d, _) = h.closest_approach(&apart);
        assert!((d - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_approx_collinear() {
        let a = Seg::new(Point::new(0, 0), Point::new(10, 10));
        let b = Seg::new(Point::new(10, 10), Point::new(25, 25));
        let c = Seg::new(Point::new(10, 10), Point::new(20, 25));
        assert!(a.approx_collinear(&b));
        assert!(!a.approx_collinear(&c));
    }

    #[test]
    fn test_arc_polyline_ends() {
        let arc = CircularArc::new(
            Point::new(1_000_000, 0),
            Point::new(0, 1_000_000),
            Point::new(-1_000_000, 0),
        );
        let pts = arc.to_polyline(ARC_HIGH_DEF);
        assert_eq!(pts.first(), Some(&arc.start));
        assert_eq!(pts.last(), Some(&arc.end));
        // Counter-clockwise half circle passes through positive y.
        assert!(pts.iter().all(|p| p.y >= -1));
    }

    #[test]
    fn test_polygon_contains() {
        let square = BBox::new(Point::new(0, 0), Point::new(10, 10)).corners();
        assert!(polygon_contains(&square, &Point::new(5, 5)));
        assert!(polygon_contains(&square, &Point::new(10, 5)));
        assert!(!polygon_contains(&square, &Point::new(11, 5)));
    }
}

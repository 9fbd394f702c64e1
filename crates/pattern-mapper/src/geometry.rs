//! 2D geometry used while sampling shape outlines.
//!
//! ## Rust Lesson #3: Structs & Derives
//!
//! The `#[derive(...)]` macro auto-generates common functionality:
//! - `Debug` = lets you print with `{:?}`
//! - `Clone` + `Copy` = small stack values that copy implicitly
//! - `PartialEq` = can compare with `==`

/// A 2D point with x,y coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move by `offset`, then scale about the origin.
    #[inline]
    pub fn offset_scaled(&self, offset: Point, scale: f64) -> Point {
        Point::new((self.x + offset.x) * scale, (self.y + offset.y) * scale)
    }

    #[inline]
    pub fn approx_eq(&self, other: Point) -> bool {
        (self.x - other.x).abs() < 1e-6 && (self.y - other.y).abs() < 1e-6
    }
}

/// Cumulative distance at every vertex of a polyline (first entry is 0).
pub fn cumulative_distances(points: &[Point]) -> Vec<f64> {
    let mut total = 0.0;
    let mut distances = Vec::with_capacity(points.len());
    let mut previous: Option<Point> = None;
    for &p in points {
        if let Some(prev) = previous {
            total += prev.distance(p);
        }
        distances.push(total);
        previous = Some(p);
    }
    distances
}

/// Mean of the vertices; `None` for an empty slice.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

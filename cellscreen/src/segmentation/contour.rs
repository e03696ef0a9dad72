//! External contour extraction and shape measurements.

use std::f64::consts::PI;

use image_lib::{GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::point::Point;

/// Closed object boundary, last point implicitly joined to the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Iterator over the closed polygon's edges.
    fn edges(&self) -> impl Iterator<Item = (Point<i32>, Point<i32>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Length of the closed polygon.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.edges()
            .map(|(a, b)| {
                let dx = f64::from(b.x - a.x);
                let dy = f64::from(b.y - a.y);
                dx.hypot(dy)
            })
            .sum()
    }

    /// Enclosed area by the shoelace formula.
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let twice: i64 = self
            .edges()
            .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
            .sum();
        twice.abs() as f64 / 2.0
    }

    /// 4π·area/perimeter², 1.0 for a circle; `None` for a zero perimeter.
    pub fn circularity(&self) -> Option<f64> {
        let perimeter = self.perimeter();
        if perimeter == 0.0 {
            return None;
        }
        Some(4.0 * PI * self.area() / (perimeter * perimeter))
    }
}

/// Open interval of accepted circularity scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularityRange {
    pub min: f64,
    pub max: f64,
}

impl CircularityRange {
    pub fn accepts(&self, contour: &Contour) -> bool {
        contour
            .circularity()
            .is_some_and(|c| self.min < c && c < self.max)
    }
}

/// Outermost object boundaries of a 0/1 image.
///
/// Objects touching the image edge are traced along the edge pixels. Holes
/// and objects nested inside holes are dropped; each boundary is reduced to
/// the endpoints of its straight runs.
pub fn external_contours(binary: &GrayImage) -> Vec<Contour> {
    // Border following only starts next to a background pixel, so foreground
    // on the image edge needs a background frame around it.
    let (width, height) = binary.dimensions();
    let framed = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        if x == 0 || y == 0 || x > width || y > height {
            Luma([0])
        } else {
            *binary.get_pixel(x - 1, y - 1)
        }
    });

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| c.parent.is_none())
        .map(|c| {
            let points = c.points.into_iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect();
            Contour::new(simplify_chain(points))
        })
        .collect()
}

/// Drops points in the middle of horizontal, vertical or diagonal runs.
///
/// Boundary points from border following are 8-neighbors, so a point is
/// redundant when the step into it equals the step out of it.
pub fn simplify_chain(mut points: Vec<Point<i32>>) -> Vec<Point<i32>> {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let n = points.len();
    if n < 3 {
        return points;
    }

    let step = |a: Point<i32>, b: Point<i32>| ((b.x - a.x).signum(), (b.y - a.y).signum());

    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    // All points collinear.
    if kept.is_empty() {
        points
    } else {
        kept
    }
}

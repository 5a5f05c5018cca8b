//! Planar geometry for contour post-processing.
//!
//! Contours coming out of `imageproc` are wrapped in a [`Polygon`], which
//! knows its area, perimeter, axis-aligned extent and minimum-area rectangle.

use imageproc::contours::Contour;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates, in pixel space (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }
}

/// A closed polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates a polygon from the border pixels of a contour.
    pub fn from_contour(contour: &Contour<u32>) -> Self {
        let points = contour
            .points
            .iter()
            .map(|p| Point::new(p.x as f32, p.y as f32))
            .collect();
        Self { points }
    }

    /// Area by the shoelace formula; 0 for fewer than 3 points.
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let twice: f32 = self
            .points
            .iter()
            .circular_tuple_windows()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();
        twice.abs() / 2.0
    }

    /// Length of the closed outline.
    pub fn perimeter(&self) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points
            .iter()
            .circular_tuple_windows()
            .map(|(a, b)| ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt())
            .sum()
    }

    /// Axis-aligned bounding rectangle, `None` for an empty polygon.
    pub fn bounding_rect(&self) -> Option<Rect> {
        let (x_min, x_max) = self.points.iter().map(|p| p.x).minmax().into_option()?;
        let (y_min, y_max) = self.points.iter().map(|p| p.y).minmax().into_option()?;
        Some(Rect {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Convex hull by Graham scan, counter-clockwise in the y-down frame.
    fn convex_hull(&self) -> Vec<Point> {
        let mut points = self.points.clone();
        if points.len() < 3 {
            return points;
        }

        let start_idx = points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.y.partial_cmp(&b.y)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        points.swap(0, start_idx);
        let origin = points[0];

        points[1..].sort_by(|a, b| {
            let cross = cross(&origin, a, b);
            if cross == 0.0 {
                let da = (a.x - origin.x).powi(2) + (a.y - origin.y).powi(2);
                let db = (b.x - origin.x).powi(2) + (b.y - origin.y).powi(2);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            } else if cross > 0.0 {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });

        let mut hull: Vec<Point> = Vec::with_capacity(points.len());
        for point in points {
            while hull.len() > 1 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) <= 0.0
            {
                hull.pop();
            }
            hull.push(point);
        }
        hull
    }

    /// Minimum-area enclosing rectangle by rotating calipers over the hull.
    pub fn min_area_rect(&self) -> MinAreaRect {
        let hull = self.convex_hull();
        if hull.len() < 3 {
            let rect = self.bounding_rect().unwrap_or(Rect {
                x_min: 0.0,
                y_min: 0.0,
                x_max: 0.0,
                y_max: 0.0,
            });
            return MinAreaRect {
                center: Point::new(
                    (rect.x_min + rect.x_max) / 2.0,
                    (rect.y_min + rect.y_max) / 2.0,
                ),
                width: rect.width(),
                height: rect.height(),
                angle: 0.0,
            };
        }

        let mut best = MinAreaRect {
            center: hull[0],
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        };
        let mut best_area = f32::MAX;

        for (a, b) in hull.iter().circular_tuple_windows() {
            let (ex, ey) = (b.x - a.x, b.y - a.y);
            let len = (ex * ex + ey * ey).sqrt();
            if len < f32::EPSILON {
                continue;
            }
            let (nx, ny) = (ex / len, ey / len);
            let (px, py) = (-ny, nx);

            let (mut min_n, mut max_n, mut min_p, mut max_p) =
                (f32::MAX, f32::MIN, f32::MAX, f32::MIN);
            for q in &hull {
                let along = nx * (q.x - a.x) + ny * (q.y - a.y);
                let across = px * (q.x - a.x) + py * (q.y - a.y);
                min_n = min_n.min(along);
                max_n = max_n.max(along);
                min_p = min_p.min(across);
                max_p = max_p.max(across);
            }

            let (width, height) = (max_n - min_n, max_p - min_p);
            if width * height < best_area {
                best_area = width * height;
                let (cn, cp) = ((min_n + max_n) / 2.0, (min_p + max_p) / 2.0);
                best = MinAreaRect {
                    center: Point::new(a.x + cn * nx + cp * px, a.y + cn * ny + cp * py),
                    width,
                    height,
                    angle: ny.atan2(nx).to_degrees(),
                };
            }
        }
        best
    }
}

fn cross(p1: &Point, p2: &Point, p3: &Point) -> f32 {
    (p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)
}

/// A rotated rectangle.
///
/// `width` runs along the direction given by `angle` (degrees, measured in
/// image coordinates where y grows downwards); `height` is perpendicular to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinAreaRect {
    pub center: Point,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl MinAreaRect {
    /// `max(w / h, h / w)`; infinite for a degenerate rectangle.
    pub fn elongation(&self) -> f32 {
        let (long, short) = if self.width >= self.height {
            (self.width, self.height)
        } else {
            (self.height, self.width)
        };
        if short <= 0.0 {
            f32::INFINITY
        } else {
            long / short
        }
    }

    /// Counter-clockwise angle of the long side against the horizontal, in `(-90, 90]`.
    pub fn long_side_angle(&self) -> f32 {
        let image_angle = if self.width >= self.height {
            self.angle
        } else {
            self.angle + 90.0
        };
        normalize_half_turn(-image_angle)
    }
}

/// Folds an undirected line angle into `(-90, 90]`.
pub fn normalize_half_turn(angle: f32) -> f32 {
    let mut a = angle % 180.0;
    if a <= -90.0 {
        a += 180.0;
    } else if a > 90.0 {
        a -= 180.0;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_polygon(x0: f32, y0: f32, x1: f32, y1: f32) -> Polygon {
        Polygon::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    #[test]
    fn test_area_and_perimeter() {
        let p = rect_polygon(0.0, 0.0, 10.0, 4.0);
        assert!((p.area() - 40.0).abs() < 1e-4);
        assert!((p.perimeter() - 28.0).abs() < 1e-4);
        let r = p.bounding_rect().unwrap();
        assert_eq!((r.width(), r.height()), (10.0, 4.0));
    }

    #[test]
    fn test_min_area_rect_of_axis_aligned_box() {
        let rect = rect_polygon(2.0, 3.0, 22.0, 7.0).min_area_rect();
        assert!((rect.elongation() - 5.0).abs() < 1e-3);
        assert!((rect.center.x - 12.0).abs() < 1e-3);
        assert!((rect.center.y - 5.0).abs() < 1e-3);
        assert!(rect.long_side_angle().abs() < 1e-3);
    }

    #[test]
    fn test_min_area_rect_of_tilted_line() {
        // A 40x4 bar rising to the right by 30 degrees.
        let (c, s) = (30f32.to_radians().cos(), 30f32.to_radians().sin());
        let corners = [(-20.0, -2.0), (20.0, -2.0), (20.0, 2.0), (-20.0, 2.0)];
        let points = corners
            .iter()
            .map(|(x, y)| Point::new(50.0 + x * c + y * s, 50.0 - x * s + y * c))
            .collect();
        let rect = Polygon::new(points).min_area_rect();
        assert!((rect.elongation() - 10.0).abs() < 1e-2);
        assert!((rect.long_side_angle() - 30.0).abs() < 1e-2);
    }

    #[test]
    fn test_normalize_half_turn() {
        assert_eq!(normalize_half_turn(90.0), 90.0);
        assert_eq!(normalize_half_turn(-90.0), 90.0);
        assert_eq!(normalize_half_turn(120.0), -60.0);
        assert_eq!(normalize_half_turn(-135.0), 45.0);
    }
}

use serde::Serialize;

use crate::geometry::{
    clip_segment, distance_to_segment, segment_intersection_point, segment_intersects_rect, segments_intersect,
    Point, Rect,
};

/// Cubic Bézier from `start` to `end`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CubicCurve {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicCurve {
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        self.start * (u * u * u)
            + self.control1 * (3.0 * u * u * t)
            + self.control2 * (3.0 * u * t * t)
            + self.end * (t * t * t)
    }

    pub fn flatten(&self, segments: usize) -> Polyline {
        let segments = segments.max(1);
        Polyline::new(
            (0..=segments)
                .map(|i| self.point_at(i as f64 / segments as f64))
                .collect(),
        )
    }

    pub fn length(&self, segments: usize) -> f64 {
        self.flatten(segments).length()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    points: Vec<Point>,
    bounds: Rect,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        let first = points.first().copied().unwrap_or(Point::ORIGIN);
        let bounds = points
            .iter()
            .fold(Rect::from_corners(first, first), |bounds, point| {
                bounds.united(&Rect::from_corners(*point, *point))
            });
        Polyline { points, bounds }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn segments(&self) -> impl Iterator<Item = (&Point, &Point)> + '_ {
        self.points.windows(2).map(|pair| (&pair[0], &pair[1]))
    }

    pub fn length(&self) -> f64 {
        self.segments().map(|(a, b)| a.distance(b)).sum()
    }

    pub fn distance_to(&self, point: &Point) -> f64 {
        match self.points.as_slice() {
            [] => f64::INFINITY,
            [single] => single.distance(point),
            _ => self
                .segments()
                .map(|(a, b)| distance_to_segment(point, a, b))
                .fold(f64::INFINITY, f64::min),
        }
    }

    pub fn intersects(&self, other: &Polyline) -> bool {
        if !self.bounds.touches(&other.bounds) {
            return false;
        }
        self.segments().any(|(a, b)| {
            let segment_bounds = Rect::from_corners(*a, *b);
            other.segments().any(|(c, d)| {
                segment_bounds.touches(&Rect::from_corners(*c, *d)) && segments_intersect(a, b, c, d)
            })
        })
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        if !self.bounds.touches(rect) {
            return false;
        }
        match self.points.as_slice() {
            [single] => rect.contains(single),
            _ => self.segments().any(|(a, b)| segment_intersects_rect(a, b, rect)),
        }
    }

    /// Bounding-box area of the region where the two strokes of width `stroke_width` overlap.
    pub fn stroke_overlap_area(&self, other: &Polyline, stroke_width: f64) -> f64 {
        let half = stroke_width / 2.0;
        if !self.bounds.expanded(half, half).touches(&other.bounds.expanded(half, half)) {
            return 0.0;
        }

        let mut close: Vec<Point> = self
            .points
            .iter()
            .filter(|point| other.distance_to(point) <= stroke_width)
            .chain(other.points.iter().filter(|point| self.distance_to(point) <= stroke_width))
            .copied()
            .collect();
        for (a, b) in self.segments() {
            close.extend(other.segments().filter_map(|(c, d)| segment_intersection_point(a, b, c, d)));
        }

        match bounds_of(&close) {
            Some(region) => region.expanded(half, half).area(),
            None => 0.0,
        }
    }

    /// Bounding-box area of the part of the stroke that lies inside `rect`.
    pub fn stroke_rect_overlap_area(&self, rect: &Rect, stroke_width: f64) -> f64 {
        let half = stroke_width / 2.0;
        let reach = rect.expanded(half, half);
        if !self.bounds.touches(&reach) {
            return 0.0;
        }

        let clipped: Vec<Point> = self
            .segments()
            .filter_map(|(a, b)| clip_segment(a, b, &reach))
            .flat_map(|(a, b)| [a, b])
            .collect();

        bounds_of(&clipped)
            .and_then(|region| region.expanded(half, half).intersection(rect))
            .map_or(0.0, |overlap| overlap.area())
    }
}

fn bounds_of(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    Some(
        points
            .iter()
            .fold(Rect::from_corners(*first, *first), |bounds, point| {
                bounds.united(&Rect::from_corners(*point, *point))
            }),
    )
}

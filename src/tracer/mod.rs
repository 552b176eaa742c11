use std::collections::HashSet;

use image::GrayImage;

use crate::{ChromatraceError, ChromatraceResult};

pub mod marching_squares;

pub use marching_squares::MarchingSquares;

/// A point in image space; `x` is the column axis and `y` the row axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One closed contour. The last point repeats the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    points: Vec<Point>,
}

impl Boundary {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the first and last points coincide within `tolerance`.
    pub fn is_closed(&self, tolerance: f64) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => {
                (first.x - last.x).abs() <= tolerance && (first.y - last.y).abs() <= tolerance
            }
            _ => false,
        }
    }

    /// Number of distinct coordinates on the contour.
    pub fn distinct_points(&self) -> usize {
        self.points
            .iter()
            .map(|p| (p.x.to_bits(), p.y.to_bits()))
            .collect::<HashSet<_>>()
            .len()
    }
}

/// An algorithm that turns a binary mask into closed boundaries.
pub trait BoundaryTracer {
    fn trace(&self, mask: &GrayImage) -> ChromatraceResult<Vec<Boundary>>;

    /// Trace `mask` after checking that it is `expected` (width, height) and non-empty.
    fn trace_checked(
        &self,
        mask: &GrayImage,
        expected: (u32, u32),
    ) -> ChromatraceResult<Vec<Boundary>> {
        let found = mask.dimensions();
        if found != expected || found.0 == 0 || found.1 == 0 {
            return Err(ChromatraceError::Trace { expected, found });
        }
        self.trace(mask)
    }
}

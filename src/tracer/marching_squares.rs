//! Marching squares contour tracing.
//!
//! The mask is sampled on pixel centers and padded with a one-pixel border
//! of background, so every contour closes. Each 2×2 cell emits oriented
//! segments between crossings on its edges with the set region kept on the
//! right-hand side; since every crossing edge then starts exactly one
//! segment and ends exactly one, chaining segments yields closed loops.
//!
//! Saddle cells keep their two set corners apart: set pixels are
//! 4-connected and background pixels 8-connected.

use image::GrayImage;
use tracing::trace;

use super::{Boundary, BoundaryTracer, Point};
use crate::ChromatraceResult;

const NO_EDGE: usize = usize::MAX;
/// Contour level on the mask normalized to `[0, 1]`.
const ISO_LEVEL: f64 = 0.5;

/// Marching squares tracer at iso-level 0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingSquares;

impl BoundaryTracer for MarchingSquares {
    fn trace(&self, mask: &GrayImage) -> ChromatraceResult<Vec<Boundary>> {
        let (w, h) = mask.dimensions();
        if w == 0 || h == 0 {
            return Ok(Vec::new());
        }
        let field = PaddedField::new(mask);
        let boundaries = field.contours(ISO_LEVEL);
        trace!(width = w, height = h, count = boundaries.len(), "traced mask");
        Ok(boundaries)
    }
}

/// Cell edges, named by their position in a cell.
#[derive(Debug, Clone, Copy)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

use Side::{Bottom, Left, Right, Top};

/// Oriented segments for each corner configuration.
///
/// Bits: top-left = 1, top-right = 2, bottom-right = 4, bottom-left = 8.
fn segments(case: u8) -> &'static [(Side, Side)] {
    match case {
        1 => &[(Top, Left)],
        2 => &[(Right, Top)],
        3 => &[(Right, Left)],
        4 => &[(Bottom, Right)],
        5 => &[(Top, Left), (Bottom, Right)],
        6 => &[(Bottom, Top)],
        7 => &[(Bottom, Left)],
        8 => &[(Left, Bottom)],
        9 => &[(Top, Bottom)],
        10 => &[(Right, Top), (Left, Bottom)],
        11 => &[(Right, Bottom)],
        12 => &[(Left, Right)],
        13 => &[(Top, Right)],
        14 => &[(Left, Top)],
        _ => &[],
    }
}

/// Mask values in `[0, 1]` with a zero border, row-major.
struct PaddedField {
    values: Vec<f64>,
    width: usize,
    height: usize,
}

impl PaddedField {
    fn new(mask: &GrayImage) -> Self {
        let (w, h) = mask.dimensions();
        let width = w as usize + 2;
        let height = h as usize + 2;
        let mut values = vec![0.0; width * height];
        for (x, y, px) in mask.enumerate_pixels() {
            values[(y as usize + 1) * width + x as usize + 1] = f64::from(px[0]) / 255.0;
        }
        Self {
            values,
            width,
            height,
        }
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.width + col]
    }

    /// Global id of a cell side. Horizontal grid edges get even ids, vertical ones odd.
    fn edge_id(&self, row: usize, col: usize, side: Side) -> usize {
        let (r, c, vertical) = match side {
            Top => (row, col, 0),
            Bottom => (row + 1, col, 0),
            Left => (row, col, 1),
            Right => (row, col + 1, 1),
        };
        2 * (r * self.width + c) + vertical
    }

    /// Interpolated crossing on an edge, in unpadded (x, y) coordinates.
    fn crossing(&self, edge: usize, level: f64) -> Point {
        let cell = edge / 2;
        let (row, col) = (cell / self.width, cell % self.width);
        let from = self.value(row, col);
        let (x, y) = if edge % 2 == 0 {
            let t = interpolate(from, self.value(row, col + 1), level);
            (col as f64 + t, row as f64)
        } else {
            let t = interpolate(from, self.value(row + 1, col), level);
            (col as f64, row as f64 + t)
        };
        Point::new(x - 1.0, y - 1.0)
    }

    fn contours(&self, level: f64) -> Vec<Boundary> {
        let mut next = vec![NO_EDGE; 2 * self.width * self.height];
        let mut starts = Vec::new();

        for row in 0..self.height - 1 {
            for col in 0..self.width - 1 {
                let inside = |r: usize, c: usize| self.value(r, c) > level;
                let case = u8::from(inside(row, col))
                    | u8::from(inside(row, col + 1)) << 1
                    | u8::from(inside(row + 1, col + 1)) << 2
                    | u8::from(inside(row + 1, col)) << 3;
                for &(from, to) in segments(case) {
                    let from = self.edge_id(row, col, from);
                    next[from] = self.edge_id(row, col, to);
                    starts.push(from);
                }
            }
        }

        let mut visited = vec![false; next.len()];
        let mut boundaries = Vec::new();
        for start in starts {
            if visited[start] {
                continue;
            }
            let mut points = Vec::new();
            let mut edge = start;
            while edge != NO_EDGE && !visited[edge] {
                visited[edge] = true;
                points.push(self.crossing(edge, level));
                edge = next[edge];
            }
            if let Some(&first) = points.first() {
                points.push(first);
                boundaries.push(Boundary::new(points));
            }
        }
        boundaries
    }
}

fn interpolate(from: f64, to: f64, level: f64) -> f64 {
    let span = to - from;
    if span == 0.0 {
        0.5
    } else {
        (level - from) / span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChromatraceError;
    use image::Luma;

    fn mask_from_rows(rows: &[&str]) -> GrayImage {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        GrayImage::from_fn(w, h, |x, y| {
            let set = rows[y as usize].as_bytes()[x as usize] == b'#';
            Luma([if set { 255 } else { 0 }])
        })
    }

    fn trace(mask: &GrayImage) -> Vec<Boundary> {
        MarchingSquares.trace(mask).unwrap()
    }

    fn bounds(boundary: &Boundary) -> (f64, f64, f64, f64) {
        boundary.points().iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    mod unit {
        use super::*;

        #[test]
        fn empty_mask_has_no_boundaries() {
            let mask = GrayImage::new(6, 4);
            assert!(trace(&mask).is_empty());
        }

        #[test]
        fn zero_sized_mask_has_no_boundaries() {
            assert!(trace(&GrayImage::new(0, 0)).is_empty());
        }

        #[test]
        fn single_pixel_is_a_diamond() {
            let mask = mask_from_rows(&["...", ".#.", "..."]);
            let boundaries = trace(&mask);
            assert_eq!(boundaries.len(), 1);
            let b = &boundaries[0];
            assert_eq!(b.len(), 5);
            assert_eq!(b.distinct_points(), 4);
            assert!(b.is_closed(1e-9));
            assert_eq!(bounds(b), (0.5, 0.5, 1.5, 1.5));
            for p in b.points() {
                let manhattan = (p.x - 1.0).abs() + (p.y - 1.0).abs();
                assert!((manhattan - 0.5).abs() < 1e-9);
            }
        }

        #[test]
        fn full_mask_closes_along_the_border() {
            let mask = mask_from_rows(&["###", "###"]);
            let boundaries = trace(&mask);
            assert_eq!(boundaries.len(), 1);
            assert!(boundaries[0].is_closed(1e-9));
            assert_eq!(bounds(&boundaries[0]), (-0.5, -0.5, 2.5, 1.5));
        }

        #[test]
        fn coordinates_are_x_then_y() {
            // A horizontal bar: wide in x, short in y.
            let mask = mask_from_rows(&[".....", ".###.", "....."]);
            let boundaries = trace(&mask);
            assert_eq!(boundaries.len(), 1);
            let (x0, y0, x1, y1) = bounds(&boundaries[0]);
            assert_eq!((x0, x1), (0.5, 3.5));
            assert_eq!((y0, y1), (0.5, 1.5));
        }

        #[test]
        fn disjoint_regions_trace_separately() {
            let mask = mask_from_rows(&["##...", "##...", ".....", "...##"]);
            assert_eq!(trace(&mask).len(), 2);
        }

        #[test]
        fn ring_yields_outer_and_hole_contours() {
            let mask = mask_from_rows(&[".....", ".###.", ".#.#.", ".###.", "....."]);
            let boundaries = trace(&mask);
            assert_eq!(boundaries.len(), 2);
            let mut extents: Vec<_> = boundaries.iter().map(bounds).collect();
            extents.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
            assert_eq!(extents[0], (0.5, 0.5, 3.5, 3.5));
            assert_eq!(extents[1], (1.5, 1.5, 2.5, 2.5));
        }

        #[test]
        fn diagonal_pixels_are_not_joined() {
            let mask = mask_from_rows(&["#.", ".#"]);
            let boundaries = trace(&mask);
            assert_eq!(boundaries.len(), 2);
            for b in &boundaries {
                assert_eq!(b.distinct_points(), 4);
            }
        }

        #[test]
        fn trace_checked_rejects_mismatched_mask() {
            let mask = GrayImage::new(4, 3);
            let err = MarchingSquares
                .trace_checked(&mask, (3, 4))
                .unwrap_err();
            match err {
                ChromatraceError::Trace { expected, found } => {
                    assert_eq!(expected, (3, 4));
                    assert_eq!(found, (4, 3));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn trace_checked_rejects_zero_sized_mask() {
            let err = MarchingSquares
                .trace_checked(&GrayImage::new(0, 0), (0, 0))
                .unwrap_err();
            assert!(matches!(err, ChromatraceError::Trace { .. }));
        }
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// trace: every boundary is closed with at least 3 distinct points
            #[test]
            fn boundaries_are_closed(
                w in 1u32..10,
                h in 1u32..10,
                bits in proptest::collection::vec(proptest::bool::ANY, 100)
            ) {
                let mask = GrayImage::from_fn(w, h, |x, y| {
                    Luma([if bits[(y * 10 + x) as usize] { 255 } else { 0 }])
                });
                let any_set = mask.pixels().any(|p| p[0] == 255);
                let boundaries = trace(&mask);
                prop_assert_eq!(boundaries.is_empty(), !any_set);
                for b in &boundaries {
                    prop_assert!(b.is_closed(1e-9));
                    prop_assert!(b.distinct_points() >= 3);
                    for p in b.points() {
                        prop_assert!(p.x >= -0.5 && p.x <= w as f64 - 0.5);
                        prop_assert!(p.y >= -0.5 && p.y <= h as f64 - 0.5);
                    }
                }
            }
        }
    }
}

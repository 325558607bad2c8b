//! Matching utilities for multi-object tracking.

use std::collections::BTreeMap;

use ndarray::Array2;

use crate::error::TrackerError;
use crate::tracker::rect::{Rect, iou_batch};

/// Cost given to padding cells and to pairs at or above the match threshold.
const LARGE_COST: f64 = 1e6;

/// Detection input for the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Bounding box in TLWH format
    pub bbox: Rect,
    /// Detection confidence score in [0, 1]
    pub score: f32,
}

impl Detection {
    pub fn new(bbox: Rect, score: f32) -> Self {
        Self { bbox, score }
    }

    pub fn from_tlwh(x: f32, y: f32, width: f32, height: f32, score: f32) -> Self {
        Self::new(Rect::new(x, y, width, height), score)
    }

    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self::new(Rect::from_tlbr(x1, y1, x2, y2), score)
    }
}

/// Compute the IoU distance (`1 - IoU`) matrix between two sets of boxes.
///
/// An empty matrix (0x0) is returned when either side is empty; callers
/// read that as "nothing can match".
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    if track_boxes.is_empty() || det_boxes.is_empty() {
        return Array2::zeros((0, 0));
    }
    iou_batch(track_boxes, det_boxes).mapv_into(|iou| 1.0 - iou)
}

/// One-to-one partial matching from cost-matrix rows to columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    matches: BTreeMap<usize, usize>,
}

impl Assignment {
    pub fn get(&self, row: usize) -> Option<usize> {
        self.matches.get(&row).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.matches.iter().map(|(&row, &col)| (row, col))
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Rows in `0..num_rows` that were not assigned.
    pub fn unmatched_rows(&self, num_rows: usize) -> Vec<usize> {
        (0..num_rows)
            .filter(|row| !self.matches.contains_key(row))
            .collect()
    }

    /// Columns in `0..num_cols` that were not assigned.
    pub fn unmatched_cols(&self, num_cols: usize) -> Vec<usize> {
        let mut matched = vec![false; num_cols];
        for &col in self.matches.values() {
            if col < num_cols {
                matched[col] = true;
            }
        }
        matched
            .iter()
            .enumerate()
            .filter_map(|(col, &m)| if m { None } else { Some(col) })
            .collect()
    }
}

/// Solve the minimum-cost assignment between rows and columns of `cost_matrix`.
///
/// The matrix is padded to a square of side `max(M, N)`; padding cells and any
/// cell with cost `>= thresh` get [`LARGE_COST`] so the solver only picks them
/// when nothing else is left. Those picks are dropped from the result.
pub fn linear_assignment(
    cost_matrix: &Array2<f32>,
    thresh: f32,
) -> Result<Assignment, TrackerError> {
    let (num_rows, num_cols) = cost_matrix.dim();
    if num_rows == 0 || num_cols == 0 {
        return Ok(Assignment::default());
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), LARGE_COST);

    let mut admissible = 0usize;
    for ((i, j), &cost) in cost_matrix.indexed_iter() {
        if cost < thresh {
            padded[[i, j]] = cost as f64;
            admissible += 1;
        }
    }
    if admissible == 0 {
        return Ok(Assignment::default());
    }

    let (row_to_col, _) =
        lapjv::lapjv(&padded).map_err(|e| TrackerError::Assignment(format!("{e:?}")))?;

    let mut matches = BTreeMap::new();
    for (row, &col) in row_to_col.iter().enumerate().take(num_rows) {
        if col < num_cols && cost_matrix[[row, col]] < thresh {
            matches.insert(row, col);
        }
    }

    Ok(Assignment { matches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn test_iou_distance_values() {
        let tracks = [Rect::new(0.0, 0.0, 10.0, 10.0)];
        let dets = [
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(5.0, 0.0, 10.0, 10.0),
            Rect::new(100.0, 100.0, 10.0, 10.0),
        ];
        let dists = iou_distance(&tracks, &dets);
        assert_eq!(dists.dim(), (1, 3));
        assert!(dists[[0, 0]].abs() < 1e-6);
        assert!((dists[[0, 1]] - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(dists[[0, 2]], 1.0);
    }

    #[test]
    fn test_iou_distance_empty() {
        let boxes = [Rect::new(0.0, 0.0, 10.0, 10.0)];
        assert_eq!(iou_distance(&boxes, &[]).dim(), (0, 0));
        assert_eq!(iou_distance(&[], &boxes).dim(), (0, 0));
    }

    #[test]
    fn test_iou_distance_is_pure() {
        let a = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(3.3, 1.7, 7.1, 9.4)];
        let b = [Rect::new(1.0, 2.0, 10.0, 10.0), Rect::new(0.0, 0.0, 0.0, 0.0)];
        let first = iou_distance(&a, &b);
        let second = iou_distance(&a, &b);
        for (x, y) in first.iter().zip(second.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        assert!(first.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_assignment_prefers_diagonal() {
        let cost = array![[0.1f32, 0.9], [0.9, 0.1]];
        let assignment = linear_assignment(&cost, 0.7).unwrap();
        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment.get(0), Some(0));
        assert_eq!(assignment.get(1), Some(1));
    }

    #[test]
    fn test_assignment_minimizes_total_cost() {
        // Greedy would take (0, 0) at 0.1 and leave row 1 with 0.6;
        // the optimum is (0, 1) + (1, 0) = 0.2 + 0.2.
        let cost = array![[0.1f32, 0.2], [0.2, 0.6]];
        let assignment = linear_assignment(&cost, 0.7).unwrap();
        assert_eq!(assignment.get(0), Some(1));
        assert_eq!(assignment.get(1), Some(0));
    }

    #[test]
    fn test_assignment_threshold_exclusion() {
        let cost = array![[0.7f32, 0.8], [0.9, 1.0]];
        let assignment = linear_assignment(&cost, 0.7).unwrap();
        assert!(assignment.is_empty());
        assert_eq!(assignment.unmatched_rows(2), vec![0, 1]);
        assert_eq!(assignment.unmatched_cols(2), vec![0, 1]);
    }

    #[test]
    fn test_assignment_partial_threshold() {
        let cost = array![[0.2f32, 0.95], [0.95, 0.95]];
        let assignment = linear_assignment(&cost, 0.7).unwrap();
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.get(0), Some(0));
        assert_eq!(assignment.unmatched_rows(2), vec![1]);
        assert_eq!(assignment.unmatched_cols(2), vec![1]);
    }

    #[test]
    fn test_assignment_rectangular() {
        let wide = array![[0.9f32, 0.3, 0.1]];
        let assignment = linear_assignment(&wide, 0.7).unwrap();
        assert_eq!(assignment.get(0), Some(2));
        assert_eq!(assignment.unmatched_cols(3), vec![0, 1]);

        let tall = array![[0.5f32], [0.2], [0.4]];
        let assignment = linear_assignment(&tall, 0.7).unwrap();
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.get(1), Some(0));
        assert_eq!(assignment.unmatched_rows(3), vec![0, 2]);
    }

    #[test]
    fn test_assignment_empty_dimensions() {
        let empty = Array2::<f32>::zeros((0, 0));
        assert!(linear_assignment(&empty, 0.7).unwrap().is_empty());

        let no_cols = Array2::<f32>::zeros((3, 0));
        let assignment = linear_assignment(&no_cols, 0.7).unwrap();
        assert!(assignment.is_empty());
        assert_eq!(assignment.unmatched_rows(3), vec![0, 1, 2]);
    }

    #[test]
    fn test_assignment_ignores_nan() {
        let cost = array![[f32::NAN, 0.3]];
        let assignment = linear_assignment(&cost, 0.7).unwrap();
        assert_eq!(assignment.get(0), Some(1));
    }

    #[test]
    fn test_quickcheck_one_to_one() {
        fn prop(rows: u8, cols: u8, values: Vec<u8>) -> TestResult {
            let rows = (rows % 6) as usize + 1;
            let cols = (cols % 6) as usize + 1;
            if values.len() < rows * cols {
                return TestResult::discard();
            }
            let cost = Array2::from_shape_fn((rows, cols), |(i, j)| {
                values[i * cols + j] as f32 / 255.0
            });
            let assignment = match linear_assignment(&cost, 0.7) {
                Ok(assignment) => assignment,
                Err(_) => return TestResult::failed(),
            };

            let mut seen_cols = vec![false; cols];
            for (row, col) in assignment.iter() {
                if row >= rows || col >= cols || seen_cols[col] || cost[[row, col]] >= 0.7 {
                    return TestResult::failed();
                }
                seen_cols[col] = true;
            }
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(200)
            .quickcheck(prop as fn(u8, u8, Vec<u8>) -> TestResult);
    }
}

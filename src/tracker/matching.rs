//! Detection input and IoU-gated optimal assignment.

use crate::tracker::rect::{Rect, iou_batch};
use log::warn;
use ndarray::Array2;

/// Cost given to padding cells and to pairs rejected by the IoU gate.
const GATED_COST: f64 = 1e6;

/// Detection input for the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Bounding box in TLWH storage, built from TLBR input
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self { bbox, score }
    }

    /// Build a detection from an `[x1, y1, x2, y2, score]` row.
    pub fn from_row(row: [f32; 5]) -> Self {
        Self::new(row[0], row[1], row[2], row[3], row[4])
    }

    /// A detection the tracker can use: finite numbers and a box with positive area.
    pub fn is_valid(&self) -> bool {
        self.bbox.is_finite() && self.score.is_finite() && !self.bbox.is_empty()
    }
}

/// Compute the `1 - IoU` distance matrix between tracks and detections.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    iou_batch(track_boxes, det_boxes).mapv(|iou| 1.0 - iou)
}

/// Outcome of one association round. Indices refer to the rows (tracks) and
/// columns (detections) of the cost matrix; every index lands in exactly one set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Match predicted track boxes against detection boxes.
///
/// Pairs whose IoU falls below `iou_threshold` are never matched.
pub fn associate(track_boxes: &[Rect], det_boxes: &[Rect], iou_threshold: f32) -> AssignmentResult {
    let dists = iou_distance(track_boxes, det_boxes);
    linear_assignment(&dists, 1.0 - iou_threshold)
}

/// Minimum-total-cost assignment over `cost_matrix`, accepting only pairs with
/// `cost <= thresh`.
///
/// Gated pairs are priced out before solving, so the optimum is taken over the
/// admissible pairs only. Among optimal assignments of equal cost the one
/// favouring lower row, then lower column indices is returned. Rows and
/// columns are reported in ascending order.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    let admissible = |cost: f32| cost.is_finite() && cost <= thresh;

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), GATED_COST);
    for ((i, j), &cost) in cost_matrix.indexed_iter() {
        if admissible(cost) {
            padded[[i, j]] = cost as f64;
        }
    }

    let mut matches = vec![];
    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
                if col_idx < num_cols && admissible(cost_matrix[[row_idx, col_idx]]) {
                    matches.push((row_idx, col_idx));
                }
            }
        }
        Err(_) => {
            warn!("assignment solver failed, leaving all pairs unmatched");
        }
    }
    prefer_lower_indices(cost_matrix, &admissible, &mut matches);

    let mut track_matched = vec![false; num_rows];
    let mut detection_matched = vec![false; num_cols];
    for &(row_idx, col_idx) in &matches {
        track_matched[row_idx] = true;
        detection_matched[col_idx] = true;
    }

    AssignmentResult {
        matches,
        unmatched_tracks: unmatched(&track_matched),
        unmatched_detections: unmatched(&detection_matched),
    }
}

/// Rewrite `matches` into the equal-cost assignment that favours low track
/// indices, then low detection indices.
///
/// Only exchanges that keep the total cost unchanged are made, so an optimal
/// assignment stays optimal. Every exchange lowers the summed indices or, at
/// equal sums, the number of crossed pairs, so the loop terminates.
fn prefer_lower_indices(
    cost: &Array2<f32>,
    admissible: &impl Fn(f32) -> bool,
    matches: &mut [(usize, usize)],
) {
    let (num_rows, num_cols) = cost.dim();
    let usable = |i: usize, j: usize| admissible(cost[[i, j]]);
    let c = |i: usize, j: usize| f64::from(cost[[i, j]]);

    loop {
        let mut changed = false;

        for a in 0..matches.len() {
            for b in 0..matches.len() {
                let ((i1, j1), (i2, j2)) = (matches[a], matches[b]);
                if i1 < i2
                    && j1 > j2
                    && usable(i1, j2)
                    && usable(i2, j1)
                    && c(i1, j2) + c(i2, j1) == c(i1, j1) + c(i2, j2)
                {
                    matches[a].1 = j2;
                    matches[b].1 = j1;
                    changed = true;
                }
            }
        }

        let mut row_used = vec![false; num_rows];
        let mut col_used = vec![false; num_cols];
        for &(i, j) in matches.iter() {
            row_used[i] = true;
            col_used[j] = true;
        }
        for m in matches.iter_mut() {
            let (i, j) = *m;
            if let Some(lower) = (0..j).find(|&k| !col_used[k] && usable(i, k) && c(i, k) == c(i, j)) {
                col_used[j] = false;
                col_used[lower] = true;
                m.1 = lower;
                changed = true;
            }
            let (i, j) = *m;
            if let Some(lower) = (0..i).find(|&k| !row_used[k] && usable(k, j) && c(k, j) == c(i, j)) {
                row_used[i] = false;
                row_used[lower] = true;
                m.0 = lower;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }
    matches.sort_unstable();
}

fn unmatched(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &matched)| if matched { None } else { Some(i) })
        .collect()
}

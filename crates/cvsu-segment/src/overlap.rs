//! Overlap-driven segmentation
//!
//! Trees divide while their candidate children's estimated intensity
//! intervals overlap too little, then leaves fuse with the neighbors
//! whose intervals overlap the most.

use crate::error::{SegmentError, SegmentResult};
use crate::render::refresh_segments;
use cvsu_forest::{QuadForest, TreeId, segment_find, segment_of, segment_union};

/// Ratio of intersection to union of two estimated intensity intervals
///
/// Each interval is `[mean - spread, mean + spread]` clamped to [0, 255].
/// An empty intersection counts as 0; a non-empty one is floored at 1, as
/// is the union, to keep the ratio stable for near-degenerate intervals.
fn interval_overlap(mean_a: f64, spread_a: f64, mean_b: f64, spread_b: f64) -> f64 {
    let low_a = (mean_a - spread_a).max(0.0);
    let high_a = (mean_a + spread_a).min(255.0);
    let low_b = (mean_b - spread_b).max(0.0);
    let high_b = (mean_b + spread_b).min(255.0);
    let low_max = low_a.max(low_b);
    let high_min = high_a.min(high_b);
    let intersection = if low_max > high_min {
        0.0
    } else {
        (high_min - low_max).max(1.0)
    };
    let union = (high_a.max(high_b) - low_a.min(low_b)).max(1.0);
    intersection / union
}

/// Segment the forest by intensity interval overlap
///
/// Phase 1 runs the overlap division criterion over the whole pool,
/// recursing through appended children. Phase 2 unions each leaf with the
/// neighbor of highest interval overlap when it exceeds
/// `threshold_trees`; phase 3 repeats against merged segment intervals
/// with `threshold_segments`. Ends by refreshing segment counts and
/// colors.
pub fn segment_with_overlap(
    forest: &mut QuadForest,
    alpha: f64,
    threshold_trees: f64,
    threshold_segments: f64,
) -> SegmentResult<()> {
    if alpha <= 0.0 {
        return Err(SegmentError::InvalidParameters(
            "alpha must be positive".to_string(),
        ));
    }
    if threshold_trees <= 0.0 || threshold_segments <= 0.0 {
        return Err(SegmentError::InvalidParameters(
            "overlap thresholds must be positive".to_string(),
        ));
    }

    // divide until all trees are consistent
    let mut index = 0;
    while index < forest.len() {
        let id = TreeId(index as u32);
        forest.divide_with_overlap(id, alpha, threshold_trees)?;
        index += 1;
    }

    // union each leaf with its best-overlapping neighbor
    let total = forest.len();
    for index in 0..total {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() {
            continue;
        }
        let tree_segment = segment_find(forest, id);
        let (tree_mean, tree_spread) = {
            let stat = forest.tree(id).stat;
            (stat.mean, (alpha * stat.deviation).max(alpha))
        };
        let links = {
            let tree = forest.tree(id);
            [tree.n, tree.e, tree.s, tree.w]
        };
        let mut best_overlap = 0.0;
        let mut best_neighbor = None;
        for link in links {
            let Some(neighbor) = link else { continue };
            if !forest.tree(neighbor).is_leaf() {
                continue;
            }
            if segment_find(forest, neighbor) == tree_segment {
                continue;
            }
            let stat = forest.tree(neighbor).stat;
            let overlap = interval_overlap(
                tree_mean,
                tree_spread,
                stat.mean,
                (alpha * stat.deviation).max(alpha),
            );
            if overlap > best_overlap {
                best_overlap = overlap;
                best_neighbor = Some(neighbor);
            }
        }
        if let Some(neighbor) = best_neighbor
            && best_overlap > threshold_trees
        {
            segment_union(forest, id, neighbor);
        }
    }

    // union neighboring segments whose merged intervals still agree
    for index in 0..total {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() {
            continue;
        }
        let Some(tree_segment) = segment_find(forest, id) else {
            continue;
        };
        let (segment_mean, segment_spread) = match segment_of(forest, tree_segment) {
            Some(segment) => (
                segment.stat.mean,
                (alpha * segment.stat.deviation).max(alpha),
            ),
            None => continue,
        };
        let links = {
            let tree = forest.tree(id);
            [tree.n, tree.e, tree.s, tree.w]
        };
        for link in links {
            let Some(neighbor) = link else { continue };
            if !forest.tree(neighbor).is_leaf() {
                continue;
            }
            let Some(neighbor_segment) = segment_find(forest, neighbor) else {
                continue;
            };
            if neighbor_segment == tree_segment {
                continue;
            }
            let overlap = match segment_of(forest, neighbor_segment) {
                Some(segment) => interval_overlap(
                    segment_mean,
                    segment_spread,
                    segment.stat.mean,
                    (alpha * segment.stat.deviation).max(alpha),
                ),
                None => continue,
            };
            if overlap > threshold_segments {
                segment_union(forest, id, neighbor);
            }
        }
    }

    refresh_segments(forest)
}

//! Deviation-driven segmentation
//!
//! Divides trees until their intensity deviation falls under a threshold,
//! then fuses neighboring leaves whose means are close: first each leaf
//! with its single best neighbor, then leaves against the running means of
//! the merged segments.

use crate::error::{SegmentError, SegmentResult};
use crate::render::refresh_segments;
use cvsu_forest::{QuadForest, TreeId, segment_create, segment_find, segment_of, segment_union};

/// Segment the forest by intensity deviation
///
/// Phase 1 subdivides every tree with deviation above `threshold` while
/// its size allows, turning the rest into one-tree segments. Phase 2
/// unions each leaf with its best (closest-mean) direct neighbor when the
/// distance stays under `alpha * threshold`; phase 3 repeats the test
/// against the merged segments' running means. Ends by refreshing segment
/// counts and colors.
pub fn segment_with_deviation(
    forest: &mut QuadForest,
    threshold: f64,
    alpha: f64,
) -> SegmentResult<()> {
    if threshold <= 0.0 {
        return Err(SegmentError::InvalidParameters(
            "deviation threshold must be positive".to_string(),
        ));
    }
    if alpha <= 0.0 {
        return Err(SegmentError::InvalidParameters(
            "alpha must be positive".to_string(),
        ));
    }
    let min_size = forest.tree_min_size();

    // divide until all trees are consistent; appended children are
    // visited by the same sweep
    let mut index = 0;
    while index < forest.len() {
        let id = TreeId(index as u32);
        let tree = forest.tree(id);
        if tree.size >= 2 * min_size && tree.stat.deviation > threshold {
            forest.divide(id)?;
        } else {
            segment_create(forest, id);
        }
        index += 1;
    }

    // union each leaf with the closest of its neighbors
    let total = forest.len();
    for index in 0..total {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() {
            continue;
        }
        let tree_segment = segment_find(forest, id);
        let tree_mean = forest.tree(id).stat.mean;
        let links = {
            let tree = forest.tree(id);
            [tree.n, tree.e, tree.s, tree.w]
        };
        let mut best_dist = 255.0;
        let mut best_neighbor = None;
        for link in links {
            let Some(neighbor) = link else { continue };
            if !forest.tree(neighbor).is_leaf() {
                continue;
            }
            if segment_find(forest, neighbor) == tree_segment {
                continue;
            }
            let dist = (tree_mean - forest.tree(neighbor).stat.mean).abs();
            if dist < best_dist {
                best_dist = dist;
                best_neighbor = Some(neighbor);
            }
        }
        if let Some(neighbor) = best_neighbor
            && best_dist < alpha * threshold
        {
            segment_union(forest, id, neighbor);
        }
    }

    // union neighboring segments that are consistent together
    for index in 0..total {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() {
            continue;
        }
        let Some(tree_segment) = segment_find(forest, id) else {
            continue;
        };
        let segment_mean = segment_of(forest, tree_segment).map_or(0.0, |s| s.stat.mean);
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
            let neighbor_mean =
                segment_of(forest, neighbor_segment).map_or(0.0, |s| s.stat.mean);
            if (segment_mean - neighbor_mean).abs() < alpha * threshold {
                segment_union(forest, id, neighbor);
            }
        }
    }

    refresh_segments(forest)
}

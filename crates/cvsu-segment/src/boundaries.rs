//! Boundary discovery and boundary-guided segmentation
//!
//! The deviation of each tree diffuses through the forest; a tree whose
//! own deviation stands clearly above the propagated neighborhood
//! estimate is a boundary candidate. Adjacent candidates fuse into
//! boundary fragments, and segmentation then merges the consistent
//! non-boundary regions between them.

use crate::error::{SegmentError, SegmentResult};
use crate::render::refresh_segments;
use cvsu_forest::{
    AnnotationKind, NeighborhoodStat, QuadForest, TreeId, boundary_create, boundary_find,
    boundary_of, boundary_union, has_boundary, segment_create, segment_find, segment_of,
    segment_union,
};

/// Diffuse deviations and store the neighborhood estimates
///
/// After the rounds, each tree's `NeighborhoodStat` annotation holds the
/// propagated deviation mean and the deviation of that estimate.
fn propagate_deviation(forest: &mut QuadForest, rounds: u32) {
    let total = forest.len();
    for index in 0..total {
        forest.prime_with_dev(TreeId(index as u32));
    }
    for round in 0..rounds {
        for index in 0..total {
            forest.propagate(TreeId(index as u32));
        }
        if round + 1 < rounds {
            for index in 0..total {
                forest.prime_with_pool(TreeId(index as u32));
            }
        }
    }
    let token = forest.token();
    for index in 0..total {
        let id = TreeId(index as u32);
        let (pool, pool2) = {
            let tree = forest.tree(id);
            (tree.pool, tree.pool2)
        };
        let dev_mean = pool;
        let dev_dev = (pool2 - pool * pool).max(0.0).sqrt();
        let entry = forest
            .tree_mut(id)
            .annotation
            .ensure_has(AnnotationKind::NeighborhoodStat);
        if entry.token != token {
            entry.token = token;
            if let Some(stat) = entry.value.as_neighborhood_stat_mut() {
                *stat = NeighborhoodStat::default();
            }
        }
        if let Some(stat) = entry.value.as_neighborhood_stat_mut() {
            stat.dev_mean = dev_mean;
            stat.dev_dev = dev_dev;
        }
    }
}

/// The tree's propagated neighborhood deviation estimates
fn neighborhood_devs(forest: &QuadForest, id: TreeId) -> (f64, f64) {
    forest
        .tree(id)
        .annotation
        .current(AnnotationKind::NeighborhoodStat, forest.token())
        .and_then(|value| value.as_neighborhood_stat())
        .map_or((0.0, 0.0), |stat| (stat.dev_mean, stat.dev_dev))
}

/// Union adjacent boundary trees into fragments
fn link_boundaries(forest: &mut QuadForest) {
    let total = forest.len();
    for index in 0..total {
        let id = TreeId(index as u32);
        if !has_boundary(forest, id) {
            continue;
        }
        let links = {
            let tree = forest.tree(id);
            [tree.n, tree.e, tree.s, tree.w]
        };
        for link in links {
            if let Some(neighbor) = link
                && has_boundary(forest, neighbor)
            {
                boundary_union(forest, id, neighbor);
            }
        }
    }
}

/// Find boundary trees by deviation propagation
///
/// A tree becomes a boundary when its deviation exceeds
/// `dev_mean + bias * dev_dev` of the propagated field. Adjacent boundary
/// trees union into fragments, and fragments shorter than `min_length`
/// nodes are dropped.
pub fn find_boundaries(
    forest: &mut QuadForest,
    rounds: u32,
    bias: f64,
    min_length: u32,
) -> SegmentResult<()> {
    if rounds == 0 {
        return Err(SegmentError::InvalidParameters(
            "boundary detection needs at least one round".to_string(),
        ));
    }
    propagate_deviation(forest, rounds);

    let total = forest.len();
    for index in 0..total {
        let id = TreeId(index as u32);
        let (dev_mean, dev_dev) = neighborhood_devs(forest, id);
        if forest.tree(id).stat.deviation > dev_mean + bias * dev_dev {
            boundary_create(forest, id);
        }
    }
    link_boundaries(forest);

    if min_length > 1 {
        let mut doomed = Vec::new();
        for index in 0..total {
            let id = TreeId(index as u32);
            if !has_boundary(forest, id) {
                continue;
            }
            let Some(root) = boundary_find(forest, id) else {
                continue;
            };
            if boundary_of(forest, root).map_or(0, |b| b.length) < min_length {
                doomed.push(id);
            }
        }
        for id in doomed {
            forest.tree_mut(id).annotation.remove(AnnotationKind::Boundary);
        }
    }
    Ok(())
}

/// Find boundary trees with a two-threshold hysteresis
///
/// Trees above the high threshold (`dev_mean + high_bias * dev_dev`) seed
/// the boundary set; trees above `low_factor` times their high threshold
/// join when they touch a boundary tree, repeated to fixpoint.
pub fn find_boundaries_with_hysteresis(
    forest: &mut QuadForest,
    rounds: u32,
    high_bias: f64,
    low_factor: f64,
) -> SegmentResult<()> {
    if rounds == 0 {
        return Err(SegmentError::InvalidParameters(
            "boundary detection needs at least one round".to_string(),
        ));
    }
    if low_factor <= 0.0 || low_factor > 1.0 {
        return Err(SegmentError::InvalidParameters(
            "low factor must be in (0, 1]".to_string(),
        ));
    }
    propagate_deviation(forest, rounds);

    let total = forest.len();
    for index in 0..total {
        let id = TreeId(index as u32);
        let (dev_mean, dev_dev) = neighborhood_devs(forest, id);
        if forest.tree(id).stat.deviation > dev_mean + high_bias * dev_dev {
            boundary_create(forest, id);
        }
    }

    // grow along the low threshold until nothing joins
    loop {
        let mut changed = false;
        for index in 0..total {
            let id = TreeId(index as u32);
            if has_boundary(forest, id) {
                continue;
            }
            let (dev_mean, dev_dev) = neighborhood_devs(forest, id);
            let low = low_factor * (dev_mean + high_bias * dev_dev);
            if forest.tree(id).stat.deviation <= low {
                continue;
            }
            let links = {
                let tree = forest.tree(id);
                [tree.n, tree.e, tree.s, tree.w]
            };
            let touches = links
                .into_iter()
                .flatten()
                .any(|neighbor| has_boundary(forest, neighbor));
            if touches {
                boundary_create(forest, id);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    link_boundaries(forest);
    Ok(())
}

/// Drop boundary flags from trees with no boundary 4-neighbor
pub fn prune_boundaries(forest: &mut QuadForest) {
    let total = forest.len();
    let mut doomed = Vec::new();
    for index in 0..total {
        let id = TreeId(index as u32);
        if !has_boundary(forest, id) {
            continue;
        }
        let links = {
            let tree = forest.tree(id);
            [tree.n, tree.e, tree.s, tree.w]
        };
        let connected = links
            .into_iter()
            .flatten()
            .any(|neighbor| has_boundary(forest, neighbor));
        if !connected {
            doomed.push(id);
        }
    }
    for id in doomed {
        forest.tree_mut(id).annotation.remove(AnnotationKind::Boundary);
    }
}

/// Segment the forest between discovered boundaries
///
/// Finds boundaries (optionally with hysteresis), merges consistent
/// non-boundary neighbors whose mean distance stays under `tree_alpha`
/// times the smaller neighborhood deviation, merges consistent segments
/// with `segment_alpha` against the merged statistics, optionally prunes
/// isolated boundaries, and refreshes segment counts and colors.
#[allow(clippy::too_many_arguments)]
pub fn segment_with_boundaries(
    forest: &mut QuadForest,
    rounds: u32,
    high_bias: f64,
    low_factor: f64,
    tree_alpha: f64,
    segment_alpha: f64,
    use_hysteresis: bool,
    use_pruning: bool,
) -> SegmentResult<()> {
    if tree_alpha <= 0.0 || segment_alpha <= 0.0 {
        return Err(SegmentError::InvalidParameters(
            "alpha factors must be positive".to_string(),
        ));
    }
    if use_hysteresis {
        find_boundaries_with_hysteresis(forest, rounds, high_bias, low_factor)?;
    } else {
        find_boundaries(forest, rounds, high_bias, 3)?;
    }

    // merge consistent non-boundary neighbors
    let total = forest.len();
    for index in 0..total {
        let id = TreeId(index as u32);
        if has_boundary(forest, id) {
            continue;
        }
        if segment_find(forest, id).is_some() {
            continue;
        }
        let tree_mean = forest.tree(id).stat.mean;
        let (dev_mean, dev_dev) = neighborhood_devs(forest, id);
        let tree_dev = (dev_mean + dev_dev).max(1.0);
        let links = {
            let tree = forest.tree(id);
            [tree.n, tree.e, tree.s, tree.w]
        };
        for link in links {
            let Some(neighbor) = link else { continue };
            if has_boundary(forest, neighbor) {
                continue;
            }
            let neighbor_mean = forest.tree(neighbor).stat.mean;
            let (dev_mean, dev_dev) = neighborhood_devs(forest, neighbor);
            let neighbor_dev = (dev_mean + dev_dev).max(1.0);
            let deviation = tree_dev.min(neighbor_dev);
            if (tree_mean - neighbor_mean).abs() < tree_alpha * deviation {
                segment_create(forest, id);
                segment_create(forest, neighbor);
                segment_union(forest, id, neighbor);
            }
        }
    }

    // merge consistent segments
    for index in 0..total {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() {
            continue;
        }
        let Some(tree_segment) = segment_find(forest, id) else {
            continue;
        };
        let (segment_mean, segment_dev) = match segment_of(forest, tree_segment) {
            Some(segment) => (segment.stat.mean, segment.stat.deviation.max(1.0)),
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
            let (neighbor_mean, neighbor_dev) = match segment_of(forest, neighbor_segment) {
                Some(segment) => (segment.stat.mean, segment.stat.deviation.max(1.0)),
                None => continue,
            };
            let deviation = segment_dev.min(neighbor_dev);
            if (segment_mean - neighbor_mean).abs() < segment_alpha * deviation {
                segment_union(forest, id, neighbor);
            }
        }
    }

    if use_pruning {
        prune_boundaries(forest);
    }
    refresh_segments(forest)
}

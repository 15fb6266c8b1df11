//! Edge detection and edge-driven segmentation
//!
//! Edge responses diffuse through the forest with the synchronous
//! propagation engine; trees whose pooled response stands out from the
//! population are flagged as edges and fused into segments along the
//! requested direction.

use crate::error::{SegmentError, SegmentResult};
use crate::render::refresh_segments;
use cvsu_forest::{
    AnnotationKind, Direction, EdgeResponse, QuadForest, TreeId, segment_create, segment_union,
};

/// Parameters of [`segment_edges`]
#[derive(Debug, Clone, Copy)]
pub struct EdgeSegmentOptions {
    /// Propagation rounds of the detection phase
    pub detect_rounds: u32,
    /// How many pool deviations above the pool mean a tree must sit to
    /// count as an edge
    pub detect_bias: f64,
    /// Direction of the detection propagation
    pub detect_dir: Direction,
    /// Propagation rounds of the edge spreading phase
    pub propagate_rounds: u32,
    /// Pool value above which a tree keeps its edge after spreading
    pub propagate_threshold: f64,
    /// Direction of the spreading propagation
    pub propagate_dir: Direction,
    /// Direction along which edge trees merge into segments
    pub merge_dir: Direction,
}

impl Default for EdgeSegmentOptions {
    fn default() -> Self {
        Self {
            detect_rounds: 3,
            detect_bias: 0.5,
            detect_dir: Direction::N4,
            propagate_rounds: 2,
            propagate_threshold: 2.5,
            propagate_dir: Direction::N4,
            merge_dir: Direction::N4,
        }
    }
}

fn check_direction(direction: Direction) -> SegmentResult<()> {
    match direction {
        Direction::H | Direction::V | Direction::N4 => Ok(()),
        other => Err(SegmentError::InvalidParameters(format!(
            "direction must be H, V or N4, got {:?}",
            other
        ))),
    }
}

fn set_has_edge(forest: &mut QuadForest, id: TreeId, flag: bool) {
    let token = forest.token();
    let entry = forest
        .tree_mut(id)
        .annotation
        .ensure_has(AnnotationKind::EdgeResponse);
    if entry.token != token {
        entry.token = token;
        if let Some(response) = entry.value.as_edge_response_mut() {
            *response = EdgeResponse::default();
        }
    }
    if let Some(response) = entry.value.as_edge_response_mut() {
        response.has_edge = flag;
    }
}

/// Detect edge trees by propagated edge response
///
/// Computes the box-Fisher response of every tree, seeds the propagation
/// with the component matching `direction` (dx for H, dy for V, the
/// magnitude otherwise), runs `rounds` synchronous rounds carrying the
/// pool forward between them, and flags trees whose final pool exceeds
/// `mean + bias * deviation` of the pool distribution.
pub fn find_edges(
    forest: &mut QuadForest,
    rounds: u32,
    bias: f64,
    direction: Direction,
) -> SegmentResult<()> {
    if rounds == 0 {
        return Err(SegmentError::InvalidParameters(
            "detection needs at least one round".to_string(),
        ));
    }
    check_direction(direction)?;

    let total = forest.len();
    for index in 0..total {
        forest.edge_response(TreeId(index as u32))?;
    }
    for index in 0..total {
        let id = TreeId(index as u32);
        match direction {
            Direction::H => forest.prime_with_dx(id),
            Direction::V => forest.prime_with_dy(id),
            _ => forest.prime_with_mag(id),
        }
    }
    for round in 0..rounds {
        for index in 0..total {
            let id = TreeId(index as u32);
            match direction {
                Direction::H => forest.propagate_h(id),
                Direction::V => forest.propagate_v(id),
                _ => forest.propagate(id),
            }
        }
        if round + 1 < rounds {
            for index in 0..total {
                forest.prime_with_pool(TreeId(index as u32));
            }
        }
    }

    let count = total as f64;
    let mut sum = 0.0;
    let mut sum2 = 0.0;
    for index in 0..total {
        let pool = forest.tree(TreeId(index as u32)).pool;
        sum += pool;
        sum2 += pool * pool;
    }
    let mean = sum / count;
    let deviation = (sum2 / count - mean * mean).max(0.0).sqrt();
    let threshold = mean + bias * deviation;

    for index in 0..total {
        let id = TreeId(index as u32);
        let flag = forest.tree(id).pool > threshold;
        set_has_edge(forest, id, flag);
    }
    Ok(())
}

/// Segment the forest along detected edges
///
/// Runs [`find_edges`], re-seeds edge trees with a constant charge,
/// spreads it in the requested direction, keeps the edge flag on trees
/// whose pool exceeds the threshold, and unions edge trees with their
/// edge neighbors along the merge direction.
pub fn segment_edges(forest: &mut QuadForest, options: EdgeSegmentOptions) -> SegmentResult<()> {
    if options.detect_rounds == 0 {
        return Err(SegmentError::InvalidParameters(
            "detection needs at least one round".to_string(),
        ));
    }
    check_direction(options.detect_dir)?;
    check_direction(options.propagate_dir)?;
    check_direction(options.merge_dir)?;

    find_edges(
        forest,
        options.detect_rounds,
        options.detect_bias,
        options.detect_dir,
    )?;

    let roots: Vec<TreeId> = forest.roots().collect();

    // re-seed detected edges and spread them
    for &id in &roots {
        forest.prime_with_edge(id, 10.0);
    }
    for round in 0..options.propagate_rounds {
        for &id in &roots {
            match options.propagate_dir {
                Direction::H => forest.propagate_h(id),
                Direction::V => forest.propagate_v(id),
                _ => forest.propagate_m(id),
            }
        }
        if round + 1 < options.propagate_rounds {
            for &id in &roots {
                forest.prime_with_pool(id);
            }
        }
    }
    for &id in &roots {
        if forest.tree(id).pool > options.propagate_threshold {
            set_has_edge(forest, id, true);
        }
    }

    // edge trees become segments, merged along the chosen direction
    for &id in &roots {
        if forest.edge_values(id).has_edge {
            segment_create(forest, id);
        }
    }
    for &id in &roots {
        if !forest.edge_values(id).has_edge {
            continue;
        }
        let (n, e, s, w) = {
            let tree = forest.tree(id);
            (tree.n, tree.e, tree.s, tree.w)
        };
        let links = match options.merge_dir {
            Direction::H => [w, e, None, None],
            Direction::V => [n, s, None, None],
            _ => [w, e, n, s],
        };
        for link in links {
            if let Some(neighbor) = link
                && forest.edge_values(neighbor).has_edge
            {
                segment_union(forest, id, neighbor);
            }
        }
    }

    refresh_segments(forest)
}

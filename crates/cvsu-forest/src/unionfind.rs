//! Union-find records stored as annotations
//!
//! [`Segment`] and [`Boundary`] are disjoint-set records embedded in tree
//! annotations. The parent reference is the id of the tree whose record is
//! the parent, so path compression rewrites plain indices through the
//! forest. Find is path-compressing; union is by rank and merges bounding
//! boxes, statistics and curvature.

use crate::annotation::AnnotationKind;
use crate::forest::QuadForest;
use crate::tree::TreeId;
use cvsu_core::Statistics;

/// Shape category of a boundary fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryCategory {
    /// Not yet initialized
    #[default]
    Undef,
    /// Initialized but not yet categorized
    Unknown,
    /// Mean curvature within the straight tolerance
    Straight,
    /// Mean curvature above the straight tolerance
    Curved,
}

/// Disjoint-set record of a segmented region
///
/// The bounding box uses exclusive bottom-right corners. The statistics
/// are the additive merge over every tree in the set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Segment {
    /// Tree whose segment record is the parent; self for roots
    pub parent: TreeId,
    /// Union-by-rank rank
    pub rank: u32,
    /// Bounding box left edge
    pub x1: u32,
    /// Bounding box top edge
    pub y1: u32,
    /// Bounding box right edge, exclusive
    pub x2: u32,
    /// Bounding box bottom edge, exclusive
    pub y2: u32,
    /// Merged statistics of the covered region
    pub stat: Statistics,
    /// Color assigned for visualization, `[r, g, b, 0]`
    pub color: [u8; 4],
    /// Deterministic record id assigned at initialization
    pub id: u32,
}

/// Disjoint-set record of a boundary fragment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Boundary {
    /// Tree whose boundary record is the parent; self for roots
    pub parent: TreeId,
    /// Union-by-rank rank
    pub rank: u32,
    /// Bounding box left edge
    pub x1: u32,
    /// Bounding box top edge
    pub y1: u32,
    /// Bounding box right edge, exclusive
    pub x2: u32,
    /// Bounding box bottom edge, exclusive
    pub y2: u32,
    /// Fragment length in nodes
    pub length: u32,
    /// Summed curvature over the fragment
    pub curvature_sum: f64,
    /// `curvature_sum / length`
    pub curvature_mean: f64,
    /// Endpoint angle at the against end
    pub dir_a: f64,
    /// Endpoint angle at the towards end
    pub dir_b: f64,
    /// Shape category, updated on union
    pub category: BoundaryCategory,
    /// Deterministic record id assigned at initialization
    pub id: u32,
}

/// Mean curvature above which a merged boundary counts as curved
const CURVED_THRESHOLD: f64 = 0.15;

/// The tree's current-round segment record, if any
pub fn segment_of(forest: &QuadForest, id: TreeId) -> Option<&Segment> {
    forest
        .tree(id)
        .annotation
        .current(AnnotationKind::Segment, forest.token())?
        .as_segment()
}

/// Mutable current-round segment record, if any
pub fn segment_of_mut(forest: &mut QuadForest, id: TreeId) -> Option<&mut Segment> {
    let token = forest.token();
    forest
        .tree_mut(id)
        .annotation
        .current_mut(AnnotationKind::Segment, token)?
        .as_segment_mut()
}

/// Whether the tree carries a current-round segment record
pub fn has_segment(forest: &QuadForest, id: TreeId) -> bool {
    segment_of(forest, id).is_some()
}

/// The tree's current-round boundary record, if any
pub fn boundary_of(forest: &QuadForest, id: TreeId) -> Option<&Boundary> {
    forest
        .tree(id)
        .annotation
        .current(AnnotationKind::Boundary, forest.token())?
        .as_boundary()
}

/// Mutable current-round boundary record, if any
pub fn boundary_of_mut(forest: &mut QuadForest, id: TreeId) -> Option<&mut Boundary> {
    let token = forest.token();
    forest
        .tree_mut(id)
        .annotation
        .current_mut(AnnotationKind::Boundary, token)?
        .as_boundary_mut()
}

/// Whether the tree carries a current-round boundary record
pub fn has_boundary(forest: &QuadForest, id: TreeId) -> bool {
    boundary_of(forest, id).is_some()
}

/// Initialize a one-tree segment on the tree, once per round
///
/// The record becomes its own parent with rank 0, the tree's rectangle as
/// bounding box and the tree's statistics. A record already initialized in
/// this round is left untouched.
pub fn segment_create(forest: &mut QuadForest, id: TreeId) {
    let token = forest.token();
    let needs_init = forest.tree_mut(id).annotation.ensure_has(AnnotationKind::Segment).token != token;
    if !needs_init {
        return;
    }
    let record_id = forest.next_record_id();
    let (x, y, size, stat) = {
        let tree = forest.tree(id);
        (tree.x, tree.y, tree.size, tree.stat)
    };
    let entry = forest.tree_mut(id).annotation.ensure_has(AnnotationKind::Segment);
    entry.token = token;
    if let Some(segment) = entry.value.as_segment_mut() {
        *segment = Segment {
            parent: id,
            rank: 0,
            x1: x,
            y1: y,
            x2: x + size,
            y2: y + size,
            stat,
            color: [0; 4],
            id: record_id,
        };
    }
}

/// Find the root of the tree's segment, compressing the path
pub fn segment_find(forest: &mut QuadForest, id: TreeId) -> Option<TreeId> {
    segment_of(forest, id)?;
    let mut root = id;
    loop {
        let parent = segment_of(forest, root)?.parent;
        if parent == root {
            break;
        }
        root = parent;
    }
    let mut current = id;
    while current != root {
        let segment = segment_of_mut(forest, current)?;
        let next = segment.parent;
        segment.parent = root;
        current = next;
    }
    Some(root)
}

/// Union the segments the two trees belong to
///
/// The smaller-rank root becomes a child of the larger; on a tie the first
/// tree's root wins and its rank increments. The surviving root absorbs
/// the other's bounding box and statistics.
pub fn segment_union(forest: &mut QuadForest, a: TreeId, b: TreeId) {
    let (Some(root_a), Some(root_b)) = (segment_find(forest, a), segment_find(forest, b)) else {
        return;
    };
    if root_a == root_b {
        return;
    }
    let rank_a = segment_of(forest, root_a).map_or(0, |s| s.rank);
    let rank_b = segment_of(forest, root_b).map_or(0, |s| s.rank);
    let (child, parent) = if rank_a < rank_b {
        (root_a, root_b)
    } else {
        (root_b, root_a)
    };
    let Some(child_record) = segment_of(forest, child).copied() else {
        return;
    };
    if let Some(record) = segment_of_mut(forest, parent) {
        if rank_a == rank_b {
            record.rank += 1;
        }
        record.x1 = record.x1.min(child_record.x1);
        record.y1 = record.y1.min(child_record.y1);
        record.x2 = record.x2.max(child_record.x2);
        record.y2 = record.y2.max(child_record.y2);
        record.stat = Statistics::combine(&record.stat, &child_record.stat);
    }
    if let Some(record) = segment_of_mut(forest, child) {
        record.parent = parent;
    }
}

/// Deterministic id of the segment the tree belongs to
pub fn segment_id(forest: &mut QuadForest, id: TreeId) -> Option<u32> {
    let root = segment_find(forest, id)?;
    segment_of(forest, root).map(|s| s.id)
}

/// Whether the tree's segment record is its own root
pub fn is_segment_parent(forest: &mut QuadForest, id: TreeId) -> bool {
    segment_find(forest, id) == Some(id)
}

/// Initialize a one-tree boundary on the tree, once per round
pub fn boundary_create(forest: &mut QuadForest, id: TreeId) {
    let token = forest.token();
    let needs_init = forest.tree_mut(id).annotation.ensure_has(AnnotationKind::Boundary).token != token;
    if !needs_init {
        return;
    }
    let record_id = forest.next_record_id();
    let (x, y, size) = {
        let tree = forest.tree(id);
        (tree.x, tree.y, tree.size)
    };
    let entry = forest.tree_mut(id).annotation.ensure_has(AnnotationKind::Boundary);
    entry.token = token;
    if let Some(boundary) = entry.value.as_boundary_mut() {
        *boundary = Boundary {
            parent: id,
            rank: 0,
            x1: x,
            y1: y,
            x2: x + size,
            y2: y + size,
            length: 1,
            curvature_sum: 0.0,
            curvature_mean: 0.0,
            dir_a: 0.0,
            dir_b: 0.0,
            category: BoundaryCategory::Undef,
            id: record_id,
        };
    }
}

/// Seed a fresh one-node boundary from the tree's edge links
///
/// A no-op unless the record is still an unmerged single node; then the
/// link curvature and endpoint angles move into the record and the
/// category becomes `Unknown`.
pub fn boundary_init(forest: &mut QuadForest, id: TreeId) {
    boundary_create(forest, id);
    let token = forest.token();
    let links = forest
        .tree(id)
        .annotation
        .current(AnnotationKind::EdgeLinks, token)
        .and_then(|value| value.as_edge_links())
        .copied();
    let Some(links) = links else {
        return;
    };
    let Some(root) = boundary_find(forest, id) else {
        return;
    };
    if root != id {
        return;
    }
    if let Some(boundary) = boundary_of_mut(forest, id)
        && boundary.length <= 1
    {
        boundary.category = BoundaryCategory::Unknown;
        boundary.length = 1;
        boundary.curvature_sum = links.curvature;
        boundary.curvature_mean = links.curvature;
        boundary.dir_a = links.against_angle;
        boundary.dir_b = links.towards_angle;
    }
}

/// Find the root of the tree's boundary, compressing the path
pub fn boundary_find(forest: &mut QuadForest, id: TreeId) -> Option<TreeId> {
    boundary_of(forest, id)?;
    let mut root = id;
    loop {
        let parent = boundary_of(forest, root)?.parent;
        if parent == root {
            break;
        }
        root = parent;
    }
    let mut current = id;
    while current != root {
        let boundary = boundary_of_mut(forest, current)?;
        let next = boundary.parent;
        boundary.parent = root;
        current = next;
    }
    Some(root)
}

/// Union the boundaries the two trees belong to
///
/// Lengths and curvature sums add and the mean curvature is recomputed.
/// The surviving root keeps the first root's `dir_a` and the second
/// root's `dir_b`, so the endpoint angles always describe the distal
/// ends. The merged fragment is `Curved` when `|curvature_mean|` exceeds
/// 0.15, otherwise `Straight`.
pub fn boundary_union(forest: &mut QuadForest, a: TreeId, b: TreeId) {
    let (Some(root_a), Some(root_b)) = (boundary_find(forest, a), boundary_find(forest, b)) else {
        return;
    };
    if root_a == root_b {
        return;
    }
    let rank_a = boundary_of(forest, root_a).map_or(0, |r| r.rank);
    let rank_b = boundary_of(forest, root_b).map_or(0, |r| r.rank);
    let (child, parent) = if rank_a < rank_b {
        (root_a, root_b)
    } else {
        (root_b, root_a)
    };
    let Some(child_record) = boundary_of(forest, child).copied() else {
        return;
    };
    if let Some(record) = boundary_of_mut(forest, parent) {
        if rank_a == rank_b {
            record.rank += 1;
        }
        record.x1 = record.x1.min(child_record.x1);
        record.y1 = record.y1.min(child_record.y1);
        record.x2 = record.x2.max(child_record.x2);
        record.y2 = record.y2.max(child_record.y2);
        record.length += child_record.length;
        record.curvature_sum += child_record.curvature_sum;
        record.curvature_mean = record.curvature_sum / record.length as f64;
        if child == root_a {
            // the first root contributes the against end
            record.dir_a = child_record.dir_a;
        } else {
            record.dir_b = child_record.dir_b;
        }
        record.category = if record.curvature_mean.abs() > CURVED_THRESHOLD {
            BoundaryCategory::Curved
        } else {
            BoundaryCategory::Straight
        };
    }
    if let Some(record) = boundary_of_mut(forest, child) {
        record.parent = parent;
    }
}

/// Deterministic id of the boundary the tree belongs to
pub fn boundary_id(forest: &mut QuadForest, id: TreeId) -> Option<u32> {
    let root = boundary_find(forest, id)?;
    boundary_of(forest, root).map(|b| b.id)
}

/// Whether the tree's boundary record is its own root
pub fn is_boundary_parent(forest: &mut QuadForest, id: TreeId) -> bool {
    boundary_find(forest, id) == Some(id)
}

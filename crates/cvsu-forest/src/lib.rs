//! cvsu-forest - Hierarchical quad forest image representation
//!
//! This crate provides:
//!
//! - **QuadTree / QuadForest** - a grid of root quad trees that
//!   adaptively subdivide over an image, with cached 4-neighbor links and
//!   O(1) statistics from the integral image
//! - **Annotations** - pluggable per-node records with parsing-round
//!   tokens
//! - **Union-find** - `Segment` and `Boundary` disjoint-set records
//!   stored as annotations
//! - **Propagation** - synchronous prime/propagate/accumulate passes used
//!   for edge and boundary diffusion

pub mod annotation;
pub mod error;
pub mod forest;
mod propagate;
pub mod tree;
pub mod unionfind;

// Re-export upstream crates
pub use cvsu_core;
pub use cvsu_integral;

pub use annotation::{
    AnnotationEntry, AnnotationKind, AnnotationSet, AnnotationValue, Direction, EdgeResponse,
    NeighborhoodStat,
};
pub use error::{ForestError, ForestResult};
pub use forest::QuadForest;
pub use tree::{QuadTree, TreeId};
pub use unionfind::{
    Boundary, BoundaryCategory, Segment, boundary_create, boundary_find, boundary_id,
    boundary_init, boundary_of, boundary_of_mut, boundary_union, has_boundary, has_segment,
    is_boundary_parent, is_segment_parent, segment_create, segment_find, segment_id, segment_of,
    segment_of_mut, segment_union,
};

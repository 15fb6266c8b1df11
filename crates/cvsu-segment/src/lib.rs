//! cvsu-segment - Region segmentation over a quad forest
//!
//! High-level orchestrators that turn a freshly updated [`QuadForest`]
//! into labeled regions:
//!
//! - **Deviation segmentation** - divide by intensity deviation, merge
//!   close-mean neighbors
//! - **Overlap segmentation** - divide and merge by estimated intensity
//!   interval overlap
//! - **Edge segmentation** - propagated box-Fisher edge responses fused
//!   along a chosen direction
//! - **Boundary segmentation** - deviation-propagation boundary discovery
//!   with optional hysteresis and pruning
//! - **Rendering** - segment counting, reproducible coloring, and RGB
//!   visualization of the forest

pub mod boundaries;
pub mod deviation;
pub mod edges;
pub mod error;
pub mod overlap;
pub mod render;

// Re-export upstream crates
pub use cvsu_forest;
pub use cvsu_forest::QuadForest;

pub use boundaries::{
    find_boundaries, find_boundaries_with_hysteresis, prune_boundaries, segment_with_boundaries,
};
pub use deviation::segment_with_deviation;
pub use edges::{EdgeSegmentOptions, find_edges, segment_edges};
pub use error::{SegmentError, SegmentResult};
pub use overlap::segment_with_overlap;
pub use render::{draw_image, get_segments, refresh_segments};

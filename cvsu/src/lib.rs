//! cvsu - Quad forest image parsing library
//!
//! A Rust port of the cvsu computer vision library. The core represents
//! an image as a forest of adaptively subdividing quad trees backed by an
//! integral-image statistics engine, and segments it by merging trees
//! into regions with union-find.
//!
//! # Overview
//!
//! - Typed pixel rasters with ROI views and format conversion
//! - O(1) rectangle statistics from integral images, plus Sauvola and
//!   Feng adaptive binarization
//! - Quad forests with cached neighbor links and per-node annotations
//! - Deviation-, overlap-, edge- and boundary-driven segmenters
//! - PNM image file I/O
//!
//! # Example
//!
//! ```
//! use cvsu::{PixelFormat, PixelImage, PixelType, QuadForest, segment_with_deviation};
//!
//! let image = PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 64, 64).unwrap();
//! let mut forest = QuadForest::new(&image, 16, 4).unwrap();
//! forest.update().unwrap();
//! segment_with_deviation(&mut forest, 10.0, 1.0).unwrap();
//! assert_eq!(forest.segments(), 1);
//! ```

// Re-export the member crates
pub use cvsu_core::*;
pub use cvsu_forest::{
    AnnotationEntry, AnnotationKind, AnnotationSet, AnnotationValue, Boundary, BoundaryCategory,
    Direction, EdgeResponse, ForestError, ForestResult, NeighborhoodStat, QuadForest, QuadTree,
    Segment, TreeId, boundary_create, boundary_find, boundary_id, boundary_of, boundary_union,
    has_boundary, has_segment, is_boundary_parent, is_segment_parent, segment_create,
    segment_find, segment_id, segment_of, segment_union,
};
pub use cvsu_integral::{
    IntegralError, IntegralImage, IntegralResult, threshold_feng, threshold_sauvola,
};
pub use cvsu_io::{IoError, IoResult, PnmVariant, read_image, read_pnm, write_image, write_pnm};
pub use cvsu_segment::{
    EdgeSegmentOptions, SegmentError, SegmentResult, draw_image, find_boundaries,
    find_boundaries_with_hysteresis, find_edges, get_segments, prune_boundaries, refresh_segments,
    segment_edges, segment_with_boundaries, segment_with_deviation, segment_with_overlap,
};

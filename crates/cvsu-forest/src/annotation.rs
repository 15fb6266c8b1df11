//! Per-node annotations
//!
//! A quad tree carries an [`AnnotationSet`]: a bag of optional records, at
//! most one per [`AnnotationKind`]. Each entry stores the parsing-round
//! token it was last initialized in; callers compare it against the
//! forest's current token and reinitialize on mismatch, so parsing rounds
//! reuse storage without an explicit clearing pass.

use crate::tree::TreeId;
use crate::unionfind::{Boundary, Segment};
use cvsu_core::{Error, Statistics};

/// Direction selector used by propagation and neighbor descent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// No direction
    #[default]
    None,
    /// North
    N,
    /// East
    E,
    /// South
    S,
    /// West
    W,
    /// Horizontal (east-west)
    H,
    /// Vertical (north-south)
    V,
    /// Full 4-neighborhood
    N4,
}

/// Raw image moments of a node's rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m11: f64,
    pub m20: f64,
    pub m02: f64,
}

/// Statistics accumulated over a propagation run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccumulatedStat {
    pub meanmean: f64,
    pub meandev: f64,
    pub devmean: f64,
    pub devdev: f64,
    pub strength: f64,
}

/// Statistics of the node's neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NeighborhoodStat {
    pub mean_mean: f64,
    pub mean_dev: f64,
    pub dev_mean: f64,
    pub dev_dev: f64,
    pub strength: f64,
    pub strength_score: f64,
    pub ridge_score: f64,
    pub overlap: f64,
}

/// Box-Fisher edge response of the node
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeResponse {
    /// Horizontal response
    pub dx: f64,
    /// Vertical response
    pub dy: f64,
    /// Response magnitude
    pub mag: f64,
    /// Response angle in [0, 2pi)
    pub ang: f64,
    pub confidence: f64,
    /// Set by edge detection when the propagated response exceeds the
    /// detection threshold
    pub has_edge: bool,
}

/// Neighborhood-smoothed gradient
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothedGradient {
    pub mag: f64,
    pub ang: f64,
    pub confidence: f64,
}

/// Category of a link between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkCategory {
    #[default]
    Undef,
    Towards,
    Against,
    Left,
    Right,
    Parallel,
    Perpendicular,
}

/// Measures attached to a link between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkMeasure {
    pub category: LinkCategory,
    pub strength_score: f64,
    pub magnitude_score: f64,
    pub angle_score: f64,
    pub straightness_score: f64,
    pub profile_score: f64,
}

/// Links of a node along an edge chain
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeLinks {
    /// Next node along the edge direction
    pub towards: Option<TreeId>,
    /// Previous node against the edge direction
    pub against: Option<TreeId>,
    pub own_angle: f64,
    pub towards_angle: f64,
    pub against_angle: f64,
    pub straightness: f64,
    pub curvature: f64,
    pub own_consistency: f64,
    pub towards_consistency: f64,
    pub against_consistency: f64,
    pub direction_consistency: f64,
    pub edge_score: f64,
    pub mean_left: f64,
    pub mean_right: f64,
    pub dev_left: f64,
    pub dev_right: f64,
}

/// Intensity profile across an edge
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeProfile {
    pub direction_consistency: f64,
    pub edge_score: f64,
    pub mean_left: f64,
    pub mean_right: f64,
    pub dev_left: f64,
    pub dev_right: f64,
}

/// Ridge candidate state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RidgePotential {
    pub round: u32,
    pub ridge_score: f64,
    pub better_ridge: Option<TreeId>,
}

/// Boundary candidate state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundaryPotential {
    pub length: u32,
    pub strength_score: f64,
    pub angle_score: f64,
    pub straightness_score: f64,
    pub profile_score: f64,
}

/// Message passed between boundary candidates during parsing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundaryMessage {
    pub round: u32,
    pub pool_curvature: f64,
    pub acc_curvature: f64,
    pub pool_length: u32,
    pub acc_length: u32,
}

/// Message passed between segment candidates during parsing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentMessage {
    pub round: u32,
    pub pool_overlap: f64,
    pub acc_overlap: f64,
}

/// Segment candidate state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentPotential {
    pub rank: u32,
    pub extent: u32,
    pub diff_score: f64,
    pub overlap_score: f64,
}

/// Accumulator for neighborhood statistics propagation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatAccumulator {
    pub round: u32,
    pub mean_pool1: f64,
    pub mean_acc1: f64,
    pub mean_pool2: f64,
    pub mean_acc2: f64,
    pub dev_pool1: f64,
    pub dev_acc1: f64,
    pub dev_pool2: f64,
    pub dev_acc2: f64,
}

/// Accumulator for region characteristics propagation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegAccumulator {
    pub round: u32,
    pub locality_overlap: f64,
    pub neighborhood_overlap: f64,
    pub locality_pool: f64,
    pub locality_acc: f64,
    pub neighborhood_pool: f64,
    pub neighborhood_acc: f64,
}

/// Cached intensity interval overlap
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeOverlap {
    pub round: u32,
    pub overlap: f64,
}

/// Ridge detection state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RidgeFinder {
    pub round: u32,
    pub has_ridge: bool,
}

/// Shortest-path search state between boundary endpoints
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathSniffer {
    /// Previous node along the best path to this node
    pub prev: Option<TreeId>,
    /// Boundary endpoint the path extends
    pub endpoint: Option<TreeId>,
    pub strength: f64,
    pub cost: f64,
    pub length: u32,
    pub dir_start: Direction,
    pub dir_end: Direction,
}

/// Cost accumulation state for edge chain parsing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeParser {
    pub pool_cost: f64,
    pub acc_cost: f64,
    pub pool_length: u32,
    pub acc_length: u32,
}

macro_rules! annotation_kinds {
    ($(($variant:ident, $ty:ty, $as_ref:ident, $as_mut:ident)),* $(,)?) => {
        /// Identifies one annotation record kind
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum AnnotationKind {
            $($variant),*
        }

        impl AnnotationKind {
            /// Kind name used in error messages
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }

        /// One annotation payload
        #[derive(Debug, Clone, PartialEq)]
        pub enum AnnotationValue {
            $($variant($ty)),*
        }

        impl AnnotationValue {
            /// The kind tag of this payload
            pub fn kind(&self) -> AnnotationKind {
                match self {
                    $(Self::$variant(_) => AnnotationKind::$variant),*
                }
            }

            /// A zero-initialized payload of the given kind
            pub fn default_for(kind: AnnotationKind) -> Self {
                match kind {
                    $(AnnotationKind::$variant => Self::$variant(<$ty>::default())),*
                }
            }

            $(
                pub fn $as_ref(&self) -> Option<&$ty> {
                    if let Self::$variant(value) = self { Some(value) } else { None }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    if let Self::$variant(value) = self { Some(value) } else { None }
                }
            )*
        }
    };
}

annotation_kinds!(
    (Statistics, Statistics, as_statistics, as_statistics_mut),
    (RawMoments, RawMoments, as_raw_moments, as_raw_moments_mut),
    (AccumulatedStat, AccumulatedStat, as_accumulated_stat, as_accumulated_stat_mut),
    (NeighborhoodStat, NeighborhoodStat, as_neighborhood_stat, as_neighborhood_stat_mut),
    (EdgeResponse, EdgeResponse, as_edge_response, as_edge_response_mut),
    (SmoothedGradient, SmoothedGradient, as_smoothed_gradient, as_smoothed_gradient_mut),
    (LinkMeasure, LinkMeasure, as_link_measure, as_link_measure_mut),
    (EdgeLinks, EdgeLinks, as_edge_links, as_edge_links_mut),
    (EdgeProfile, EdgeProfile, as_edge_profile, as_edge_profile_mut),
    (RidgePotential, RidgePotential, as_ridge_potential, as_ridge_potential_mut),
    (BoundaryPotential, BoundaryPotential, as_boundary_potential, as_boundary_potential_mut),
    (BoundaryMessage, BoundaryMessage, as_boundary_message, as_boundary_message_mut),
    (Boundary, Boundary, as_boundary, as_boundary_mut),
    (SegmentMessage, SegmentMessage, as_segment_message, as_segment_message_mut),
    (SegmentPotential, SegmentPotential, as_segment_potential, as_segment_potential_mut),
    (Segment, Segment, as_segment, as_segment_mut),
    (StatAccumulator, StatAccumulator, as_stat_accumulator, as_stat_accumulator_mut),
    (RegAccumulator, RegAccumulator, as_reg_accumulator, as_reg_accumulator_mut),
    (RangeOverlap, RangeOverlap, as_range_overlap, as_range_overlap_mut),
    (RidgeFinder, RidgeFinder, as_ridge_finder, as_ridge_finder_mut),
    (PathSniffer, PathSniffer, as_path_sniffer, as_path_sniffer_mut),
    (EdgeParser, EdgeParser, as_edge_parser, as_edge_parser_mut),
);

/// One annotation slot: the payload plus the round token it was
/// initialized in
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntry {
    /// Parsing-round token; mismatch against the forest token means the
    /// payload is stale and must be reinitialized before use
    pub token: u32,
    /// The payload
    pub value: AnnotationValue,
}

/// The annotation bag of one quad tree node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    entries: Vec<AnnotationEntry>,
}

impl AnnotationSet {
    /// An empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, of any age
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry of the given kind, regardless of token
    pub fn get(&self, kind: AnnotationKind) -> Option<&AnnotationEntry> {
        self.entries.iter().find(|entry| entry.value.kind() == kind)
    }

    /// Mutable entry of the given kind, regardless of token
    pub fn get_mut(&mut self, kind: AnnotationKind) -> Option<&mut AnnotationEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.value.kind() == kind)
    }

    /// The payload of the given kind if it belongs to the given round
    pub fn current(&self, kind: AnnotationKind, token: u32) -> Option<&AnnotationValue> {
        self.get(kind)
            .filter(|entry| entry.token == token)
            .map(|entry| &entry.value)
    }

    /// Mutable payload of the given kind if it belongs to the given round
    pub fn current_mut(
        &mut self,
        kind: AnnotationKind,
        token: u32,
    ) -> Option<&mut AnnotationValue> {
        self.get_mut(kind)
            .filter(|entry| entry.token == token)
            .map(|entry| &mut entry.value)
    }

    /// The entry of the given kind, appending a zero-initialized one with
    /// token 0 when absent
    ///
    /// The caller decides staleness by comparing the entry token against
    /// the current round token.
    pub fn ensure_has(&mut self, kind: AnnotationKind) -> &mut AnnotationEntry {
        if let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.value.kind() == kind)
        {
            return &mut self.entries[index];
        }
        self.entries.push(AnnotationEntry {
            token: 0,
            value: AnnotationValue::default_for(kind),
        });
        let index = self.entries.len() - 1;
        &mut self.entries[index]
    }

    /// Make the set hold exactly one entry of the given kind
    ///
    /// An existing entry of that kind survives with its token; entries of
    /// every other kind are dropped, and a zero-initialized entry with
    /// token 0 is inserted when none matches.
    pub fn ensure_is(&mut self, kind: AnnotationKind) -> &mut AnnotationEntry {
        self.entries.retain(|entry| entry.value.kind() == kind);
        self.ensure_has(kind)
    }

    /// The entry of the given kind, or `BadType` when absent
    pub fn expect(&self, kind: AnnotationKind) -> cvsu_core::Result<&AnnotationEntry> {
        self.get(kind).ok_or(Error::BadType {
            expected: kind.name(),
            actual: "absent annotation",
        })
    }

    /// Remove the entry of the given kind; reports whether one existed
    pub fn remove(&mut self, kind: AnnotationKind) -> bool {
        if let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.value.kind() == kind)
        {
            self.entries.swap_remove(index);
            true
        } else {
            false
        }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over all entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AnnotationEntry> {
        self.entries.iter()
    }
}

//! cvsu-core - Core data structures for the cvsu image parsing library
//!
//! This crate provides the raster and statistics primitives the rest of the
//! workspace builds on:
//!
//! - **PixelImage** - typed 2-D raster with step/stride layout, borrowed
//!   ROI views, copy/convert/normalize/scale operations
//! - **Statistics** - first- and second-order intensity statistics with
//!   disjoint-merge arithmetic
//! - **Error** - the unified error taxonomy shared across the workspace

pub mod error;
pub mod pixel_image;
pub mod statistics;
pub mod types;

pub use error::{Error, Result};
pub use pixel_image::{
    PixelImage, PixelView, PixelViewMut, convert, grey8_to_grey24, grey8_to_yuv24, pick_channel,
    rgb24_to_grey8, rgb24_to_yuv24, yuv24_to_grey8, yuv24_to_rgb24,
};
pub use statistics::Statistics;
pub use types::{PixelData, PixelElement, PixelFormat, PixelType};

//! cvsu-integral - Integral image statistics engine
//!
//! This crate answers rectangle-statistics queries in O(1) after a single
//! O(W*H) sweep:
//!
//! - **IntegralImage** - first and second order summed area tables with
//!   clipped rectangle statistics
//! - **Binarization** - Sauvola and Feng adaptive thresholding
//! - **Edgel responses** - box-pair Fisher discriminant scans used for
//!   quad tree edge responses

pub mod binarize;
pub mod edgel;
pub mod error;
pub mod integral;

// Re-export core types
pub use cvsu_core;

pub use binarize::{threshold_feng, threshold_sauvola};
pub use edgel::{edgel_response_x, fisher_signed, fisher_unsigned, hscan_fisher, vscan_fisher};
pub use error::{IntegralError, IntegralResult};
pub use integral::IntegralImage;

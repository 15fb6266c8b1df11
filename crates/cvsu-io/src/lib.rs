//! cvsu-io - Image file I/O
//!
//! PNM (P1-P6) reading and writing plus magic-based format detection.
//! The PNM reader tolerates header comments, decodes bitmaps to 0/1
//! samples, and selects U8/U16/U32 element types by maxval; the writer
//! emits standard headers with the fixed creator comment.

pub mod error;
#[cfg(feature = "pnm")]
pub mod format;
#[cfg(feature = "pnm")]
pub mod pnm;

// Re-export core types
pub use cvsu_core;

pub use error::{IoError, IoResult};
#[cfg(feature = "pnm")]
pub use format::{PnmVariant, detect_format, detect_format_from_bytes};
#[cfg(feature = "pnm")]
pub use pnm::{read_pnm, write_pnm};

#[cfg(feature = "pnm")]
use cvsu_core::PixelImage;
#[cfg(feature = "pnm")]
use std::fs::File;
#[cfg(feature = "pnm")]
use std::io::{BufReader, BufWriter};
#[cfg(feature = "pnm")]
use std::path::Path;

/// Read an image file, detecting the format from its magic
#[cfg(feature = "pnm")]
pub fn read_image<P: AsRef<Path>>(path: P) -> IoResult<PixelImage> {
    let mut reader = BufReader::new(File::open(path)?);
    read_pnm(&mut reader)
}

/// Write an image file in the given PNM variant
#[cfg(feature = "pnm")]
pub fn write_image<P: AsRef<Path>>(
    image: &PixelImage,
    path: P,
    variant: PnmVariant,
) -> IoResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_pnm(image, variant, &mut writer)
}

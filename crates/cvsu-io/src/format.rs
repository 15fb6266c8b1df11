//! PNM format detection
//!
//! Detects the PNM variant by examining the two-byte magic at the start
//! of the data. Detection is independent of which variants the reader
//! supports, so callers can report "unsupported" instead of silently
//! failing.

use crate::{IoError, IoResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PNM file variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PnmVariant {
    /// ASCII bitmap
    P1,
    /// ASCII graymap
    P2,
    /// ASCII pixmap
    P3,
    /// Binary bitmap
    P4,
    /// Binary graymap
    P5,
    /// Binary pixmap
    P6,
}

impl PnmVariant {
    /// The variant for a magic digit
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'1' => Some(Self::P1),
            b'2' => Some(Self::P2),
            b'3' => Some(Self::P3),
            b'4' => Some(Self::P4),
            b'5' => Some(Self::P5),
            b'6' => Some(Self::P6),
            _ => None,
        }
    }

    /// The two-byte magic of this variant
    pub fn magic(self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::P5 => "P5",
            Self::P6 => "P6",
        }
    }

    /// Whether the payload is whitespace-separated ASCII numbers
    pub fn is_ascii(self) -> bool {
        matches!(self, Self::P1 | Self::P2 | Self::P3)
    }

    /// Whether the variant carries a maxval header field
    pub fn has_maxval(self) -> bool {
        !matches!(self, Self::P1 | Self::P4)
    }

    /// Samples per pixel of the decoded image
    pub fn channels(self) -> u32 {
        match self {
            Self::P3 | Self::P6 => 3,
            _ => 1,
        }
    }
}

/// Detect the PNM variant from an in-memory byte slice
pub fn detect_format_from_bytes(data: &[u8]) -> IoResult<PnmVariant> {
    if data.len() < 2 || data[0] != b'P' {
        return Err(IoError::UnsupportedFormat(
            "missing PNM magic".to_string(),
        ));
    }
    PnmVariant::from_digit(data[1]).ok_or_else(|| {
        IoError::UnsupportedFormat(format!("unknown PNM magic P{}", data[1] as char))
    })
}

/// Detect the PNM variant of a file by reading its header bytes
pub fn detect_format<P: AsRef<Path>>(path: P) -> IoResult<PnmVariant> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    file.read_exact(&mut magic)?;
    detect_format_from_bytes(&magic)
}

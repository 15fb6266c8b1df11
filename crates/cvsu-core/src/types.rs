//! Pixel element types, image formats, and dynamically typed sample storage
//!
//! API boundaries dispatch on the [`PixelType`] enum; hot loops go through
//! the [`PixelElement`] trait so they monomorphize per element type.

use crate::error::{Error, Result};

/// Pixel element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// Unsigned 8-bit samples
    U8,
    /// Signed 8-bit samples
    S8,
    /// Unsigned 16-bit samples
    U16,
    /// Signed 16-bit samples
    S16,
    /// Unsigned 32-bit samples
    U32,
    /// Signed 32-bit samples
    S32,
    /// 32-bit floating point samples
    F32,
    /// 64-bit floating point samples
    F64,
}

impl PixelType {
    /// Size of one sample in bytes
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::U32 | Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Short name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::S8 => "S8",
            Self::U16 => "U16",
            Self::S16 => "S16",
            Self::U32 => "U32",
            Self::S32 => "S32",
            Self::F32 => "F32",
            Self::F64 => "F64",
        }
    }
}

/// Pixel format tag
///
/// The format describes how the `step` samples of one pixel are to be
/// interpreted; it does not affect storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// No format assigned
    #[default]
    None,
    /// 1-bit monochrome stored one sample per pixel
    Mono,
    /// Single-channel intensity
    Grey,
    /// Interleaved UYVY, two samples per pixel
    Uyvy,
    /// Interleaved RGB
    Rgb,
    /// Interleaved HSV
    Hsv,
    /// Interleaved YUV (BT.601, chroma rescaled to [0,255])
    Yuv,
    /// Interleaved CIE Lab
    Lab,
    /// Interleaved RGBA
    Rgba,
}

impl PixelFormat {
    /// Number of samples per pixel implied by the format
    pub fn channels(self) -> u32 {
        match self {
            Self::None | Self::Mono | Self::Grey => 1,
            Self::Uyvy => 2,
            Self::Rgb | Self::Hsv | Self::Yuv | Self::Lab => 3,
            Self::Rgba => 4,
        }
    }
}

/// Dynamically typed sample buffer
///
/// One variant per supported element type. Operations that do not need to
/// be fast read and write through [`PixelData::get`] / [`PixelData::set`];
/// hot loops extract a typed slice with [`PixelElement::slice`].
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    S8(Vec<i8>),
    U16(Vec<u16>),
    S16(Vec<i16>),
    U32(Vec<u32>),
    S32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! each_variant {
    ($data:expr, $buf:ident => $body:expr) => {
        match $data {
            PixelData::U8($buf) => $body,
            PixelData::S8($buf) => $body,
            PixelData::U16($buf) => $body,
            PixelData::S16($buf) => $body,
            PixelData::U32($buf) => $body,
            PixelData::S32($buf) => $body,
            PixelData::F32($buf) => $body,
            PixelData::F64($buf) => $body,
        }
    };
}

impl PixelData {
    /// Allocate a zero-filled buffer of the given type and length
    pub fn zeroed(ty: PixelType, len: usize) -> Self {
        match ty {
            PixelType::U8 => Self::U8(vec![0; len]),
            PixelType::S8 => Self::S8(vec![0; len]),
            PixelType::U16 => Self::U16(vec![0; len]),
            PixelType::S16 => Self::S16(vec![0; len]),
            PixelType::U32 => Self::U32(vec![0; len]),
            PixelType::S32 => Self::S32(vec![0; len]),
            PixelType::F32 => Self::F32(vec![0.0; len]),
            PixelType::F64 => Self::F64(vec![0.0; len]),
        }
    }

    /// Element type of this buffer
    pub fn ty(&self) -> PixelType {
        match self {
            Self::U8(_) => PixelType::U8,
            Self::S8(_) => PixelType::S8,
            Self::U16(_) => PixelType::U16,
            Self::S16(_) => PixelType::S16,
            Self::U32(_) => PixelType::U32,
            Self::S32(_) => PixelType::S32,
            Self::F32(_) => PixelType::F32,
            Self::F64(_) => PixelType::F64,
        }
    }

    /// Number of samples in the buffer
    pub fn len(&self) -> usize {
        each_variant!(self, buf => buf.len())
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dynamically typed sample read
    pub fn get(&self, index: usize) -> Option<f64> {
        each_variant!(self, buf => buf.get(index).map(|v| *v as f64))
    }

    /// Dynamically typed sample write; the value is cast to the element type
    pub fn set(&mut self, index: usize, value: f64) {
        match self {
            Self::U8(buf) => buf[index] = value as u8,
            Self::S8(buf) => buf[index] = value as i8,
            Self::U16(buf) => buf[index] = value as u16,
            Self::S16(buf) => buf[index] = value as i16,
            Self::U32(buf) => buf[index] = value as u32,
            Self::S32(buf) => buf[index] = value as i32,
            Self::F32(buf) => buf[index] = value as f32,
            Self::F64(buf) => buf[index] = value,
        }
    }

    /// Zero the whole buffer
    pub fn fill_zero(&mut self) {
        match self {
            Self::U8(buf) => buf.fill(0),
            Self::S8(buf) => buf.fill(0),
            Self::U16(buf) => buf.fill(0),
            Self::S16(buf) => buf.fill(0),
            Self::U32(buf) => buf.fill(0),
            Self::S32(buf) => buf.fill(0),
            Self::F32(buf) => buf.fill(0.0),
            Self::F64(buf) => buf.fill(0.0),
        }
    }

    /// Zero a contiguous span of samples
    pub fn fill_zero_range(&mut self, start: usize, end: usize) {
        match self {
            Self::U8(buf) => buf[start..end].fill(0),
            Self::S8(buf) => buf[start..end].fill(0),
            Self::U16(buf) => buf[start..end].fill(0),
            Self::S16(buf) => buf[start..end].fill(0),
            Self::U32(buf) => buf[start..end].fill(0),
            Self::S32(buf) => buf[start..end].fill(0),
            Self::F32(buf) => buf[start..end].fill(0.0),
            Self::F64(buf) => buf[start..end].fill(0.0),
        }
    }

    /// Copy a span of samples from another buffer of the same type
    pub fn copy_range_from(&mut self, source: &Self, src_start: usize, dst_start: usize, len: usize) -> Result<()> {
        macro_rules! copy_pair {
            ($($variant:ident),*) => {
                match (self, source) {
                    $((Self::$variant(dst), Self::$variant(src)) => {
                        dst[dst_start..dst_start + len]
                            .copy_from_slice(&src[src_start..src_start + len]);
                        Ok(())
                    })*
                    (dst, src) => Err(Error::BadType {
                        expected: dst.ty().name(),
                        actual: src.ty().name(),
                    }),
                }
            };
        }
        copy_pair!(U8, S8, U16, S16, U32, S32, F32, F64)
    }
}

/// Element type of a pixel sample; keys the generic hot loops
pub trait PixelElement: Copy + PartialOrd + 'static {
    /// The matching dynamic type tag
    const TYPE: PixelType;

    /// Additive identity
    fn zero() -> Self;

    /// Widen to f64
    fn to_f64(self) -> f64;

    /// Narrow from f64 with the platform cast semantics
    fn from_f64(value: f64) -> Self;

    /// Borrow the typed slice from dynamic storage
    fn slice(data: &PixelData) -> Result<&[Self]>;

    /// Borrow the typed slice mutably from dynamic storage
    fn slice_mut(data: &mut PixelData) -> Result<&mut [Self]>;
}

macro_rules! impl_pixel_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl PixelElement for $t {
            const TYPE: PixelType = PixelType::$variant;

            fn zero() -> Self {
                0 as $t
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn slice(data: &PixelData) -> Result<&[Self]> {
                match data {
                    PixelData::$variant(buf) => Ok(buf),
                    other => Err(Error::BadType {
                        expected: PixelType::$variant.name(),
                        actual: other.ty().name(),
                    }),
                }
            }

            fn slice_mut(data: &mut PixelData) -> Result<&mut [Self]> {
                match data {
                    PixelData::$variant(buf) => Ok(buf),
                    other => Err(Error::BadType {
                        expected: PixelType::$variant.name(),
                        actual: other.ty().name(),
                    }),
                }
            }
        })*
    };
}

impl_pixel_element!(
    u8 => U8,
    i8 => S8,
    u16 => U16,
    i16 => S16,
    u32 => U32,
    i32 => S32,
    f32 => F32,
    f64 => F64,
);

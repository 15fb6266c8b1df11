//! PixelImage - the raster container
//!
//! A `PixelImage` is a typed 2-D view over a contiguous sample buffer.
//! Pixels are `step` samples wide, rows are `stride` samples apart, and an
//! `offset` selects the first sample within a row. A continuous image has
//! `width * step == stride`, which enables the bulk copy and clear paths.
//!
//! Sub-rectangles are exposed as borrowed [`PixelView`] / [`PixelViewMut`]
//! types that share the parent's buffer.

mod access;
mod convert;
mod measure;
mod ops;

pub use access::{PixelView, PixelViewMut};
pub use convert::{
    convert, grey8_to_grey24, grey8_to_yuv24, pick_channel, rgb24_to_grey8, rgb24_to_yuv24,
    yuv24_to_grey8, yuv24_to_rgb24,
};

use crate::error::{Error, Result};
use crate::types::{PixelData, PixelElement, PixelFormat, PixelType};

/// Typed 2-D raster image
///
/// # Examples
///
/// ```
/// use cvsu_core::{PixelFormat, PixelImage, PixelType};
///
/// let image = PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 64, 48).unwrap();
/// assert_eq!(image.width(), 64);
/// assert_eq!(image.height(), 48);
/// assert!(image.is_continuous());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PixelImage {
    ty: PixelType,
    format: PixelFormat,
    width: u32,
    height: u32,
    step: u32,
    stride: u32,
    offset: u32,
    data: PixelData,
}

impl PixelImage {
    /// Create an image over a fresh zero-initialized buffer
    ///
    /// # Errors
    ///
    /// `BadParam` when a dimension or the step is zero, or when the stride
    /// cannot hold a full row of pixels.
    pub fn new(
        ty: PixelType,
        format: PixelFormat,
        width: u32,
        height: u32,
        step: u32,
        stride: u32,
    ) -> Result<Self> {
        Self::check_layout(width, height, step, stride)?;
        let data = PixelData::zeroed(ty, (stride as usize) * (height as usize));
        Ok(Self {
            ty,
            format,
            width,
            height,
            step,
            stride,
            offset: 0,
            data,
        })
    }

    /// Create a continuous image with the step implied by the format
    pub fn new_continuous(
        ty: PixelType,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let step = format.channels();
        Self::new(ty, format, width, height, step, width * step)
    }

    /// Adopt a caller-provided buffer
    ///
    /// # Errors
    ///
    /// `BadSize` when the buffer is too small for the described layout,
    /// `BadParam` on an invalid layout.
    pub fn from_data(
        data: PixelData,
        format: PixelFormat,
        width: u32,
        height: u32,
        step: u32,
        stride: u32,
    ) -> Result<Self> {
        Self::check_layout(width, height, step, stride)?;
        let required = (stride as usize) * (height as usize);
        if data.len() < required {
            return Err(Error::BadSize(format!(
                "buffer of {} samples cannot hold {}x{} image with stride {}",
                data.len(),
                width,
                height,
                stride
            )));
        }
        Ok(Self {
            ty: data.ty(),
            format,
            width,
            height,
            step,
            stride,
            offset: 0,
            data,
        })
    }

    fn check_layout(width: u32, height: u32, step: u32, stride: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::BadParam(format!(
                "invalid image dimensions {}x{}",
                width, height
            )));
        }
        if step == 0 {
            return Err(Error::BadParam("pixel step must be positive".into()));
        }
        if stride < width * step {
            return Err(Error::BadParam(format!(
                "stride {} too small for width {} with step {}",
                stride, width, step
            )));
        }
        Ok(())
    }

    /// Element type of the samples
    #[inline]
    pub fn ty(&self) -> PixelType {
        self.ty
    }

    /// Pixel format tag
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Width in pixels
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples per pixel
    #[inline]
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Samples per row
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Sample offset of the first channel within a row
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Whether rows are packed back to back without padding
    #[inline]
    pub fn is_continuous(&self) -> bool {
        self.offset == 0 && self.width * self.step == self.stride
    }

    /// The backing sample buffer
    #[inline]
    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// Mutable access to the backing sample buffer
    #[inline]
    pub fn data_mut(&mut self) -> &mut PixelData {
        &mut self.data
    }

    /// Consume the image, returning its buffer
    pub fn into_data(self) -> PixelData {
        self.data
    }

    /// Buffer index of a sample
    #[inline]
    pub fn sample_index(&self, x: u32, y: u32, channel: u32) -> usize {
        (y * self.stride + x * self.step + self.offset + channel) as usize
    }

    /// Bounds-checked dynamically typed sample read
    pub fn get_sample(&self, x: u32, y: u32, channel: u32) -> Option<f64> {
        if x >= self.width || y >= self.height || channel >= self.step {
            return None;
        }
        self.data.get(self.sample_index(x, y, channel))
    }

    /// Bounds-checked dynamically typed sample write
    pub fn set_sample(&mut self, x: u32, y: u32, channel: u32, value: f64) -> Result<()> {
        if x >= self.width || y >= self.height || channel >= self.step {
            return Err(Error::BadSize(format!(
                "sample ({}, {}, {}) outside {}x{} image with step {}",
                x, y, channel, self.width, self.height, self.step
            )));
        }
        let index = self.sample_index(x, y, channel);
        self.data.set(index, value);
        Ok(())
    }

    /// Typed slice of one row's addressable samples
    pub fn row<T: PixelElement>(&self, y: u32) -> Result<&[T]> {
        if y >= self.height {
            return Err(Error::BadSize(format!("row {} >= height {}", y, self.height)));
        }
        let all = T::slice(&self.data)?;
        let start = (y * self.stride + self.offset) as usize;
        Ok(&all[start..start + (self.width * self.step) as usize])
    }

    /// Mutable typed slice of one row's addressable samples
    pub fn row_mut<T: PixelElement>(&mut self, y: u32) -> Result<&mut [T]> {
        if y >= self.height {
            return Err(Error::BadSize(format!("row {} >= height {}", y, self.height)));
        }
        let start = (y * self.stride + self.offset) as usize;
        let end = start + (self.width * self.step) as usize;
        let all = T::slice_mut(&mut self.data)?;
        Ok(&mut all[start..end])
    }

    /// The whole sample buffer as a typed slice
    pub fn samples<T: PixelElement>(&self) -> Result<&[T]> {
        T::slice(&self.data)
    }

    /// The whole sample buffer as a mutable typed slice
    pub fn samples_mut<T: PixelElement>(&mut self) -> Result<&mut [T]> {
        T::slice_mut(&mut self.data)
    }

    /// Borrow a read-only sub-view sharing this image's buffer
    ///
    /// # Errors
    ///
    /// `BadSize` when the rectangle does not fit inside the image.
    pub fn roi(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelView<'_>> {
        self.check_roi(x, y, width, height)?;
        Ok(PixelView::new(self, x, y, width, height))
    }

    /// Borrow a mutable sub-view sharing this image's buffer
    pub fn roi_mut(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelViewMut<'_>> {
        self.check_roi(x, y, width, height)?;
        Ok(PixelViewMut::new(self, x, y, width, height))
    }

    fn check_roi(&self, x: u32, y: u32, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::BadParam("ROI dimensions must be positive".into()));
        }
        if x + width > self.width || y + height > self.height {
            return Err(Error::BadSize(format!(
                "ROI ({}, {}) {}x{} outside {}x{} image",
                x, y, width, height, self.width, self.height
            )));
        }
        Ok(())
    }
}

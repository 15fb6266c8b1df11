//! Whole-image operations: clear, copy, normalize, 2x scaling
//!
//! Continuous images take the bulk paths; strided images fall back to
//! per-row spans.

use super::PixelImage;
use crate::error::{Error, Result};
use crate::types::{PixelElement, PixelType};

impl PixelImage {
    /// Zero every addressable sample
    pub fn clear(&mut self) {
        if self.is_continuous() {
            self.data_mut().fill_zero();
            return;
        }
        let stride = self.stride();
        let offset = self.offset();
        let row_len = (self.width() * self.step()) as usize;
        for y in 0..self.height() {
            let start = (y * stride + offset) as usize;
            self.data_mut().fill_zero_range(start, start + row_len);
        }
    }

    /// Copy sample content from another image of identical shape
    ///
    /// # Errors
    ///
    /// `BadType` on element type or format mismatch, `BadSize` on shape
    /// mismatch.
    pub fn copy_from(&mut self, source: &PixelImage) -> Result<()> {
        if self.ty() != source.ty() {
            return Err(Error::BadType {
                expected: self.ty().name(),
                actual: source.ty().name(),
            });
        }
        if self.format() != source.format() {
            return Err(Error::BadType {
                expected: "matching pixel format",
                actual: "different pixel format",
            });
        }
        if self.width() != source.width()
            || self.height() != source.height()
            || self.step() != source.step()
        {
            return Err(Error::BadSize(format!(
                "cannot copy {}x{} (step {}) into {}x{} (step {})",
                source.width(),
                source.height(),
                source.step(),
                self.width(),
                self.height(),
                self.step()
            )));
        }

        if self.is_continuous() && source.is_continuous() {
            let len = source.data().len().min(self.data().len());
            let src = source.data();
            return self.data_mut().copy_range_from(src, 0, 0, len);
        }

        let row_len = (self.width() * self.step()) as usize;
        for y in 0..self.height() {
            let src_start = source.sample_index(0, y, 0);
            let dst_start = self.sample_index(0, y, 0);
            let src = source.data();
            self.data_mut()
                .copy_range_from(src, src_start, dst_start, row_len)?;
        }
        Ok(())
    }

    /// Linearly map samples into a U8 target of the same shape
    ///
    /// Each channel is normalized independently. When `min == max == 0.0`
    /// the channel extrema are detected from the source; a flat channel
    /// maps to zero (the unit range substitution avoids division by zero).
    pub fn normalize_into(&self, target: &mut PixelImage, min: f64, max: f64) -> Result<()> {
        if target.ty() != PixelType::U8 {
            return Err(Error::BadType {
                expected: "U8",
                actual: target.ty().name(),
            });
        }
        if self.width() != target.width()
            || self.height() != target.height()
            || self.step() != target.step()
        {
            return Err(Error::BadSize("normalize shape mismatch".into()));
        }

        match self.ty() {
            PixelType::U8 => normalize_channels::<u8>(self, target, min, max),
            PixelType::S8 => normalize_channels::<i8>(self, target, min, max),
            PixelType::U16 => normalize_channels::<u16>(self, target, min, max),
            PixelType::S16 => normalize_channels::<i16>(self, target, min, max),
            PixelType::U32 => normalize_channels::<u32>(self, target, min, max),
            PixelType::S32 => normalize_channels::<i32>(self, target, min, max),
            PixelType::F32 => normalize_channels::<f32>(self, target, min, max),
            PixelType::F64 => normalize_channels::<f64>(self, target, min, max),
        }
    }

    /// 2x nearest-neighbor downscale into a target of half the size
    ///
    /// The target must be `ceil(w/2) x ceil(h/2)` with the same element
    /// type and step.
    pub fn scale_down_into(&self, target: &mut PixelImage) -> Result<()> {
        if self.ty() != target.ty() {
            return Err(Error::BadType {
                expected: self.ty().name(),
                actual: target.ty().name(),
            });
        }
        if target.width() != self.width().div_ceil(2)
            || target.height() != self.height().div_ceil(2)
            || target.step() != self.step()
        {
            return Err(Error::BadSize("downscale target must be half size".into()));
        }
        let step = self.step();
        for y in 0..target.height() {
            for x in 0..target.width() {
                for channel in 0..step {
                    let value = self
                        .get_sample(2 * x, 2 * y, channel)
                        .ok_or_else(|| Error::Fatal("downscale source index".into()))?;
                    target.set_sample(x, y, channel, value)?;
                }
            }
        }
        Ok(())
    }

    /// 2x nearest-neighbor upscale into a target of double the size
    pub fn scale_up_into(&self, target: &mut PixelImage) -> Result<()> {
        if self.ty() != target.ty() {
            return Err(Error::BadType {
                expected: self.ty().name(),
                actual: target.ty().name(),
            });
        }
        if target.width() != self.width() * 2
            || target.height() != self.height() * 2
            || target.step() != self.step()
        {
            return Err(Error::BadSize("upscale target must be double size".into()));
        }
        let step = self.step();
        for y in 0..target.height() {
            for x in 0..target.width() {
                for channel in 0..step {
                    let value = self
                        .get_sample(x / 2, y / 2, channel)
                        .ok_or_else(|| Error::Fatal("upscale source index".into()))?;
                    target.set_sample(x, y, channel, value)?;
                }
            }
        }
        Ok(())
    }
}

fn normalize_channels<T: PixelElement>(
    source: &PixelImage,
    target: &mut PixelImage,
    min: f64,
    max: f64,
) -> Result<()> {
    let step = source.step() as usize;
    for channel in 0..step {
        let (lo, hi) = if min == 0.0 && max == 0.0 {
            channel_extrema::<T>(source, channel)?
        } else {
            (min, max)
        };
        let mut range = hi - lo;
        if range <= 0.0 {
            range = 1.0;
        }
        let factor = 255.0 / range;
        for y in 0..source.height() {
            let src_row = source.row::<T>(y)?;
            let dst_row = target.row_mut::<u8>(y)?;
            for (src_pixel, dst_pixel) in src_row
                .chunks_exact(step)
                .zip(dst_row.chunks_exact_mut(step))
            {
                let value = (src_pixel[channel].to_f64() - lo) * factor;
                dst_pixel[channel] = value.clamp(0.0, 255.0) as u8;
            }
        }
    }
    Ok(())
}

fn channel_extrema<T: PixelElement>(source: &PixelImage, channel: usize) -> Result<(f64, f64)> {
    let step = source.step() as usize;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for y in 0..source.height() {
        for pixel in source.row::<T>(y)?.chunks_exact(step) {
            let value = pixel[channel].to_f64();
            if value < lo {
                lo = value;
            }
            if value > hi {
                hi = value;
            }
        }
    }
    Ok((lo, hi))
}

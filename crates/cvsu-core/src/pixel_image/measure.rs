//! Byte-image rectangle measurements
//!
//! Direct min/max/mean/variance over a rectangle of a U8 image. Rectangles
//! given in signed coordinates are clipped to the image; a rectangle that
//! misses the image entirely measures as zero.

use super::PixelImage;
use crate::error::{Error, Result};
use crate::types::PixelType;

impl PixelImage {
    fn clip_rect(&self, x: i32, y: i32, width: i32, height: i32) -> Option<(u32, u32, u32, u32)> {
        let mut x = x;
        let mut y = y;
        let mut width = width;
        let mut height = height;
        if x < 0 {
            width += x;
            x = 0;
        }
        if y < 0 {
            height += y;
            y = 0;
        }
        if width <= 0 || height <= 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let width = (width as u32).min(self.width() - x);
        let height = (height as u32).min(self.height() - y);
        Some((x, y, width, height))
    }

    fn check_byte(&self) -> Result<()> {
        if self.ty() != PixelType::U8 {
            return Err(Error::BadType {
                expected: "U8",
                actual: self.ty().name(),
            });
        }
        Ok(())
    }

    /// Minimum of channel 0 over a clipped rectangle
    pub fn find_min_byte(&self, x: i32, y: i32, width: i32, height: i32) -> Result<u8> {
        self.check_byte()?;
        let Some((x, y, width, height)) = self.clip_rect(x, y, width, height) else {
            return Ok(0);
        };
        let step = self.step() as usize;
        let mut min = u8::MAX;
        for row in y..y + height {
            let samples = self.row::<u8>(row)?;
            for pixel in samples[(x as usize) * step..((x + width) as usize) * step]
                .chunks_exact(step)
            {
                if pixel[0] < min {
                    min = pixel[0];
                }
            }
        }
        Ok(min)
    }

    /// Maximum of channel 0 over a clipped rectangle
    pub fn find_max_byte(&self, x: i32, y: i32, width: i32, height: i32) -> Result<u8> {
        self.check_byte()?;
        let Some((x, y, width, height)) = self.clip_rect(x, y, width, height) else {
            return Ok(0);
        };
        let step = self.step() as usize;
        let mut max = u8::MIN;
        for row in y..y + height {
            let samples = self.row::<u8>(row)?;
            for pixel in samples[(x as usize) * step..((x + width) as usize) * step]
                .chunks_exact(step)
            {
                if pixel[0] > max {
                    max = pixel[0];
                }
            }
        }
        Ok(max)
    }

    /// Mean of channel 0 over a clipped rectangle
    pub fn mean_byte(&self, x: i32, y: i32, width: i32, height: i32) -> Result<f64> {
        self.check_byte()?;
        let Some((x, y, width, height)) = self.clip_rect(x, y, width, height) else {
            return Ok(0.0);
        };
        let step = self.step() as usize;
        let mut sum = 0.0;
        for row in y..y + height {
            let samples = self.row::<u8>(row)?;
            for pixel in samples[(x as usize) * step..((x + width) as usize) * step]
                .chunks_exact(step)
            {
                sum += pixel[0] as f64;
            }
        }
        Ok(sum / (width as f64 * height as f64))
    }

    /// Variance of channel 0 over a clipped rectangle, clamped non-negative
    pub fn variance_byte(&self, x: i32, y: i32, width: i32, height: i32) -> Result<f64> {
        self.check_byte()?;
        let Some((x, y, width, height)) = self.clip_rect(x, y, width, height) else {
            return Ok(0.0);
        };
        let step = self.step() as usize;
        let mut sum = 0.0;
        let mut sum2 = 0.0;
        for row in y..y + height {
            let samples = self.row::<u8>(row)?;
            for pixel in samples[(x as usize) * step..((x + width) as usize) * step]
                .chunks_exact(step)
            {
                let value = pixel[0] as f64;
                sum += value;
                sum2 += value * value;
            }
        }
        let n = width as f64 * height as f64;
        let mean = sum / n;
        Ok((sum2 / n - mean * mean).max(0.0))
    }
}

//! Integral image (summed area table) with first and second order planes
//!
//! The two planes hold running sums of sample values and squared sample
//! values over the source's selected channel. Each plane is
//! `(W+1) x (H+1)` with the top row and left column identically zero, so
//! rectangle sums need no corner special-casing: the sum over
//! `[x, x+w) x [y, y+h)` is
//!
//! ```text
//! I[y+h][x+w] + I[y][x] - I[y+h][x] - I[y][x+w]
//! ```
//!
//! and full statistics for any rectangle follow in O(1).

use crate::error::{IntegralError, IntegralResult};
use cvsu_core::{PixelImage, PixelType, Statistics};

/// Summed area tables over one channel of a U8 image
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    channel: u32,
    i1: Vec<f64>,
    i2: Vec<f64>,
}

impl IntegralImage {
    /// Build the integral planes over channel 0 of the source
    pub fn from_pix(source: &PixelImage) -> IntegralResult<Self> {
        Self::with_channel(source, 0)
    }

    /// Build the integral planes over the given channel of the source
    ///
    /// Multi-channel sources use the same recurrence per channel; an
    /// integral image is bound to one channel at construction.
    ///
    /// # Errors
    ///
    /// `UnsupportedType` unless the source is U8; `InvalidParameters` when
    /// the channel does not exist.
    pub fn with_channel(source: &PixelImage, channel: u32) -> IntegralResult<Self> {
        if source.ty() != PixelType::U8 {
            return Err(IntegralError::UnsupportedType {
                expected: "U8",
                actual: source.ty().name(),
            });
        }
        if channel >= source.step() {
            return Err(IntegralError::InvalidParameters(format!(
                "channel {} out of range for step {}",
                channel,
                source.step()
            )));
        }
        let width = source.width();
        let height = source.height();
        let plane = ((width + 1) as usize) * ((height + 1) as usize);
        let mut integral = Self {
            width,
            height,
            channel,
            i1: vec![0.0; plane],
            i2: vec![0.0; plane],
        };
        integral.update(source)?;
        Ok(integral)
    }

    /// Recompute both planes from the source in one sweep
    ///
    /// The source must have the shape the integral was created with.
    pub fn update(&mut self, source: &PixelImage) -> IntegralResult<()> {
        if source.width() != self.width || source.height() != self.height {
            return Err(IntegralError::ShapeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: source.width(),
                actual_height: source.height(),
            });
        }
        if source.ty() != PixelType::U8 {
            return Err(IntegralError::UnsupportedType {
                expected: "U8",
                actual: source.ty().name(),
            });
        }

        // the zero border row and column must stay zero for the recurrence
        self.i1.fill(0.0);
        self.i2.fill(0.0);

        let squared: Vec<f64> = (0..256u32).map(|v| (v * v) as f64).collect();
        let stride = (self.width + 1) as usize;
        let step = source.step() as usize;
        let channel = self.channel as usize;
        for y in 0..self.height {
            let row = source.row::<u8>(y).map_err(IntegralError::Core)?;
            let base = ((y + 1) as usize) * stride;
            let above = (y as usize) * stride;
            for x in 0..self.width as usize {
                let value = row[x * step + channel] as usize;
                self.i1[base + x + 1] =
                    self.i1[base + x] + self.i1[above + x + 1] - self.i1[above + x]
                        + value as f64;
                self.i2[base + x + 1] =
                    self.i2[base + x] + self.i2[above + x + 1] - self.i2[above + x]
                        + squared[value];
            }
        }
        Ok(())
    }

    /// Source width in pixels
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Source height in pixels
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel the planes were accumulated over
    #[inline]
    pub fn channel(&self) -> u32 {
        self.channel
    }

    #[inline]
    fn plane_index(&self, x: u32, y: u32) -> usize {
        (y as usize) * ((self.width + 1) as usize) + x as usize
    }

    /// First and second order sums over an in-bounds rectangle
    ///
    /// Callers must ensure `x + w <= width` and `y + h <= height`.
    #[inline]
    pub fn box_sums(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let a = self.plane_index(x, y);
        let b = self.plane_index(x + w, y);
        let c = self.plane_index(x, y + h);
        let d = self.plane_index(x + w, y + h);
        (
            self.i1[d] + self.i1[a] - self.i1[b] - self.i1[c],
            self.i2[d] + self.i2[a] - self.i2[b] - self.i2[c],
        )
    }

    /// Sum of samples over an in-bounds rectangle
    #[inline]
    pub fn sum_rect(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        self.box_sums(x, y, w, h).0
    }

    fn clip(&self, x: i32, y: i32, w: i32, h: i32) -> Option<(u32, u32, u32, u32)> {
        let mut x = x;
        let mut y = y;
        let mut w = w;
        let mut h = h;
        if x < 0 {
            w += x;
            x = 0;
        }
        if y < 0 {
            h += y;
            y = 0;
        }
        if w <= 0 || h <= 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        let w = (w as u32).min(self.width - x);
        let h = (h as u32).min(self.height - y);
        Some((x, y, w, h))
    }

    /// Statistics of a rectangle, clipped to the image
    ///
    /// A rectangle entirely outside the image yields the zero record.
    pub fn rect_statistics(&self, x: i32, y: i32, w: i32, h: i32) -> Statistics {
        let Some((x, y, w, h)) = self.clip(x, y, w, h) else {
            return Statistics::zero();
        };
        let (sum1, sum2) = self.box_sums(x, y, w, h);
        Statistics::from_sums((w as f64) * (h as f64), sum1, sum2)
    }

    /// Mean intensity of a clipped rectangle
    pub fn rect_mean(&self, x: i32, y: i32, w: i32, h: i32) -> f64 {
        self.rect_statistics(x, y, w, h).mean
    }

    /// Intensity variance of a clipped rectangle
    pub fn rect_variance(&self, x: i32, y: i32, w: i32, h: i32) -> f64 {
        self.rect_statistics(x, y, w, h).variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvsu_core::PixelFormat;

    fn constant_image(width: u32, height: u32, value: u8) -> PixelImage {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
        for y in 0..height {
            image.row_mut::<u8>(y).unwrap().fill(value);
        }
        image
    }

    fn column_gradient(width: u32, height: u32) -> PixelImage {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                image.set_sample(x, y, 0, (x * 64) as f64).unwrap();
            }
        }
        image
    }

    #[test]
    fn test_constant_rect() {
        let integral = IntegralImage::from_pix(&constant_image(4, 4, 100)).unwrap();
        let stat = integral.rect_statistics(0, 0, 4, 4);
        assert_eq!(stat.n, 16.0);
        assert_eq!(stat.sum, 1600.0);
        assert_eq!(stat.sum2, 160000.0);
        assert_eq!(stat.mean, 100.0);
        assert_eq!(stat.variance, 0.0);
        assert_eq!(stat.deviation, 0.0);
    }

    #[test]
    fn test_gradient_rect() {
        let integral = IntegralImage::from_pix(&column_gradient(4, 4)).unwrap();
        let stat = integral.rect_statistics(0, 0, 4, 4);
        assert_eq!(stat.mean, 96.0);
        assert_eq!(stat.variance, 5120.0);
        assert!((stat.deviation - 71.554).abs() < 1e-3);
    }

    #[test]
    fn test_interior_rect() {
        let integral = IntegralImage::from_pix(&column_gradient(4, 4)).unwrap();
        // single column of value 128
        let stat = integral.rect_statistics(2, 1, 1, 2);
        assert_eq!(stat.n, 2.0);
        assert_eq!(stat.mean, 128.0);
        assert_eq!(stat.variance, 0.0);
    }

    #[test]
    fn test_clipping() {
        let integral = IntegralImage::from_pix(&constant_image(4, 4, 10)).unwrap();
        // hangs over the top-left corner; clips to 2x2
        let stat = integral.rect_statistics(-2, -2, 4, 4);
        assert_eq!(stat.n, 4.0);
        assert_eq!(stat.mean, 10.0);
        // entirely outside
        assert_eq!(integral.rect_statistics(8, 8, 2, 2), Statistics::zero());
        assert_eq!(integral.rect_statistics(-4, 0, 4, 4), Statistics::zero());
    }

    #[test]
    fn test_with_channel() {
        let mut image = PixelImage::new_continuous(PixelType::U8, PixelFormat::Rgb, 2, 2).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                image.set_sample(x, y, 0, 10.0).unwrap();
                image.set_sample(x, y, 1, 20.0).unwrap();
                image.set_sample(x, y, 2, 30.0).unwrap();
            }
        }
        let green = IntegralImage::with_channel(&image, 1).unwrap();
        assert_eq!(green.rect_statistics(0, 0, 2, 2).mean, 20.0);
        assert!(IntegralImage::with_channel(&image, 3).is_err());
    }

    #[test]
    fn test_update_shape_guard() {
        let mut integral = IntegralImage::from_pix(&constant_image(4, 4, 1)).unwrap();
        let other = constant_image(5, 4, 1);
        assert!(integral.update(&other).is_err());
    }

    #[test]
    fn test_requires_bytes() {
        let image =
            PixelImage::new_continuous(PixelType::F64, PixelFormat::Grey, 4, 4).unwrap();
        assert!(IntegralImage::from_pix(&image).is_err());
    }
}

//! Adaptive thresholding over integral image statistics
//!
//! Sauvola and Feng binarization. Both derive local mean and deviation
//! from the integral planes in O(1) per pixel, then threshold each sample
//! against its neighborhood.

use crate::error::{IntegralError, IntegralResult};
use crate::integral::IntegralImage;
use cvsu_core::{PixelFormat, PixelImage, PixelType};

/// Sauvola adaptive binarization
///
/// The threshold at each pixel is `mean * (1 + k * (dev / R - 1))` over a
/// square neighborhood of radius `radius`. `R` is either the caller's
/// `max`, or, when `calculate_max` is set, derived from the image itself:
/// the maximum neighborhood deviation, or the mean neighborhood deviation
/// when `use_mean` is also set.
///
/// Samples above the threshold map to 255 and the rest to 0; `invert`
/// swaps the two.
///
/// # Errors
///
/// `InvalidParameters` when the radius is zero or a non-positive `R` is
/// supplied; `UnsupportedType` unless the source is U8.
pub fn threshold_sauvola(
    source: &PixelImage,
    invert: bool,
    radius: u32,
    k: f64,
    calculate_max: bool,
    max: f64,
    use_mean: bool,
) -> IntegralResult<PixelImage> {
    if radius == 0 {
        return Err(IntegralError::InvalidParameters(
            "radius must be positive".to_string(),
        ));
    }
    if !calculate_max && max <= 0.0 {
        return Err(IntegralError::InvalidParameters(
            "max deviation must be positive".to_string(),
        ));
    }
    let integral = IntegralImage::from_pix(source)?;

    let width = source.width();
    let height = source.height();
    let size = (2 * radius + 1) as i32;
    let (value_above, value_below) = if invert { (0u8, 255u8) } else { (255u8, 0u8) };

    let mut target =
        PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height)
            .map_err(IntegralError::Core)?;

    if !calculate_max {
        let r = max;
        for y in 0..height {
            for x in 0..width {
                let stat = integral.rect_statistics(
                    x as i32 - radius as i32,
                    y as i32 - radius as i32,
                    size,
                    size,
                );
                let threshold = (stat.mean * (1.0 + k * (stat.deviation / r - 1.0))).floor();
                let sample = source.get_sample(x, y, 0).unwrap_or(0.0);
                let value = if sample > threshold { value_above } else { value_below };
                target
                    .set_sample(x, y, 0, value as f64)
                    .map_err(IntegralError::Core)?;
            }
        }
        return Ok(target);
    }

    // first pass caches neighborhood statistics and derives R
    let mut means = vec![0.0f64; (width as usize) * (height as usize)];
    let mut devs = vec![0.0f64; (width as usize) * (height as usize)];
    let mut dev_max = 0.0f64;
    let mut dev_sum = 0.0f64;
    for y in 0..height {
        for x in 0..width {
            let stat = integral.rect_statistics(
                x as i32 - radius as i32,
                y as i32 - radius as i32,
                size,
                size,
            );
            let index = (y as usize) * (width as usize) + x as usize;
            means[index] = stat.mean;
            devs[index] = stat.deviation;
            if stat.deviation > dev_max {
                dev_max = stat.deviation;
            }
            dev_sum += stat.deviation;
        }
    }
    let mut r = if use_mean {
        dev_sum / ((width as f64) * (height as f64))
    } else {
        dev_max
    };
    if r <= 0.0 {
        r = 1.0;
    }

    for y in 0..height {
        for x in 0..width {
            let index = (y as usize) * (width as usize) + x as usize;
            let threshold = (means[index] * (1.0 + k * (devs[index] / r - 1.0))).floor();
            let sample = source.get_sample(x, y, 0).unwrap_or(0.0);
            let value = if sample > threshold { value_above } else { value_below };
            target
                .set_sample(x, y, 0, value as f64)
                .map_err(IntegralError::Core)?;
        }
    }
    Ok(target)
}

/// Feng adaptive binarization
///
/// Uses two nested neighborhoods of radii `radius1` and
/// `multiplier * radius1` with the fixed parameters `k1 = 0.25`,
/// `k2 = 0.04`, `a1 = 0.12` and exponent 2:
///
/// ```text
/// a_s = dev1 / max(1, dev2)
/// t   = (1 - a1) * mean + k1 * a_s^2 * a_s * (mean - min) + k2 * a_s^2 * min
/// ```
///
/// `min` is the observed rectangle minimum, or the estimate
/// `max(0, mean - alpha * dev1)` when `estimate_min` is set.
pub fn threshold_feng(
    source: &PixelImage,
    invert: bool,
    radius1: u32,
    multiplier: f64,
    estimate_min: bool,
    alpha: f64,
) -> IntegralResult<PixelImage> {
    if radius1 == 0 {
        return Err(IntegralError::InvalidParameters(
            "radius must be positive".to_string(),
        ));
    }
    if multiplier < 1.0 {
        return Err(IntegralError::InvalidParameters(
            "outer neighborhood multiplier must be at least 1".to_string(),
        ));
    }
    let integral = IntegralImage::from_pix(source)?;

    let width = source.width();
    let height = source.height();
    let g = 2.0;
    let a1 = 0.12;
    let k1 = 0.25;
    let k2 = 0.04;
    let radius2 = (multiplier * radius1 as f64) as u32;
    let size1 = (2 * radius1 + 1) as i32;
    let size2 = (2 * radius2 + 1) as i32;
    let (value_above, value_below) = if invert { (0u8, 255u8) } else { (255u8, 0u8) };

    let mut target =
        PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height)
            .map_err(IntegralError::Core)?;

    for y in 0..height {
        for x in 0..width {
            let inner = integral.rect_statistics(
                x as i32 - radius1 as i32,
                y as i32 - radius1 as i32,
                size1,
                size1,
            );
            let min = if estimate_min {
                (inner.mean - alpha * inner.deviation).max(0.0)
            } else {
                source.find_min_byte(
                    x as i32 - radius1 as i32,
                    y as i32 - radius1 as i32,
                    size1,
                    size1,
                )? as f64
            };
            let dev2 = integral
                .rect_variance(
                    x as i32 - radius2 as i32,
                    y as i32 - radius2 as i32,
                    size2,
                    size2,
                )
                .sqrt();
            let a_s = inner.deviation / dev2.max(1.0);
            let asg = a_s.powf(g);
            let threshold =
                ((1.0 - a1) * inner.mean + k1 * asg * a_s * (inner.mean - min) + k2 * asg * min)
                    .floor();
            let sample = source.get_sample(x, y, 0).unwrap_or(0.0);
            let value = if sample > threshold { value_above } else { value_below };
            target
                .set_sample(x, y, 0, value as f64)
                .map_err(IntegralError::Core)?;
        }
    }
    Ok(target)
}

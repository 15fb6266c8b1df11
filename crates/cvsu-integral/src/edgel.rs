//! Box-pair Fisher discriminant responses
//!
//! An edgel response compares two adjacent boxes of pixels separated by a
//! one-pixel gap: a strong difference of means relative to the pooled
//! variance indicates an intensity edge between the boxes. The sliding
//! scans accumulate the signed response over a tree-sized span and are the
//! basis of the quad tree edge response.

use crate::error::{IntegralError, IntegralResult};
use crate::integral::IntegralImage;
use cvsu_core::{PixelFormat, PixelImage, PixelType};

/// Signed Fisher discriminant between two boxes of `n` samples each
///
/// The pooled variance is floored at 1 to keep flat regions from blowing
/// up the ratio.
#[inline]
pub fn fisher_signed(n: f64, sum1: f64, sum2: f64, sumsqr1: f64, sumsqr2: f64) -> f64 {
    let mean1 = sum1 / n;
    let mean2 = sum2 / n;
    let var1 = sumsqr1 / n - mean1 * mean1;
    let var2 = sumsqr2 / n - mean2 * mean2;
    let var = (var1 + var2).max(1.0);
    (mean2 - mean1) / var.sqrt()
}

/// Unsigned Fisher discriminant between two boxes of `n` samples each
#[inline]
pub fn fisher_unsigned(n: f64, sum1: f64, sum2: f64, sumsqr1: f64, sumsqr2: f64) -> f64 {
    let mean1 = sum1 / n;
    let mean2 = sum2 / n;
    let diff = mean2 - mean1;
    let var1 = sumsqr1 / n - mean1 * mean1;
    let var2 = sumsqr2 / n - mean2 * mean2;
    let var = (var1 + var2).max(1.0);
    diff * diff / var
}

/// Horizontal cumulative Fisher response across a span
///
/// At each of the `box_width` scan positions two `box_length x box_width`
/// boxes, separated by a one-pixel column, are compared left against
/// right. The scan starts `box_length` left of `x` and the accumulated
/// response is averaged over the span. Returns 0 when the scan window does
/// not fit inside the image.
pub fn hscan_fisher(
    integral: &IntegralImage,
    x: u32,
    y: u32,
    box_length: u32,
    box_width: u32,
) -> f64 {
    let start = x as i64 - box_length as i64;
    let end = start + box_width as i64 + 2 * box_length as i64 + 1;
    if start < 0 || end > integral.width() as i64 || y + box_width > integral.height() {
        return 0.0;
    }
    let n = (box_length * box_width) as f64;
    let mut sum = 0.0;
    for i in 0..box_width {
        let col = (start + i as i64) as u32;
        let (sum1, sumsqr1) = integral.box_sums(col, y, box_length, box_width);
        let (sum2, sumsqr2) =
            integral.box_sums(col + box_length + 1, y, box_length, box_width);
        sum += fisher_signed(n, sum1, sum2, sumsqr1, sumsqr2);
    }
    sum / box_width as f64
}

/// Vertical cumulative Fisher response across a span
///
/// The transpose of [`hscan_fisher`]: `box_width x box_length` boxes
/// compared top against bottom, scanning downward from `box_length` above
/// `y`.
pub fn vscan_fisher(
    integral: &IntegralImage,
    x: u32,
    y: u32,
    box_length: u32,
    box_width: u32,
) -> f64 {
    let start = y as i64 - box_length as i64;
    let end = start + box_width as i64 + 2 * box_length as i64 + 1;
    if start < 0 || end > integral.height() as i64 || x + box_width > integral.width() {
        return 0.0;
    }
    let n = (box_length * box_width) as f64;
    let mut sum = 0.0;
    for i in 0..box_width {
        let row = (start + i as i64) as u32;
        let (sum1, sumsqr1) = integral.box_sums(x, row, box_width, box_length);
        let (sum2, sumsqr2) =
            integral.box_sums(x, row + box_length + 1, box_width, box_length);
        sum += fisher_signed(n, sum1, sum2, sumsqr1, sumsqr2);
    }
    sum / box_width as f64
}

/// Horizontal edgel response sweep over the whole image
///
/// Computes the two-box criterion at every interior column, in bands of
/// `vsize` rows: at column x the boxes `[x-hsize-1, x-1)` and
/// `[x, x+hsize)` of band height are compared across the one-pixel gap at
/// `x-1`, and the response is written to all rows of the band at `x`, the
/// first column of the right box. Border columns and any partial bottom
/// band stay zero and must be masked by callers.
pub fn edgel_response_x<F>(
    integral: &IntegralImage,
    hsize: u32,
    vsize: u32,
    criterion: F,
) -> IntegralResult<PixelImage>
where
    F: Fn(f64, f64, f64, f64, f64) -> f64,
{
    if hsize == 0 || vsize == 0 {
        return Err(IntegralError::InvalidParameters(
            "edgel box sides must be positive".to_string(),
        ));
    }
    let width = integral.width();
    let height = integral.height();
    if 2 * hsize + 1 >= width || vsize > height {
        return Err(IntegralError::InvalidParameters(format!(
            "edgel boxes {}x{} do not fit a {}x{} image",
            hsize, vsize, width, height
        )));
    }
    let mut target =
        PixelImage::new_continuous(PixelType::F64, PixelFormat::Grey, width, height)
            .map_err(IntegralError::Core)?;

    let n = (hsize * vsize) as f64;
    let mut y = 0;
    while y + vsize <= height {
        for x in hsize + 1..width - hsize {
            let (sum1, sumsqr1) = integral.box_sums(x - hsize - 1, y, hsize, vsize);
            let (sum2, sumsqr2) = integral.box_sums(x, y, hsize, vsize);
            let response = criterion(n, sum1, sum2, sumsqr1, sumsqr2);
            for row in y..y + vsize {
                target
                    .set_sample(x, row, 0, response)
                    .map_err(IntegralError::Core)?;
            }
        }
        y += vsize;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_edge_image(width: u32, height: u32, edge_x: u32) -> PixelImage {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let value = if x < edge_x { 20.0 } else { 220.0 };
                image.set_sample(x, y, 0, value).unwrap();
            }
        }
        image
    }

    #[test]
    fn test_fisher_flat_is_zero() {
        assert_eq!(fisher_signed(16.0, 1600.0, 1600.0, 160000.0, 160000.0), 0.0);
        assert_eq!(fisher_unsigned(16.0, 1600.0, 1600.0, 160000.0, 160000.0), 0.0);
    }

    #[test]
    fn test_fisher_sign() {
        // second box brighter -> positive signed response
        let g = fisher_signed(4.0, 40.0, 400.0, 400.0, 40000.0);
        assert!(g > 0.0);
        assert!(fisher_signed(4.0, 400.0, 40.0, 40000.0, 400.0) < 0.0);
    }

    #[test]
    fn test_hscan_detects_vertical_edge() {
        let image = step_edge_image(32, 32, 16);
        let integral = IntegralImage::from_pix(&image).unwrap();
        let on_edge = hscan_fisher(&integral, 12, 8, 4, 8);
        let off_edge = hscan_fisher(&integral, 4, 8, 4, 8);
        assert!(on_edge.abs() > 10.0 * off_edge.abs().max(1e-9));
        // no vertical variation anywhere
        let vertical = vscan_fisher(&integral, 12, 8, 4, 8);
        assert_eq!(vertical, 0.0);
    }

    #[test]
    fn test_edgel_response_sweep() {
        let image = step_edge_image(32, 16, 16);
        let integral = IntegralImage::from_pix(&image).unwrap();
        let response = edgel_response_x(&integral, 4, 4, fisher_unsigned).unwrap();
        assert_eq!(response.width(), 32);
        // the first bright column, right of the gap, carries the
        // strongest response
        let at_edge = response.get_sample(16, 4, 0).unwrap();
        let far_away = response.get_sample(6, 4, 0).unwrap();
        assert!(at_edge > 100.0 * far_away.max(1e-9));
        // rows within a band share the response
        assert_eq!(response.get_sample(16, 4, 0), response.get_sample(16, 7, 0));
        // border columns stay zero
        assert_eq!(response.get_sample(0, 0, 0), Some(0.0));
        assert_eq!(response.get_sample(31, 0, 0), Some(0.0));

        assert!(edgel_response_x(&integral, 0, 4, fisher_unsigned).is_err());
        assert!(edgel_response_x(&integral, 16, 4, fisher_unsigned).is_err());
    }

    #[test]
    fn test_scan_outside_image_is_zero() {
        let image = step_edge_image(16, 16, 8);
        let integral = IntegralImage::from_pix(&image).unwrap();
        assert_eq!(hscan_fisher(&integral, 0, 0, 4, 8), 0.0);
        assert_eq!(hscan_fisher(&integral, 14, 0, 4, 8), 0.0);
        assert_eq!(vscan_fisher(&integral, 0, 0, 4, 8), 0.0);
    }
}

//! Pixel format conversion
//!
//! Grey, RGB and YUV conversions over U8 images with the fixed ITU-R
//! BT.601 matrices. Chroma channels are rescaled into [0,255] by
//! `(x + r) / (2r)` with r = 0.436 for U and r = 0.615 for V.

use super::PixelImage;
use crate::error::{Error, Result};
use crate::types::{PixelFormat, PixelType};

const U_RANGE: f64 = 0.436;
const V_RANGE: f64 = 0.615;

/// Convert `source` into `target`, dispatching on the format pair
///
/// Identical type and format is a plain copy. Element type conversion is
/// not supported; unsupported format pairs yield `NotImplemented`.
pub fn convert(source: &PixelImage, target: &mut PixelImage) -> Result<()> {
    if source.width() != target.width() || source.height() != target.height() {
        return Err(Error::BadSize(format!(
            "cannot convert {}x{} into {}x{}",
            source.width(),
            source.height(),
            target.width(),
            target.height()
        )));
    }
    if source.ty() == target.ty() && source.format() == target.format() {
        return target.copy_from(source);
    }
    if source.ty() != target.ty() {
        return Err(Error::NotImplemented(format!(
            "element type conversion {} -> {}",
            source.ty().name(),
            target.ty().name()
        )));
    }
    match (source.format(), target.format()) {
        (PixelFormat::Grey, PixelFormat::Rgb) => grey8_to_grey24(source, target),
        (PixelFormat::Grey, PixelFormat::Yuv) => grey8_to_yuv24(source, target),
        (PixelFormat::Rgb, PixelFormat::Grey) => rgb24_to_grey8(source, target),
        (PixelFormat::Rgb, PixelFormat::Yuv) => rgb24_to_yuv24(source, target),
        (PixelFormat::Yuv, PixelFormat::Grey) => yuv24_to_grey8(source, target),
        (PixelFormat::Yuv, PixelFormat::Rgb) => yuv24_to_rgb24(source, target),
        (from, to) => Err(Error::NotImplemented(format!(
            "format conversion {:?} -> {:?}",
            from, to
        ))),
    }
}

fn check_shapes(
    source: &PixelImage,
    target: &PixelImage,
    source_step: u32,
    target_step: u32,
) -> Result<()> {
    if source.ty() != PixelType::U8 || target.ty() != PixelType::U8 {
        return Err(Error::BadType {
            expected: "U8",
            actual: if source.ty() != PixelType::U8 {
                source.ty().name()
            } else {
                target.ty().name()
            },
        });
    }
    if source.step() != source_step || target.step() != target_step {
        return Err(Error::BadParam(format!(
            "conversion requires steps {} -> {}, got {} -> {}",
            source_step,
            target_step,
            source.step(),
            target.step()
        )));
    }
    if source.width() != target.width() || source.height() != target.height() {
        return Err(Error::BadSize("conversion shape mismatch".into()));
    }
    Ok(())
}

/// Replicate a grey channel into a three-channel image
pub fn grey8_to_grey24(source: &PixelImage, target: &mut PixelImage) -> Result<()> {
    check_shapes(source, target, 1, 3)?;
    for y in 0..source.height() {
        let src_row = source.row::<u8>(y)?.to_vec();
        let dst_row = target.row_mut::<u8>(y)?;
        for (value, pixel) in src_row.iter().zip(dst_row.chunks_exact_mut(3)) {
            pixel[0] = *value;
            pixel[1] = *value;
            pixel[2] = *value;
        }
    }
    Ok(())
}

/// Expand a grey channel into YUV with neutral chroma
pub fn grey8_to_yuv24(source: &PixelImage, target: &mut PixelImage) -> Result<()> {
    check_shapes(source, target, 1, 3)?;
    for y in 0..source.height() {
        let src_row = source.row::<u8>(y)?.to_vec();
        let dst_row = target.row_mut::<u8>(y)?;
        for (value, pixel) in src_row.iter().zip(dst_row.chunks_exact_mut(3)) {
            pixel[0] = *value;
            pixel[1] = 128;
            pixel[2] = 128;
        }
    }
    Ok(())
}

/// BT.601 luma from RGB
pub fn rgb24_to_grey8(source: &PixelImage, target: &mut PixelImage) -> Result<()> {
    check_shapes(source, target, 3, 1)?;
    for y in 0..source.height() {
        let src_row = source.row::<u8>(y)?.to_vec();
        let dst_row = target.row_mut::<u8>(y)?;
        for (pixel, value) in src_row.chunks_exact(3).zip(dst_row.iter_mut()) {
            let luma =
                0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
            *value = luma.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(())
}

/// BT.601 RGB to YUV with chroma rescaled into [0,255]
pub fn rgb24_to_yuv24(source: &PixelImage, target: &mut PixelImage) -> Result<()> {
    check_shapes(source, target, 3, 3)?;
    for row in 0..source.height() {
        let src_row = source.row::<u8>(row)?.to_vec();
        let dst_row = target.row_mut::<u8>(row)?;
        for (src_pixel, dst_pixel) in src_row.chunks_exact(3).zip(dst_row.chunks_exact_mut(3)) {
            let r = src_pixel[0] as f64 / 255.0;
            let g = src_pixel[1] as f64 / 255.0;
            let b = src_pixel[2] as f64 / 255.0;
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            let u = -0.14713 * r - 0.28886 * g + 0.436 * b;
            let v = 0.615 * r - 0.51499 * g - 0.10001 * b;
            dst_pixel[0] = (y * 255.0).round().clamp(0.0, 255.0) as u8;
            dst_pixel[1] = ((u + U_RANGE) / (2.0 * U_RANGE) * 255.0)
                .round()
                .clamp(0.0, 255.0) as u8;
            dst_pixel[2] = ((v + V_RANGE) / (2.0 * V_RANGE) * 255.0)
                .round()
                .clamp(0.0, 255.0) as u8;
        }
    }
    Ok(())
}

/// Inverse BT.601 YUV to RGB
pub fn yuv24_to_rgb24(source: &PixelImage, target: &mut PixelImage) -> Result<()> {
    check_shapes(source, target, 3, 3)?;
    for row in 0..source.height() {
        let src_row = source.row::<u8>(row)?.to_vec();
        let dst_row = target.row_mut::<u8>(row)?;
        for (src_pixel, dst_pixel) in src_row.chunks_exact(3).zip(dst_row.chunks_exact_mut(3)) {
            let y = src_pixel[0] as f64 / 255.0;
            let u = src_pixel[1] as f64 / 255.0 * 2.0 * U_RANGE - U_RANGE;
            let v = src_pixel[2] as f64 / 255.0 * 2.0 * V_RANGE - V_RANGE;
            let r = y + 1.13983 * v;
            let g = y - 0.39465 * u - 0.58060 * v;
            let b = y + 2.03211 * u;
            dst_pixel[0] = (r * 255.0).round().clamp(0.0, 255.0) as u8;
            dst_pixel[1] = (g * 255.0).round().clamp(0.0, 255.0) as u8;
            dst_pixel[2] = (b * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(())
}

/// Take the luma channel of a YUV image
pub fn yuv24_to_grey8(source: &PixelImage, target: &mut PixelImage) -> Result<()> {
    check_shapes(source, target, 3, 1)?;
    pick_channel(source, target, 0)
}

/// Extract one channel of a multi-channel image into a grey image
pub fn pick_channel(source: &PixelImage, target: &mut PixelImage, channel: u32) -> Result<()> {
    if source.ty() != target.ty() {
        return Err(Error::BadType {
            expected: source.ty().name(),
            actual: target.ty().name(),
        });
    }
    if channel >= source.step() {
        return Err(Error::BadParam(format!(
            "channel {} out of range for step {}",
            channel,
            source.step()
        )));
    }
    if target.step() != 1
        || source.width() != target.width()
        || source.height() != target.height()
    {
        return Err(Error::BadSize("channel pick shape mismatch".into()));
    }
    for y in 0..source.height() {
        for x in 0..source.width() {
            let value = source
                .get_sample(x, y, channel)
                .ok_or_else(|| Error::Fatal("channel pick index".into()))?;
            target.set_sample(x, y, 0, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_image(pixels: &[[u8; 3]]) -> PixelImage {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Rgb, pixels.len() as u32, 1)
                .unwrap();
        for (x, pixel) in pixels.iter().enumerate() {
            for (channel, value) in pixel.iter().enumerate() {
                image
                    .set_sample(x as u32, 0, channel as u32, *value as f64)
                    .unwrap();
            }
        }
        image
    }

    #[test]
    fn test_grey_to_rgb_replicates() {
        let mut grey = PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 2, 1).unwrap();
        grey.set_sample(0, 0, 0, 10.0).unwrap();
        grey.set_sample(1, 0, 0, 200.0).unwrap();
        let mut rgb = PixelImage::new_continuous(PixelType::U8, PixelFormat::Rgb, 2, 1).unwrap();
        convert(&grey, &mut rgb).unwrap();
        assert_eq!(rgb.row::<u8>(0).unwrap(), &[10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn test_grey_to_yuv_neutral_chroma() {
        let mut grey = PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 1, 1).unwrap();
        grey.set_sample(0, 0, 0, 77.0).unwrap();
        let mut yuv = PixelImage::new_continuous(PixelType::U8, PixelFormat::Yuv, 1, 1).unwrap();
        convert(&grey, &mut yuv).unwrap();
        assert_eq!(yuv.row::<u8>(0).unwrap(), &[77, 128, 128]);
    }

    #[test]
    fn test_rgb_grey_weights() {
        let rgb = rgb_image(&[[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]]);
        let mut grey = PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 4, 1).unwrap();
        convert(&rgb, &mut grey).unwrap();
        assert_eq!(grey.row::<u8>(0).unwrap(), &[76, 150, 29, 255]);
    }

    #[test]
    fn test_rgb_yuv_round_trip_within_two() {
        let pixels = [
            [0, 0, 0],
            [255, 255, 255],
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [120, 200, 40],
            [13, 77, 200],
        ];
        let rgb = rgb_image(&pixels);
        let mut yuv =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Yuv, pixels.len() as u32, 1)
                .unwrap();
        convert(&rgb, &mut yuv).unwrap();
        let mut back =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Rgb, pixels.len() as u32, 1)
                .unwrap();
        convert(&yuv, &mut back).unwrap();
        for (x, pixel) in pixels.iter().enumerate() {
            for channel in 0..3 {
                let out = back.get_sample(x as u32, 0, channel as u32).unwrap();
                let diff = (out - pixel[channel] as f64).abs();
                assert!(diff <= 2.0, "channel {} of pixel {} off by {}", channel, x, diff);
            }
        }
    }

    #[test]
    fn test_unsupported_pair() {
        let rgb = rgb_image(&[[1, 2, 3]]);
        let mut hsv = PixelImage::new_continuous(PixelType::U8, PixelFormat::Hsv, 1, 1).unwrap();
        assert!(matches!(
            convert(&rgb, &mut hsv),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_pick_channel() {
        let rgb = rgb_image(&[[1, 2, 3], [4, 5, 6]]);
        let mut grey = PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 2, 1).unwrap();
        pick_channel(&rgb, &mut grey, 1).unwrap();
        assert_eq!(grey.row::<u8>(0).unwrap(), &[2, 5]);
        assert!(pick_channel(&rgb, &mut grey, 3).is_err());
    }
}

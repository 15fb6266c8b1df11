//! PNM (Portable Any Map) reading and writing
//!
//! Supports all six variants: ASCII and binary bitmaps (P1/P4), graymaps
//! (P2/P5) and pixmaps (P3/P6). Headers are whitespace-separated with
//! `#` comments allowed between fields. Maxval selects the element type:
//! up to 255 decodes as U8, up to 65535 as U16 (big-endian two-byte
//! samples in binary files), larger values as U32 in the ASCII variants.
//! Bitmaps decode to 0/1 samples where 1 is black.

use crate::error::{IoError, IoResult};
use crate::format::{PnmVariant, detect_format_from_bytes};
use cvsu_core::{PixelFormat, PixelImage, PixelType};
use std::io::{Read, Write};

struct HeaderCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

fn is_pnm_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\x0b' | b'\x0c' | b'\n' | b'\r')
}

impl<'a> HeaderCursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Skip whitespace runs and `#` comments up to the next token
    fn skip_separators(&mut self) {
        loop {
            while self.peek().is_some_and(is_pnm_space) {
                self.pos += 1;
            }
            if self.peek() == Some(b'#') {
                while let Some(byte) = self.peek() {
                    self.pos += 1;
                    if byte == b'\n' || byte == b'\r' {
                        break;
                    }
                }
            } else {
                return;
            }
        }
    }

    /// Parse the next unsigned decimal number
    fn read_number(&mut self, what: &str) -> IoResult<u32> {
        self.skip_separators();
        let start = self.pos;
        while self.peek().is_some_and(|byte| byte.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(IoError::InputError(format!("missing {} in pnm header", what)));
        }
        let text = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| IoError::InputError(format!("malformed {} in pnm header", what)))?;
        text.parse::<u32>()
            .map_err(|_| IoError::InputError(format!("{} out of range in pnm header", what)))
    }

    /// Consume the single whitespace byte separating header and payload
    fn expect_payload_separator(&mut self) -> IoResult<()> {
        match self.peek() {
            Some(byte) if is_pnm_space(byte) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(IoError::InputError(
                "missing separator before pnm payload".to_string(),
            )),
        }
    }

    /// Parse a bitmap digit, 0 or 1, possibly unseparated from the next
    fn read_bit(&mut self) -> IoResult<u32> {
        self.skip_separators();
        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                Ok(0)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(1)
            }
            _ => Err(IoError::InputError("malformed pnm bitmap digit".to_string())),
        }
    }
}

fn element_type_for(maxval: u32) -> PixelType {
    if maxval <= 255 {
        PixelType::U8
    } else if maxval <= 65535 {
        PixelType::U16
    } else {
        PixelType::U32
    }
}

/// Read a PNM image from a reader
///
/// # Errors
///
/// `UnsupportedFormat` when the magic is not P1-P6; `InputError` on a
/// malformed header or truncated payload.
pub fn read_pnm<R: Read>(reader: &mut R) -> IoResult<PixelImage> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let variant = detect_format_from_bytes(&data)?;
    let mut cursor = HeaderCursor::new(&data, 2);

    let width = cursor.read_number("width")?;
    let height = cursor.read_number("height")?;
    if width == 0 || height == 0 {
        return Err(IoError::InputError(format!(
            "degenerate pnm dimensions {}x{}",
            width, height
        )));
    }
    let maxval = if variant.has_maxval() {
        let maxval = cursor.read_number("maxval")?;
        if maxval == 0 {
            return Err(IoError::InputError("zero maxval in pnm header".to_string()));
        }
        maxval
    } else {
        1
    };

    let ty = element_type_for(maxval);
    let step = variant.channels();
    let format = match variant {
        PnmVariant::P1 | PnmVariant::P4 => PixelFormat::Mono,
        PnmVariant::P2 | PnmVariant::P5 => PixelFormat::Grey,
        PnmVariant::P3 | PnmVariant::P6 => PixelFormat::Rgb,
    };
    let mut image = PixelImage::new(ty, format, width, height, step, width * step)?;

    match variant {
        PnmVariant::P1 => {
            for y in 0..height {
                for x in 0..width {
                    let bit = cursor.read_bit()?;
                    image.set_sample(x, y, 0, bit as f64)?;
                }
            }
        }
        PnmVariant::P2 | PnmVariant::P3 => {
            let samples = width as usize * height as usize * step as usize;
            for index in 0..samples {
                let value = cursor.read_number("sample")?;
                if value > maxval {
                    return Err(IoError::InputError(format!(
                        "pnm sample {} exceeds maxval {} at position {}",
                        value, maxval, index
                    )));
                }
                image.data_mut().set(index, value as f64);
            }
        }
        PnmVariant::P4 => {
            cursor.expect_payload_separator()?;
            let row_bytes = width.div_ceil(8) as usize;
            let needed = row_bytes * height as usize;
            let payload = data
                .get(cursor.pos..cursor.pos + needed)
                .ok_or_else(|| IoError::InputError("truncated pnm bitmap payload".to_string()))?;
            for y in 0..height {
                let row_data = &payload[(y as usize) * row_bytes..];
                let row = image.row_mut::<u8>(y)?;
                for (x, sample) in row.iter_mut().enumerate() {
                    let byte = row_data[x / 8];
                    *sample = (byte >> (7 - (x % 8))) & 1;
                }
            }
        }
        PnmVariant::P5 | PnmVariant::P6 => {
            cursor.expect_payload_separator()?;
            let samples = width as usize * height as usize * step as usize;
            match ty {
                PixelType::U8 => {
                    let payload = data.get(cursor.pos..cursor.pos + samples).ok_or_else(|| {
                        IoError::InputError("truncated pnm payload".to_string())
                    })?;
                    image.samples_mut::<u8>()?.copy_from_slice(payload);
                }
                PixelType::U16 => {
                    let payload =
                        data.get(cursor.pos..cursor.pos + 2 * samples).ok_or_else(|| {
                            IoError::InputError("truncated pnm payload".to_string())
                        })?;
                    let buffer = image.samples_mut::<u16>()?;
                    for (sample, pair) in buffer.iter_mut().zip(payload.chunks_exact(2)) {
                        *sample = u16::from_be_bytes([pair[0], pair[1]]);
                    }
                }
                _ => {
                    return Err(IoError::InputError(format!(
                        "maxval {} too large for binary pnm",
                        maxval
                    )));
                }
            }
        }
    }

    Ok(image)
}

fn check_writable(image: &PixelImage, variant: PnmVariant) -> IoResult<u32> {
    let format_ok = match variant {
        PnmVariant::P1 | PnmVariant::P4 => image.format() == PixelFormat::Mono,
        PnmVariant::P2 | PnmVariant::P5 => image.format() == PixelFormat::Grey,
        PnmVariant::P3 | PnmVariant::P6 => image.format() == PixelFormat::Rgb,
    };
    if !format_ok || image.step() != variant.channels() {
        return Err(IoError::EncodeError(format!(
            "{:?} image with step {} cannot encode as {}",
            image.format(),
            image.step(),
            variant.magic()
        )));
    }
    match image.ty() {
        PixelType::U8 => Ok(255),
        PixelType::U16 if variant.has_maxval() => Ok(65535),
        other => Err(IoError::EncodeError(format!(
            "element type {} cannot encode as {}",
            other.name(),
            variant.magic()
        ))),
    }
}

/// Write an image as PNM
///
/// Mono images encode as P1/P4, grey U8/U16 as P2/P5, RGB as P3/P6.
/// U16 images serialize with maxval 65535 and big-endian samples.
pub fn write_pnm<W: Write>(
    image: &PixelImage,
    variant: PnmVariant,
    writer: &mut W,
) -> IoResult<()> {
    let maxval = check_writable(image, variant)?;
    let width = image.width();
    let height = image.height();
    let step = image.step();

    write!(writer, "{}\n# Created by cvsu\n", variant.magic())?;
    if variant.has_maxval() {
        write!(writer, "{} {}\n{}\n", width, height, maxval)?;
    } else {
        writeln!(writer, "{} {}", width, height)?;
    }

    match variant {
        PnmVariant::P1 => {
            for y in 0..height {
                let row = image.row::<u8>(y)?;
                let line: Vec<String> =
                    row.iter().map(|bit| (bit & 1).to_string()).collect();
                writeln!(writer, "{}", line.join(" "))?;
            }
        }
        PnmVariant::P2 | PnmVariant::P3 => {
            for y in 0..height {
                let line: Vec<String> = match image.ty() {
                    PixelType::U8 => {
                        image.row::<u8>(y)?.iter().map(|v| v.to_string()).collect()
                    }
                    _ => image.row::<u16>(y)?.iter().map(|v| v.to_string()).collect(),
                };
                writeln!(writer, "{}", line.join(" "))?;
            }
        }
        PnmVariant::P4 => {
            let row_bytes = width.div_ceil(8) as usize;
            for y in 0..height {
                let row = image.row::<u8>(y)?;
                let mut packed = vec![0u8; row_bytes];
                for (x, sample) in row.iter().enumerate() {
                    if sample & 1 != 0 {
                        packed[x / 8] |= 1 << (7 - (x % 8));
                    }
                }
                writer.write_all(&packed)?;
            }
        }
        PnmVariant::P5 | PnmVariant::P6 => match image.ty() {
            PixelType::U8 => {
                for y in 0..height {
                    writer.write_all(image.row::<u8>(y)?)?;
                }
            }
            _ => {
                let mut row_bytes = Vec::with_capacity((width * step * 2) as usize);
                for y in 0..height {
                    row_bytes.clear();
                    for sample in image.row::<u16>(y)? {
                        row_bytes.extend_from_slice(&sample.to_be_bytes());
                    }
                    writer.write_all(&row_bytes)?;
                }
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey_image(width: u32, height: u32) -> PixelImage {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                image
                    .set_sample(x, y, 0, ((x * 31 + y * 7) % 256) as f64)
                    .unwrap();
            }
        }
        image
    }

    fn round_trip(image: &PixelImage, variant: PnmVariant) -> PixelImage {
        let mut bytes = Vec::new();
        write_pnm(image, variant, &mut bytes).unwrap();
        read_pnm(&mut bytes.as_slice()).unwrap()
    }

    #[test]
    fn test_p5_round_trip() {
        let image = grey_image(13, 7);
        let decoded = round_trip(&image, PnmVariant::P5);
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_p2_round_trip() {
        let image = grey_image(5, 4);
        let decoded = round_trip(&image, PnmVariant::P2);
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_p6_and_p3_round_trip() {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Rgb, 6, 3).unwrap();
        for y in 0..3 {
            for x in 0..6 {
                for channel in 0..3u32 {
                    image
                        .set_sample(x, y, channel, (((x + y * 6) * 3 + channel) % 256) as f64)
                        .unwrap();
                }
            }
        }
        assert_eq!(round_trip(&image, PnmVariant::P6), image);
        assert_eq!(round_trip(&image, PnmVariant::P3), image);
    }

    #[test]
    fn test_p1_and_p4_round_trip() {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Mono, 10, 4).unwrap();
        for y in 0..4 {
            for x in 0..10 {
                image
                    .set_sample(x, y, 0, ((x + y) % 2) as f64)
                    .unwrap();
            }
        }
        assert_eq!(round_trip(&image, PnmVariant::P1), image);
        assert_eq!(round_trip(&image, PnmVariant::P4), image);
    }

    #[test]
    fn test_u16_p5_round_trip() {
        let mut image =
            PixelImage::new_continuous(PixelType::U16, PixelFormat::Grey, 4, 2).unwrap();
        for y in 0..2 {
            for x in 0..4 {
                image
                    .set_sample(x, y, 0, (1000 * (y * 4 + x) + 42) as f64)
                    .unwrap();
            }
        }
        let mut bytes = Vec::new();
        write_pnm(&image, PnmVariant::P5, &mut bytes).unwrap();
        // maxval written as 65535, not truncated to 255
        let header = String::from_utf8_lossy(&bytes[..31]).to_string();
        assert!(header.contains("65535"), "header was {:?}", header);
        let decoded = read_pnm(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_header_comments_are_skipped() {
        let data = b"P2\n# a comment\n3 # another\n2\n255\n0 1 2\n3 4 5\n";
        let image = read_pnm(&mut data.as_slice()).unwrap();
        assert_eq!(image.width(), 3);
        assert_eq!(image.height(), 2);
        assert_eq!(image.get_sample(2, 1, 0), Some(5.0));
    }

    #[test]
    fn test_written_header_carries_creator_comment() {
        let image = grey_image(4, 4);
        let mut bytes = Vec::new();
        write_pnm(&image, PnmVariant::P5, &mut bytes).unwrap();
        let text = String::from_utf8_lossy(&bytes[..32]).to_string();
        assert!(text.starts_with("P5\n# Created by cvsu\n4 4\n255\n"));
    }

    #[test]
    fn test_malformed_inputs() {
        // bad magic
        assert!(read_pnm(&mut b"Q5 1 1 255 x".as_slice()).is_err());
        // missing height
        assert!(read_pnm(&mut b"P5\n4\n".as_slice()).is_err());
        // truncated binary payload
        assert!(read_pnm(&mut b"P5\n4 4\n255\nab".as_slice()).is_err());
        // ASCII sample above maxval
        assert!(read_pnm(&mut b"P2\n1 1\n10\n11\n".as_slice()).is_err());
        // zero-sized image
        assert!(read_pnm(&mut b"P5\n0 4\n255\n".as_slice()).is_err());
    }

    #[test]
    fn test_encode_validation() {
        let grey = grey_image(4, 4);
        let mut sink = Vec::new();
        // grey data cannot encode as a pixmap
        assert!(write_pnm(&grey, PnmVariant::P6, &mut sink).is_err());
        // U16 cannot encode as a bitmap
        let deep =
            PixelImage::new_continuous(PixelType::U16, PixelFormat::Mono, 4, 4).unwrap();
        assert!(write_pnm(&deep, PnmVariant::P4, &mut sink).is_err());
    }
}

//! TIFF decoding into raw samples ready for a Flate image XObject.

use super::jpeg::ImageColorSpace;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use ::tiff::decoder::ifd::Value;
use ::tiff::decoder::{Decoder, DecodingResult};
use ::tiff::tags::Tag;
use ::tiff::ColorType;
use std::io::Cursor;

/// Dimensions and resolution of one TIFF directory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiffInfo {
    pub width: u32,
    pub height: u32,
    /// Horizontal and vertical dots per inch, if the file records them
    pub dpi: Option<(f64, f64)>,
}

impl TiffInfo {
    pub fn size_in_points(&self) -> (f64, f64) {
        let (width, height) = (f64::from(self.width), f64::from(self.height));
        match self.dpi {
            Some((x_dpi, y_dpi)) if x_dpi > 0.0 && y_dpi > 0.0 => {
                (width * 72.0 / x_dpi, height * 72.0 / y_dpi)
            }
            _ => (width, height),
        }
    }
}

/// Samples of one TIFF directory, 8 bits per component (or packed 1-bit).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: ImageColorSpace,
    pub bits_per_component: u8,
    pub samples: Vec<u8>,
    /// 8-bit alpha plane, emitted as an `/SMask`
    pub alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    /// Image XObject dictionary (without `/SMask`, which needs an id).
    pub fn xobject_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XObject"));
        dict.set("Subtype", Object::name("Image"));
        dict.set("Width", self.width);
        dict.set("Height", self.height);
        dict.set("ColorSpace", Object::name(self.color_space.pdf_name()));
        dict.set("BitsPerComponent", i64::from(self.bits_per_component));
        dict
    }

    /// Soft mask dictionary for the alpha plane
    pub fn smask_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XObject"));
        dict.set("Subtype", Object::name("Image"));
        dict.set("Width", self.width);
        dict.set("Height", self.height);
        dict.set("ColorSpace", Object::name("DeviceGray"));
        dict.set("BitsPerComponent", 8);
        dict
    }
}

fn decode_error(err: ::tiff::TiffError) -> PdfError {
    PdfError::DecodeError(format!("TIFF: {err}"))
}

fn open(data: &[u8]) -> Result<Decoder<Cursor<&[u8]>>> {
    Decoder::new(Cursor::new(data)).map_err(decode_error)
}

/// Number of images (directories) in the file
pub fn page_count(data: &[u8]) -> Result<usize> {
    let mut decoder = open(data)?;
    let mut count = 1;
    while decoder.more_images() {
        decoder.next_image().map_err(decode_error)?;
        count += 1;
    }
    Ok(count)
}

/// Decoder positioned on directory `index`
fn seek_to(data: &[u8], index: usize) -> Result<Decoder<Cursor<&[u8]>>> {
    let mut decoder = open(data)?;
    for current in 0..index {
        if !decoder.more_images() {
            return Err(PdfError::PageIndexOutOfRange {
                index,
                count: current + 1,
            });
        }
        decoder.next_image().map_err(decode_error)?;
    }
    Ok(decoder)
}

fn value_as_f64(value: Value) -> Option<f64> {
    match value {
        Value::Rational(n, d) if d != 0 => Some(f64::from(n) / f64::from(d)),
        Value::Short(v) => Some(f64::from(v)),
        Value::Unsigned(v) => Some(f64::from(v)),
        Value::Float(v) => Some(f64::from(v)),
        Value::Double(v) => Some(v),
        Value::List(mut values) if !values.is_empty() => value_as_f64(values.remove(0)),
        _ => None,
    }
}

fn resolution(decoder: &mut Decoder<Cursor<&[u8]>>) -> Result<Option<(f64, f64)>> {
    let x = decoder
        .find_tag(Tag::XResolution)
        .map_err(decode_error)?
        .and_then(value_as_f64);
    let y = decoder
        .find_tag(Tag::YResolution)
        .map_err(decode_error)?
        .and_then(value_as_f64);
    // Absent unit means inch
    let unit = decoder
        .find_tag(Tag::ResolutionUnit)
        .map_err(decode_error)?
        .and_then(value_as_f64)
        .unwrap_or(2.0);

    let scale = match unit as u32 {
        2 => 1.0,
        3 => 2.54,
        _ => return Ok(None),
    };
    Ok(match (x, y) {
        (Some(x), Some(y)) => Some((x * scale, y * scale)),
        (Some(x), None) => Some((x * scale, x * scale)),
        _ => None,
    })
}

/// Dimensions and resolution of directory `index`
pub fn info(data: &[u8], index: usize) -> Result<TiffInfo> {
    let mut decoder = seek_to(data, index)?;
    let (width, height) = decoder.dimensions().map_err(decode_error)?;
    let dpi = resolution(&mut decoder)?;
    Ok(TiffInfo { width, height, dpi })
}

/// Decode directory `index` to PDF-ready samples.
pub fn decode(data: &[u8], index: usize) -> Result<DecodedImage> {
    let mut decoder = seek_to(data, index)?;
    let (width, height) = decoder.dimensions().map_err(decode_error)?;
    let color_type = decoder.colortype().map_err(decode_error)?;
    let result = decoder.read_image().map_err(decode_error)?;

    let (color_space, channels, has_alpha, bits) = match color_type {
        ColorType::Gray(bits) => (ImageColorSpace::DeviceGray, 1, false, bits),
        ColorType::GrayA(bits) => (ImageColorSpace::DeviceGray, 2, true, bits),
        ColorType::RGB(bits) => (ImageColorSpace::DeviceRGB, 3, false, bits),
        ColorType::RGBA(bits) => (ImageColorSpace::DeviceRGB, 4, true, bits),
        ColorType::CMYK(bits) => (ImageColorSpace::DeviceCMYK, 4, false, bits),
        other => {
            return Err(PdfError::DecodeError(format!(
                "TIFF color type {other:?} is not supported"
            )))
        }
    };

    if bits == 1 {
        return match (color_space, result) {
            (ImageColorSpace::DeviceGray, DecodingResult::U8(packed)) => Ok(DecodedImage {
                width,
                height,
                color_space,
                bits_per_component: 1,
                samples: packed,
                alpha: None,
            }),
            _ => Err(PdfError::DecodeError(
                "1-bit TIFF data must be single-channel".to_string(),
            )),
        };
    }

    let samples: Vec<u8> = match result {
        DecodingResult::U8(samples) => samples,
        // Keep the high byte
        DecodingResult::U16(samples) => samples.into_iter().map(|s| (s >> 8) as u8).collect(),
        _ => {
            return Err(PdfError::DecodeError(
                "TIFF sample format is not supported".to_string(),
            ))
        }
    };

    let pixels = width as usize * height as usize;
    if samples.len() < pixels * channels {
        return Err(PdfError::DecodeError("TIFF image data is truncated".to_string()));
    }

    let (samples, alpha) = if has_alpha {
        let color_channels = channels - 1;
        let mut color = Vec::with_capacity(pixels * color_channels);
        let mut alpha = Vec::with_capacity(pixels);
        for pixel in samples.chunks_exact(channels).take(pixels) {
            color.extend_from_slice(&pixel[..color_channels]);
            alpha.push(pixel[color_channels]);
        }
        (color, Some(alpha))
    } else {
        (samples, None)
    };

    tracing::debug!(width, height, ?color_space, alpha = alpha.is_some(), "decoded TIFF");
    Ok(DecodedImage {
        width,
        height,
        color_space,
        bits_per_component: 8,
        samples,
        alpha,
    })
}

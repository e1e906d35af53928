//! JPEG header parsing for pass-through embedding.
//!
//! JPEG data is never decoded; the bytes go into a `/DCTDecode` image as
//! they are. Only the frame header and the JFIF/Adobe application segments
//! are read.

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};

/// Color spaces for images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageColorSpace {
    DeviceGray,
    DeviceRGB,
    DeviceCMYK,
}

impl ImageColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ImageColorSpace::DeviceGray => "DeviceGray",
            ImageColorSpace::DeviceRGB => "DeviceRGB",
            ImageColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }

    pub fn components(&self) -> usize {
        match self {
            ImageColorSpace::DeviceGray => 1,
            ImageColorSpace::DeviceRGB => 3,
            ImageColorSpace::DeviceCMYK => 4,
        }
    }
}

/// Pixel density from a JFIF APP0 segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JpegDensity {
    /// Dots per inch
    PerInch(f64, f64),
    /// Dots per centimetre
    PerCm(f64, f64),
}

impl JpegDensity {
    /// Density converted to dots per inch
    pub fn dpi(&self) -> (f64, f64) {
        match *self {
            JpegDensity::PerInch(x, y) => (x, y),
            JpegDensity::PerCm(x, y) => (x * 2.54, y * 2.54),
        }
    }
}

/// What the frame header and application segments say about an image
#[derive(Debug, Clone, PartialEq)]
pub struct JpegInfo {
    pub width: u32,
    pub height: u32,
    pub color_space: ImageColorSpace,
    pub bits_per_component: u8,
    pub density: Option<JpegDensity>,
    /// Adobe APP14 present; such CMYK data is stored inverted
    pub adobe: bool,
}

impl JpegInfo {
    /// Size in points: pixels scaled by the density, or 1 px = 1 pt
    pub fn size_in_points(&self) -> (f64, f64) {
        let (width, height) = (f64::from(self.width), f64::from(self.height));
        match self.density.map(|density| density.dpi()) {
            Some((x_dpi, y_dpi)) if x_dpi > 0.0 && y_dpi > 0.0 => {
                (width * 72.0 / x_dpi, height * 72.0 / y_dpi)
            }
            _ => (width, height),
        }
    }

    /// Image XObject dictionary for the raw JPEG bytes
    pub fn xobject_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XObject"));
        dict.set("Subtype", Object::name("Image"));
        dict.set("Width", self.width);
        dict.set("Height", self.height);
        dict.set("ColorSpace", Object::name(self.color_space.pdf_name()));
        dict.set("BitsPerComponent", i64::from(self.bits_per_component));
        if self.adobe && self.color_space == ImageColorSpace::DeviceCMYK {
            dict.set(
                "Decode",
                Object::Array([1, 0, 1, 0, 1, 0, 1, 0].map(Object::from).to_vec()),
            );
        }
        dict.set("Filter", Object::name("DCTDecode"));
        dict
    }
}

fn truncated() -> PdfError {
    PdfError::DecodeError("Truncated JPEG file".to_string())
}

fn read_u16(data: &[u8], pos: usize) -> Result<u16> {
    match data.get(pos..pos + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(truncated()),
    }
}

/// Parse JPEG header to extract image information
pub fn parse_jpeg_header(data: &[u8]) -> Result<JpegInfo> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(PdfError::DecodeError("Not a valid JPEG file".to_string()));
    }

    let mut pos = 2;
    let mut density = None;
    let mut adobe = false;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return Err(PdfError::DecodeError("Invalid JPEG marker".to_string()));
        }

        let marker = data[pos + 1];
        pos += 2;

        match marker {
            // Fill bytes
            0xFF => {
                pos -= 1;
                continue;
            }
            // Markers without a length field
            0xD8 | 0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => break,
            // SOF markers (DHT, JPG and DAC share the range)
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let precision = *data.get(pos + 2).ok_or_else(truncated)?;
                let height = read_u16(data, pos + 3)?;
                let width = read_u16(data, pos + 5)?;
                let components = *data.get(pos + 7).ok_or_else(truncated)?;

                if width == 0 || height == 0 {
                    return Err(PdfError::DecodeError(
                        "Could not find image dimensions".to_string(),
                    ));
                }
                let color_space = match components {
                    1 => ImageColorSpace::DeviceGray,
                    3 => ImageColorSpace::DeviceRGB,
                    4 => ImageColorSpace::DeviceCMYK,
                    _ => {
                        return Err(PdfError::DecodeError(format!(
                            "Unsupported number of components: {components}"
                        )))
                    }
                };

                return Ok(JpegInfo {
                    width: u32::from(width),
                    height: u32::from(height),
                    color_space,
                    bits_per_component: precision,
                    density,
                    adobe,
                });
            }
            _ => {
                let length = usize::from(read_u16(data, pos)?);
                if length < 2 {
                    return Err(PdfError::DecodeError("Invalid JPEG segment length".to_string()));
                }
                let segment = data.get(pos + 2..pos + length).ok_or_else(truncated)?;
                match marker {
                    0xE0 => density = density.or(parse_jfif_density(segment)),
                    0xEE if segment.starts_with(b"Adobe") => adobe = true,
                    _ => {}
                }
                pos += length;
            }
        }
    }

    Err(PdfError::DecodeError(
        "Could not find image dimensions".to_string(),
    ))
}

/// `JFIF\0` version(2) units(1) xdensity(2) ydensity(2)
fn parse_jfif_density(segment: &[u8]) -> Option<JpegDensity> {
    if !segment.starts_with(b"JFIF\0") || segment.len() < 12 {
        return None;
    }
    let units = segment[7];
    let x = f64::from(u16::from_be_bytes([segment[8], segment[9]]));
    let y = f64::from(u16::from_be_bytes([segment[10], segment[11]]));
    if x == 0.0 || y == 0.0 {
        return None;
    }
    match units {
        1 => Some(JpegDensity::PerInch(x, y)),
        2 => Some(JpegDensity::PerCm(x, y)),
        // Aspect ratio only
        _ => None,
    }
}

//! Content-based type detection and measurement.

use super::{ImageDimensions, ImageType};
use crate::error::{PdfError, Result};
use crate::graphics::{jpeg, tiff_image};
use crate::parser::{ParseError, PdfReader};

/// How far into a file the `%PDF-` marker may appear
const PDF_HEADER_WINDOW: usize = 1024;

/// Detect the image type from leading bytes.
pub fn sniff(data: &[u8]) -> ImageType {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageType::Jpeg
    } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        ImageType::Tiff
    } else if data[..data.len().min(PDF_HEADER_WINDOW)]
        .windows(5)
        .any(|window| window == b"%PDF-")
    {
        ImageType::Pdf
    } else {
        ImageType::Undefined
    }
}

pub(crate) fn pdf_decode_error(err: ParseError) -> PdfError {
    PdfError::DecodeError(format!("PDF: {err}"))
}

/// Size in points of image `index` of `data`.
///
/// `Undefined` measures as [`ImageDimensions::UNKNOWN`]. Indices past the
/// last page or directory are `PageIndexOutOfRange`.
pub fn measure(data: &[u8], image_type: ImageType, index: u32) -> Result<ImageDimensions> {
    let index = index as usize;
    match image_type {
        ImageType::Undefined => Ok(ImageDimensions::UNKNOWN),
        ImageType::Jpeg => {
            // JPEG has a single frame
            if index > 0 {
                return Err(PdfError::PageIndexOutOfRange { index, count: 1 });
            }
            let (width, height) = jpeg::parse_jpeg_header(data)?.size_in_points();
            Ok(ImageDimensions::new(width, height))
        }
        ImageType::Tiff => {
            let (width, height) = tiff_image::info(data, index)?.size_in_points();
            Ok(ImageDimensions::new(width, height))
        }
        ImageType::Pdf => {
            let mut reader = PdfReader::from_bytes(data.to_vec()).map_err(pdf_decode_error)?;
            let count = reader.page_count().map_err(pdf_decode_error)?;
            match reader.page(index).map_err(pdf_decode_error)? {
                Some(page) => Ok(ImageDimensions::new(page.width(), page.height())),
                None => Err(PdfError::PageIndexOutOfRange { index, count }),
            }
        }
    }
}

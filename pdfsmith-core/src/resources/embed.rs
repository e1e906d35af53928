//! Writing an image as a form XObject for a reserved id.

use super::detect::pdf_decode_error;
use super::{ImageDimensions, ImageType};
use crate::error::{PdfError, Result};
use crate::graphics::{jpeg, tiff_image};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::operations::{pages, ObjectCopier};
use crate::parser::PdfReader;
use crate::writer::{format_number, ObjectWriter};

/// Resource name of the image inside its wrapping form
const INNER_IMAGE_NAME: &str = "Im0";

/// Embed image `index` of `data` as the form XObject `form_id`.
///
/// The form's bounding box is the image size in points, so drawing it with
/// an identity matrix places the image at its natural size.
pub(crate) fn write_image_form(
    writer: &mut ObjectWriter,
    data: &[u8],
    image_type: ImageType,
    index: u32,
    form_id: ObjectId,
    compress: bool,
) -> Result<ImageDimensions> {
    match image_type {
        ImageType::Undefined => Err(PdfError::UnsupportedImageFormat(format!(
            "object {form_id}"
        ))),
        ImageType::Jpeg => {
            let info = jpeg::parse_jpeg_header(data)?;
            let image_id = writer.allocate();
            // DCT data is written as is
            writer.write_stream(image_id, info.xobject_dictionary(), data.to_vec(), false)?;

            let (width, height) = info.size_in_points();
            write_wrapping_form(writer, form_id, image_id, width, height, compress)?;
            Ok(ImageDimensions::new(width, height))
        }
        ImageType::Tiff => {
            let index = index as usize;
            let (width, height) = tiff_image::info(data, index)?.size_in_points();
            let decoded = tiff_image::decode(data, index)?;

            let mut image_dict = decoded.xobject_dictionary();
            if let Some(alpha) = &decoded.alpha {
                let smask_id = writer.allocate();
                writer.write_stream(smask_id, decoded.smask_dictionary(), alpha.clone(), compress)?;
                image_dict.set("SMask", smask_id);
            }
            let image_id = writer.allocate();
            writer.write_stream(image_id, image_dict, decoded.samples, compress)?;

            write_wrapping_form(writer, form_id, image_id, width, height, compress)?;
            Ok(ImageDimensions::new(width, height))
        }
        ImageType::Pdf => {
            let mut reader = PdfReader::from_bytes(data.to_vec()).map_err(pdf_decode_error)?;
            let count = reader.page_count().map_err(pdf_decode_error)?;
            let page = reader
                .page(index as usize)
                .map_err(pdf_decode_error)?
                .ok_or(PdfError::PageIndexOutOfRange {
                    index: index as usize,
                    count,
                })?;

            let mut copier = ObjectCopier::new(compress);
            pages::write_page_as_form(&mut reader, writer, &mut copier, &page, form_id, compress)
                .map_err(|err| match err {
                    PdfError::Parse(e) => pdf_decode_error(e),
                    other => other,
                })?;
            Ok(ImageDimensions::new(page.width(), page.height()))
        }
    }
}

/// Form of size `width` x `height` points that paints `image_id` over its
/// whole box.
fn write_wrapping_form(
    writer: &mut ObjectWriter,
    form_id: ObjectId,
    image_id: ObjectId,
    width: f64,
    height: f64,
    compress: bool,
) -> Result<()> {
    let mut xobjects = Dictionary::new();
    xobjects.set(INNER_IMAGE_NAME, image_id);
    let mut resources = Dictionary::new();
    resources.set("XObject", xobjects);

    let mut dict = Dictionary::new();
    dict.set("Type", Object::name("XObject"));
    dict.set("Subtype", Object::name("Form"));
    dict.set("FormType", 1);
    dict.set(
        "BBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width),
            Object::Real(height),
        ]),
    );
    dict.set("Resources", resources);

    let content = format!(
        "q\n{} 0 0 {} 0 0 cm\n/{INNER_IMAGE_NAME} Do\nQ\n",
        format_number(width),
        format_number(height)
    );
    writer.write_stream(form_id, dict, content.into_bytes(), compress)
}

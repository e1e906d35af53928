//! Page-level copy helpers: a source page as a new page, or as a form.

use super::ObjectCopier;
use crate::error::Result;
use crate::geometry::Rectangle;
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::{ParsedPage, PdfReader};
use crate::writer::ObjectWriter;

/// Page keys that are not carried over: the tree link, annotations and
/// logical structure hooks.
const DROPPED_PAGE_KEYS: [&str; 6] = ["Parent", "Annots", "B", "StructParents", "Tabs", "Metadata"];

/// Write `page` as a new page object under `parent`. Inherited attributes
/// are already flattened into [`ParsedPage::dict`].
pub(crate) fn copy_page(
    reader: &mut PdfReader,
    writer: &mut ObjectWriter,
    copier: &mut ObjectCopier,
    page: &ParsedPage,
    parent: ObjectId,
) -> Result<ObjectId> {
    let copied = copier.copy_dictionary(reader, writer, &page.dict, &DROPPED_PAGE_KEYS)?;

    let mut dict = Dictionary::with_capacity(copied.len() + 2);
    dict.set("Type", Object::name("Page"));
    dict.set("Parent", parent);
    dict.set("MediaBox", page.media_box.to_object());
    for (key, value) in copied.iter() {
        if !matches!(key.as_str(), "Type" | "MediaBox") {
            dict.set(key.clone(), value.clone());
        }
    }

    let id = writer.allocate();
    writer.write_object(id, &Object::Dictionary(dict))?;
    tracing::debug!(source = %page.id, %id, "copied page");
    Ok(id)
}

/// Translation moving the lower-left corner of `media_box` to the origin
pub(crate) fn origin_matrix(media_box: &Rectangle) -> Option<Object> {
    let (x, y) = (media_box.lower_left.x, media_box.lower_left.y);
    if x == 0.0 && y == 0.0 {
        return None;
    }
    Some(Object::Array(vec![
        Object::Integer(1),
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(1),
        Object::Real(-x),
        Object::Real(-y),
    ]))
}

/// Write `page` as a form XObject with id `form_id`: the page content,
/// decoded and concatenated, with the page's resources copied.
pub(crate) fn write_page_as_form(
    reader: &mut PdfReader,
    writer: &mut ObjectWriter,
    copier: &mut ObjectCopier,
    page: &ParsedPage,
    form_id: ObjectId,
    compress: bool,
) -> Result<()> {
    let content = reader.page_contents(page)?;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::name("XObject"));
    dict.set("Subtype", Object::name("Form"));
    dict.set("FormType", 1);
    dict.set("BBox", page.media_box.to_object());
    if let Some(matrix) = origin_matrix(&page.media_box) {
        dict.set("Matrix", matrix);
    }
    if let Some(resources) = page.resources() {
        dict.set("Resources", copier.copy(reader, writer, resources)?);
    }

    writer.write_stream(form_id, dict, content, compress)?;
    tracing::debug!(source = %page.id, %form_id, "wrote page as form");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::io::{OutputTarget, Sink};

    fn one_page_pdf(media_box: &str) -> Vec<u8> {
        let content = "0 0 m 10 10 l S";
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox {media_box} >>"),
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Annots [] /Resources << /ProcSet [/PDF] >> >>".to_string(),
            format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
        ];
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref = pdf.len();
        pdf.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
        for offset in offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(
            format!("trailer\n<< /Size 5 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n").as_bytes(),
        );
        pdf
    }

    fn writer() -> ObjectWriter {
        ObjectWriter::new(Sink::create(OutputTarget::memory()).unwrap(), 20)
    }

    #[test]
    fn test_copy_page_flattens_and_drops() {
        let mut reader = PdfReader::from_bytes(one_page_pdf("[0 0 200 300]")).unwrap();
        let page = reader.page(0).unwrap().unwrap();
        let mut writer = writer();
        let mut copier = ObjectCopier::new(false);

        let id = copy_page(&mut reader, &mut writer, &mut copier, &page, ObjectId::new(1, 0)).unwrap();
        let text = String::from_utf8_lossy(&writer.finish().unwrap().into_bytes().unwrap()).into_owned();

        assert!(text.contains(&format!("{} 0 obj\n<<\n/Type /Page\n/Parent 1 0 R\n/MediaBox [0 0 200 300]", id.number())));
        assert!(!text.contains("/Annots"));
        assert!(text.contains("0 0 m 10 10 l S"));
    }

    #[test]
    fn test_page_as_form() {
        let mut reader = PdfReader::from_bytes(one_page_pdf("[10 20 110 220]")).unwrap();
        let page = reader.page(0).unwrap().unwrap();
        let mut writer = writer();
        let mut copier = ObjectCopier::new(false);
        let form_id = writer.allocate();

        write_page_as_form(&mut reader, &mut writer, &mut copier, &page, form_id, false).unwrap();
        let text = String::from_utf8_lossy(&writer.finish().unwrap().into_bytes().unwrap()).into_owned();
        assert!(text.contains("/Subtype /Form"));
        assert!(text.contains("/BBox [10 20 110 220]"));
        assert!(text.contains("/Matrix [1 0 0 1 -10 -20]"));
        assert!(text.contains("/Resources <<\n/ProcSet [/PDF]\n>>"));
        assert!(text.contains("stream\n0 0 m 10 10 l S\nendstream"));
    }

    #[test]
    fn test_origin_matrix() {
        assert_eq!(origin_matrix(&Rectangle::letter()), None);
        let shifted = Rectangle::new(Point::new(5.0, 0.0), Point::new(10.0, 10.0));
        assert!(origin_matrix(&shifted).is_some());
    }
}

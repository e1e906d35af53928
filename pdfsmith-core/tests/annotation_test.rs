//! Link annotations and annotation references

mod common;

use common::{finish, start_memory};
use pdfsmith::{
    DocumentDriver, InputSource, LogConfig, Object, ObjectId, OutputTarget, PdfError, PdfReader,
    Rectangle,
};
use pretty_assertions::assert_eq;

fn link_area() -> Rectangle {
    Rectangle::from_position_and_size(72.0, 700.0, 200.0, 20.0)
}

/// Annotation ids listed by page `index`
fn annots(reader: &mut PdfReader, index: usize) -> Vec<ObjectId> {
    let page = reader.page(index).unwrap().unwrap();
    match page.dict.get("Annots") {
        Some(Object::Array(items)) => items.iter().filter_map(Object::as_reference).collect(),
        _ => Vec::new(),
    }
}

fn link_uri(reader: &mut PdfReader, id: ObjectId) -> Vec<u8> {
    let annot = reader.get_object(id).unwrap();
    let dict = annot.as_dict().unwrap();
    assert_eq!(dict.get_name("Subtype"), Some("Link"));
    let action = dict.get_dict("A").unwrap();
    assert_eq!(action.get_name("S"), Some("URI"));
    action.get("URI").and_then(Object::as_string).unwrap().to_vec()
}

#[test]
fn test_link_listed_on_page() {
    let mut driver = start_memory();
    let page = driver.create_page(Rectangle::a4()).unwrap();
    let first = driver
        .attach_url_link_to_page(page, "https://example.com/", link_area())
        .unwrap();
    let second = driver
        .attach_url_link_to_page(page, "mailto:someone@example.com", link_area())
        .unwrap();
    driver.write_page(page).unwrap();

    let mut reader = PdfReader::from_bytes(finish(driver)).unwrap();
    assert_eq!(annots(&mut reader, 0), vec![first, second]);
    assert_eq!(link_uri(&mut reader, first), b"https://example.com/");
    let annot = reader.get_object(first).unwrap();
    let rect = annot.as_dict().and_then(|d| d.get("Rect")).cloned().unwrap();
    assert_eq!(Rectangle::from_object(&rect), Some(link_area()));
}

#[test]
fn test_pending_reference_goes_to_next_written_page_only() {
    let mut driver = start_memory();
    let early = driver.create_page(Rectangle::a4()).unwrap();
    let own = driver
        .attach_url_link_to_page(early, "https://example.com/own", link_area())
        .unwrap();
    let pending = driver
        .attach_url_link_to_current_page("https://example.com/next", link_area())
        .unwrap();
    driver.write_page(early).unwrap();

    let later = driver.create_page(Rectangle::a4()).unwrap();
    driver.write_page(later).unwrap();

    let mut reader = PdfReader::from_bytes(finish(driver)).unwrap();
    assert_eq!(annots(&mut reader, 0), vec![own, pending]);
    assert!(annots(&mut reader, 1).is_empty());
}

#[test]
fn test_register_copied_annotation() {
    // A source document with one link
    let mut source = start_memory();
    let page = source.create_page(Rectangle::letter()).unwrap();
    let link = source
        .attach_url_link_to_page(page, "https://example.org/", link_area())
        .unwrap();
    source.write_page(page).unwrap();
    let source = finish(source);

    let mut driver = start_memory();
    let context = driver
        .create_pdf_copying_context(InputSource::bytes(source))
        .unwrap();
    let copied = driver.copy_object_from_copying_context(context, link).unwrap();
    driver
        .register_annotation_reference_for_next_page_write(copied)
        .unwrap();
    let page = driver.create_page(Rectangle::letter()).unwrap();
    driver.write_page(page).unwrap();

    let mut reader = PdfReader::from_bytes(finish(driver)).unwrap();
    assert_eq!(annots(&mut reader, 0), vec![copied]);
    assert_eq!(link_uri(&mut reader, copied), b"https://example.org/");
}

#[test]
fn test_links_survive_suspend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("links.pdf");
    let state = dir.path().join("links.state.json");

    let mut driver = DocumentDriver::new();
    driver
        .start_pdf(
            OutputTarget::file(&path),
            pdfsmith::PdfVersion::V1_7,
            LogConfig::disabled(),
            pdfsmith::CreationSettings::uncompressed(),
        )
        .unwrap();
    let page = driver.create_page(Rectangle::a4()).unwrap();
    let attached = driver
        .attach_url_link_to_page(page, "https://example.com/a", link_area())
        .unwrap();
    let pending = driver
        .attach_url_link_to_current_page("https://example.com/b", link_area())
        .unwrap();
    driver.suspend(&state).unwrap();

    let mut driver = DocumentDriver::new();
    driver
        .continue_pdf(OutputTarget::file(&path), &state, None, LogConfig::disabled())
        .unwrap();
    driver.write_page(page).unwrap();
    driver.end().unwrap();

    let mut reader = PdfReader::open(&path).unwrap();
    assert_eq!(annots(&mut reader, 0), vec![attached, pending]);
    assert_eq!(link_uri(&mut reader, pending), b"https://example.com/b");
}

#[test]
fn test_link_errors_do_not_poison() {
    let mut driver = start_memory();
    let page = driver.create_page(Rectangle::a4()).unwrap();
    let position = driver.output_position();

    assert!(matches!(
        driver.attach_url_link_to_page(page, "", link_area()),
        Err(PdfError::InvalidArgument(_))
    ));
    assert!(matches!(
        driver.attach_url_link_to_current_page("https://example.com/\u{263a}", link_area()),
        Err(PdfError::InvalidArgument(_))
    ));
    assert!(matches!(
        driver.register_annotation_reference_for_next_page_write(ObjectId::new(500, 0)),
        Err(PdfError::InvalidArgument(_))
    ));
    assert_eq!(driver.output_position(), position);

    driver.write_page(page).unwrap();
    assert!(matches!(
        driver.attach_url_link_to_page(page, "https://example.com/", link_area()),
        Err(PdfError::HandleClosed(0))
    ));
    assert!(!driver.is_poisoned());
}

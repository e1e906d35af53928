//! Incremental updates of existing documents

mod common;

use common::{pdf_with_pages, start_memory};
use pdfsmith::{
    CreationSettings, DocumentDriver, DocumentMetadata, Font, InputSource, LogConfig, Object,
    ObjectId, OutputTarget, PageRange, PdfError, PdfReader, PdfVersion, Rectangle,
};
use pretty_assertions::assert_eq;
use std::path::Path;

fn modify(driver: &mut DocumentDriver, source: &Path, destination: Option<&Path>) {
    driver
        .modify_pdf(
            InputSource::file(source),
            PdfVersion::V1_7,
            destination.map(OutputTarget::file),
            LogConfig::disabled(),
            CreationSettings::uncompressed(),
        )
        .unwrap();
}

fn add_text_page(driver: &mut DocumentDriver, text: &str) -> pdfsmith::ObjectId {
    let page = driver.create_page(Rectangle::letter()).unwrap();
    let handle = driver.start_page_content_context(page).unwrap();
    driver
        .content(handle)
        .unwrap()
        .text_at(Font::Courier, 10.0, 36.0, 36.0, text)
        .unwrap();
    driver.write_page(page).unwrap()
}

#[test]
fn test_update_to_destination_keeps_original_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.pdf");
    let destination = dir.path().join("updated.pdf");
    let original = pdf_with_pages(&[(595.0, 842.0), (595.0, 842.0)]);
    std::fs::write(&source, &original).unwrap();
    let original_reader = PdfReader::from_bytes(original.clone()).unwrap();
    let max_number = original_reader.max_object_number();

    let mut driver = DocumentDriver::new();
    modify(&mut driver, &source, Some(&destination));
    assert_eq!(driver.modified_source_page_count(), Some(2));
    assert_eq!(driver.next_object_number(), Some(max_number + 1));
    let new_page = add_text_page(&mut driver, "appendix");
    driver.end().unwrap();

    assert_eq!(std::fs::read(&source).unwrap(), original);
    let updated = std::fs::read(&destination).unwrap();
    assert_eq!(&updated[..original.len()], &original[..]);
    assert!(new_page.number() > max_number);

    let mut reader = PdfReader::from_bytes(updated).unwrap();
    assert_eq!(reader.xref().sections(), 2);
    assert_eq!(
        reader.trailer().get_integer("Prev"),
        Some(original_reader.startxref() as i64)
    );
    assert_eq!(reader.page_count().unwrap(), 3);
    let last = reader.page(2).unwrap().unwrap();
    assert_eq!(last.id, new_page);
    let contents = reader.page_contents(&last).unwrap();
    assert!(common::contains(&contents, b"(appendix) Tj"));

    // Original pages still resolve to the original objects
    let first = reader.page(0).unwrap().unwrap();
    assert!(first.id.number() <= max_number);
}

#[test]
fn test_update_in_place_appends() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.pdf");
    let original = pdf_with_pages(&[(300.0, 300.0)]);
    std::fs::write(&source, &original).unwrap();

    let mut driver = DocumentDriver::new();
    modify(&mut driver, &source, None);
    add_text_page(&mut driver, "second");
    driver.end().unwrap();

    let updated = std::fs::read(&source).unwrap();
    assert!(updated.len() > original.len());
    assert_eq!(&updated[..original.len()], &original[..]);
    let mut reader = PdfReader::from_bytes(updated).unwrap();
    assert_eq!(reader.page_count().unwrap(), 2);
}

#[test]
fn test_in_place_needs_file_source() {
    let mut driver = DocumentDriver::new();
    let result = driver.modify_pdf(
        InputSource::bytes(pdf_with_pages(&[(100.0, 100.0)])),
        PdfVersion::V1_7,
        None,
        LogConfig::disabled(),
        CreationSettings::default(),
    );
    assert!(matches!(result, Err(PdfError::InvalidArgument(_))));
}

#[test]
fn test_unreadable_source_is_unsupported() {
    let mut driver = DocumentDriver::new();
    let result = driver.modify_pdf(
        InputSource::bytes(b"this is not a PDF".to_vec()),
        PdfVersion::V1_7,
        Some(OutputTarget::memory()),
        LogConfig::disabled(),
        CreationSettings::default(),
    );
    assert!(matches!(result, Err(PdfError::UnsupportedSource(_))));
}

#[test]
fn test_version_raised_and_metadata_merged() {
    let mut driver = DocumentDriver::new();
    driver
        .start_pdf(
            OutputTarget::memory(),
            PdfVersion::V1_4,
            LogConfig::disabled(),
            CreationSettings::uncompressed()
                .with_metadata(DocumentMetadata::default().with_author("Original author")),
        )
        .unwrap();
    let page = driver.create_page(Rectangle::a4()).unwrap();
    driver.write_page(page).unwrap();
    let source = driver.end().unwrap().into_bytes().unwrap();

    let mut driver = DocumentDriver::new();
    driver
        .modify_pdf(
            InputSource::bytes(source),
            PdfVersion::V2_0,
            Some(OutputTarget::memory()),
            LogConfig::disabled(),
            CreationSettings::uncompressed()
                .with_metadata(DocumentMetadata::default().with_title("Revised")),
        )
        .unwrap();
    let bytes = driver.end().unwrap().into_bytes().unwrap();

    let mut reader = PdfReader::from_bytes(bytes).unwrap();
    assert_eq!(reader.version(), PdfVersion::V1_4);
    let catalog = reader.catalog().unwrap();
    assert_eq!(catalog.get_name("Version"), Some("2.0"));
    let info = reader.info().unwrap().unwrap();
    assert_eq!(
        info.get("Title").and_then(Object::as_string),
        Some(&b"Revised"[..])
    );
    assert_eq!(
        info.get("Author").and_then(Object::as_string),
        Some(&b"Original author"[..])
    );
    assert_eq!(reader.page_count().unwrap(), 1);
}

#[test]
fn test_suspended_update_continues_with_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.pdf");
    let destination = dir.path().join("updated.pdf");
    let state = dir.path().join("update.state.json");
    std::fs::write(&source, pdf_with_pages(&[(200.0, 200.0), (200.0, 200.0)])).unwrap();

    let mut driver = DocumentDriver::new();
    modify(&mut driver, &source, Some(&destination));
    add_text_page(&mut driver, "first batch");
    driver.suspend(&state).unwrap();

    let mut driver = DocumentDriver::new();
    driver
        .continue_pdf(
            OutputTarget::file(&destination),
            &state,
            Some(InputSource::file(&source)),
            LogConfig::disabled(),
        )
        .unwrap();
    assert_eq!(driver.modified_source_page_count(), Some(2));
    add_text_page(&mut driver, "second batch");
    driver.end().unwrap();

    let mut reader = PdfReader::open(&destination).unwrap();
    assert_eq!(reader.page_count().unwrap(), 4);
}

#[test]
fn test_modify_on_started_driver() {
    let mut driver = start_memory();
    let result = driver.modify_pdf(
        InputSource::bytes(pdf_with_pages(&[(100.0, 100.0)])),
        PdfVersion::V1_7,
        Some(OutputTarget::memory()),
        LogConfig::disabled(),
        CreationSettings::default(),
    );
    assert!(matches!(result, Err(PdfError::AlreadyStarted)));
}

#[test]
fn test_modified_file_context_references_original_objects() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.pdf");
    let destination = dir.path().join("updated.pdf");
    std::fs::write(&source, pdf_with_pages(&[(200.0, 200.0), (300.0, 300.0)])).unwrap();
    let max_number = PdfReader::open(&source).unwrap().max_object_number();

    let mut driver = DocumentDriver::new();
    modify(&mut driver, &source, Some(&destination));
    let context = driver.create_pdf_copying_context_for_modified_file().unwrap();
    let before = driver.next_object_number().unwrap();
    let pages = driver
        .append_pdf_pages_from_copying_context(context, &PageRange::single(1))
        .unwrap();
    // Only the new page object itself
    assert_eq!(driver.next_object_number(), Some(before + 1));
    let font = ObjectId::new(3, 0);
    assert_eq!(driver.copied_object_id(context, font).unwrap(), Some(font));
    driver.end().unwrap();

    let updated = std::fs::read(&destination).unwrap();
    assert_eq!(common::count(&updated, b"/BaseFont /Helvetica"), 1);
    let mut reader = PdfReader::from_bytes(updated).unwrap();
    assert_eq!(reader.page_count().unwrap(), 3);
    let duplicate = reader.page(2).unwrap().unwrap();
    assert_eq!(duplicate.id, pages[0]);
    assert_eq!(duplicate.width(), 300.0);
    let contents = duplicate.dict.get_reference("Contents").unwrap();
    assert!(contents.number() <= max_number);
    let text = reader.page_contents(&duplicate).unwrap();
    assert!(common::contains(&text, b"(Page 2) Tj"));
}

#[test]
fn test_modified_file_context_needs_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.pdf");
    let destination = dir.path().join("updated.pdf");
    let state = dir.path().join("update.state.json");
    std::fs::write(&source, pdf_with_pages(&[(200.0, 200.0)])).unwrap();

    let mut driver = DocumentDriver::new();
    modify(&mut driver, &source, Some(&destination));
    driver.suspend(&state).unwrap();

    let mut driver = DocumentDriver::new();
    driver
        .continue_pdf(OutputTarget::file(&destination), &state, None, LogConfig::disabled())
        .unwrap();
    assert!(matches!(
        driver.create_pdf_copying_context_for_modified_file(),
        Err(PdfError::InvalidArgument(_))
    ));
    assert!(!driver.is_poisoned());
    driver.end().unwrap();
}

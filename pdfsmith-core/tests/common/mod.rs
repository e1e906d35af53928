//! Fixtures shared by the integration tests

#![allow(dead_code)]

use pdfsmith::{
    CreationSettings, DocumentDriver, Font, LogConfig, OutputTarget, PdfVersion, Rectangle,
};
use std::io::Cursor;
use tiff::encoder::{colortype, TiffEncoder};

/// Smallest JPEG the header parser accepts: SOI, JFIF without density,
/// a baseline frame header and EOI.
pub fn jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

pub fn tiff_rgb(width: u32, height: u32, pages: usize) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
        let samples = vec![90u8; (width * height * 3) as usize];
        for _ in 0..pages {
            encoder
                .write_image::<colortype::RGB8>(width, height, &samples)
                .unwrap();
        }
    }
    cursor.into_inner()
}

pub fn tiff_rgba(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
        let samples: Vec<u8> = [255u8, 0, 0, 128].repeat((width * height) as usize);
        encoder
            .write_image::<colortype::RGBA8>(width, height, &samples)
            .unwrap();
    }
    cursor.into_inner()
}

pub fn start_memory() -> DocumentDriver {
    start_memory_with(CreationSettings::uncompressed())
}

pub fn start_memory_with(settings: CreationSettings) -> DocumentDriver {
    let mut driver = DocumentDriver::new();
    driver
        .start_pdf(
            OutputTarget::memory(),
            PdfVersion::V1_7,
            LogConfig::disabled(),
            settings,
        )
        .unwrap();
    driver
}

pub fn finish(mut driver: DocumentDriver) -> Vec<u8> {
    driver.end().unwrap().into_bytes().unwrap()
}

/// A PDF with one page per size, each saying "Page N".
pub fn pdf_with_pages(sizes: &[(f64, f64)]) -> Vec<u8> {
    let mut driver = start_memory();
    for (number, &(width, height)) in sizes.iter().enumerate() {
        let page = driver
            .create_page(Rectangle::from_position_and_size(0.0, 0.0, width, height))
            .unwrap();
        let handle = driver.start_page_content_context(page).unwrap();
        driver
            .content(handle)
            .unwrap()
            .text_at(Font::Helvetica, 12.0, 10.0, 10.0, &format!("Page {}", number + 1))
            .unwrap();
        driver.write_page(page).unwrap();
    }
    finish(driver)
}

pub fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count()
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    count(haystack, needle) > 0
}

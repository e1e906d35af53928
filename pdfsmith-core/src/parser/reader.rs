//! High-level PDF Reader
//!
//! Ties header, cross-reference and object parsing together and hands out
//! resolved objects, the catalog and the flattened page list.

use super::filters::decode_stream;
use super::header::{parse_header, PdfVersion};
use super::objects::ObjectParser;
use super::page_tree::{collect_pages, ParsedPage};
use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseResult};
use crate::io::InputSource;
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::HashMap;
use std::path::Path;

/// Reference chains longer than this are treated as cycles
const MAX_REFERENCE_CHAIN: usize = 32;

/// PDF reader over an in-memory copy of the document
pub struct PdfReader {
    data: Vec<u8>,
    version: PdfVersion,
    xref: XRefTable,
    cache: HashMap<u32, Object>,
    pages: Option<Vec<ParsedPage>>,
}

impl std::fmt::Debug for PdfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfReader")
            .field("size", &self.data.len())
            .field("version", &self.version)
            .field("objects", &self.xref.in_use_count())
            .finish()
    }
}

impl PdfReader {
    /// Open a PDF file
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Read a PDF from any input source
    pub fn from_source(source: InputSource) -> ParseResult<Self> {
        Self::from_bytes(source.read_all()?)
    }

    /// Parse a document held in memory
    pub fn from_bytes(data: Vec<u8>) -> ParseResult<Self> {
        let version = parse_header(&data)?;

        let xref = match XRefTable::parse(&data) {
            Ok(xref) => xref,
            Err(e) => {
                tracing::warn!(error = %e, "cross-reference chain unusable, recovering");
                XRefTable::recover(&data)?
            }
        };

        if xref.trailer().contains_key("Encrypt") {
            return Err(ParseError::EncryptionNotSupported);
        }

        let mut reader = Self {
            data,
            version,
            xref,
            cache: HashMap::new(),
            pages: None,
        };

        if reader.xref.trailer().get_reference("Root").is_none() {
            let root = reader
                .find_catalog()
                .ok_or_else(|| ParseError::MissingKey("Root".to_string()))?;
            reader.xref.trailer_mut().set("Root", root);
        }
        if reader.xref.trailer().get_integer("Size").is_none() {
            let size = i64::from(reader.xref.max_object_number()) + 1;
            reader.xref.trailer_mut().set("Size", size);
        }

        tracing::debug!(
            version = %reader.version,
            objects = reader.xref.in_use_count(),
            sections = reader.xref.sections(),
            "parsed PDF"
        );
        Ok(reader)
    }

    fn find_catalog(&self) -> Option<ObjectId> {
        self.xref.iter().find_map(|(number, entry)| {
            let id = super::xref::id_for(number, entry)?;
            let object = self.load_entry(number, entry).ok()?;
            (object.as_dict()?.get_type() == Some("Catalog")).then_some(id)
        })
    }

    /// Raw bytes of the document
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn version(&self) -> PdfVersion {
        self.version
    }

    /// Trailer of the newest cross-reference section
    pub fn trailer(&self) -> &Dictionary {
        self.xref.trailer()
    }

    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    /// Offset of the newest cross-reference section, for `/Prev`
    pub fn startxref(&self) -> u64 {
        self.xref.startxref()
    }

    /// Highest object number in use or reserved by `/Size`
    pub fn max_object_number(&self) -> u32 {
        let from_size = self
            .trailer()
            .get_integer("Size")
            .and_then(|size| u32::try_from(size - 1).ok())
            .unwrap_or(0);
        from_size.max(self.xref.max_object_number())
    }

    pub fn root_id(&self) -> ParseResult<ObjectId> {
        self.trailer()
            .get_reference("Root")
            .ok_or_else(|| ParseError::MissingKey("Root".to_string()))
    }

    pub fn info_id(&self) -> Option<ObjectId> {
        self.trailer().get_reference("Info")
    }

    /// Get an object by id; unknown or free objects read as `null`
    pub fn get_object(&mut self, id: ObjectId) -> ParseResult<Object> {
        if let Some(object) = self.cache.get(&id.number()) {
            return Ok(object.clone());
        }
        let object = match self.xref.get(id.number()) {
            Some(entry) => self.load_entry(id.number(), entry)?,
            None => Object::Null,
        };
        self.cache.insert(id.number(), object.clone());
        Ok(object)
    }

    /// Follow references until a direct object is reached
    pub fn resolve(&mut self, object: &Object) -> ParseResult<Object> {
        let mut current = object.clone();
        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                Object::Reference(id) => current = self.get_object(id)?,
                direct => return Ok(direct),
            }
        }
        Err(ParseError::CircularReference)
    }

    /// Resolve `key` of `dict` if present
    pub fn resolve_key(&mut self, dict: &Dictionary, key: &str) -> ParseResult<Option<Object>> {
        match dict.get(key) {
            Some(value) => self.resolve(value).map(Some),
            None => Ok(None),
        }
    }

    /// Decoded data of a stream object (or a reference to one)
    pub fn stream_data(&mut self, object: &Object) -> ParseResult<Vec<u8>> {
        match self.resolve(object)? {
            Object::Stream(mut dict, raw) => {
                for key in ["Filter", "DecodeParms"] {
                    if let Some(Object::Reference(_)) = dict.get(key) {
                        let value = self.resolve_key(&dict, key)?.unwrap_or(Object::Null);
                        dict.set(key, value);
                    }
                }
                decode_stream(&raw, &dict)
            }
            other => Err(ParseError::syntax(
                0,
                format!("expected a stream, found {other:?}"),
            )),
        }
    }

    pub fn catalog(&mut self) -> ParseResult<Dictionary> {
        let root = self.root_id()?;
        match self.get_object(root)? {
            Object::Dictionary(dict) => Ok(dict),
            _ => Err(ParseError::InvalidTrailer),
        }
    }

    pub fn info(&mut self) -> ParseResult<Option<Dictionary>> {
        match self.info_id() {
            Some(id) => Ok(self.get_object(id)?.as_dict().cloned()),
            None => Ok(None),
        }
    }

    /// Object id of the root `/Pages` node
    pub fn pages_root(&mut self) -> ParseResult<ObjectId> {
        self.catalog()?
            .get_reference("Pages")
            .ok_or_else(|| ParseError::MissingKey("Pages".to_string()))
    }

    /// All pages in document order
    pub fn pages(&mut self) -> ParseResult<&[ParsedPage]> {
        if self.pages.is_none() {
            let root = self.pages_root()?;
            let pages = collect_pages(self, root)?;
            self.pages = Some(pages);
        }
        Ok(self.pages.as_deref().unwrap_or_default())
    }

    pub fn page_count(&mut self) -> ParseResult<usize> {
        Ok(self.pages()?.len())
    }

    /// Page by 0-based index; `None` when out of range
    pub fn page(&mut self, index: usize) -> ParseResult<Option<ParsedPage>> {
        Ok(self.pages()?.get(index).cloned())
    }

    /// Decoded content of a page, all `/Contents` streams joined in order
    pub fn page_contents(&mut self, page: &ParsedPage) -> ParseResult<Vec<u8>> {
        let contents = match page.dict.get("Contents") {
            Some(contents) => self.resolve(contents)?,
            None => return Ok(Vec::new()),
        };
        let parts = match contents {
            Object::Array(parts) => parts,
            stream @ Object::Stream(..) => vec![stream],
            Object::Null => Vec::new(),
            other => {
                return Err(ParseError::syntax(
                    0,
                    format!("invalid page /Contents: {other:?}"),
                ))
            }
        };

        let mut joined = Vec::new();
        for part in &parts {
            if !joined.is_empty() {
                joined.push(b'\n');
            }
            joined.extend_from_slice(&self.stream_data(part)?);
        }
        Ok(joined)
    }

    fn load_entry(&self, number: u32, entry: XRefEntry) -> ParseResult<Object> {
        match entry {
            XRefEntry::Free => Ok(Object::Null),
            XRefEntry::InUse { offset, generation } => {
                let offset = usize::try_from(offset).map_err(|_| ParseError::InvalidXRef)?;
                if offset >= self.data.len() {
                    return Err(ParseError::InvalidReference(number, generation));
                }
                let lengths = |id: ObjectId| self.lookup_length(id);
                let (id, object) = ObjectParser::new(&self.data, offset).parse_indirect(&lengths)?;
                if id.number() != number {
                    return Err(ParseError::InvalidReference(number, generation));
                }
                Ok(object)
            }
            XRefEntry::Compressed { stream, index } => self.load_compressed(number, stream, index),
        }
    }

    fn load_compressed(&self, number: u32, stream: u32, index: u32) -> ParseResult<Object> {
        let container = match self.xref.get(stream) {
            Some(entry @ XRefEntry::InUse { .. }) => self.load_entry(stream, entry)?,
            _ => return Err(ParseError::InvalidReference(stream, 0)),
        };
        let (dict, raw) = match &container {
            Object::Stream(dict, raw) => (dict, raw),
            _ => return Err(ParseError::InvalidReference(stream, 0)),
        };
        let decoded = decode_stream(raw, dict)?;
        let count = dict
            .get_integer("N")
            .ok_or_else(|| ParseError::MissingKey("N".to_string()))?;
        let first = dict
            .get_integer("First")
            .and_then(|first| usize::try_from(first).ok())
            .ok_or_else(|| ParseError::MissingKey("First".to_string()))?;

        let mut header = ObjectParser::new(&decoded, 0);
        let mut located = None;
        for slot in 0..count.max(0) {
            let listed = header.parse_object()?.as_integer();
            let offset = header.parse_object()?.as_integer();
            if let (Some(listed), Some(offset)) = (listed, offset) {
                let matches_slot = slot == i64::from(index);
                if listed == i64::from(number) && (matches_slot || located.is_none()) {
                    located = usize::try_from(offset).ok();
                    if matches_slot {
                        break;
                    }
                }
            }
        }

        let offset = located.ok_or(ParseError::InvalidReference(number, 0))?;
        ObjectParser::new(&decoded, first + offset).parse_object()
    }

    fn lookup_length(&self, id: ObjectId) -> Option<usize> {
        match self.xref.get(id.number())? {
            XRefEntry::InUse { offset, .. } => {
                let (_, object) = ObjectParser::new(&self.data, usize::try_from(offset).ok()?)
                    .parse_indirect(&|_| None)
                    .ok()?;
                usize::try_from(object.as_integer()?).ok()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two pages under one Pages node, the second inheriting its MediaBox
    fn sample_pdf() -> Vec<u8> {
        let objects: Vec<&[u8]> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>",
            b"<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 200 100] >>",
            b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 400] /Contents 5 0 R >>",
            b"<< /Type /Page /Parent 2 0 R /Contents [5 0 R 6 0 R] >>",
            b"<< /Length 6 0 R >>\nstream\n0 0 m\nendstream",
            b"6",
        ];
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            pdf.extend_from_slice(body);
            pdf.extend_from_slice(b"\nendobj\n");
        }
        let xref = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_reader_basics() {
        let mut reader = PdfReader::from_bytes(sample_pdf()).unwrap();
        assert_eq!(reader.version(), PdfVersion::V1_4);
        assert_eq!(reader.max_object_number(), 6);
        assert_eq!(reader.catalog().unwrap().get_type(), Some("Catalog"));
        assert!(reader.info().unwrap().is_none());
        assert_eq!(reader.page_count().unwrap(), 2);
    }

    #[test]
    fn test_inherited_media_box() {
        let mut reader = PdfReader::from_bytes(sample_pdf()).unwrap();
        let first = reader.page(0).unwrap().unwrap();
        let second = reader.page(1).unwrap().unwrap();
        assert_eq!(first.width(), 300.0);
        assert_eq!(second.width(), 200.0);
        assert_eq!(second.height(), 100.0);
        assert!(second.dict.contains_key("MediaBox"));
        assert!(reader.page(2).unwrap().is_none());
    }

    #[test]
    fn test_page_contents_with_indirect_length() {
        let mut reader = PdfReader::from_bytes(sample_pdf()).unwrap();
        let first = reader.page(0).unwrap().unwrap();
        assert_eq!(reader.page_contents(&first).unwrap(), b"0 0 m\n");

        // An array of two references to the same stream
        let second = reader.page(1).unwrap().unwrap();
        assert_eq!(reader.page_contents(&second).unwrap(), b"0 0 m\n\n0 0 m\n");
    }

    #[test]
    fn test_missing_objects_are_null() {
        let mut reader = PdfReader::from_bytes(sample_pdf()).unwrap();
        assert_eq!(reader.get_object(ObjectId::new(42, 0)).unwrap(), Object::Null);
    }

    #[test]
    fn test_rejects_non_pdf() {
        assert!(matches!(
            PdfReader::from_bytes(b"hello world".to_vec()),
            Err(ParseError::InvalidHeader)
        ));
    }

    #[test]
    fn test_rejects_encrypted() {
        let pdf = String::from_utf8(sample_pdf())
            .unwrap()
            .replace("/Root 1 0 R >>", "/Root 1 0 R /Encrypt 9 0 R >>");
        assert!(matches!(
            PdfReader::from_bytes(pdf.into_bytes()),
            Err(ParseError::EncryptionNotSupported)
        ));
    }

    #[test]
    fn test_recovers_without_xref() {
        let pdf = sample_pdf();
        let cut = super::super::objects::rfind(&pdf, b"xref\n0").unwrap();
        let mut broken = pdf[..cut].to_vec();
        broken.extend_from_slice(b"%%EOF\n");

        let mut reader = PdfReader::from_bytes(broken).unwrap();
        assert!(reader.xref().is_recovered());
        assert_eq!(reader.root_id().unwrap(), ObjectId::new(1, 0));
        assert_eq!(reader.page_count().unwrap(), 2);
    }

    #[test]
    fn test_object_stream() {
        let body = b"<< /Type /Catalog /Pages 11 0 R >> << /Type /Pages /Kids [] /Count 0 >>";
        // Offsets are relative to /First
        let second = body.iter().position(|&b| b == b'>').unwrap() + 3;
        let header = format!("10 0 11 {second} ");
        let mut objstm = header.clone().into_bytes();
        objstm.extend_from_slice(body);

        let mut pdf = b"%PDF-1.5\n".to_vec();
        let stream_offset = pdf.len();
        pdf.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /ObjStm /N 2 /First {} /Length {} >>\nstream\n",
                header.len(),
                objstm.len()
            )
            .as_bytes(),
        );
        pdf.extend_from_slice(&objstm);
        pdf.extend_from_slice(b"\nendstream\nendobj\n");

        let rows: Vec<u8> = vec![
            1, 0, stream_offset as u8, 0, // 5: in use
            2, 0, 5, 0, // 10: in stream 5, index 0
            2, 0, 5, 1, // 11: in stream 5, index 1
        ];
        let xref_offset = pdf.len();
        pdf.extend_from_slice(
            format!(
                "12 0 obj\n<< /Type /XRef /Size 12 /Index [5 1 10 2] /W [1 2 1] /Root 10 0 R /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        pdf.extend_from_slice(&rows);
        pdf.extend_from_slice(
            format!("\nendstream\nendobj\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes(),
        );

        let mut reader = PdfReader::from_bytes(pdf).unwrap();
        assert_eq!(reader.max_object_number(), 11);
        assert_eq!(
            reader.catalog().unwrap().get_reference("Pages"),
            Some(ObjectId::new(11, 0))
        );
        assert_eq!(reader.page_count().unwrap(), 0);
    }
}

//! PDF Cross-Reference Table Parser
//!
//! Parses xref tables and xref streams according to ISO 32000-1
//! Sections 7.5.4 and 7.5.8, following `/Prev` chains from the newest
//! section backwards. When the chain is unusable the file is scanned for
//! `N G obj` markers instead.

use super::filters::decode_stream;
use super::lexer::{is_whitespace, Token};
use super::objects::{rfind, ObjectParser};
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};

/// How far from the end of the file `startxref` is searched for
const STARTXREF_SEARCH_WINDOW: usize = 2048;

/// Cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free,
    /// Object stored at a byte offset
    InUse { offset: u64, generation: u16 },
    /// Object stored inside an object stream
    Compressed { stream: u32, index: u32 },
}

/// Merged cross-reference data of a document
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dictionary,
    startxref: u64,
    sections: usize,
    recovered: bool,
}

impl XRefTable {
    /// Parse the cross-reference chain starting at the final `startxref`.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let startxref = find_startxref(data)?;
        let mut table = XRefTable {
            startxref,
            ..Default::default()
        };

        let mut visited = HashSet::new();
        let mut next = Some(startxref);
        while let Some(offset) = next {
            if !visited.insert(offset) {
                return Err(ParseError::CircularReference);
            }
            let trailer = table.parse_section(data, offset)?;
            next = trailer
                .get_integer("Prev")
                .and_then(|prev| u64::try_from(prev).ok());
            if table.sections == 0 {
                table.trailer = trailer;
            }
            table.sections += 1;
        }

        if table.entries.is_empty() {
            return Err(ParseError::InvalidXRef);
        }
        Ok(table)
    }

    /// Rebuild cross-reference data by scanning every `N G obj` marker.
    pub fn recover(data: &[u8]) -> ParseResult<Self> {
        let mut entries = BTreeMap::new();
        for (number, generation, offset) in scan_object_markers(data) {
            // Later definitions override earlier ones, as in an update chain
            entries.insert(
                number,
                XRefEntry::InUse {
                    offset: offset as u64,
                    generation,
                },
            );
        }
        if entries.is_empty() {
            return Err(ParseError::InvalidXRef);
        }

        let trailer = recover_trailer(data).unwrap_or_default();
        tracing::warn!(
            objects = entries.len(),
            "cross-reference data rebuilt by scanning object markers"
        );

        Ok(XRefTable {
            entries,
            trailer,
            startxref: 0,
            sections: 1,
            recovered: true,
        })
    }

    /// Parse one section and merge entries not already known from a newer one
    fn parse_section(&mut self, data: &[u8], offset: u64) -> ParseResult<Dictionary> {
        let position = usize::try_from(offset).map_err(|_| ParseError::InvalidXRef)?;
        if position >= data.len() {
            return Err(ParseError::InvalidXRef);
        }

        let mut cursor = position;
        while cursor < data.len() && is_whitespace(data[cursor]) {
            cursor += 1;
        }

        if data[cursor..].starts_with(b"xref") {
            let trailer = self.parse_classic(data, cursor + 4)?;
            // Hybrid files: the xref stream named by /XRefStm precedes /Prev
            if let Some(stream_offset) = trailer
                .get_integer("XRefStm")
                .and_then(|value| u64::try_from(value).ok())
            {
                self.parse_stream_section(data, stream_offset)?;
            }
            Ok(trailer)
        } else {
            self.parse_stream_section(data, offset)
        }
    }

    fn parse_classic(&mut self, data: &[u8], start: usize) -> ParseResult<Dictionary> {
        let mut parser = ObjectParser::new(data, start);
        loop {
            let lexer = parser.lexer_mut();
            match lexer.next_significant()? {
                Token::Keyword(keyword) if keyword == "trailer" => break,
                Token::Integer(first) => {
                    let count = match lexer.next_significant()? {
                        Token::Integer(count) => count,
                        _ => return Err(ParseError::InvalidXRef),
                    };
                    let first = u32::try_from(first).map_err(|_| ParseError::InvalidXRef)?;
                    for i in 0..count.max(0) as u32 {
                        let offset = match lexer.next_significant()? {
                            Token::Integer(value) => value,
                            _ => return Err(ParseError::InvalidXRef),
                        };
                        let generation = match lexer.next_significant()? {
                            Token::Integer(value) => value,
                            _ => return Err(ParseError::InvalidXRef),
                        };
                        let entry = match lexer.next_significant()? {
                            Token::Keyword(kind) if kind == "n" => XRefEntry::InUse {
                                offset: u64::try_from(offset)
                                    .map_err(|_| ParseError::InvalidXRef)?,
                                generation: u16::try_from(generation).unwrap_or(u16::MAX),
                            },
                            Token::Keyword(kind) if kind == "f" => XRefEntry::Free,
                            _ => return Err(ParseError::InvalidXRef),
                        };
                        self.merge(first + i, entry);
                    }
                }
                _ => return Err(ParseError::InvalidXRef),
            }
        }

        match parser.parse_object()? {
            Object::Dictionary(trailer) => Ok(trailer),
            _ => Err(ParseError::InvalidTrailer),
        }
    }

    fn parse_stream_section(&mut self, data: &[u8], offset: u64) -> ParseResult<Dictionary> {
        let position = usize::try_from(offset).map_err(|_| ParseError::InvalidXRef)?;
        let (_, object) = ObjectParser::new(data, position).parse_indirect(&|_| None)?;
        let (dict, raw) = match object {
            Object::Stream(dict, raw) if dict.get_type() == Some("XRef") => (dict, raw),
            _ => return Err(ParseError::InvalidXRef),
        };

        let widths: Vec<usize> = dict
            .get("W")
            .and_then(Object::as_array)
            .ok_or_else(|| ParseError::MissingKey("W".to_string()))?
            .iter()
            .map(|width| width.as_integer().unwrap_or(0).max(0) as usize)
            .collect();
        if widths.len() < 3 || widths.iter().any(|&w| w > 8) {
            return Err(ParseError::InvalidXRef);
        }
        let row_len: usize = widths.iter().sum();
        if row_len == 0 {
            return Err(ParseError::InvalidXRef);
        }

        let size = dict
            .get_integer("Size")
            .ok_or_else(|| ParseError::MissingKey("Size".to_string()))?;
        let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(Object::as_array) {
            Some(index) => index
                .chunks(2)
                .filter_map(|pair| match pair {
                    [start, count] => Some((
                        u32::try_from(start.as_integer()?).ok()?,
                        u32::try_from(count.as_integer()?).ok()?,
                    )),
                    _ => None,
                })
                .collect(),
            None => vec![(0, u32::try_from(size).unwrap_or(0))],
        };

        let decoded = decode_stream(&raw, &dict)?;
        let mut rows = decoded.chunks_exact(row_len);
        for (start, count) in ranges {
            for number in start..start.saturating_add(count) {
                let row = match rows.next() {
                    Some(row) => row,
                    None => break,
                };
                let (kind_bytes, rest) = row.split_at(widths[0]);
                let (second, third) = rest.split_at(widths[1]);
                // A zero-width type field means type 1
                let kind = if widths[0] == 0 {
                    1
                } else {
                    read_be(kind_bytes)
                };
                let entry = match kind {
                    0 => XRefEntry::Free,
                    1 => XRefEntry::InUse {
                        offset: read_be(second),
                        generation: u16::try_from(read_be(third)).unwrap_or(0),
                    },
                    2 => XRefEntry::Compressed {
                        stream: u32::try_from(read_be(second))
                            .map_err(|_| ParseError::InvalidXRef)?,
                        index: u32::try_from(read_be(third))
                            .map_err(|_| ParseError::InvalidXRef)?,
                    },
                    // Unknown types are references to null
                    _ => XRefEntry::Free,
                };
                self.merge(number, entry);
            }
        }

        Ok(dict)
    }

    fn merge(&mut self, number: u32, entry: XRefEntry) {
        self.entries.entry(number).or_insert(entry);
    }

    pub fn get(&self, number: u32) -> Option<XRefEntry> {
        self.entries.get(&number).copied()
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub(crate) fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    /// Offset the final `startxref` points at (0 when recovered)
    pub fn startxref(&self) -> u64 {
        self.startxref
    }

    /// Number of cross-reference sections in the update chain
    pub fn sections(&self) -> usize {
        self.sections
    }

    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    /// Highest object number with any entry
    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, XRefEntry)> + '_ {
        self.entries.iter().map(|(number, entry)| (*number, *entry))
    }

    /// Objects that are in use, directly or in object streams
    pub fn in_use_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| !matches!(entry, XRefEntry::Free))
            .count()
    }
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

/// Read the offset following the last `startxref` keyword.
pub fn find_startxref(data: &[u8]) -> ParseResult<u64> {
    let tail_start = data.len().saturating_sub(STARTXREF_SEARCH_WINDOW);
    let keyword = rfind(&data[tail_start..], b"startxref").ok_or(ParseError::InvalidXRef)?;
    let mut parser = ObjectParser::new(data, tail_start + keyword + b"startxref".len());
    match parser.parse_object()? {
        Object::Integer(offset) => u64::try_from(offset).map_err(|_| ParseError::InvalidXRef),
        _ => Err(ParseError::InvalidXRef),
    }
}

/// Every `N G obj` marker in the file as (number, generation, offset)
pub(crate) fn scan_object_markers(data: &[u8]) -> Vec<(u32, u16, usize)> {
    let mut found = Vec::new();
    let mut search_from = 0;
    while let Some(relative) = super::objects::find(&data[search_from..], b"obj") {
        let at = search_from + relative;
        search_from = at + 3;

        // "obj" must be a whole word, which also rules out "endobj"
        let next_ok = data
            .get(at + 3)
            .map_or(true, |&b| is_whitespace(b) || super::lexer::is_delimiter(b));
        if !next_ok || at == 0 || !is_whitespace(data[at - 1]) {
            continue;
        }

        let mut cursor = at;
        let generation = match read_number_backwards(data, &mut cursor) {
            Some(value) => value,
            None => continue,
        };
        let number = match read_number_backwards(data, &mut cursor) {
            Some(value) => value,
            None => continue,
        };
        if cursor > 0 && !is_whitespace(data[cursor - 1]) {
            continue;
        }
        if let (Ok(number), Ok(generation)) = (u32::try_from(number), u16::try_from(generation)) {
            if number > 0 {
                found.push((number, generation, cursor));
            }
        }
    }
    found
}

/// Skip whitespace leftwards from `cursor`, then read decimal digits.
/// On success `cursor` points at the first digit.
fn read_number_backwards(data: &[u8], cursor: &mut usize) -> Option<u64> {
    let mut end = *cursor;
    while end > 0 && is_whitespace(data[end - 1]) {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && data[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == end || end - start > 10 {
        return None;
    }
    *cursor = start;
    std::str::from_utf8(&data[start..end]).ok()?.parse().ok()
}

fn recover_trailer(data: &[u8]) -> Option<Dictionary> {
    let at = rfind(data, b"trailer")?;
    match ObjectParser::new(data, at + b"trailer".len()).parse_object() {
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    }
}

/// Object id of an in-use entry, given its number
pub(crate) fn id_for(number: u32, entry: XRefEntry) -> Option<ObjectId> {
    match entry {
        XRefEntry::InUse { generation, .. } => Some(ObjectId::new(number, generation)),
        XRefEntry::Compressed { .. } => Some(ObjectId::new(number, 0)),
        XRefEntry::Free => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic_pdf() -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let obj1 = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let obj2 = pdf.len();
        pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n0 3\n0000000000 65535 f \n{obj1:010} 00000 n \n{obj2:010} 00000 n \n\
                 trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_find_startxref() {
        let pdf = classic_pdf();
        let offset = find_startxref(&pdf).unwrap() as usize;
        assert!(pdf[offset..].starts_with(b"xref"));
        assert!(find_startxref(b"%PDF-1.4\nno xref here").is_err());
    }

    #[test]
    fn test_parse_classic_table() {
        let pdf = classic_pdf();
        let table = XRefTable::parse(&pdf).unwrap();
        assert_eq!(table.get(0), Some(XRefEntry::Free));
        assert!(matches!(table.get(1), Some(XRefEntry::InUse { .. })));
        assert_eq!(table.max_object_number(), 2);
        assert_eq!(table.in_use_count(), 2);
        assert_eq!(table.sections(), 1);
        assert_eq!(
            table.trailer().get_reference("Root"),
            Some(ObjectId::new(1, 0))
        );
    }

    #[test]
    fn test_prev_chain_newer_entries_win() {
        let mut pdf = classic_pdf();
        let first_xref = find_startxref(&pdf).unwrap();
        let obj2 = pdf.len();
        pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 /New true >>\nendobj\n");
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n2 1\n{obj2:010} 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R /Prev {first_xref} >>\n\
                 startxref\n{xref}\n%%EOF\n"
            )
            .as_bytes(),
        );

        let table = XRefTable::parse(&pdf).unwrap();
        assert_eq!(table.sections(), 2);
        assert_eq!(
            table.get(2),
            Some(XRefEntry::InUse {
                offset: obj2 as u64,
                generation: 0
            })
        );
        assert_eq!(table.trailer().get_integer("Prev"), Some(first_xref as i64));
    }

    #[test]
    fn test_recover_scans_markers() {
        let mut pdf = classic_pdf();
        // Point startxref past the end of the file
        let keyword = rfind(&pdf, b"startxref\n").unwrap();
        pdf.truncate(keyword + b"startxref\n".len());
        pdf.extend_from_slice(b"999999\n%%EOF\n");

        assert!(XRefTable::parse(&pdf).is_err());
        let table = XRefTable::recover(&pdf).unwrap();
        assert!(table.is_recovered());
        assert_eq!(table.max_object_number(), 2);
        assert_eq!(
            table.trailer().get_reference("Root"),
            Some(ObjectId::new(1, 0))
        );
    }

    #[test]
    fn test_scan_ignores_endobj() {
        let markers = scan_object_markers(b"\n3 0 obj\n(x)\nendobj\n 12 1 obj null endobj");
        assert_eq!(markers, vec![(3, 0, 1), (12, 1, 21)]);
    }

    #[test]
    fn test_xref_stream() {
        // Rows: type(1) offset(2) gen(1)
        let rows: Vec<u8> = vec![0, 0, 0, 255, 1, 0, 9, 0, 2, 0, 5, 0];
        let mut pdf = b"%PDF-1.5\n".to_vec();
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "7 0 obj\n<< /Type /XRef /Size 3 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        pdf.extend_from_slice(&rows);
        pdf.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{xref}\n%%EOF\n").as_bytes());

        let table = XRefTable::parse(&pdf).unwrap();
        assert_eq!(table.get(0), Some(XRefEntry::Free));
        assert_eq!(
            table.get(1),
            Some(XRefEntry::InUse {
                offset: 9,
                generation: 0
            })
        );
        assert_eq!(table.get(2), Some(XRefEntry::Compressed { stream: 5, index: 0 }));
        assert_eq!(table.trailer().get_type(), Some("XRef"));
    }
}

//! PDF Stream Filters
//!
//! Handles decompression and decoding of PDF streams according to ISO 32000-1 Section 7.4

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object};

use flate2::read::ZlibDecoder;
use std::io::Read;

/// Supported PDF filters
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// ASCII hex decode
    ASCIIHexDecode,

    /// ASCII 85 decode
    ASCII85Decode,

    /// Flate decode (zlib/deflate compression)
    FlateDecode,

    /// DCT decode (JPEG), never decoded here
    DCTDecode,
}

impl Filter {
    /// Parse filter from name (abbreviated inline-image names included)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            _ => None,
        }
    }
}

/// Filter names of a stream dictionary, in application order
pub fn filter_names(dict: &Dictionary) -> ParseResult<Vec<String>> {
    match dict.get("Filter") {
        None | Some(Object::Null) => Ok(Vec::new()),
        Some(Object::Name(name)) => Ok(vec![name.clone()]),
        Some(Object::Array(array)) => array
            .iter()
            .map(|item| {
                item.as_name()
                    .map(str::to_string)
                    .ok_or_else(|| ParseError::syntax(0, "Invalid filter in array"))
            })
            .collect(),
        Some(_) => Err(ParseError::syntax(0, "Invalid Filter type")),
    }
}

/// Decode stream data according to the dictionary's `/Filter` and
/// `/DecodeParms`.
pub fn decode_stream(data: &[u8], dict: &Dictionary) -> ParseResult<Vec<u8>> {
    let filters = filter_names(dict)?;
    let params: Vec<Option<&Dictionary>> = match dict.get("DecodeParms") {
        Some(Object::Dictionary(params)) => vec![Some(params)],
        Some(Object::Array(array)) => array.iter().map(Object::as_dict).collect(),
        _ => Vec::new(),
    };

    let mut result = data.to_vec();
    for (index, name) in filters.iter().enumerate() {
        let filter =
            Filter::from_name(name).ok_or_else(|| ParseError::UnsupportedFilter(name.clone()))?;
        let params = params.get(index).copied().flatten();
        result = apply_filter(&result, &filter, params)?;
    }

    Ok(result)
}

/// Apply a single filter to data
fn apply_filter(data: &[u8], filter: &Filter, params: Option<&Dictionary>) -> ParseResult<Vec<u8>> {
    match filter {
        Filter::FlateDecode => {
            let inflated = decode_flate(data)?;
            match params {
                Some(params) => apply_predictor(inflated, params),
                None => Ok(inflated),
            }
        }
        Filter::ASCIIHexDecode => decode_ascii_hex(data),
        Filter::ASCII85Decode => decode_ascii85(data),
        Filter::DCTDecode => Err(ParseError::UnsupportedFilter("DCTDecode".to_string())),
    }
}

/// Decode FlateDecode (zlib/deflate) compressed data
fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    match decoder.read_to_end(&mut result) {
        Ok(_) => Ok(result),
        // Truncated streams still yield whatever inflated cleanly
        Err(_) if !result.is_empty() => Ok(result),
        Err(e) => Err(ParseError::StreamDecodeError(format!(
            "Flate decode error: {e}"
        ))),
    }
}

/// Undo TIFF (2) or PNG (10..15) prediction
fn apply_predictor(data: Vec<u8>, params: &Dictionary) -> ParseResult<Vec<u8>> {
    let predictor = params.get_integer("Predictor").unwrap_or(1);
    if predictor <= 1 {
        return Ok(data);
    }

    let colors = params.get_integer("Colors").unwrap_or(1).max(1) as usize;
    let bits = params.get_integer("BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = params.get_integer("Columns").unwrap_or(1).max(1) as usize;
    let bytes_per_pixel = (colors * bits).div_ceil(8).max(1);
    let row_len = (columns * colors * bits).div_ceil(8);

    if predictor == 2 {
        if bits != 8 {
            return Err(ParseError::StreamDecodeError(
                "TIFF predictor only supported for 8-bit components".to_string(),
            ));
        }
        let mut out = data;
        for row in out.chunks_mut(row_len) {
            for i in bytes_per_pixel..row.len() {
                row[i] = row[i].wrapping_add(row[i - bytes_per_pixel]);
            }
        }
        return Ok(out);
    }

    let mut out = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];
    for chunk in data.chunks(row_len + 1) {
        let (kind, encoded) = match chunk.split_first() {
            Some((kind, rest)) => (*kind, rest),
            None => break,
        };
        let mut row = encoded.to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bytes_per_pixel {
                row[i - bytes_per_pixel]
            } else {
                0
            };
            let up = previous[i];
            let upper_left = if i >= bytes_per_pixel {
                previous[i - bytes_per_pixel]
            } else {
                0
            };
            row[i] = match kind {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, upper_left)),
                other => {
                    return Err(ParseError::StreamDecodeError(format!(
                        "Unknown PNG predictor type {other}"
                    )))
                }
            };
        }

        out.extend_from_slice(&row);
        previous = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Decode ASCIIHexDecode data
fn decode_ascii_hex(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut pending: Option<u8> = None;

    for &ch in data.iter().filter(|b| !b.is_ascii_whitespace()) {
        if ch == b'>' {
            break;
        }
        let value = (ch as char).to_digit(16).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", ch as char))
        })? as u8;
        match pending.take() {
            Some(high) => result.push((high << 4) | value),
            None => pending = Some(value),
        }
    }

    // Odd number of digits, pad with 0
    if let Some(high) = pending {
        result.push(high << 4);
    }

    Ok(result)
}

/// Decode ASCII85Decode data
fn decode_ascii85(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut body: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if body.starts_with(b"<~") {
        body.drain(..2);
    }

    let mut result = Vec::new();
    let mut group = Vec::with_capacity(5);
    let mut iter = body.iter().copied();

    while let Some(c) = iter.next() {
        match c {
            b'~' => {
                if iter.next() == Some(b'>') {
                    break;
                }
                return Err(ParseError::StreamDecodeError(
                    "Invalid ASCII85 end marker".to_string(),
                ));
            }
            // Special case: 'z' represents four zero bytes
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(c);
                if group.len() == 5 {
                    result.extend_from_slice(&ascii85_group(&group).to_be_bytes());
                    group.clear();
                }
            }
            _ => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )));
            }
        }
    }

    // Handle incomplete final group
    if !group.is_empty() {
        let original_len = group.len();
        group.resize(5, b'u');
        let bytes = ascii85_group(&group).to_be_bytes();
        result.extend_from_slice(&bytes[..original_len - 1]);
    }

    Ok(result)
}

fn ascii85_group(group: &[u8]) -> u32 {
    group
        .iter()
        .fold(0u32, |acc, &ch| acc.wrapping_mul(85).wrapping_add(u32::from(ch - b'!')))
}

//! Object serialization (ISO 32000-1 Section 7.3).
//!
//! Output is deterministic: dictionaries keep insertion order and numbers
//! always format the same way, so identical call sequences produce
//! identical bytes.

use crate::objects::Object;
use chrono::{DateTime, Utc};
use std::io::{self, Write};

/// Format a number the way content streams and objects expect it:
/// at most six decimals, no trailing zeros, integers without a point.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Literal string body with `(`, `)`, `\` and line breaks escaped
pub fn escape_string(bytes: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(bytes.len() + 2);
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => {
                escaped.push(b'\\');
                escaped.push(byte);
            }
            b'\r' => escaped.extend_from_slice(b"\\r"),
            b'\n' => escaped.extend_from_slice(b"\\n"),
            _ => escaped.push(byte),
        }
    }
    escaped
}

/// Name body with irregular characters written as `#xx`
pub fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for ch in name.chars() {
        let code = ch as u32;
        let regular = (0x21..=0x7E).contains(&code)
            && !matches!(
                ch,
                '#' | '(' | ')' | '<' | '>' | '[' | ']' | '{' | '}' | '/' | '%'
            );
        if regular {
            escaped.push(ch);
        } else if code <= 0xFF {
            escaped.push_str(&format!("#{code:02X}"));
        } else {
            for byte in ch.to_string().bytes() {
                escaped.push_str(&format!("#{byte:02X}"));
            }
        }
    }
    escaped
}

/// Text string object: plain bytes for ASCII, UTF-16BE with a byte order
/// mark otherwise.
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec());
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes)
}

/// Write one object value (not the `obj`/`endobj` wrapper).
pub fn write_value<W: Write>(out: &mut W, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => out.write_all(b"null"),
        Object::Boolean(b) => out.write_all(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.write_all(i.to_string().as_bytes()),
        Object::Real(f) => out.write_all(format_number(*f).as_bytes()),
        Object::String(s) => {
            out.write_all(b"(")?;
            out.write_all(&escape_string(s))?;
            out.write_all(b")")
        }
        Object::Name(n) => {
            out.write_all(b"/")?;
            out.write_all(escape_name(n).as_bytes())
        }
        Object::Array(arr) => {
            out.write_all(b"[")?;
            for (i, obj) in arr.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                write_value(out, obj)?;
            }
            out.write_all(b"]")
        }
        Object::Dictionary(dict) => {
            out.write_all(b"<<")?;
            for (key, value) in dict.entries() {
                out.write_all(b"\n/")?;
                out.write_all(escape_name(key).as_bytes())?;
                out.write_all(b" ")?;
                write_value(out, value)?;
            }
            out.write_all(b"\n>>")
        }
        Object::Stream(dict, data) => {
            let mut dict = dict.clone();
            dict.set("Length", data.len());
            write_value(out, &Object::Dictionary(dict))?;
            out.write_all(b"\nstream\n")?;
            out.write_all(data)?;
            out.write_all(b"\nendstream")
        }
        Object::Reference(id) => write!(out, "{} {} R", id.number(), id.generation()),
    }
}

/// Serialize a value into a fresh buffer
pub fn to_bytes(object: &Object) -> Vec<u8> {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_value(&mut buffer, object);
    buffer
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSSOHH'mm)
pub fn format_pdf_date(date: DateTime<Utc>) -> String {
    // For UTC, the offset is always +00'00
    let formatted = date.format("D:%Y%m%d%H%M%S");
    format!("{formatted}+00'00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Dictionary, ObjectId};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn text(object: &Object) -> String {
        String::from_utf8(to_bytes(object)).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(0.1234567), "0.123457");
        assert_eq!(format_number(-2.25), "-2.25");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn test_write_scalars() {
        assert_eq!(text(&Object::Null), "null");
        assert_eq!(text(&Object::Boolean(true)), "true");
        assert_eq!(text(&Object::Integer(-42)), "-42");
        assert_eq!(text(&Object::Real(612.0)), "612");
        assert_eq!(text(&Object::Reference(ObjectId::new(7, 0))), "7 0 R");
    }

    #[test]
    fn test_write_special_characters_in_strings() {
        let object = Object::String(b"a (b) c\\d\ne".to_vec());
        assert_eq!(text(&object), "(a \\(b\\) c\\\\d\\ne)");
    }

    #[test]
    fn test_write_names_with_special_chars() {
        assert_eq!(text(&Object::name("Type")), "/Type");
        assert_eq!(text(&Object::name("A B")), "/A#20B");
        assert_eq!(text(&Object::name("x#y")), "/x#23y");
    }

    #[test]
    fn test_write_dictionary_in_insertion_order() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        dict.set("Count", 3);
        dict.set("Kids", Object::Array(vec![Object::Reference(ObjectId::new(4, 0))]));
        assert_eq!(
            text(&Object::Dictionary(dict)),
            "<<\n/Type /Page\n/Count 3\n/Kids [4 0 R]\n>>"
        );
    }

    #[test]
    fn test_write_stream_sets_length() {
        let object = Object::Stream(Dictionary::new(), b"q Q".to_vec());
        assert_eq!(text(&object), "<<\n/Length 3\n>>\nstream\nq Q\nendstream");
    }

    #[test]
    fn test_text_string() {
        assert_eq!(text_string("Report"), Object::String(b"Report".to_vec()));
        assert_eq!(
            text_string("\u{e9}"),
            Object::String(vec![0xFE, 0xFF, 0x00, 0xE9])
        );
    }

    #[test]
    fn test_format_pdf_date() {
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();
        assert_eq!(format_pdf_date(date), "D:20240309140530+00'00");
    }

    proptest::proptest! {
        #[test]
        fn test_formatted_numbers_lex_back(value in -1.0e6f64..1.0e6) {
            let formatted = format_number(value);
            let mut lexer = crate::parser::lexer::Lexer::new(formatted.as_bytes());
            let parsed = match lexer.next_token().unwrap() {
                crate::parser::lexer::Token::Integer(n) => n as f64,
                crate::parser::lexer::Token::Real(r) => r,
                other => panic!("unexpected token {other:?}"),
            };
            proptest::prop_assert!((parsed - value).abs() <= 1.0e-6);
        }
    }
}

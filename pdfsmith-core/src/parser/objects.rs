//! PDF Object Parser
//!
//! Builds [`Object`] values from lexer tokens, including indirect objects
//! and their stream payloads (ISO 32000-1 Section 7.3).

use super::lexer::{is_whitespace, Lexer, Token};
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};

/// Maximum nesting of arrays and dictionaries
const MAX_DEPTH: usize = 256;

/// Resolves an indirect `/Length` while a stream is being parsed.
pub type LengthResolver<'r> = &'r dyn Fn(ObjectId) -> Option<usize>;

pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8], offset: usize) -> Self {
        Self {
            lexer: Lexer::at(data, offset),
        }
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Parse one direct object at the current position
    pub fn parse_object(&mut self) -> ParseResult<Object> {
        let token = self.lexer.next_significant()?;
        self.parse_from_token(token, 0)
    }

    /// Parse `N G obj ... endobj` at the current position.
    pub fn parse_indirect(
        &mut self,
        lengths: LengthResolver<'_>,
    ) -> ParseResult<(ObjectId, Object)> {
        let start = self.lexer.position();
        let number = self.expect_integer("object number")?;
        let generation = self.expect_integer("generation number")?;
        match self.lexer.next_significant()? {
            Token::Obj => {}
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "obj".to_string(),
                    found: format!("{other:?}"),
                })
            }
        }

        let number = u32::try_from(number)
            .map_err(|_| ParseError::syntax(start, "Negative object number"))?;
        let generation = u16::try_from(generation)
            .map_err(|_| ParseError::syntax(start, "Invalid generation number"))?;
        let id = ObjectId::new(number, generation);

        let object = self.parse_object()?;

        let saved = self.lexer.position();
        match self.lexer.next_significant()? {
            Token::Stream => {
                let dict = match object {
                    Object::Dictionary(dict) => dict,
                    _ => {
                        return Err(ParseError::syntax(
                            saved,
                            "Stream keyword after a non-dictionary",
                        ))
                    }
                };
                let data = self.read_stream_data(&dict, lengths)?;
                self.skip_endobj();
                Ok((id, Object::Stream(dict, data)))
            }
            Token::EndObj => Ok((id, object)),
            _ => {
                // Missing endobj is common enough to tolerate
                self.lexer.seek(saved);
                Ok((id, object))
            }
        }
    }

    fn skip_endobj(&mut self) {
        let saved = self.lexer.position();
        if !matches!(self.lexer.next_significant(), Ok(Token::EndObj)) {
            self.lexer.seek(saved);
        }
    }

    fn read_stream_data(
        &mut self,
        dict: &Dictionary,
        lengths: LengthResolver<'_>,
    ) -> ParseResult<Vec<u8>> {
        self.lexer.skip_stream_eol();
        let start = self.lexer.position();
        let data = self.lexer.data();

        let declared = match dict.get("Length") {
            Some(Object::Integer(length)) => usize::try_from(*length).ok(),
            Some(Object::Reference(id)) => lengths(*id),
            _ => None,
        };

        if let Some(length) = declared {
            let end = start.saturating_add(length);
            if end <= data.len() && ends_stream_at(data, end) {
                self.lexer.seek(end);
                if matches!(self.lexer.next_significant()?, Token::EndStream) {
                    return Ok(data[start..end].to_vec());
                }
            }
        }

        // Length missing or wrong: fall back to scanning for the keyword
        let keyword_at = find(&data[start..], b"endstream")
            .map(|found| start + found)
            .ok_or_else(|| ParseError::syntax(start, "Unterminated stream"))?;
        let mut end = keyword_at;
        if end > start && data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && data[end - 1] == b'\r' {
            end -= 1;
        }
        self.lexer.seek(keyword_at + b"endstream".len());
        Ok(data[start..end].to_vec())
    }

    fn expect_integer(&mut self, what: &str) -> ParseResult<i64> {
        match self.lexer.next_significant()? {
            Token::Integer(value) => Ok(value),
            other => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    fn parse_from_token(&mut self, token: Token, depth: usize) -> ParseResult<Object> {
        if depth > MAX_DEPTH {
            return Err(ParseError::syntax(
                self.lexer.position(),
                "Objects nested too deeply",
            ));
        }

        match token {
            Token::Null => Ok(Object::Null),
            Token::Boolean(value) => Ok(Object::Boolean(value)),
            Token::Integer(value) => Ok(self.integer_or_reference(value)),
            Token::Real(value) => Ok(Object::Real(value)),
            Token::String(bytes) => Ok(Object::String(bytes)),
            Token::Name(name) => Ok(Object::Name(name)),
            Token::ArrayStart => self.parse_array(depth),
            Token::DictStart => self.parse_dictionary(depth).map(Object::Dictionary),
            other => Err(ParseError::UnexpectedToken {
                expected: "object".to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    /// `N G R` is only known to be a reference after two more tokens
    fn integer_or_reference(&mut self, value: i64) -> Object {
        let saved = self.lexer.position();
        if let (Ok(Token::Integer(generation)), Ok(Token::Keyword(keyword))) =
            (self.lexer.next_significant(), self.lexer.next_significant())
        {
            if keyword == "R" {
                if let (Ok(number), Ok(generation)) =
                    (u32::try_from(value), u16::try_from(generation))
                {
                    return Object::Reference(ObjectId::new(number, generation));
                }
            }
        }
        self.lexer.seek(saved);
        Object::Integer(value)
    }

    fn parse_array(&mut self, depth: usize) -> ParseResult<Object> {
        let mut items = Vec::new();
        loop {
            match self.lexer.next_significant()? {
                Token::ArrayEnd => return Ok(Object::Array(items)),
                Token::Eof => {
                    return Err(ParseError::syntax(
                        self.lexer.position(),
                        "Unterminated array",
                    ))
                }
                token => items.push(self.parse_from_token(token, depth + 1)?),
            }
        }
    }

    fn parse_dictionary(&mut self, depth: usize) -> ParseResult<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            match self.lexer.next_significant()? {
                Token::DictEnd => return Ok(dict),
                Token::Name(key) => {
                    let token = self.lexer.next_significant()?;
                    if token == Token::DictEnd {
                        // Key without a value; treat as null and stop
                        dict.set(key, Object::Null);
                        return Ok(dict);
                    }
                    let value = self.parse_from_token(token, depth + 1)?;
                    dict.set(key, value);
                }
                Token::Eof => {
                    return Err(ParseError::syntax(
                        self.lexer.position(),
                        "Unterminated dictionary",
                    ))
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "dictionary key".to_string(),
                        found: format!("{other:?}"),
                    })
                }
            }
        }
    }
}

fn ends_stream_at(data: &[u8], end: usize) -> bool {
    let rest = &data[end..];
    let skip = rest.iter().take_while(|&&b| is_whitespace(b)).count();
    rest[skip..].starts_with(b"endstream")
}

/// Position of the first occurrence of `needle` in `haystack`
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Position of the last occurrence of `needle` in `haystack`
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_lengths(_: ObjectId) -> Option<usize> {
        None
    }

    fn parse(input: &[u8]) -> Object {
        ObjectParser::new(input, 0).parse_object().unwrap()
    }

    #[test]
    fn test_parse_simple_objects() {
        assert_eq!(parse(b"null"), Object::Null);
        assert_eq!(parse(b"42"), Object::Integer(42));
        assert_eq!(parse(b"(text)"), Object::String(b"text".to_vec()));
        assert_eq!(parse(b"/Name"), Object::Name("Name".to_string()));
    }

    #[test]
    fn test_parse_reference_vs_integers() {
        assert_eq!(parse(b"12 0 R"), Object::Reference(ObjectId::new(12, 0)));
        assert_eq!(
            parse(b"[1 2 3]"),
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(2),
                Object::Integer(3)
            ])
        );
        assert_eq!(
            parse(b"[1 0 R 2]"),
            Object::Array(vec![
                Object::Reference(ObjectId::new(1, 0)),
                Object::Integer(2)
            ])
        );
    }

    #[test]
    fn test_parse_dictionary() {
        let object = parse(b"<< /Type /Page /Parent 3 0 R /MediaBox [0 0 612 792] >>");
        let dict = object.as_dict().unwrap();
        assert_eq!(dict.get_type(), Some("Page"));
        assert_eq!(dict.get_reference("Parent"), Some(ObjectId::new(3, 0)));
        assert_eq!(dict.get("MediaBox").unwrap().as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_indirect_object() {
        let input = b"7 0 obj\n<< /A 1 >>\nendobj\n";
        let (id, object) = ObjectParser::new(input, 0)
            .parse_indirect(&no_lengths)
            .unwrap();
        assert_eq!(id, ObjectId::new(7, 0));
        assert_eq!(object.as_dict().unwrap().get_integer("A"), Some(1));
    }

    #[test]
    fn test_parse_stream_with_direct_length() {
        let input = b"1 0 obj\n<< /Length 5 >>\nstream\r\nhello\nendstream\nendobj\n";
        let (_, object) = ObjectParser::new(input, 0)
            .parse_indirect(&no_lengths)
            .unwrap();
        let (_, data) = object.as_stream().unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn test_parse_stream_with_indirect_length() {
        let input = b"1 0 obj\n<< /Length 2 0 R >>\nstream\nabcdef\nendstream\nendobj\n";
        let resolver = |id: ObjectId| (id == ObjectId::new(2, 0)).then_some(6usize);
        let (_, object) = ObjectParser::new(input, 0)
            .parse_indirect(&resolver)
            .unwrap();
        assert_eq!(object.as_stream().unwrap().1, b"abcdef");
    }

    #[test]
    fn test_parse_stream_with_wrong_length_scans() {
        let input = b"1 0 obj\n<< /Length 99 >>\nstream\nabc\nendstream\nendobj\n";
        let (_, object) = ObjectParser::new(input, 0)
            .parse_indirect(&no_lengths)
            .unwrap();
        assert_eq!(object.as_stream().unwrap().1, b"abc");
    }

    #[test]
    fn test_parse_errors() {
        assert!(ObjectParser::new(b"[1 2", 0).parse_object().is_err());
        assert!(ObjectParser::new(b"<< 1 2 >>", 0).parse_object().is_err());
        assert!(ObjectParser::new(b"1 0 foo", 0)
            .parse_indirect(&no_lengths)
            .is_err());
    }

    #[test]
    fn test_find_helpers() {
        assert_eq!(find(b"abcabc", b"bc"), Some(1));
        assert_eq!(rfind(b"abcabc", b"bc"), Some(4));
        assert_eq!(find(b"ab", b"abc"), None);
    }
}

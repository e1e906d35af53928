//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. Works directly
//! on a byte slice so callers can jump to any cross-reference offset.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal)
    String(Vec<u8>),

    /// Name object (e.g., /Type)
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Stream keyword
    Stream,

    /// Endstream keyword
    EndStream,

    /// Obj keyword
    Obj,

    /// Endobj keyword
    EndObj,

    /// StartXRef keyword
    StartXRef,

    /// Any other bare word (R, xref, trailer, n, f, content operators)
    Keyword(String),

    /// Null object
    Null,

    /// Comment (usually ignored)
    Comment(String),

    /// End of input
    Eof,
}

/// PDF whitespace characters (Table 1)
pub fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

/// PDF delimiter characters (Table 2)
pub fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(ch: u8) -> bool {
    !is_whitespace(ch) && !is_delimiter(ch)
}

/// PDF Lexer for tokenizing PDF content
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a lexer positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            position: offset.min(data.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.data.len());
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();

        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'%' => Ok(self.read_comment()),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.position += 1;
                if self.peek_char() == Some(b'>') {
                    self.position += 1;
                    Ok(Token::DictEnd)
                } else {
                    Err(ParseError::syntax(self.position, "Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ if is_regular(ch) => Ok(self.read_keyword()),
            _ => Err(ParseError::syntax(
                self.position,
                format!("Unexpected character: {}", ch as char),
            )),
        }
    }

    /// Next token that is not a comment
    pub fn next_significant(&mut self) -> ParseResult<Token> {
        loop {
            match self.next_token()? {
                Token::Comment(_) => continue,
                token => return Ok(token),
            }
        }
    }

    /// Look at the next significant token without consuming it
    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let saved = self.position;
        let token = self.next_significant();
        self.position = saved;
        token
    }

    fn peek_char(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn consume_char(&mut self) -> Option<u8> {
        let ch = self.peek_char()?;
        self.position += 1;
        Some(ch)
    }

    /// Skip whitespace and return the number of bytes skipped
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.position;
        while matches!(self.peek_char(), Some(ch) if is_whitespace(ch)) {
            self.position += 1;
        }
        self.position - start
    }

    /// Skip the end-of-line marker after a `stream` keyword (CRLF or LF,
    /// a lone CR is tolerated).
    pub fn skip_stream_eol(&mut self) {
        match self.peek_char() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_char() == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    /// Read a comment (from % to end of line)
    fn read_comment(&mut self) -> Token {
        self.position += 1;
        let start = self.position;
        while !matches!(self.peek_char(), None | Some(b'\n') | Some(b'\r')) {
            self.position += 1;
        }
        Token::Comment(String::from_utf8_lossy(&self.data[start..self.position]).into_owned())
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut name = String::new();

        while let Some(ch) = self.peek_char() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;

            // Handle hex codes in names (e.g., /A#20B means /A B)
            if ch == b'#' {
                let digits = self
                    .data
                    .get(self.position..self.position + 2)
                    .and_then(|pair| std::str::from_utf8(pair).ok())
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok());
                match digits {
                    Some(value) => {
                        self.position += 2;
                        name.push(value as char);
                    }
                    None => {
                        return Err(ParseError::syntax(
                            self.position,
                            "Invalid hex code in name",
                        ))
                    }
                }
            } else {
                name.push(ch as char);
            }
        }

        Ok(Token::Name(name))
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut string = Vec::new();
        let mut paren_depth = 1;

        while paren_depth > 0 {
            let ch = self
                .consume_char()
                .ok_or_else(|| ParseError::syntax(self.position, "Unterminated string"))?;

            match ch {
                b'\\' => {
                    let escaped = self
                        .consume_char()
                        .ok_or_else(|| ParseError::syntax(self.position, "Unterminated string"))?;
                    match escaped {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'0'..=b'7' => {
                            // Octal escape sequence
                            let mut value = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match self.peek_char() {
                                    Some(next @ b'0'..=b'7') => {
                                        self.position += 1;
                                        value = value * 8 + u32::from(next - b'0');
                                    }
                                    _ => break,
                                }
                            }
                            string.push((value & 0xFF) as u8);
                        }
                        // Line continuation
                        b'\r' => {
                            if self.peek_char() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        other => string.push(other),
                    }
                }
                b'(' => {
                    string.push(ch);
                    paren_depth += 1;
                }
                b')' => {
                    paren_depth -= 1;
                    if paren_depth > 0 {
                        string.push(ch);
                    }
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        self.position += 1;

        if self.peek_char() == Some(b'<') {
            self.position += 1;
            return Ok(Token::DictStart);
        }

        let mut nibbles = Vec::new();
        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| ParseError::syntax(self.position, "Unterminated hex string"))?;
            match ch {
                b'>' => break,
                _ if is_whitespace(ch) => {}
                _ => {
                    let value = (ch as char).to_digit(16).ok_or_else(|| {
                        ParseError::syntax(self.position, "Invalid character in hex string")
                    })?;
                    nibbles.push(value as u8);
                }
            }
        }

        // Pad with 0 if odd number of digits
        if nibbles.len() % 2 != 0 {
            nibbles.push(0);
        }

        let bytes = nibbles
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair[1])
            .collect();
        Ok(Token::String(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let mut has_dot = false;
        let mut has_digit = false;

        if matches!(self.peek_char(), Some(b'+') | Some(b'-')) {
            self.position += 1;
        }

        while let Some(ch) = self.peek_char() {
            match ch {
                b'0'..=b'9' => has_digit = true,
                b'.' if !has_dot => has_dot = true,
                _ => break,
            }
            self.position += 1;
        }

        if !has_digit {
            return Err(ParseError::syntax(start, "Invalid number"));
        }

        let text = std::str::from_utf8(&self.data[start..self.position])
            .map_err(|_| ParseError::syntax(start, "Invalid number"))?;

        if has_dot {
            // "4." and "-.5" are both legal PDF reals
            let normalized = if text.ends_with('.') {
                format!("{text}0")
            } else {
                text.to_string()
            };
            normalized
                .parse::<f64>()
                .map(Token::Real)
                .map_err(|_| ParseError::syntax(start, format!("Invalid real: {text}")))
        } else {
            match text.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(value)),
                // Out-of-range integers degrade to reals
                Err(_) => text
                    .parse::<f64>()
                    .map(Token::Real)
                    .map_err(|_| ParseError::syntax(start, format!("Invalid integer: {text}"))),
            }
        }
    }

    /// Read a keyword (true, false, null, obj, R, operators, ...)
    fn read_keyword(&mut self) -> Token {
        let start = self.position;
        while matches!(self.peek_char(), Some(ch) if is_regular(ch)) {
            self.position += 1;
        }
        let word = String::from_utf8_lossy(&self.data[start..self.position]);

        match word.as_ref() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            "obj" => Token::Obj,
            "endobj" => Token::EndObj,
            "stream" => Token::Stream,
            "endstream" => Token::EndStream,
            "startxref" => Token::StartXRef,
            _ => Token::Keyword(word.into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            match lexer.next_token().unwrap() {
                Token::Eof => break,
                token => out.push(token),
            }
        }
        out
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens(b"true false null 42 -3.5 .5 4. /Type"),
            vec![
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
                Token::Integer(42),
                Token::Real(-3.5),
                Token::Real(0.5),
                Token::Real(4.0),
                Token::Name("Type".to_string()),
            ]
        );
    }

    #[test]
    fn test_structure_tokens() {
        assert_eq!(
            tokens(b"<< /Kids [1 0 R] >>"),
            vec![
                Token::DictStart,
                Token::Name("Kids".to_string()),
                Token::ArrayStart,
                Token::Integer(1),
                Token::Integer(0),
                Token::Keyword("R".to_string()),
                Token::ArrayEnd,
                Token::DictEnd,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens(b"obj endobj stream endstream startxref xref trailer"),
            vec![
                Token::Obj,
                Token::EndObj,
                Token::Stream,
                Token::EndStream,
                Token::StartXRef,
                Token::Keyword("xref".to_string()),
                Token::Keyword("trailer".to_string()),
            ]
        );
    }

    #[test]
    fn test_literal_strings() {
        assert_eq!(
            tokens(b"(Hello (nested) \\(esc\\) \\101\\n)"),
            vec![Token::String(b"Hello (nested) (esc) A\n".to_vec())]
        );
    }

    #[test]
    fn test_hex_strings() {
        assert_eq!(
            tokens(b"<48 65 6C 6C 6F> <414>"),
            vec![
                Token::String(b"Hello".to_vec()),
                Token::String(vec![0x41, 0x40]),
            ]
        );
    }

    #[test]
    fn test_name_hex_escape() {
        assert_eq!(tokens(b"/A#20B"), vec![Token::Name("A B".to_string())]);
    }

    #[test]
    fn test_comments_are_tokens_but_skippable() {
        let mut lexer = Lexer::new(b"% comment\n12");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Comment(" comment".to_string())
        );
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(12));

        let mut lexer = Lexer::new(b"%a\n%b\n/X");
        assert_eq!(
            lexer.next_significant().unwrap(),
            Token::Name("X".to_string())
        );
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new(b"1 2");
        assert_eq!(lexer.peek_token().unwrap(), Token::Integer(1));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(1));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(2));
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new(b"(unterminated").next_token().is_err());
        assert!(Lexer::new(b"<4G>").next_token().is_err());
        assert!(Lexer::new(b"> x").next_token().is_err());
        assert!(Lexer::new(b"-").next_token().is_err());
    }

    #[test]
    fn test_stream_eol() {
        let mut lexer = Lexer::new(b"\r\nDATA");
        lexer.skip_stream_eol();
        assert_eq!(lexer.position(), 2);

        let mut lexer = Lexer::new(b"\nDATA");
        lexer.skip_stream_eol();
        assert_eq!(lexer.position(), 1);
    }
}

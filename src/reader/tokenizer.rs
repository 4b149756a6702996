//! Tokenizer splitting JSON text into [`Token`]s

use std::fmt::{Display, Formatter};

use log::trace;

use super::{LexError, LexErrorKind, LinePosition, Location};
use crate::json_number::is_valid_json_number;

/// Kind of a [`Token`]
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TokenKind {
    #[allow(missing_docs)]
    BraceOpen,
    #[allow(missing_docs)]
    BraceClose,
    #[allow(missing_docs)]
    BracketOpen,
    #[allow(missing_docs)]
    BracketClose,
    #[allow(missing_docs)]
    Colon,
    #[allow(missing_docs)]
    Comma,
    /// String value or member name
    String,
    /// Number without fraction and exponent which fits into an `i64`
    Integer,
    /// Any other number
    Decimal,
    #[allow(missing_docs)]
    True,
    #[allow(missing_docs)]
    False,
    #[allow(missing_docs)]
    Null,
    /// End of the input; returned repeatedly once the input is exhausted
    End,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenKind::BraceOpen => "'{'",
            TokenKind::BraceClose => "'}'",
            TokenKind::BracketOpen => "'['",
            TokenKind::BracketClose => "']'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::String => "string",
            TokenKind::Integer => "integer",
            TokenKind::Decimal => "decimal",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Null => "'null'",
            TokenKind::End => "end of input",
        };
        f.write_str(s)
    }
}

impl TokenKind {
    /// Whether tokens of this kind are complete values on their own
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            TokenKind::String
                | TokenKind::Integer
                | TokenKind::Decimal
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }
}

/// Value carried by a primitive [`Token`]
#[derive(PartialEq, Clone, Debug)]
pub enum Literal {
    #[allow(missing_docs)]
    String(String),
    #[allow(missing_docs)]
    Integer(i64),
    #[allow(missing_docs)]
    Decimal(f64),
    #[allow(missing_docs)]
    Bool(bool),
    #[allow(missing_docs)]
    Null,
}

/// Lexical unit of JSON text
///
/// Primitive tokens carry a [`Literal`] matching their kind, structural tokens and
/// [`TokenKind::End`] carry none.
#[derive(PartialEq, Clone, Debug)]
pub struct Token {
    kind: TokenKind,
    value: Option<Literal>,
    offset: usize,
}

impl Token {
    fn structural(kind: TokenKind, offset: usize) -> Self {
        Token {
            kind,
            value: None,
            offset,
        }
    }

    fn primitive(kind: TokenKind, value: Literal, offset: usize) -> Self {
        Token {
            kind,
            value: Some(value),
            offset,
        }
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[allow(missing_docs)]
    pub fn value(&self) -> Option<&Literal> {
        self.value.as_ref()
    }

    /// Byte offset of the start of the token within the JSON text
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Gets the string value if this is a [`TokenKind::String`] token
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Some(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn into_value(self) -> Option<Literal> {
        self.value
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(Literal::String(s)) => write!(f, "string {s:?}"),
            Some(Literal::Integer(i)) => write!(f, "integer {i}"),
            Some(Literal::Decimal(d)) => write!(f, "decimal {d}"),
            _ => write!(f, "{}", self.kind),
        }
    }
}

/// Position of the [`Tokenizer`] which can be returned to, see [`Tokenizer::mark`]
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Savepoint {
    index: usize,
}

/// Splits JSON text into [`Token`]s
///
/// Besides reading tokens in forward direction the tokenizer supports returning a single token
/// with [`push_back`](Self::push_back) and returning to an arbitrary earlier position with
/// [`mark`](Self::mark) and [`reset`](Self::reset).
///
/// # Examples
/// ```
/// # use jsongraph::reader::*;
/// let mut tokenizer = Tokenizer::new(r#"{"a": 1}"#);
/// assert_eq!(TokenKind::BraceOpen, tokenizer.next_token()?.kind());
///
/// let name = tokenizer.next_token()?;
/// assert_eq!(Some("a"), name.as_str());
/// tokenizer.push_back(&name);
/// assert_eq!(name, tokenizer.next_token()?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Tokenizer<'j> {
    json: &'j str,
    index: usize,
}

impl<'j> Tokenizer<'j> {
    /// Creates a tokenizer positioned at the start of `json`
    pub fn new(json: &'j str) -> Self {
        Tokenizer { json, index: 0 }
    }

    /// Byte offset of the next char which has not been consumed yet
    pub fn offset(&self) -> usize {
        self.index
    }

    /// Returns the tokenizer to the start of a previously returned token
    ///
    /// The next call to [`next_token`](Self::next_token) returns a token equal to `token`.
    /// Only the most recently returned token should be pushed back.
    pub fn push_back(&mut self, token: &Token) {
        debug_assert!(
            token.offset <= self.index,
            "Incorrect tokenizer usage: Cannot push back token which has not been read yet"
        );
        self.index = token.offset;
    }

    /// Creates a savepoint for the current position
    pub fn mark(&self) -> Savepoint {
        Savepoint { index: self.index }
    }

    /// Returns to the position of the savepoint
    pub fn reset(&mut self, savepoint: Savepoint) {
        self.index = savepoint.index;
    }

    /// Computes the location of the byte `offset` for error messages
    pub(crate) fn location(&self, offset: usize, path: &str) -> Location {
        Location {
            path: path.to_owned(),
            line_pos: LinePosition::of_offset(self.json, offset),
            offset,
        }
    }

    fn error(&self, kind: LexErrorKind, offset: usize) -> LexError {
        LexError {
            kind,
            location: LinePosition::of_offset(self.json, offset),
            offset,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.json.as_bytes().get(self.index).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.peek_byte() {
            self.index += 1;
        }
    }

    /// Reads the next token
    ///
    /// Once the input is exhausted every call returns a [`TokenKind::End`] token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.index;

        let byte = match self.peek_byte() {
            None => return Ok(Token::structural(TokenKind::End, start)),
            Some(byte) => byte,
        };

        let structural_kind = match byte {
            b'{' => Some(TokenKind::BraceOpen),
            b'}' => Some(TokenKind::BraceClose),
            b'[' => Some(TokenKind::BracketOpen),
            b']' => Some(TokenKind::BracketClose),
            b':' => Some(TokenKind::Colon),
            b',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = structural_kind {
            self.index += 1;
            return Ok(Token::structural(kind, start));
        }

        match byte {
            b'"' => {
                self.index += 1;
                let value = self.read_string(start)?;
                Ok(Token::primitive(
                    TokenKind::String,
                    Literal::String(value),
                    start,
                ))
            }
            b'-' | b'0'..=b'9' => self.read_number(start),
            b't' => self.read_keyword("true", TokenKind::True, Literal::Bool(true)),
            b'f' => self.read_keyword("false", TokenKind::False, Literal::Bool(false)),
            b'n' => self.read_keyword("null", TokenKind::Null, Literal::Null),
            _ => Err(self.error(LexErrorKind::UnexpectedCharacter, start)),
        }
    }

    fn read_keyword(
        &mut self,
        keyword: &str,
        kind: TokenKind,
        value: Literal,
    ) -> Result<Token, LexError> {
        let start = self.index;
        if self.json[start..].starts_with(keyword) {
            self.index += keyword.len();
            Ok(Token::primitive(kind, value, start))
        } else {
            Err(self.error(LexErrorKind::InvalidKeyword, start))
        }
    }

    fn read_number(&mut self, start: usize) -> Result<Token, LexError> {
        let mut is_decimal = false;
        // Consume the complete run of number chars and validate it afterwards
        self.index += 1;
        while let Some(byte) = self.peek_byte() {
            match byte {
                b'0'..=b'9' => {}
                b'.' | b'-' | b'+' | b'e' | b'E' => is_decimal = true,
                _ => break,
            }
            self.index += 1;
        }

        let number = &self.json[start..self.index];
        if !is_valid_json_number(number) {
            return Err(self.error(LexErrorKind::MalformedNumber, start));
        }

        if !is_decimal {
            if let Ok(value) = number.parse::<i64>() {
                return Ok(Token::primitive(
                    TokenKind::Integer,
                    Literal::Integer(value),
                    start,
                ));
            }
            trace!("integer {number} exceeds i64 range, reading it as decimal");
        }

        match number.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Token::primitive(
                TokenKind::Decimal,
                Literal::Decimal(value),
                start,
            )),
            _ => Err(self.error(LexErrorKind::MalformedNumber, start)),
        }
    }

    /// Reads the remainder of a string whose opening `"` at `start` has already been consumed
    fn read_string(&mut self, start: usize) -> Result<String, LexError> {
        let mut value = String::new();
        // Start of the chars which have not been copied to `value` yet; escape sequences
        // and the closing `"` are ASCII so slicing there is always at a char boundary
        let mut chunk_start = self.index;

        loop {
            let byte = match self.peek_byte() {
                None => return Err(self.error(LexErrorKind::UnterminatedString, start)),
                Some(byte) => byte,
            };
            match byte {
                b'"' => {
                    value.push_str(&self.json[chunk_start..self.index]);
                    self.index += 1;
                    return Ok(value);
                }
                b'\\' => {
                    value.push_str(&self.json[chunk_start..self.index]);
                    let c = self.read_escape(start)?;
                    value.push(c);
                    chunk_start = self.index;
                }
                0x00..=0x1F => {
                    return Err(self.error(LexErrorKind::NotEscapedControlCharacter, self.index))
                }
                _ => self.index += 1,
            }
        }
    }

    /// Reads an escape sequence, the tokenizer is positioned at its `\`
    fn read_escape(&mut self, string_start: usize) -> Result<char, LexError> {
        let escape_start = self.index;
        self.index += 1;

        let byte = match self.peek_byte() {
            None => return Err(self.error(LexErrorKind::UnterminatedString, string_start)),
            Some(byte) => byte,
        };
        self.index += 1;

        let c = match byte {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => return self.read_unicode_escape_char(escape_start),
            _ => return Err(self.error(LexErrorKind::UnknownEscapeSequence, escape_start)),
        };
        Ok(c)
    }

    /// Reads the 4 hex digits of a `\uXXXX` escape
    fn read_unicode_escape(&mut self, escape_start: usize) -> Result<u32, LexError> {
        let mut c = 0;
        for _ in 0..4 {
            let digit = match self.peek_byte() {
                Some(b @ b'0'..=b'9') => b - b'0',
                Some(b @ b'a'..=b'f') => b - b'a' + 10,
                Some(b @ b'A'..=b'F') => b - b'A' + 10,
                _ => return Err(self.error(LexErrorKind::MalformedEscapeSequence, escape_start)),
            };
            self.index += 1;
            c = c << 4 | u32::from(digit);
        }
        Ok(c)
    }

    /// Reads a Unicode-escaped char, combining UTF-16 surrogate pairs
    ///
    /// The initial `\u` prefix has already been consumed.
    fn read_unicode_escape_char(&mut self, escape_start: usize) -> Result<char, LexError> {
        let mut c = self.read_unicode_escape(escape_start)?;

        // Unpaired low surrogate
        if (0xDC00..=0xDFFF).contains(&c) {
            return Err(self.error(
                LexErrorKind::UnpairedSurrogatePairEscapeSequence,
                escape_start,
            ));
        }
        // If char is high surrogate, expect Unicode-escaped low surrogate
        if (0xD800..=0xDBFF).contains(&c) {
            if !self.json[self.index..].starts_with("\\u") {
                return Err(self.error(
                    LexErrorKind::UnpairedSurrogatePairEscapeSequence,
                    escape_start,
                ));
            }
            self.index += 2;
            let c2 = self.read_unicode_escape(escape_start)?;
            if !(0xDC00..=0xDFFF).contains(&c2) {
                return Err(self.error(
                    LexErrorKind::UnpairedSurrogatePairEscapeSequence,
                    escape_start,
                ));
            }

            c = ((c - 0xD800) << 10 | (c2 - 0xDC00)) + 0x10000;
        }

        // unwrap() here should be safe since checks above made sure this is a valid Rust `char`
        Ok(char::from_u32(c).unwrap())
    }
}

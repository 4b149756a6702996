//! Module for parsing JSON text into object graphs
//!
//! Parsing is split into the [`Tokenizer`], which lexes the JSON text, the [`TypeResolver`]
//! which decides which [`TargetType`](crate::bean::TargetType) to instantiate for nested JSON
//! objects and arrays, and the object builder which populates maps, sequences and beans.
//! The entry points are the `parse` methods of [`Codec`](crate::Codec).

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::value::ConversionError;

mod parser;
pub mod path;
pub mod resolver;
pub mod tokenizer;

pub(crate) use parser::Parser;
pub use resolver::{DiscriminatorSpec, Discriminators, TypeHintTable, TypeResolver};
pub use tokenizer::{Literal, Savepoint, Token, TokenKind, Tokenizer};

/// Line and column position
///
/// # Examples
/// Consider the following JSON document:
/// ```json
/// {
///   "a": null
/// }
/// ```
/// The position of `null` is:
/// - line: 1
///   Line numbering starts at 0 and it is in the second line
/// - column: 7
///   Column numbering starts at 0 and the `n` of `null` is the 8th character in that line,
///   respectively there are 7 characters in front of it
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct LinePosition {
    /// Line number, starting at 0
    ///
    /// The characters _CR_ (U+000D), _LF_ (U+000A) and _CR LF_ are considered line breaks. Escaped
    /// line breaks in member names and string values are not considered line breaks.
    pub line: u64,
    /// Character column within the current line, starting at 0
    ///
    /// For all Unicode characters this value is incremented only by one, regardless of how many
    /// bytes the UTF-8 encoding of the character uses.
    pub column: u64,
}

impl LinePosition {
    /// Computes the position of the byte `offset` within `json`
    ///
    /// `offset` must be at a char boundary; chars at and after it are ignored.
    pub(crate) fn of_offset(json: &str, offset: usize) -> LinePosition {
        let mut line = 0;
        let mut column = 0;
        let mut previous_cr = false;

        for (index, c) in json.char_indices() {
            if index >= offset {
                break;
            }
            match c {
                '\r' => {
                    line += 1;
                    column = 0;
                }
                // LF directly after CR is part of the same line break
                '\n' if previous_cr => {}
                '\n' => {
                    line += 1;
                    column = 0;
                }
                _ => column += 1,
            }
            previous_cr = c == '\r';
        }
        LinePosition { line, column }
    }
}

impl Display for LinePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Location in the JSON document where a parse error occurred
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Location {
    /// Structural path of the value which was being parsed
    ///
    /// The root value has the empty path `""`, object members append `.name` and array
    /// items append `[]`, for example `.rows[].value`. This is the same notation which is
    /// used for [type hints](crate::Codec::add_type_hint).
    pub path: String,
    /// Line and column of the token where the error occurred
    pub line_pos: LinePosition,
    /// Byte offset of the token where the error occurred
    pub offset: usize,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "path '{}', {} (offset {})",
            self.path, self.line_pos, self.offset
        )
    }
}

/// Error which occurred while lexing the JSON text
#[derive(Error, PartialEq, Eq, Clone, Debug)]
#[error("JSON lex error {kind} at {location} (offset {offset})")]
pub struct LexError {
    /// Kind of the error
    pub kind: LexErrorKind,
    /// Line and column where the error occurred
    pub location: LinePosition,
    /// Byte offset where the error occurred
    pub offset: usize,
}

/// Describes why a lex error occurred
#[non_exhaustive]
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum LexErrorKind {
    /// The input ended before the closing `"` of a string
    UnterminatedString,
    /// An unknown escape sequence (`\...`) was encountered
    UnknownEscapeSequence,
    /// A malformed escape sequence was encountered, for example `\u00` instead of `\u0000`
    MalformedEscapeSequence,
    /// An unpaired UTF-16 surrogate was encountered in a string
    ///
    /// Since Rust strings must consist of valid UTF-8 data, UTF-16 surrogate characters in the form
    /// of escape sequences (`\uXXXX`) must always form a valid surrogate pair, for example
    /// `\uDBFF\uDFFF`.
    UnpairedSurrogatePairEscapeSequence,
    /// A control character was encountered in the raw JSON data of a string
    ///
    /// Unicode characters in the range from `0x00` to `0x1F` (inclusive) must be escaped.
    NotEscapedControlCharacter,
    /// A literal is incomplete or invalid, for example `tru` instead of `true`
    InvalidKeyword,
    /// A JSON number is malformed, for example `01`, or its value is too large for an `f64`
    MalformedNumber,
    /// A character which cannot start any token was encountered
    UnexpectedCharacter,
}

/// Error which occurred because the tokens do not form the expected structure
#[derive(Error, PartialEq, Eq, Clone, Debug)]
#[error("{kind}, found {found} at {location}")]
pub struct SyntaxError {
    /// Kind of the error
    pub kind: SyntaxErrorKind,
    /// Kind of the token which caused the error
    pub found: TokenKind,
    /// Location of that token
    pub location: Location,
}

/// Describes why a syntax error occurred
#[non_exhaustive]
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum SyntaxErrorKind {
    /// A token was encountered which is not allowed at this position
    UnexpectedToken {
        /// Kinds of the tokens which would have been allowed
        expected: &'static [TokenKind],
    },
    /// A JSON array was encountered where the target is not a sequence
    ArrayIntoNonSequence,
    /// A JSON object was encountered where the target is a sequence
    ObjectIntoSequence,
    /// The JSON document does not start with `{` or `[`
    NotAContainer,
    /// Unexpected trailing data was detected after the root value
    TrailingData,
    /// JSON arrays and objects are nested deeper than allowed by
    /// [`ParserSettings::max_nesting_depth`]
    NestingTooDeep,
}

impl Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxErrorKind::UnexpectedToken { expected } => {
                write!(f, "expected ")?;
                for (index, kind) in expected.iter().enumerate() {
                    if index > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{kind}")?;
                }
                Ok(())
            }
            SyntaxErrorKind::ArrayIntoNonSequence => write!(f, "array for non-sequence target"),
            SyntaxErrorKind::ObjectIntoSequence => write!(f, "object for sequence target"),
            SyntaxErrorKind::NotAContainer => write!(f, "expected object or array as root"),
            SyntaxErrorKind::TrailingData => write!(f, "trailing data after root value"),
            SyntaxErrorKind::NestingTooDeep => write!(f, "maximum nesting depth exceeded"),
        }
    }
}

/// Error which occurred while parsing JSON text
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParseError {
    /// The JSON text could not be lexed
    #[error("{error} (path '{path}')")]
    LexError {
        /// The lex error
        error: LexError,
        /// Structural path of the value which was being parsed
        path: String,
    },
    /// A syntax error was encountered
    #[error("syntax error: {0}")]
    SyntaxError(#[from] SyntaxError),
    /// The discriminator value of a JSON object has no mapped type and the
    /// [`DiscriminatorSpec`] does not allow undefined values
    #[error("no type for discriminator '{field}' value '{value}' at {location}")]
    TypeResolutionError {
        /// Name of the discriminator field
        field: String,
        /// The unmapped value, respectively its JSON text if it is not a string
        value: String,
        /// Location of the discriminator value
        location: Location,
    },
    /// A JSON member could not be assigned because the target bean has neither a property
    /// nor any other sink for it
    #[error("cannot set member '{name}' on {target} at {location}")]
    PropertyError {
        /// Name of the JSON member
        name: String,
        /// Name of the target type
        target: String,
        /// Location of the member name
        location: Location,
    },
    /// A parsed value could not be converted to the type of its property
    #[error("{error} at {location}")]
    ConversionError {
        /// Name of the JSON member, `None` for the root value and for accumulated items
        name: Option<String>,
        /// The conversion error
        error: ConversionError,
        /// Location of the value
        location: Location,
    },
}

/// Settings to customize the parser behavior
///
/// These settings are used by [`Codec::new_custom`](crate::Codec::new_custom). To avoid repeating
/// the default values for unchanged settings `..Default::default()` can be used:
/// ```
/// # use jsongraph::reader::ParserSettings;
/// ParserSettings {
///     max_nesting_depth: 64,
///     // For all other settings use the default
///     ..Default::default()
/// }
/// # ;
/// ```
#[derive(Clone, Debug)]
pub struct ParserSettings {
    /// Maximum nesting depth of JSON arrays and objects
    ///
    /// The root value has depth 1. Exceeding the depth causes a
    /// [`SyntaxErrorKind::NestingTooDeep`] error. This protects against stack overflows
    /// for malicious input.
    pub max_nesting_depth: u32,
}

impl Default for ParserSettings {
    /// Creates the default parser settings
    ///
    /// - max nesting depth: 256
    fn default() -> Self {
        ParserSettings {
            max_nesting_depth: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_position() {
        let json = "{\n  \"a\": 1,\r\n \"b\":\r2\u{e4}x}";
        let position = |offset| LinePosition::of_offset(json, offset);
        assert_eq!(LinePosition { line: 0, column: 0 }, position(0));
        assert_eq!(LinePosition { line: 1, column: 2 }, position(json.find("\"a\"").unwrap()));
        // CR LF is a single line break
        assert_eq!(LinePosition { line: 2, column: 1 }, position(json.find("\"b\"").unwrap()));
        assert_eq!(LinePosition { line: 3, column: 0 }, position(json.find('2').unwrap()));
        // Multi-byte char counts as one column
        assert_eq!(LinePosition { line: 3, column: 2 }, position(json.find('x').unwrap()));
    }

    #[test]
    fn error_display() {
        let location = Location {
            path: ".rows[]".to_owned(),
            line_pos: LinePosition { line: 0, column: 12 },
            offset: 12,
        };
        assert_eq!("path '.rows[]', line 0, column 12 (offset 12)", location.to_string());

        let error = SyntaxError {
            kind: SyntaxErrorKind::UnexpectedToken {
                expected: &[TokenKind::Comma, TokenKind::BracketClose],
            },
            found: TokenKind::Colon,
            location,
        };
        assert_eq!(
            "expected ',' or ']', found ':' at path '.rows[]', line 0, column 12 (offset 12)",
            error.to_string()
        );
    }
}

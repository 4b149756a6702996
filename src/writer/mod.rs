//! Module for writing object graphs as JSON text
//!
//! Serialization is performed by the `serialize` methods of [`Codec`](crate::Codec). This
//! module contains the settings and errors of the serializer, as well as the standalone
//! helpers [`quote`] and [`pretty_print`].
//!
//! The written JSON text consists only of printable ASCII characters: all other characters
//! are written as `\uXXXX` escape sequences, and `/` is always escaped.

use thiserror::Error;

use crate::bean::Bean;

mod serializer;

pub(crate) use serializer::Serializer;

/// Error which occurred while serializing a value
#[non_exhaustive]
#[derive(Error, PartialEq, Clone, Debug)]
pub enum SerializeError {
    /// A floating point number is NaN or infinite, which cannot be represented in JSON
    #[error("non-finite number {value} at path '{path}'")]
    NonFiniteNumber {
        /// The number
        value: f64,
        /// Structural path of the number, in the notation used for parse errors
        path: String,
    },
    /// Values are nested deeper than allowed by [`SerializerSettings::max_nesting_depth`]
    #[error("maximum nesting depth {max_depth} exceeded at path '{path}'")]
    NestingTooDeep {
        /// The maximum nesting depth
        max_depth: u32,
        /// Structural path of the container which exceeded the depth
        path: String,
    },
}

/// Settings to customize the serializer behavior
///
/// These settings are used by [`Codec::new_custom`](crate::Codec::new_custom). To avoid repeating
/// the default values for unchanged settings `..Default::default()` can be used:
/// ```
/// # use jsongraph::writer::SerializerSettings;
/// SerializerSettings {
///     max_nesting_depth: 32,
///     // For all other settings use the default
///     ..Default::default()
/// }
/// # ;
/// ```
#[derive(Clone, Debug)]
pub struct SerializerSettings {
    /// Maximum nesting depth of sequences, maps and beans
    ///
    /// The root value has depth 1. Exceeding the depth causes a
    /// [`SerializeError::NestingTooDeep`] error.
    pub max_nesting_depth: u32,
}

impl Default for SerializerSettings {
    /// Creates the default serializer settings
    ///
    /// - max nesting depth: 256
    fn default() -> Self {
        SerializerSettings {
            max_nesting_depth: 256,
        }
    }
}

/// Function which writes the complete JSON text of a bean
///
/// Registered with [`Codec::register_custom_serializer`](crate::Codec::register_custom_serializer).
/// The returned text is written verbatim, it is not validated.
pub type CustomSerializer = Box<dyn Fn(&dyn Bean) -> String + Send + Sync>;

fn should_escape(c: char) -> bool {
    matches!(c, '"' | '\\' | '/') || !matches!(c, ' '..='~')
}

fn write_escaped_char(out: &mut String, c: char) {
    fn write_unicode_escape(out: &mut String, value: u32) {
        // For convenience `value` is u32, but it is actually u16
        debug_assert!(value <= u16::MAX as u32);

        fn to_hex(i: u32) -> char {
            match i {
                0..=9 => (b'0' + i as u8) as char,
                10..=15 => (b'a' + (i - 10) as u8) as char,
                _ => unreachable!("Unexpected value {i}"),
            }
        }

        out.push_str("\\u");
        for shift in [12, 8, 4, 0] {
            out.push(to_hex(value >> shift & 15));
        }
    }

    let escape = match c {
        '"' => "\\\"",
        '\\' => "\\\\",
        '/' => "\\/",
        '\u{0008}' => "\\b",
        '\u{000C}' => "\\f",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        '\0'..='\u{FFFF}' => {
            write_unicode_escape(out, c as u32);
            return;
        }
        _ => {
            // Encode as surrogate pair
            let temp = (c as u32) - 0x10000;
            let high = (temp >> 10) + 0xD800;
            let low = (temp & ((1 << 10) - 1)) + 0xDC00;

            write_unicode_escape(out, high);
            write_unicode_escape(out, low);
            return;
        }
    };
    out.push_str(escape);
}

/// Writes `value` as quoted JSON string to `out`
pub(crate) fn write_string(out: &mut String, value: &str) {
    out.push('"');
    let mut next_to_write_index = 0;

    for (index, char) in value.char_indices() {
        if should_escape(char) {
            if index > next_to_write_index {
                out.push_str(&value[next_to_write_index..index]);
            }
            write_escaped_char(out, char);
            next_to_write_index = index + char.len_utf8();
        }
    }
    // Write remaining chars
    if next_to_write_index < value.len() {
        out.push_str(&value[next_to_write_index..]);
    }
    out.push('"');
}

/// Quotes a string as JSON string value
///
/// The escaping is the same one the serializer uses: `"`, `\` and `/` are escaped, control
/// characters use their short escape sequence if there is one, and every other character
/// outside of printable ASCII is written as `\uXXXX` escape sequence (supplementary
/// characters as surrogate pair).
///
/// # Examples
/// ```
/// # use jsongraph::writer::quote;
/// assert_eq!(r#""a\"b\/c""#, quote("a\"b/c"));
/// assert_eq!(r#""\u00e9\n""#, quote("\u{e9}\n"));
/// ```
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    write_string(&mut out, value);
    out
}

/// Indentation per nesting level of [`pretty_print`]
const INDENT: &str = "  ";

fn push_line_break(out: &mut String, indent: usize) {
    out.push('\n');
    for _ in 0..indent {
        out.push_str(INDENT);
    }
}

/// Reformats compact JSON text for human readers
///
/// A line break is inserted after every `{`, `[` and `,`, and in front of every `}` and `]`;
/// nested lines are indented by two spaces per level. On top of these line breaks a space is
/// added after the `:` of object members, and empty arrays and objects stay on one line as
/// `[]` and `{}` instead of being split around an empty line. Both only change whitespace, so
/// the result parses to the same value as the input.
///
/// Characters inside string values are not affected, and whitespace outside of string values
/// is replaced. The text is not validated; for malformed JSON the result is unspecified but
/// this function does not panic.
///
/// # Examples
/// ```
/// # use jsongraph::writer::pretty_print;
/// let pretty = pretty_print(r#"{"a":[1,2],"b":"x,{y}","c":{}}"#);
/// assert_eq!(
///     pretty,
///     "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": \"x,{y}\",\n  \"c\": {}\n}"
/// );
/// ```
pub fn pretty_print(compact: &str) -> String {
    let mut out = String::with_capacity(compact.len() * 2);
    let mut indent: usize = 0;
    let mut in_string = false;
    let mut is_escaped = false;
    let mut chars = compact.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if is_escaped {
                is_escaped = false;
            } else if c == '\\' {
                is_escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                out.push(c);
                let close = if c == '{' { '}' } else { ']' };
                // Skip whitespace to detect empty containers
                while chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                    chars.next();
                }
                if chars.peek() == Some(&close) {
                    chars.next();
                    out.push(close);
                } else {
                    indent += 1;
                    push_line_break(&mut out, indent);
                }
            }
            '}' | ']' => {
                indent = indent.saturating_sub(1);
                push_line_break(&mut out, indent);
                out.push(c);
            }
            ',' => {
                out.push(c);
                push_line_break(&mut out, indent);
            }
            ':' => out.push_str(": "),
            ' ' | '\t' | '\n' | '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

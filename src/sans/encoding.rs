//! Delimiter table and escape sequence codec.

use alloc::{borrow::Cow, string::String, sync::Arc, vec::Vec};
use core::fmt::Write;

use spin::{Lazy, Mutex};
use thiserror::Error;
use tracing::debug;

/// The standard delimiter definition, in header order: field, component,
/// repetition, escape and subcomponent.
pub const DEFAULT_DELIMITERS: &str = "|^~\\&";

/// Number of characters in a delimiter definition.
pub const DELIMITER_LENGTH: usize = 5;

pub(crate) const FIELD: usize = 0;
pub(crate) const COMPONENT: usize = 1;
pub(crate) const REPETITION: usize = 2;
pub(crate) const ESCAPE: usize = 3;
pub(crate) const SUBCOMPONENT: usize = 4;

/// Number of non-default encodings retained for reuse. Beyond this, the
/// oldest is forgotten.
pub const CACHE_CAPACITY: usize = 8;

static DEFAULT: Lazy<Arc<Encoding>> = Lazy::new(|| {
    Arc::new(Encoding {
        delimiters: String::from(DEFAULT_DELIMITERS),
    })
});

static CACHE: Mutex<Vec<Arc<Encoding>>> = Mutex::new(Vec::new());

/// An error constructing an encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// No delimiters were supplied.
    #[error("No delimiters supplied.")]
    Empty,
    /// The wrong number of delimiters were supplied.
    #[error("Expected 5 delimiters, found {0}.")]
    Length(usize),
    /// A delimiter does not fit in a single byte.
    #[error("Delimiters must be single-byte characters.")]
    NotSingleByte,
    /// The same character was supplied for two delimiters.
    #[error("Delimiter {0:?} is used more than once.")]
    Duplicate(char),
}

/// An error resolving escape sequences.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// An escape character was opened but never closed.
    #[error("Incomplete escape sequence at offset {0}.")]
    IncompleteEscapeSequence(usize),
    /// A hexadecimal escape held something other than hexadecimal digits.
    #[error("Invalid hexadecimal escape sequence {0:?}.")]
    InvalidHex(String),
}

/// The delimiters and escape character used by one message.
///
/// Encodings are shared between the elements they produce. Construct them
/// with [`Encoding::create`], which hands out a single instance for the
/// standard delimiters.
#[derive(Debug, PartialEq, Eq)]
pub struct Encoding {
    delimiters: String,
}

impl Encoding {
    /// The value marking a field as present but null.
    pub const PRESENT_BUT_NULL: &'static str = "\"\"";

    /// Build a new, unshared encoding from a delimiter definition.
    pub fn new(delimiters: &str) -> Result<Self, EncodingError> {
        if delimiters.is_empty() {
            Err(EncodingError::Empty)?;
        }

        if !delimiters.is_ascii() {
            Err(EncodingError::NotSingleByte)?;
        }

        if delimiters.len() != DELIMITER_LENGTH {
            Err(EncodingError::Length(delimiters.len()))?;
        }

        let bytes = delimiters.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if bytes[i + 1..].contains(b) {
                Err(EncodingError::Duplicate(*b as char))?;
            }
        }

        Ok(Self {
            delimiters: String::from(delimiters),
        })
    }

    /// Retrieve an encoding for a delimiter definition.
    ///
    /// Returns the shared standard instance when the definition matches
    /// [`DEFAULT_DELIMITERS`] exactly. Other definitions yield a distinct
    /// instance, reused on a best-effort basis for repeated definitions.
    pub fn create(delimiters: &str) -> Result<Arc<Self>, EncodingError> {
        if delimiters == DEFAULT_DELIMITERS {
            return Ok(Self::standard());
        }

        let mut cache = CACHE.lock();

        if let Some(encoding) = cache.iter().find(|e| e.delimiters == delimiters) {
            return Ok(Arc::clone(encoding));
        }

        let encoding = Arc::new(Self::new(delimiters)?);

        if cache.len() == CACHE_CAPACITY {
            cache.remove(0);
        }
        cache.push(Arc::clone(&encoding));

        debug!(delimiters, "cached non-default encoding");

        Ok(encoding)
    }

    /// The shared encoding for the standard delimiters.
    pub fn standard() -> Arc<Self> {
        Arc::clone(&DEFAULT)
    }

    /// The delimiter definition, in header order.
    pub fn delimiters(&self) -> &str {
        &self.delimiters
    }

    /// The character separating fields.
    pub fn field_delimiter(&self) -> char {
        self.byte(FIELD) as char
    }

    /// The character separating components.
    pub fn component_delimiter(&self) -> char {
        self.byte(COMPONENT) as char
    }

    /// The character separating repetitions of a field.
    pub fn repetition_delimiter(&self) -> char {
        self.byte(REPETITION) as char
    }

    /// The character opening and closing escape sequences.
    pub fn escape_character(&self) -> char {
        self.byte(ESCAPE) as char
    }

    /// The character separating subcomponents.
    pub fn subcomponent_delimiter(&self) -> char {
        self.byte(SUBCOMPONENT) as char
    }

    pub(crate) fn byte(&self, index: usize) -> u8 {
        self.delimiters.as_bytes()[index]
    }

    /// Resolve the escape sequences in a value.
    ///
    /// Returns the input unchanged when it holds no escape character.
    /// Sequences with an unrecognised lead character are kept as written,
    /// escape characters included.
    pub fn decode<'a>(&self, encoded: &'a str) -> Result<Cow<'a, str>, DecodeError> {
        let escape = self.escape_character();

        if !encoded.contains(escape) {
            return Ok(Cow::Borrowed(encoded));
        }

        let mut decoded = String::with_capacity(encoded.len());
        let mut rest = encoded;

        while let Some(start) = rest.find(escape) {
            decoded.push_str(&rest[..start]);

            let offset = encoded.len() - rest.len() + start;
            let after = &rest[start + 1..];
            let end = after
                .find(escape)
                .ok_or(DecodeError::IncompleteEscapeSequence(offset))?;

            self.resolve(&after[..end], &mut decoded)?;
            rest = &after[end + 1..];
        }

        decoded.push_str(rest);

        Ok(Cow::Owned(decoded))
    }

    fn resolve(&self, sequence: &str, out: &mut String) -> Result<(), DecodeError> {
        match sequence.as_bytes().first() {
            Some(b'H') => out.push_str("<B>"),
            Some(b'N') => out.push_str("</B>"),
            Some(b'.') if sequence == ".br" => out.push_str("<BR>"),
            Some(b'.') => out.push_str(sequence),

            Some(b'F') => out.push(self.field_delimiter()),
            Some(b'S') => out.push(self.component_delimiter()),
            Some(b'T') => out.push(self.subcomponent_delimiter()),
            Some(b'R') => out.push(self.repetition_delimiter()),
            Some(b'E') => out.push(self.escape_character()),

            Some(b'X') => {
                let digits = &sequence[1..];
                let invalid = || DecodeError::InvalidHex(String::from(sequence));

                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                    Err(invalid())?;
                }

                let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
                write!(out, "{value}").map_err(|_| invalid())?;
            }

            _ => {
                out.push(self.escape_character());
                out.push_str(sequence);
                out.push(self.escape_character());
            }
        }

        Ok(())
    }

    /// Escape every delimiter and escape character in a value.
    ///
    /// The inverse of [`Encoding::decode`] for literal text.
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let delimiters = self.delimiters.as_bytes();

        if !text.bytes().any(|b| delimiters.contains(&b)) {
            return Cow::Borrowed(text);
        }

        let escape = self.escape_character();
        let mut encoded = String::with_capacity(text.len() + 2 * DELIMITER_LENGTH);

        for c in text.chars() {
            let code = match c {
                c if c == self.field_delimiter() => 'F',
                c if c == self.component_delimiter() => 'S',
                c if c == self.subcomponent_delimiter() => 'T',
                c if c == self.repetition_delimiter() => 'R',
                c if c == escape => 'E',
                c => {
                    encoded.push(c);
                    continue;
                }
            };

            encoded.push(escape);
            encoded.push(code);
            encoded.push(escape);
        }

        Cow::Owned(encoded)
    }
}

//! Splitting segment lines into element trees.
//!
//! Parsing borrows the line for its whole duration. Fields, repetitions,
//! components and subcomponents are located by delimiter scans over the
//! borrowed bytes, and each leaf span is copied into the tree exactly once by
//! [`own`]. Escape sequences are left in place; see
//! [`Element::decoded_value`](super::element::Element::decoded_value).

use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::{fmt, iter};

use memchr::{memchr, memchr2};
use thiserror::Error;
use tracing::trace;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use super::{
    element::{Component, Field, Segment, Subcomponent},
    encoding::{
        COMPONENT, DELIMITER_LENGTH, Encoding, EncodingError, FIELD, REPETITION, SUBCOMPONENT,
    },
};

/// Number of bytes in a segment label.
pub const LABEL_LENGTH: usize = 3;

/// The label of the segment declaring a message's delimiters.
pub const HEADER_LABEL: Label = Label(*b"MSH");

/// An error parsing a segment line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// The line is shorter than a segment label.
    #[error("Segment label too short ({0} bytes).")]
    LabelTooShort(usize),
    /// A header segment ended before its delimiter definition.
    #[error("Header segment is missing its delimiter definition.")]
    MissingDelimiters,
    /// Something other than a field delimiter followed the segment label.
    #[error("Expected a field delimiter after the segment label, found {0:#04x}.")]
    MissingFieldDelimiter(u8),
    /// A delimiter definition was requested from a segment other than a header.
    #[error("Segment {0} is not a header segment.")]
    NotHeader(String),
    /// The delimiter definition of a header segment is invalid.
    #[error("Invalid delimiter definition: {0}")]
    Encoding(#[from] EncodingError),
}

/// A segment label, viewed in place at the start of a line.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromBytes, KnownLayout, Immutable)]
pub struct Label([u8; LABEL_LENGTH]);

impl Label {
    /// View the label at the start of a line.
    pub fn from_line(line: &[u8]) -> Result<&Label, SegmentError> {
        let (label, _) =
            Label::ref_from_prefix(line).map_err(|_| SegmentError::LabelTooShort(line.len()))?;

        Ok(label)
    }

    /// The raw label bytes.
    pub fn as_bytes(&self) -> &[u8; LABEL_LENGTH] {
        &self.0
    }

    /// Whether this is the label of a header segment.
    pub fn is_header(&self) -> bool {
        *self == HEADER_LABEL
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// The fixed-size start of a header segment.
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable)]
struct HeaderPrefix {
    label: Label,
    delimiters: [u8; DELIMITER_LENGTH],
}

/// Derive the encoding declared by a header segment line.
pub fn header_encoding(line: &[u8]) -> Result<Arc<Encoding>, SegmentError> {
    let label = Label::from_line(line)?;

    if !label.is_header() {
        Err(SegmentError::NotHeader(label.to_string()))?;
    }

    let (header, _) =
        HeaderPrefix::ref_from_prefix(line).map_err(|_| SegmentError::MissingDelimiters)?;

    let delimiters =
        core::str::from_utf8(&header.delimiters).map_err(|_| EncodingError::NotSingleByte)?;

    Ok(Encoding::create(delimiters)?)
}

/// A parser over one borrowed segment line.
#[derive(Debug)]
pub struct SegmentParser<'a> {
    line: &'a [u8],
    label: &'a Label,
    encoding: &'a Arc<Encoding>,
}

impl<'a> SegmentParser<'a> {
    /// Prepare to parse a line, reading its label.
    pub fn new(line: &'a [u8], encoding: &'a Arc<Encoding>) -> Result<Self, SegmentError> {
        let label = Label::from_line(line)?;

        Ok(Self {
            line,
            label,
            encoding,
        })
    }

    /// The label of the line.
    pub fn label(&self) -> &'a Label {
        self.label
    }

    /// Parse the fields following the label.
    ///
    /// For a header segment, the first field is the delimiter definition
    /// itself, taken verbatim.
    pub fn parse(&self) -> Result<Vec<Field>, SegmentError> {
        let mut fields = Vec::new();
        let field_delimiter = self.encoding.byte(FIELD);

        let rest = if self.label.is_header() {
            let (header, rest) = HeaderPrefix::ref_from_prefix(self.line)
                .map_err(|_| SegmentError::MissingDelimiters)?;

            fields.push(Field::new(Arc::clone(self.encoding), own(&header.delimiters)));
            rest
        } else {
            &self.line[LABEL_LENGTH..]
        };

        let rest = match rest.split_first() {
            None => rest,
            Some((&b, rest)) if b == field_delimiter => rest,
            Some((&b, _)) => Err(SegmentError::MissingFieldDelimiter(b))?,
        };

        for span in split_fields(rest, field_delimiter) {
            let field = self.parse_field(span, fields.len());
            fields.push(field);
        }

        Ok(fields)
    }

    /// Parse a field span into its first occurrence, chaining the rest.
    fn parse_field(&self, span: &[u8], index: usize) -> Field {
        let mut head: Option<Field> = None;

        for occurrence in split(span, self.encoding.byte(REPETITION)) {
            let field = self.parse_occurrence(occurrence, index);

            match &mut head {
                None => head = Some(field),
                Some(head) => head.repeats.push(field),
            }
        }

        head.unwrap_or_else(|| Field::new(Arc::clone(self.encoding), None))
    }

    fn parse_occurrence(&self, span: &[u8], index: usize) -> Field {
        let component = self.encoding.byte(COMPONENT);
        let subcomponent = self.encoding.byte(SUBCOMPONENT);

        let mut field = Field::new(Arc::clone(self.encoding), None);
        field.index = index;

        if memchr2(component, subcomponent, span).is_none() {
            field.value = own(span);
        } else {
            field.components = split(span, component)
                .enumerate()
                .map(|(i, span)| self.parse_component(span, i))
                .collect();
        }

        field
    }

    fn parse_component(&self, span: &[u8], index: usize) -> Component {
        let subcomponent = self.encoding.byte(SUBCOMPONENT);

        let mut component = Component::new(Arc::clone(self.encoding), None);
        component.index = index;

        if memchr(subcomponent, span).is_none() {
            component.value = own(span);
        } else {
            component.subcomponents = split(span, subcomponent)
                .enumerate()
                .map(|(i, span)| {
                    let mut subcomponent = Subcomponent::new(Arc::clone(self.encoding), own(span));
                    subcomponent.index = i;
                    subcomponent
                })
                .collect();
        }

        component
    }
}

impl Segment {
    /// Parse a segment line into an owned segment.
    pub fn parse(line: &[u8], encoding: &Arc<Encoding>) -> Result<Self, SegmentError> {
        let parser = SegmentParser::new(line, encoding)?;
        let fields = parser.parse()?;

        trace!(label = %parser.label(), fields = fields.len(), "parsed segment");

        Ok(Segment::new(
            Arc::clone(encoding),
            parser.label().to_string(),
            fields,
        ))
    }
}

/// Copy a span out of the borrowed line. Empty spans are absent.
fn own(span: &[u8]) -> Option<String> {
    (!span.is_empty()).then(|| String::from_utf8_lossy(span).into_owned())
}

/// Split a span at every delimiter, keeping empty spans.
fn split(span: &[u8], delimiter: u8) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(span);

    iter::from_fn(move || {
        let current = rest?;

        match memchr(delimiter, current) {
            Some(i) => {
                rest = Some(&current[i + 1..]);
                Some(&current[..i])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

/// Split the fields of a segment. A single trailing delimiter closes the last
/// field rather than opening another.
fn split_fields(rest: &[u8], delimiter: u8) -> impl Iterator<Item = &[u8]> {
    let trimmed = rest.strip_suffix(&[delimiter]).unwrap_or(rest);
    let count = if rest.is_empty() { 0 } else { usize::MAX };

    split(trimmed, delimiter).take(count)
}

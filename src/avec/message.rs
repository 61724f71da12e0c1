//! Grouping segments into messages.

use alloc::{string::String, sync::Arc, vec::Vec};
use core::mem;

use thiserror::Error;
use tracing::debug;

use crate::sans::{
    SEGMENT_TERMINATOR,
    element::{Element, Segment},
    encoding::{DecodeError, Encoding, EncodingError},
    framer::StreamProcessor,
    segment::{Label, SegmentError, header_encoding},
};

/// Errors occurring while assembling or reading messages.
#[derive(Debug, Error)]
pub enum Error {
    /// A line could not be parsed as a segment.
    #[error("Line {line_number}: {source}")]
    Segment {
        line_number: usize,
        source: SegmentError,
    },
    /// A value held an invalid escape sequence.
    #[error("Invalid escape sequence: {0}")]
    Decode(#[from] DecodeError),
    /// A delimiter definition was invalid.
    #[error("Invalid encoding: {0}")]
    Encoding(#[from] EncodingError),
}

/// A run of segments sharing one encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    encoding: Arc<Encoding>,
    segments: Vec<Segment>,
}

impl Message {
    /// Group segments under an encoding, renumbering them in order.
    pub fn new(encoding: Arc<Encoding>, mut segments: Vec<Segment>) -> Self {
        for (i, segment) in segments.iter_mut().enumerate() {
            segment.index = i;
        }

        Self { encoding, segments }
    }

    /// The encoding declared by the message's header.
    pub fn encoding(&self) -> &Arc<Encoding> {
        &self.encoding
    }

    /// The segments of the message, in stream order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The first segment with a label.
    pub fn segment(&self, label: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.label() == label)
    }

    /// Every segment with a label, in order.
    pub fn segments_labeled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Segment> {
        self.segments.iter().filter(move |s| s.label() == label)
    }

    /// Reconstruct the raw text of the message, one segment per line.
    pub fn inner_text(&self) -> String {
        let mut text = String::new();

        for (i, segment) in self.segments.iter().enumerate() {
            if i != 0 {
                text.push(SEGMENT_TERMINATOR as char);
            }

            if let Some(t) = segment.inner_text() {
                text.push_str(&t);
            }
        }

        text
    }
}

/// Collect messages from a stream of segment lines.
///
/// A header segment closes the message before it and declares the encoding
/// of the message it opens. The final message is closed when the stream
/// completes.
#[derive(Debug)]
pub struct MessageAssembler {
    encoding: Arc<Encoding>,
    segments: Vec<Segment>,
    messages: Vec<Message>,
}

impl MessageAssembler {
    /// Assemble messages, assuming the standard encoding until a header
    /// segment declares otherwise.
    pub fn new() -> Self {
        Self::with_encoding(Encoding::standard())
    }

    /// Assemble messages, assuming an encoding until a header segment
    /// declares otherwise.
    pub fn with_encoding(encoding: Arc<Encoding>) -> Self {
        Self {
            encoding,
            segments: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// The encoding applied to the next segment.
    pub fn encoding(&self) -> &Arc<Encoding> {
        &self.encoding
    }

    /// Messages completed so far.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Take the completed messages.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    fn flush(&mut self) {
        if self.segments.is_empty() {
            return;
        }

        let segments = mem::take(&mut self.segments);
        debug!(segments = segments.len(), "message complete");

        let message = Message::new(Arc::clone(&self.encoding), segments);
        self.messages.push(message);
    }
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamProcessor for MessageAssembler {
    type Error = Error;

    fn on_next(&mut self, line: &[u8], line_number: usize) -> Result<(), Error> {
        let wrap = |source| Error::Segment {
            line_number,
            source,
        };

        if Label::from_line(line).map_err(wrap)?.is_header() {
            self.flush();
            self.encoding = header_encoding(line).map_err(wrap)?;

            debug!(
                line_number,
                delimiters = self.encoding.delimiters(),
                "header declares encoding"
            );
        }

        let segment = Segment::parse(line, &self.encoding).map_err(wrap)?;
        self.segments.push(segment);

        Ok(())
    }

    fn on_complete(&mut self) {
        self.flush();
    }
}

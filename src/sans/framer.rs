//! Reassembling segment lines from a chunked byte stream.

use core::mem;

use memchr::memchr;
use tinyvec::TinyVec;
use tracing::{trace, warn};

use super::SEGMENT_TERMINATOR;

/// The first byte of a comment line.
pub const COMMENT: u8 = b'#';

/// Bytes of an unterminated line kept inline before spilling to the heap.
pub const INLINE_LINE_CAPACITY: usize = 1024;

/// Framing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Drop empty lines before dispatch.
    pub ignore_blank_lines: bool,
    /// Deliver lines starting with `#` as comments. Otherwise they are
    /// ordinary lines.
    pub allow_comments: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ignore_blank_lines: true,
            allow_comments: true,
        }
    }
}

/// Receive lines from a framer.
///
/// Line numbers count physical lines of the source, starting from one.
#[allow(unused_variables)]
pub trait StreamProcessor {
    /// The error raised while processing a line.
    type Error;

    /// Process a segment line.
    fn on_next(&mut self, line: &[u8], line_number: usize) -> Result<(), Self::Error>;

    /// Receive a comment line. Ignored by default.
    fn on_comment(&mut self, line: &[u8], line_number: usize) {}

    /// Decide the fate of a line rejected by [`StreamProcessor::on_next`].
    ///
    /// Returning `Ok` skips the line and continues with the next one. The
    /// default implementation aborts the stream with the error.
    fn on_error(
        &mut self,
        line: &[u8],
        error: Self::Error,
        line_number: usize,
    ) -> Result<(), Self::Error> {
        Err(error)
    }

    /// Called once the source is exhausted and every line has been delivered.
    fn on_complete(&mut self) {}
}

/// A state machine splitting chunks of bytes into segment lines.
///
/// Feed chunks as they arrive with [`Framer::feed`], then call
/// [`Framer::finish`] at the end of the source. A line is dispatched only
/// once its terminator has been seen, so dropping a framer between chunks
/// discards at most one partial line.
#[derive(Debug, Default)]
pub struct Framer {
    options: Options,
    /// Bytes of a line whose terminator has not yet arrived.
    pending: TinyVec<[u8; INLINE_LINE_CAPACITY]>,
    line_number: usize,
    /// Whether the previous chunk ended on a terminator, so a newline opening
    /// the next chunk still belongs to it.
    skip_newline: bool,
}

impl Framer {
    /// A framer at the start of a source.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// The number of the last line dispatched.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Split a chunk into lines, dispatching every terminated line.
    pub fn feed<P: StreamProcessor>(&mut self, chunk: &[u8], p: &mut P) -> Result<(), P::Error> {
        let mut rest = chunk;

        if self.skip_newline && !rest.is_empty() {
            self.skip_newline = false;
            rest = rest.strip_prefix(b"\n").unwrap_or(rest);
        }

        while let Some(end) = memchr(SEGMENT_TERMINATOR, rest) {
            let line = &rest[..end];

            if self.pending.is_empty() {
                self.dispatch(line, p)?;
            } else {
                self.pending.extend_from_slice(line);
                self.dispatch_pending(p)?;
            }

            rest = &rest[end + 1..];

            // Producers often follow the terminator with a newline.
            if rest.is_empty() {
                self.skip_newline = true;
            } else {
                rest = rest.strip_prefix(b"\n").unwrap_or(rest);
            }
        }

        self.pending.extend_from_slice(rest);

        Ok(())
    }

    /// Dispatch any unterminated final line and complete the stream.
    pub fn finish<P: StreamProcessor>(mut self, p: &mut P) -> Result<(), P::Error> {
        if !self.pending.is_empty() {
            self.dispatch_pending(p)?;
        }

        trace!(lines = self.line_number, "stream complete");
        p.on_complete();

        Ok(())
    }

    fn dispatch_pending<P: StreamProcessor>(&mut self, p: &mut P) -> Result<(), P::Error> {
        let mut line = mem::take(&mut self.pending);
        let result = self.dispatch(&line, p);

        // Keep any heap allocation for the next line.
        line.clear();
        self.pending = line;

        result
    }

    fn dispatch<P: StreamProcessor>(&mut self, line: &[u8], p: &mut P) -> Result<(), P::Error> {
        self.line_number += 1;
        let line_number = self.line_number;

        if line.is_empty() && self.options.ignore_blank_lines {
            return Ok(());
        }

        if self.options.allow_comments && line.first() == Some(&COMMENT) {
            p.on_comment(line, line_number);
            return Ok(());
        }

        trace!(line_number, len = line.len(), "dispatching line");

        match p.on_next(line, line_number) {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!(line_number, "line rejected by processor");
                p.on_error(line, error, line_number)
            }
        }
    }
}

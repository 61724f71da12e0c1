//! Reader-based decoder implementation.
//!
//! _Requires Cargo feature `std`._

use std::{
    io::{ErrorKind, Read},
    vec::Vec,
};

use thiserror::Error;
use tracing::trace;

use crate::sans::framer::{Framer, Options, StreamProcessor};

use super::message::{self, Message, MessageAssembler};

extern crate std;

/// Number of bytes requested from the reader at a time.
pub const CHUNK_SIZE: usize = 4096;

/// Errors occurring while decoding from a reader.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// An error from the supplied reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An error from the processor receiving lines.
    #[error("Processing failed: {0}")]
    Processor(E),
}

/// Decode lines from a reader of a stream, publishing to a processor.
///
/// Reading stops at the first error. No line is dispatched before its
/// terminator or the end of the reader has been seen.
///
/// This method is also re-exported as `hl7_pipe::avec::decode_reader`.
///
/// _Requires Cargo feature `std`._
pub fn decode<P: StreamProcessor>(
    r: &mut impl Read,
    options: Options,
    p: &mut P,
) -> Result<(), Error<P::Error>> {
    let mut framer = Framer::new(options);
    let mut buf = [0; CHUNK_SIZE];

    loop {
        let n = match r.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => Err(e)?,
        };

        trace!(n, "read chunk");
        framer.feed(&buf[..n], p).map_err(Error::Processor)?;
    }

    framer.finish(p).map_err(Error::Processor)
}

/// Decode every message from a reader, with the default framing policy.
///
/// _Requires Cargo feature `std`._
pub fn decode_messages(r: &mut impl Read) -> Result<Vec<Message>, Error<message::Error>> {
    let mut assembler = MessageAssembler::new();
    decode(r, Options::default(), &mut assembler)?;
    Ok(assembler.into_messages())
}

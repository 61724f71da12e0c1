//! Slice-based decoder implementation.

use alloc::vec::Vec;

use crate::sans::framer::{Framer, Options, StreamProcessor};

use super::message::{Error, Message, MessageAssembler};

/// Decode lines from a slice of a stream, publishing to a processor.
///
/// This method is also re-exported as `hl7_pipe::avec::decode_slice`.
pub fn decode<P: StreamProcessor>(r: &[u8], options: Options, p: &mut P) -> Result<(), P::Error> {
    let mut framer = Framer::new(options);
    framer.feed(r, p)?;
    framer.finish(p)
}

/// Decode every message in a slice, with the default framing policy.
pub fn decode_messages(r: &[u8]) -> Result<Vec<Message>, Error> {
    let mut assembler = MessageAssembler::new();
    decode(r, Options::default(), &mut assembler)?;
    Ok(assembler.into_messages())
}

//! Asynchronous reader-based decoder implementation.
//!
//! _Requires Cargo feature `tokio`._

use std::vec::Vec;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::sans::framer::{Framer, Options, StreamProcessor};

use super::{
    message::{self, Message, MessageAssembler},
    reader::{CHUNK_SIZE, Error},
};

extern crate std;

/// Decode lines from an asynchronous reader, publishing to a processor.
///
/// Awaiting the next chunk is the only suspension point. Dropping the
/// returned future between chunks discards at most one partial line.
///
/// This method is also re-exported as `hl7_pipe::avec::decode_stream`.
///
/// _Requires Cargo feature `tokio`._
pub async fn decode<P: StreamProcessor>(
    r: &mut (impl AsyncRead + Unpin),
    options: Options,
    p: &mut P,
) -> Result<(), Error<P::Error>> {
    let mut framer = Framer::new(options);
    let mut buf = [0; CHUNK_SIZE];

    loop {
        let n = r.read(&mut buf).await?;

        if n == 0 {
            break;
        }

        trace!(n, "read chunk");
        framer.feed(&buf[..n], p).map_err(Error::Processor)?;
    }

    framer.finish(p).map_err(Error::Processor)
}

/// Decode every message from an asynchronous reader, with the default
/// framing policy.
///
/// _Requires Cargo feature `tokio`._
pub async fn decode_messages(
    r: &mut (impl AsyncRead + Unpin),
) -> Result<Vec<Message>, Error<message::Error>> {
    let mut assembler = MessageAssembler::new();
    decode(r, Options::default(), &mut assembler).await?;
    Ok(assembler.into_messages())
}

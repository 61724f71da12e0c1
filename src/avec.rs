//! Convenience interfaces for common decoding patterns.
//!
//! The functions in this module drive the [`crate::sans`] framer over byte
//! slices, readers and asynchronous readers, publishing lines to a
//! [`StreamProcessor`](crate::sans::framer::StreamProcessor).
//!
//! To collect whole messages, publish to a [`MessageAssembler`], or call one
//! of the `decode_messages` functions.

pub mod message;
#[cfg(feature = "std")]
pub mod reader;
pub mod slice;
#[cfg(feature = "tokio")]
pub mod stream;

pub use message::{Message, MessageAssembler};
#[cfg(feature = "std")]
pub use reader::decode as decode_reader;
pub use slice::decode as decode_slice;
#[cfg(feature = "tokio")]
pub use stream::decode as decode_stream;

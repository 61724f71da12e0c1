//! IO-free decoding core.
//!
//! This module is intended for applications that need fine control over how
//! bytes reach the decoder. See [`crate::avec`] for implementations covering
//! common decoding patterns.
//!
//! # Architecture
//!
//! Decoding happens in three independent stages:
//!
//! - The [`framer`] turns byte chunks of any size into segment lines. It keeps
//! the bytes of an unterminated line between chunks and never dispatches a
//! line before its terminator (or the end of the source) has been seen.
//!
//! - The [`segment`] parser splits one line into fields, repetitions,
//! components and subcomponents. Splitting works on borrowed slices of the
//! line; bytes are copied exactly once, when a leaf value is stored in the
//! [`element`] tree.
//!
//! - The [`encoding`] table resolves escape sequences. Decoding is deferred
//! until a value is read, so escaped delimiters can never be mistaken for
//! structure.
//!
//! Some concerns are left to the caller:
//!
//! - Tracking which encoding is active. A header segment declares the
//! delimiters for every segment up to the next header; see
//! [`segment::header_encoding`].
//!
//! - Grouping segments into messages. A sink doing so is provided as
//! [`crate::avec::MessageAssembler`].

pub mod element;
pub mod encoding;
pub mod framer;
pub mod segment;

/// The segment terminator.
pub const SEGMENT_TERMINATOR: u8 = b'\r';

#![no_std]

//! A streaming decoder for HL7 version 2 messages.
//!
//! HL7 v2 is a pipe-delimited, hierarchically nested text format. Every
//! message declares its own delimiters in its header segment, so decoding is
//! driven by an [`Encoding`](sans::encoding::Encoding) read from the stream
//! rather than by a fixed grammar.
//!
//! Most users should begin with the functions and the
//! [`MessageAssembler`](avec::MessageAssembler) in the [`avec`] module. These
//! are suited to collecting whole messages from files, sockets and byte
//! slices. If they prove insufficient, drive the framer and segment parser in
//! the [`sans`] module directly.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable reader-based decoder (default).
//! - `tokio`: enable `AsyncRead`-based decoder (default, implies `std`).

extern crate alloc;

pub mod avec;
pub mod sans;

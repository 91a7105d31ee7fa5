//! HTTP codec module for decoding requests and encoding response heads
//!
//! - [`RequestDecoder`]: line oriented request decoder, a [`tokio_util::codec::Decoder`]
//! - [`HeaderEncoder`]: response head encoder, a [`tokio_util::codec::Encoder`]
//! - [`create_header`]: one shot helper building a response head
//!
//! Both sides work on `BytesMut` buffers and enforce the memory limits of a small
//! device (see [`MAX_LINE_BYTES`], [`MAX_HEADER_NUM`] and [`MAX_BODY_BYTES`]).

mod header_encoder;
mod request_decoder;

pub use header_encoder::{HeaderEncoder, create_header};
pub use request_decoder::{DecodePhase, MAX_BODY_BYTES, MAX_HEADER_NUM, MAX_LINE_BYTES, RequestDecoder};

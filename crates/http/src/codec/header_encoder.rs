//! HTTP header encoder implementation for serializing response heads
//!
//! Turns a status code and an ordered list of header lines into the wire format:
//! status line, a `Server` identification header, the caller's headers, an explicit
//! `Connection: close` and the terminating blank line.

use crate::protocol::{ResponseHead, SendError};

use bytes::{BufMut, Bytes, BytesMut};

use http::StatusCode;
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 256;

/// Headers owned by the encoder, caller supplied copies are skipped.
const MANAGED_HEADERS: [&str; 2] = ["Server", "Connection"];

/// Encoder for HTTP response heads implementing the [`Encoder`] trait.
#[derive(Debug, Clone)]
pub struct HeaderEncoder {
    server: String,
}

impl HeaderEncoder {
    /// Creates an encoder that identifies itself with `server` in every response.
    pub fn new(server: impl Into<String>) -> Self {
        Self { server: server.into() }
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

impl Default for HeaderEncoder {
    fn default() -> Self {
        Self::new(concat!("wifirgb/", env!("CARGO_PKG_VERSION")))
    }
}

impl Encoder<ResponseHead<'_>> for HeaderEncoder {
    type Error = SendError;

    /// Encodes a response head into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::InvalidHeader`] if a header name or value contains a line
    /// break, nothing is written in that case.
    fn encode(&mut self, item: ResponseHead<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        for (name, value) in item.headers {
            if has_line_break(name) || has_line_break(value) {
                return Err(SendError::invalid_header(name));
            }
        }

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", item.status.as_str(), reason(item.status))?;
        write!(FastWrite(dst), "Server: {}\r\n", self.server)?;

        for (name, value) in item.headers {
            if MANAGED_HEADERS.iter().any(|managed| managed.eq_ignore_ascii_case(name)) {
                continue;
            }
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }

        // persistent connections are not supported
        dst.put_slice(b"Connection: close\r\n\r\n");
        Ok(())
    }
}

/// Builds a complete response head in one go.
///
/// # Errors
///
/// See [`HeaderEncoder::encode`].
pub fn create_header(status: StatusCode, headers: &[(&str, &str)]) -> Result<Bytes, SendError> {
    let mut dst = BytesMut::new();
    HeaderEncoder::default().encode(ResponseHead::new(status, headers), &mut dst)?;
    Ok(dst.freeze())
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("OK")
}

fn has_line_break(s: &str) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n')
}

/// Fast writer implementation for writing to BytesMut.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

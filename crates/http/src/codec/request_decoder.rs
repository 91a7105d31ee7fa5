//! HTTP request decoder module
//!
//! Requests are read line by line, the way a tiny firmware server does it: the request
//! line first, then header lines until a blank line (or end of stream), then exactly
//! `Content-Length` bytes of body. Only two headers carry meaning for the decoder:
//! `Content-Length`, which sizes the body, and `Authorization`, whose full line is kept
//! for the authentication gate.
//!
//! # Example
//!
//! ```
//! use wifirgb_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /rgb HTTP/1.1\r\n\r\n");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.target(), "/rgb");
//! ```

use bytes::{Buf, BytesMut};
use http::Method;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, Request};

/// Maximum length of a single request or header line, terminator included
pub const MAX_LINE_BYTES: usize = 1024;

/// Maximum number of header lines in a request
pub const MAX_HEADER_NUM: usize = 32;

/// Maximum body size accepted from a peer
pub const MAX_BODY_BYTES: usize = 4 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";
const AUTHORIZATION: &str = "Authorization";

/// Where the decoder currently is inside a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePhase {
    RequestLine,
    Headers,
    Body { length: usize },
}

/// A line oriented decoder for one HTTP/1.1 request
///
/// The decoder yields a single [`Request`] once the body is complete. State between
/// calls lives in `phase` and the partially built request.
#[derive(Debug)]
pub struct RequestDecoder {
    phase: DecodePhase,
    partial: Option<Request>,
    header_count: usize,
    content_length: usize,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DecodePhase {
        self.phase
    }

    fn on_request_line(&mut self, line: &str) -> Result<(), ParseError> {
        let tokens = line.split(' ').collect::<Vec<_>>();
        let [method, target, version] = tokens.as_slice() else {
            return Err(ParseError::invalid_request_line(line));
        };

        let method = Method::from_bytes(method.as_bytes()).map_err(|_e| ParseError::invalid_method(method))?;
        trace!(%method, path = *target, version = *version, "parsed request line");

        self.partial = Some(Request::new(method, *target, *version));
        self.phase = DecodePhase::Headers;
        Ok(())
    }

    fn on_header_line(&mut self, line: &str) -> Result<(), ParseError> {
        let request = self.partial.as_mut().ok_or_else(|| ParseError::invalid_header("header before request line"))?;

        let Some((name, value)) = line.split_once(':') else {
            trace!(line, "skip header line without separator");
            return Ok(());
        };

        self.header_count += 1;
        ensure!(self.header_count <= MAX_HEADER_NUM, ParseError::too_many_headers(MAX_HEADER_NUM));

        match name {
            CONTENT_LENGTH => self.content_length = parse_content_length(value)?,
            AUTHORIZATION => request.set_authorization(line),
            _ => {}
        }

        request.insert_header(name, value.trim());
        Ok(())
    }

    fn end_of_headers(&mut self) {
        self.phase = DecodePhase::Body { length: self.content_length };
        trace!(length = self.content_length, "headers complete");
    }

    fn finish(&mut self, src: &mut BytesMut, length: usize) -> Option<Request> {
        let mut request = self.partial.take()?;
        request.set_body(src.split_to(length).freeze());
        self.reset();
        Some(request)
    }

    fn reset(&mut self) {
        self.phase = DecodePhase::RequestLine;
        self.header_count = 0;
        self.content_length = 0;
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { phase: DecodePhase::RequestLine, partial: None, header_count: 0, content_length: 0 }
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Attempts to decode an HTTP request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: the request line, the headers and the whole body were read
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.phase {
                DecodePhase::RequestLine => {
                    let Some(line) = take_line(src)? else { return Ok(None) };
                    self.on_request_line(&line)?;
                }
                DecodePhase::Headers => {
                    let Some(line) = take_line(src)? else { return Ok(None) };
                    if line.is_empty() {
                        self.end_of_headers();
                    } else {
                        self.on_header_line(&line)?;
                    }
                }
                DecodePhase::Body { length } => {
                    if src.len() < length {
                        src.reserve(length - src.len());
                        return Ok(None);
                    }
                    return Ok(self.finish(src, length));
                }
            }
        }
    }

    /// Called once the peer stopped sending.
    ///
    /// End of stream terminates the header block like a blank line would (a trailing
    /// unterminated line is still taken as a header). A body that is shorter than
    /// announced fails the request.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(request) = self.decode(src)? {
            return Ok(Some(request));
        }

        match self.phase {
            DecodePhase::RequestLine if src.is_empty() => Ok(None),
            DecodePhase::RequestLine => {
                let line = String::from_utf8_lossy(src).into_owned();
                src.clear();
                Err(ParseError::invalid_request_line(line))
            }
            DecodePhase::Headers => {
                if !src.is_empty() {
                    let line = line_to_string(&src.split())?;
                    self.on_header_line(&line)?;
                }
                self.end_of_headers();
                let length = self.content_length;
                ensure!(src.len() >= length, ParseError::incomplete_body(length, src.len()));
                Ok(self.finish(src, length))
            }
            DecodePhase::Body { length } => Err(ParseError::incomplete_body(length, src.len())),
        }
    }
}

/// Takes one `\n` terminated line off the buffer, without its `\r\n` or `\n`.
fn take_line(src: &mut BytesMut) -> Result<Option<String>, ParseError> {
    let Some(newline) = src.iter().position(|b| *b == b'\n') else {
        ensure!(src.len() < MAX_LINE_BYTES, ParseError::too_long_line(MAX_LINE_BYTES));
        return Ok(None);
    };
    ensure!(newline < MAX_LINE_BYTES, ParseError::too_long_line(MAX_LINE_BYTES));

    let mut line = src.split_to(newline);
    src.advance(1);
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }

    line_to_string(&line).map(Some)
}

fn line_to_string(line: &[u8]) -> Result<String, ParseError> {
    std::str::from_utf8(line).map(str::to_owned).map_err(ParseError::invalid_header)
}

/// Keeps only the digits of the value, so `Content-Length: 12\r` or `: 1 2` still read
/// as twelve.
fn parse_content_length(value: &str) -> Result<usize, ParseError> {
    let digits = value.chars().filter(char::is_ascii_digit).collect::<String>();
    ensure!(!digits.is_empty(), ParseError::invalid_content_length(format!("no digits in {value:?}")));

    let length = digits.parse::<usize>().map_err(ParseError::invalid_content_length)?;
    ensure!(length <= MAX_BODY_BYTES, ParseError::too_large_body(length, MAX_BODY_BYTES));
    Ok(length)
}

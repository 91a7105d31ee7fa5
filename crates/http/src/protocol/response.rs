//! HTTP response head representation.
//!
//! Handlers write responses straight onto the connection, so there is no response
//! object with a body: only the status and the header lines that precede it.

use http::StatusCode;

/// Status code plus ordered header lines of a response.
///
/// `Server` and `Connection` are always emitted by the
/// [`HeaderEncoder`](crate::codec::HeaderEncoder); passing them here has no effect.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHead<'a> {
    pub status: StatusCode,
    pub headers: &'a [(&'a str, &'a str)],
}

impl<'a> ResponseHead<'a> {
    pub fn new(status: StatusCode, headers: &'a [(&'a str, &'a str)]) -> Self {
        Self { status, headers }
    }
}

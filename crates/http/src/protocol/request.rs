//! HTTP request representation.
//!
//! A [`Request`] is produced once per connection by the
//! [`RequestDecoder`](crate::codec::RequestDecoder) and consumed by exactly one handler
//! invocation. Only the parts the appliance needs are kept: the three request line
//! tokens, the header lines as received, and the raw body.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;

use crate::protocol::ParseError;

/// A fully read HTTP/1.1 request.
///
/// Header names are stored exactly as received (case sensitive). When a header is
/// repeated the last occurrence wins.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    version: String,
    headers: HashMap<String, String>,
    authorization: Option<String>,
    body: Bytes,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: Method, target: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            version: version.into(),
            headers: HashMap::new(),
            authorization: None,
            body: Bytes::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target as sent, query string included.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks up a header value by its exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The complete `Authorization` header line (without the line terminator), if the
    /// peer sent one.
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidBody`] when the body is not valid UTF-8.
    pub fn body_str(&self) -> Result<&str, ParseError> {
        std::str::from_utf8(&self.body).map_err(ParseError::invalid_body)
    }

    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn set_authorization(&mut self, line: impl Into<String>) {
        self.authorization = Some(line.into());
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Builder style variant of [`Request::insert_header`], handy in tests.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.set_body(body);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_header_wins() {
        let request = Request::new(Method::GET, "/rgb", "HTTP/1.1")
            .with_header("X-Test", "first")
            .with_header("X-Test", "second");

        assert_eq!(request.header("X-Test"), Some("second"));
        assert_eq!(request.header("x-test"), None);
        assert_eq!(request.headers().len(), 1);
    }

    #[test]
    fn body_must_be_utf8() {
        let request = Request::new(Method::POST, "/rgb", "HTTP/1.1").with_body(Bytes::from_static(&[0xff, 0xfe]));
        assert!(matches!(request.body_str(), Err(ParseError::InvalidBody { .. })));

        let request = request.with_body("{}");
        assert_eq!(request.body_str().unwrap(), "{}");
    }
}

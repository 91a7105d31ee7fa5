use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("no complete request within {0:?}")]
    Timeout(Duration),
}

impl HttpError {
    /// Returns true when the failure came from the underlying transport rather than
    /// from the bytes the peer sent.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::RequestError { source: ParseError::Io { .. } }
                | Self::ResponseError { source: SendError::Io { .. } }
                | Self::Timeout(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid request line: {line:?}")]
    InvalidRequestLine { line: String },

    #[error("invalid http method: {method:?}")]
    InvalidMethod { method: String },

    #[error("line too long, exceed the limit {max_size}")]
    TooLongLine { max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: usize, max_size: usize },

    #[error("body ended after {received} of {expected} bytes")]
    IncompleteBody { expected: usize, received: usize },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_request_line<S: ToString>(line: S) -> Self {
        Self::InvalidRequestLine { line: line.to_string() }
    }

    pub fn invalid_method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn too_long_line(max_size: usize) -> Self {
        Self::TooLongLine { max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_body(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn incomplete_body(expected: usize, received: usize) -> Self {
        Self::IncompleteBody { expected, received }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("response head has already been written")]
    HeadAlreadySent,

    #[error("response body written before the head")]
    HeadNotSent,

    #[error("invalid response header {name:?}: line breaks are not allowed")]
    InvalidHeader { name: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_header<S: ToString>(name: S) -> Self {
        Self::InvalidHeader { name: name.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

//! Core HTTP protocol types.
//!
//! - [`Request`]: a fully read request (request line tokens, headers, body)
//! - [`ResponseHead`]: status and header lines written ahead of a response body
//! - [`HttpError`]: result of a whole connection session
//! - [`ParseError`]: request reading errors
//! - [`SendError`]: response writing errors
//!
//! The appliance speaks a deliberate subset of HTTP/1.1: one request per connection,
//! `Content-Length` bodies only, and every response is followed by a close.

mod request;
pub use request::Request;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

//! HTTP connection handling module
//!
//! - [`HttpConnection`]: owns one accepted connection from the first byte read to the
//!   final close, see [`SessionState`] for its lifecycle
//! - [`ResponseWriter`]: the handle handlers use to write their response directly onto
//!   the connection
//!
//! There are no persistent connections: one request, one response, then close.

mod http_connection;
mod response_writer;

pub use http_connection::{DEFAULT_READ_TIMEOUT, HttpConnection, SessionState};
pub use response_writer::ResponseWriter;

//! A line oriented HTTP/1.1 server core for small lighting appliances
//!
//! This crate reads one request per connection under tight memory limits, hands it to
//! a [`handler::Handler`] together with a [`connection::ResponseWriter`] and always
//! closes the connection afterwards. Routing, authentication and listening live one
//! layer up, in `wifirgb-web`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use http::StatusCode;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//! use wifirgb_http::connection::{HttpConnection, ResponseWriter};
//! use wifirgb_http::handler::{Handler, HandlerError};
//! use wifirgb_http::protocol::Request;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Handler for Hello {
//!     async fn call(&self, _request: Request, writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError> {
//!         writer.respond(StatusCode::OK, &[("Content-Type", "text/plain")], b"Hello World!\r\n").await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(Hello);
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if HttpConnection::new(reader, writer).process(handler).await.is_ok() {
//!                 info!("finished process, connection shutdown");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Limitations
//!
//! - One request per connection, no keep-alive, no pipelining
//! - `Content-Length` bodies only, no chunked transfer encoding
//! - No TLS
//! - Maximum line length 1 KiB, at most 32 headers, body at most 4 KiB

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;

//! Routing, authentication and listening for `wifirgb-http`.
//!
//! - [`Router`]: exact `(method, path)` table plus not-found and unauthorized fallbacks
//! - [`BasicAuth`]: the optional Basic authentication gate
//! - [`Server`]: binds with a small backlog and runs one connection session per client
//!
//! Requests flow listener → session → parser → authentication gate → router → handler.

mod auth;
mod handler;
mod server;

pub mod router;

pub use auth::BasicAuth;
pub use handler::RequestHandler;
pub use handler::StaticResponse;
pub use router::RouteError;
pub use router::Router;
pub use server::{DEFAULT_BACKLOG, Server, ServerBuildError, ServerBuilder, ServerError};

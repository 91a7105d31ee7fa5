use std::error::Error;

use async_trait::async_trait;

use crate::connection::ResponseWriter;
use crate::protocol::Request;

/// Error type handlers report back to the connection session
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// What a connection session hands a fully read request to.
///
/// The session asks [`Handler::authorize`] first and then calls exactly one of
/// [`Handler::call`] or [`Handler::call_unauthorized`]. Handlers write their response
/// through the given [`ResponseWriter`]; writing nothing is allowed and leaves the peer
/// with a bare connection close.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Decides whether the request may be dispatched. Everything is authorized unless
    /// the implementation says otherwise.
    fn authorize(&self, _request: &Request) -> bool {
        true
    }

    async fn call(&self, request: Request, writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError>;

    /// Handles a request that failed [`Handler::authorize`]. Does nothing by default.
    async fn call_unauthorized(&self, _request: Request, _writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError> {
        Ok(())
    }
}

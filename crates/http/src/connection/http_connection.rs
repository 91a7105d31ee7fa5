use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::codec::{DecodePhase, HeaderEncoder, RequestDecoder};
use crate::connection::ResponseWriter;
use crate::handler::Handler;
use crate::protocol::{HttpError, Request, SendError};

use tokio_util::codec::FramedRead;
use tracing::{error, info, trace, warn};

/// Default time a peer gets to deliver a complete request
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const READ_BUFFER_SIZE: usize = 1024;

/// Lifecycle of a connection session.
///
/// Every session that starts in `Accepted` ends in `Closed`, whatever happened in
/// between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    ReadingRequestLine,
    ReadingHeaders,
    ReadingBody,
    Authorizing,
    Dispatching,
    Closing,
    Closed,
}

impl From<DecodePhase> for SessionState {
    fn from(phase: DecodePhase) -> Self {
        match phase {
            DecodePhase::RequestLine => Self::ReadingRequestLine,
            DecodePhase::Headers => Self::ReadingHeaders,
            DecodePhase::Body { .. } => Self::ReadingBody,
        }
    }
}

/// One accepted connection, handled end to end
///
/// `HttpConnection` reads a single request, asks the handler whether it is authorized,
/// dispatches it and then always runs the closing sequence: flush pending output,
/// shut the transport down and wait for that to complete. Parse failures, handler
/// failures and transport errors all end the session the same way.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: W,
    encoder: HeaderEncoder,
    read_timeout: Duration,
    state: SessionState,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), READ_BUFFER_SIZE),
            writer,
            encoder: HeaderEncoder::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            state: SessionState::Accepted,
        }
    }

    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    #[must_use]
    pub fn with_encoder(mut self, encoder: HeaderEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session to completion.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the session. The connection is closed either way.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        let result = self.serve(handler.as_ref()).await;
        if let Err(e) = &result {
            if e.is_transport() {
                warn!(cause = %e, state = ?self.state, "transport error, closing connection");
            } else {
                info!(cause = %e, state = ?self.state, "dropping request");
            }
        }

        self.transition(SessionState::Closing);
        let closed = self.close().await;
        self.transition(SessionState::Closed);

        result.and(closed)
    }

    async fn serve<H>(&mut self, handler: &H) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        self.transition(SessionState::ReadingRequestLine);
        let Some(request) = self.read_request().await? else {
            info!("peer closed before sending a request");
            return Ok(());
        };

        self.transition(SessionState::Authorizing);
        let authorized = handler.authorize(&request);

        self.transition(SessionState::Dispatching);
        let method = request.method().clone();
        let target = request.target().to_owned();
        let mut writer = ResponseWriter::new(&mut self.writer, self.encoder.clone());

        let result = if authorized {
            handler.call(request, &mut writer).await
        } else {
            info!(%method, path = %target, "unauthorized request");
            handler.call_unauthorized(request, &mut writer).await
        };

        match (&result, writer.status()) {
            (Err(e), _) => error!(%method, path = %target, cause = %e, "handler failed"),
            (Ok(()), Some(status)) => info!(%method, path = %target, status = status.as_u16(), "request handled"),
            (Ok(()), None) => info!(%method, path = %target, "no response written"),
        }

        writer.flush().await?;
        Ok(())
    }

    async fn read_request(&mut self) -> Result<Option<Request>, HttpError> {
        let next = timeout(self.read_timeout, self.framed_read.next()).await;

        match next {
            Err(_elapsed) => {
                self.state = self.framed_read.decoder().phase().into();
                Err(HttpError::Timeout(self.read_timeout))
            }
            Ok(None) => Ok(None),
            Ok(Some(Err(e))) => {
                self.state = self.framed_read.decoder().phase().into();
                Err(e.into())
            }
            Ok(Some(Ok(request))) => Ok(Some(request)),
        }
    }

    async fn close(&mut self) -> Result<(), HttpError> {
        self.writer.flush().await.map_err(SendError::io)?;
        self.writer.shutdown().await.map_err(SendError::io)?;
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        trace!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

impl<R, W> std::fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").field("state", &self.state).field("read_timeout", &self.read_timeout).finish_non_exhaustive()
    }
}

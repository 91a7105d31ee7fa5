use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{debug, error, info, warn};
use wifirgb_http::codec::HeaderEncoder;
use wifirgb_http::connection::{DEFAULT_READ_TIMEOUT, HttpConnection, ResponseWriter};
use wifirgb_http::handler::{Handler, HandlerError};
use wifirgb_http::protocol::Request;

use crate::auth::BasicAuth;
use crate::router::Router;

/// Pending, not yet accepted connections the transport keeps for us
pub const DEFAULT_BACKLOG: u32 = 3;

pub struct ServerBuilder {
    router: Option<Router>,
    address: Option<SocketAddr>,
    auth: Option<BasicAuth>,
    backlog: u32,
    read_timeout: Duration,
    server_name: Option<String>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            router: None,
            address: None,
            auth: None,
            backlog: DEFAULT_BACKLOG,
            read_timeout: DEFAULT_READ_TIMEOUT,
            server_name: None,
        }
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<SocketAddr>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Enables Basic authentication. Without it every request is authorized.
    #[must_use]
    pub fn basic_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Value of the `Server` header sent with every response.
    #[must_use]
    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    /// # Errors
    ///
    /// Fails when the router or the address is missing, or the backlog is zero.
    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?;
        if self.backlog == 0 {
            return Err(ServerBuildError::ZeroBacklog);
        }

        let encoder = self.server_name.map_or_else(HeaderEncoder::default, HeaderEncoder::new);
        Ok(Server { router, address, auth: self.auth, backlog: self.backlog, read_timeout: self.read_timeout, encoder })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("address", &self.address).field("backlog", &self.backlog).finish_non_exhaustive()
    }
}

/// The listener: binds, accepts and runs one [`HttpConnection`] per accepted socket.
///
/// `Server` is also the [`Handler`] those connections call into: it applies the
/// Basic authentication gate and routes authorized requests through its [`Router`].
#[derive(Debug)]
pub struct Server {
    router: Router,
    address: SocketAddr,
    auth: Option<BasicAuth>,
    backlog: u32,
    read_timeout: Duration,
    encoder: HeaderEncoder,
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
    #[error("backlog must be at least 1")]
    ZeroBacklog,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't bind {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Binds the configured address with the configured backlog. Connection attempts
    /// beyond the backlog are refused by the transport, not queued by us.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the socket can't be created, bound or put
    /// into listening mode.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.address;
        let bind_error = |source| ServerError::Bind { address, source };

        let socket = if address.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() }.map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(address).map_err(bind_error)?;
        socket.listen(self.backlog).map_err(bind_error)
    }

    /// Binds and serves forever.
    ///
    /// # Errors
    ///
    /// See [`Server::bind`].
    pub async fn start(self) -> Result<(), ServerError> {
        let tcp_listener = match self.bind() {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return Err(e);
            }
        };

        self.serve(tcp_listener).await;
        Ok(())
    }

    /// Accepts connections from an already bound listener, forever.
    pub async fn serve(self, tcp_listener: TcpListener) {
        match tcp_listener.local_addr() {
            Ok(local_addr) => info!(%local_addr, backlog = self.backlog, auth = self.auth.is_some(), "start listening"),
            Err(e) => warn!(cause = %e, "listening on unknown address"),
        }

        let handler = Arc::new(self);
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                debug!(remote = %remote_addr, "client connected");
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer)
                    .with_read_timeout(handler.read_timeout)
                    .with_encoder(handler.encoder.clone());
                match connection.process(handler).await {
                    Ok(()) => debug!(remote = %remote_addr, "finished process, connection shutdown"),
                    Err(e) => debug!(remote = %remote_addr, cause = %e, "connection shutdown after error"),
                }
            });
        }
    }
}

#[async_trait]
impl Handler for Server {
    fn authorize(&self, request: &Request) -> bool {
        match &self.auth {
            None => true,
            Some(auth) => request.authorization().is_some_and(|line| auth.authenticate(line)),
        }
    }

    async fn call(&self, request: Request, writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError> {
        let body = request.body_str()?;
        self.router.dispatch(request.method(), request.target(), writer, body).await
    }

    async fn call_unauthorized(&self, request: Request, writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError> {
        let body = String::from_utf8_lossy(request.body());
        self.router.dispatch_unauthorized(writer, &body).await
    }
}

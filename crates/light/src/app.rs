use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;
use wifirgb_web::{RouteError, Server, ServerBuildError, ServerError};

use crate::animator::Animator;
use crate::api;
use crate::color::Rgb;
use crate::config::Config;
use crate::strip::{LedStrip, Light, StripError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid route: {source}")]
    Route {
        #[from]
        source: RouteError,
    },

    #[error("invalid server configuration: {source}")]
    Build {
        #[from]
        source: ServerBuildError,
    },

    #[error(transparent)]
    Server {
        #[from]
        source: ServerError,
    },

    #[error("can't clear the strip: {source}")]
    Strip {
        #[from]
        source: StripError,
    },
}

/// The assembled lamp: one light, its coordinator and the HTTP server in front of them.
#[derive(Debug)]
pub struct App {
    animator: Animator,
    server: Server,
}

impl App {
    /// Clears `strip` and wires it up behind a server configured from `config`.
    ///
    /// # Errors
    ///
    /// Fails when the server configuration is invalid or the strip can't be written.
    pub fn new(config: &Config, strip: impl LedStrip + 'static) -> Result<Self, AppError> {
        let light = Arc::new(Light::new(strip));
        light.set(Rgb::BLACK)?;
        let animator = Animator::new(light);

        let mut builder = Server::builder()
            .router(api::router(&animator)?)
            .address(config.address)
            .backlog(config.backlog)
            .read_timeout(config.read_timeout())
            .server_name(config.server_name());
        if let Some(auth) = config.basic_auth() {
            info!(username = auth.username(), "basic authentication enabled");
            builder = builder.basic_auth(auth);
        }

        Ok(Self { animator, server: builder.build()? })
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Binds the configured address and serves until the process ends.
    ///
    /// # Errors
    ///
    /// See [`Server::bind`].
    pub async fn run(self) -> Result<(), AppError> {
        info!(leds = self.animator.light().len(), address = %self.server.address(), "wifirgb starting");
        self.server.start().await?;
        Ok(())
    }

    /// Serves on a listener bound by the caller.
    pub async fn serve(self, listener: TcpListener) {
        self.server.serve(listener).await;
    }
}

//! The lamp's HTTP API.
//!
//! | route              | effect                                                   |
//! |--------------------|----------------------------------------------------------|
//! | `GET /`            | the control page                                         |
//! | `GET /rgb`         | current color as JSON                                    |
//! | `POST /rgb`        | stop the effect, set the color, `ETag` echoes it         |
//! | `POST /smooth`     | start `smooth` unless running, then hand it the color    |
//! | `POST /rainbow`    | run `rainbow`, same for `/fire` and `/breathe`           |
//! | `POST /off`        | stop the effect and go dark                              |
//! | `GET /effect`      | name of the running effect or `null`                     |
//! | `GET /timer`       | seconds before shutdown                                  |
//! | `POST /timer`      | `{"seconds": N}` arms the shutdown timer, `N <= 0` disarms |
//!
//! Everything else is a plain-text 404.

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use wifirgb_http::connection::ResponseWriter;
use wifirgb_http::handler::HandlerError;
use wifirgb_web::{RequestHandler, RouteError, Router, StaticResponse};

use crate::animator::Animator;
use crate::color::Rgb;
use crate::effect::Effect;
use crate::strip::StripError;

/// Realm announced to clients that failed authentication
pub const REALM: &str = "wifirgb";

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request body: {source}")]
    InvalidBody { source: serde_json::Error },

    #[error("strip error: {source}")]
    Strip {
        #[from]
        source: StripError,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            Self::Strip { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct EffectStatus {
    effect: Option<Effect>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TimerStatus {
    seconds: i64,
}

/// Builds the routing table for `animator`.
///
/// # Errors
///
/// Only on an invalid route path, which would be a bug in this function.
pub fn router(animator: &Animator) -> Result<Router, RouteError> {
    let api = |endpoint| ApiHandler { animator: animator.clone(), endpoint };

    let mut router = Router::new();
    router
        .register_handler(Method::GET, "/", StaticResponse::html(StatusCode::OK, INDEX_HTML))?
        .register_handler(Method::GET, "/rgb", api(Endpoint::GetColor))?
        .register_handler(Method::POST, "/rgb", api(Endpoint::SetColor))?
        .register_handler(Method::POST, "/smooth", api(Endpoint::SmoothColor))?
        .register_handler(Method::POST, "/off", api(Endpoint::TurnOff))?
        .register_handler(Method::GET, "/effect", api(Endpoint::GetEffect))?
        .register_handler(Method::GET, "/timer", api(Endpoint::GetTimer))?
        .register_handler(Method::POST, "/timer", api(Endpoint::SetTimer))?
        .register_handler(Method::GET, "/favicon.ico", StaticResponse::status(StatusCode::NOT_FOUND))?;

    for effect in [Effect::Rainbow, Effect::Fire, Effect::Breathe] {
        router.register_handler(Method::POST, format!("/{effect}"), api(Endpoint::RunEffect(effect)))?;
    }

    router
        .register_not_found_handler(StaticResponse::text(StatusCode::NOT_FOUND, "404 Not Found"))
        .register_unauthorized_handler(Challenge);
    Ok(router)
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    GetColor,
    SetColor,
    SmoothColor,
    RunEffect(Effect),
    TurnOff,
    GetEffect,
    GetTimer,
    SetTimer,
}

struct ApiHandler {
    animator: Animator,
    endpoint: Endpoint,
}

#[async_trait]
impl RequestHandler for ApiHandler {
    async fn invoke(&self, writer: &mut ResponseWriter<'_>, body: &str) -> Result<(), HandlerError> {
        let Err(e) = self.handle(writer, body).await else {
            return Ok(());
        };
        if writer.is_head_sent() {
            return Err(e);
        }

        let e = e.downcast::<ApiError>()?;
        let status = e.status();
        if status.is_server_error() {
            error!(endpoint = ?self.endpoint, cause = %e, "request failed");
        } else {
            warn!(endpoint = ?self.endpoint, cause = %e, "rejecting request");
        }
        let message = e.to_string();
        writer.respond(status, &[("Content-Type", mime::TEXT_PLAIN_UTF_8.as_ref())], message.as_bytes()).await?;
        Ok(())
    }
}

impl ApiHandler {
    /// Failures the client should hear about are returned as [`ApiError`].
    async fn handle(&self, writer: &mut ResponseWriter<'_>, body: &str) -> Result<(), HandlerError> {
        let animator = &self.animator;

        match self.endpoint {
            Endpoint::GetColor => respond_json(writer, &animator.color()).await,
            Endpoint::SetColor => {
                let color: Rgb = parse(body)?;
                animator.set_color(color).await.map_err(ApiError::from)?;
                let etag = format!("\"{}\"", serde_json::to_string(&color)?);
                writer.respond(StatusCode::NO_CONTENT, &[("ETag", etag.as_str())], b"").await?;
                Ok(())
            }
            Endpoint::SmoothColor => {
                let color: Rgb = parse(body)?;
                if animator.active().await != Some(Effect::Smooth) {
                    animator.run_effect(Effect::Smooth).await;
                }
                animator.signal_color_change(color);
                info!(?color, "smooth transition requested");
                no_content(writer).await
            }
            Endpoint::RunEffect(effect) => {
                animator.run_effect(effect).await;
                no_content(writer).await
            }
            Endpoint::TurnOff => {
                animator.set_color(Rgb::BLACK).await.map_err(ApiError::from)?;
                no_content(writer).await
            }
            Endpoint::GetEffect => respond_json(writer, &EffectStatus { effect: animator.active().await }).await,
            Endpoint::GetTimer => {
                let seconds = i64::from(animator.shutdown_remaining());
                respond_json(writer, &TimerStatus { seconds }).await
            }
            Endpoint::SetTimer => {
                let timer: TimerStatus = parse(body)?;
                animator.arm_shutdown(timer.seconds);
                no_content(writer).await
            }
        }
    }
}

/// Answers unauthenticated requests with a Basic challenge.
struct Challenge;

#[async_trait]
impl RequestHandler for Challenge {
    async fn invoke(&self, writer: &mut ResponseWriter<'_>, _body: &str) -> Result<(), HandlerError> {
        let challenge = format!("Basic realm=\"{REALM}\"");
        let headers = [("WWW-Authenticate", challenge.as_str()), ("Content-Type", mime::TEXT_PLAIN_UTF_8.as_ref())];
        writer.respond(StatusCode::UNAUTHORIZED, &headers, b"401 Unauthorized").await?;
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::InvalidBody { source })
}

async fn respond_json<T: Serialize + Sync>(writer: &mut ResponseWriter<'_>, value: &T) -> Result<(), HandlerError> {
    let json = serde_json::to_vec(value)?;
    writer.respond(StatusCode::OK, &[("Content-Type", mime::APPLICATION_JSON.as_ref())], &json).await?;
    Ok(())
}

async fn no_content(writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError> {
    writer.respond(StatusCode::NO_CONTENT, &[], b"").await?;
    Ok(())
}

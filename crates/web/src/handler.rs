use async_trait::async_trait;
use http::StatusCode;
use mime::Mime;
use wifirgb_http::connection::ResponseWriter;
use wifirgb_http::handler::HandlerError;

/// A routed request handler.
///
/// Receives the live connection handle and the request body decoded as UTF-8, and
/// writes its response directly to the connection.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, writer: &mut ResponseWriter<'_>, body: &str) -> Result<(), HandlerError>;
}

/// A handler that always answers with the same response.
#[derive(Debug, Clone)]
pub struct StaticResponse {
    status: StatusCode,
    content_type: Option<Mime>,
    body: &'static [u8],
}

impl StaticResponse {
    /// A response with status only and an empty body.
    pub fn status(status: StatusCode) -> Self {
        Self { status, content_type: None, body: b"" }
    }

    /// A `text/plain` response.
    pub fn text(status: StatusCode, body: &'static str) -> Self {
        Self { status, content_type: Some(mime::TEXT_PLAIN_UTF_8), body: body.as_bytes() }
    }

    pub fn html(status: StatusCode, body: &'static str) -> Self {
        Self { status, content_type: Some(mime::TEXT_HTML_UTF_8), body: body.as_bytes() }
    }
}

#[async_trait]
impl RequestHandler for StaticResponse {
    async fn invoke(&self, writer: &mut ResponseWriter<'_>, _body: &str) -> Result<(), HandlerError> {
        match &self.content_type {
            Some(content_type) => writer.respond(self.status, &[("Content-Type", content_type.as_ref())], self.body).await?,
            None => writer.respond(self.status, &[], self.body).await?,
        }
        Ok(())
    }
}

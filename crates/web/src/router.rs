//! Exact match routing table.
//!
//! Routes are keyed by `(method, path)` with no patterns or wildcards. The request
//! target is compared as is, so `/rgb?x=1` does not match `/rgb`. Registering the same
//! key twice keeps only the last handler.

use std::collections::HashMap;

use http::Method;
use thiserror::Error;
use tracing::{debug, warn};
use wifirgb_http::connection::ResponseWriter;
use wifirgb_http::handler::HandlerError;

use crate::handler::RequestHandler;

/// Main router structure that maps `(method, path)` to handlers
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, HashMap<String, Box<dyn RequestHandler>>>,
    not_found: Option<Box<dyn RequestHandler>>,
    unauthorized: Option<Box<dyn RequestHandler>>,
}

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("route path must start with '/': {path:?}")]
    MissingLeadingSlash { path: String },

    #[error("route path must not contain whitespace: {path:?}")]
    Whitespace { path: String },
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `(method, path)`, replacing any previous handler for the
    /// same key.
    ///
    /// # Errors
    ///
    /// The path must start with `/` and must not contain whitespace, since such a target
    /// can never appear in a request line.
    pub fn register_handler<H>(&mut self, method: Method, path: impl Into<String>, handler: H) -> Result<&mut Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash { path });
        }
        if path.chars().any(char::is_whitespace) {
            return Err(RouteError::Whitespace { path });
        }

        let by_path = self.routes.entry(method.clone()).or_default();
        if by_path.insert(path.clone(), Box::new(handler)).is_some() {
            warn!(%method, path = %path, "route registered twice, keeping the last handler");
        }
        Ok(self)
    }

    /// Handler for requests no route matches.
    pub fn register_not_found_handler<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.not_found = Some(Box::new(handler));
        self
    }

    /// Handler for requests that failed authentication.
    pub fn register_unauthorized_handler<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.unauthorized = Some(Box::new(handler));
        self
    }

    /// Looks up the handler registered for `(method, path)`.
    pub fn at(&self, method: &Method, path: &str) -> Option<&dyn RequestHandler> {
        self.routes.get(method)?.get(path).map(Box::as_ref)
    }

    /// Number of registered routes, fallbacks excluded.
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes the route for `(method, path)`, or the not-found handler on a miss.
    ///
    /// With neither available nothing is written and the request is dropped.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error.
    pub async fn dispatch(&self, method: &Method, path: &str, writer: &mut ResponseWriter<'_>, body: &str) -> Result<(), HandlerError> {
        let handler = match self.at(method, path) {
            Some(handler) => handler,
            None => match &self.not_found {
                Some(not_found) => not_found.as_ref(),
                None => {
                    debug!(%method, path, "no handler for request");
                    return Ok(());
                }
            },
        };

        handler.invoke(writer, body).await
    }

    /// Invokes the unauthorized handler, if one is registered.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error.
    pub async fn dispatch_unauthorized(&self, writer: &mut ResponseWriter<'_>, body: &str) -> Result<(), HandlerError> {
        match &self.unauthorized {
            Some(handler) => handler.invoke(writer, body).await,
            None => {
                debug!("no unauthorized handler, dropping request");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut routes = self
            .routes
            .iter()
            .flat_map(|(method, by_path)| by_path.keys().map(move |path| format!("{method} {path}")))
            .collect::<Vec<_>>();
        routes.sort();

        f.debug_struct("Router")
            .field("routes", &routes)
            .field("not_found", &self.not_found.is_some())
            .field("unauthorized", &self.unauthorized.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::StaticResponse;
    use http::StatusCode;
    use wifirgb_http::codec::HeaderEncoder;

    async fn dispatch(router: &Router, method: Method, path: &str) -> String {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, HeaderEncoder::new("test"));
        router.dispatch(&method, path, &mut writer, "").await.unwrap();
        writer.flush().await.unwrap();
        String::from_utf8(out).unwrap()
    }

    fn router() -> Router {
        let mut router = Router::new();
        router
            .register_handler(Method::GET, "/rgb", StaticResponse::text(StatusCode::OK, "get rgb"))
            .unwrap()
            .register_handler(Method::POST, "/rgb", StaticResponse::text(StatusCode::OK, "post rgb"))
            .unwrap();
        router
    }

    #[tokio::test]
    async fn routes_by_method_and_path() {
        let router = router();
        assert_eq!(router.len(), 2);

        assert!(dispatch(&router, Method::GET, "/rgb").await.ends_with("get rgb"));
        assert!(dispatch(&router, Method::POST, "/rgb").await.ends_with("post rgb"));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut router = router();
        router.register_handler(Method::GET, "/rgb", StaticResponse::text(StatusCode::OK, "second")).unwrap();

        assert_eq!(router.len(), 2);
        assert!(dispatch(&router, Method::GET, "/rgb").await.ends_with("second"));
    }

    #[tokio::test]
    async fn miss_without_fallback_writes_nothing() {
        let router = router();
        assert!(dispatch(&router, Method::PUT, "/rgb").await.is_empty());
        assert!(dispatch(&router, Method::GET, "/rgb?x=1").await.is_empty());
        assert!(dispatch(&router, Method::GET, "/RGB").await.is_empty());
    }

    #[tokio::test]
    async fn miss_goes_to_not_found() {
        let mut router = router();
        router.register_not_found_handler(StaticResponse::text(StatusCode::NOT_FOUND, "nope"));

        let response = dispatch(&router, Method::GET, "/missing").await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("nope"));
    }

    #[tokio::test]
    async fn unauthorized_fallback() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, HeaderEncoder::new("test"));
        router().dispatch_unauthorized(&mut writer, "").await.unwrap();
        assert!(!writer.is_head_sent());

        let mut router = router();
        router.register_unauthorized_handler(StaticResponse::status(StatusCode::UNAUTHORIZED));
        router.dispatch_unauthorized(&mut writer, "").await.unwrap();
        assert_eq!(writer.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn validates_paths() {
        let mut router = Router::new();
        assert!(matches!(
            router.register_handler(Method::GET, "rgb", StaticResponse::status(StatusCode::OK)),
            Err(RouteError::MissingLeadingSlash { .. })
        ));
        assert!(matches!(
            router.register_handler(Method::GET, "/a b", StaticResponse::status(StatusCode::OK)),
            Err(RouteError::Whitespace { .. })
        ));
        assert!(router.is_empty());
    }
}

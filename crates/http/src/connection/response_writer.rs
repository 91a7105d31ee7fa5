use crate::codec::HeaderEncoder;
use crate::ensure;
use crate::protocol::{ResponseHead, SendError};
use bytes::{BufMut, BytesMut};
use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;

/// Buffered bytes beyond this are pushed to the transport right away
const FLUSH_THRESHOLD: usize = 1024;

/// The connection handle given to request handlers.
///
/// Handlers write their response straight onto the connection: first the head
/// ([`ResponseWriter::write_head`]), then any number of body chunks. Output is buffered
/// and flushed when the buffer grows past a small threshold and once more when the
/// session closes, so a handler may stream a large body without holding it in memory.
pub struct ResponseWriter<'conn> {
    writer: &'conn mut (dyn AsyncWrite + Send + Unpin),
    buffer: BytesMut,
    encoder: HeaderEncoder,
    status: Option<StatusCode>,
}

impl<'conn> ResponseWriter<'conn> {
    pub fn new(writer: &'conn mut (dyn AsyncWrite + Send + Unpin), encoder: HeaderEncoder) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(FLUSH_THRESHOLD), encoder, status: None }
    }

    /// The status of the head written so far, `None` while nothing was written.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn is_head_sent(&self) -> bool {
        self.status.is_some()
    }

    /// Writes the status line and headers.
    ///
    /// # Errors
    ///
    /// Fails with [`SendError::HeadAlreadySent`] on a second call, or when a header
    /// contains a line break.
    pub fn write_head(&mut self, status: StatusCode, headers: &[(&str, &str)]) -> Result<(), SendError> {
        ensure!(self.status.is_none(), SendError::HeadAlreadySent);
        self.encoder.encode(ResponseHead::new(status, headers), &mut self.buffer)?;
        self.status = Some(status);
        Ok(())
    }

    /// Appends a chunk of body.
    ///
    /// # Errors
    ///
    /// Fails with [`SendError::HeadNotSent`] before [`ResponseWriter::write_head`], or on
    /// a transport error while flushing.
    pub async fn write_body(&mut self, chunk: &[u8]) -> Result<(), SendError> {
        ensure!(self.status.is_some(), SendError::HeadNotSent);
        self.buffer.put_slice(chunk);
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush().await?;
        }
        Ok(())
    }

    /// Writes a whole response: head with a `Content-Length` header, then the body.
    ///
    /// `Content-Length` is left out for statuses that never carry a body (1xx, 204, 304).
    ///
    /// # Errors
    ///
    /// See [`ResponseWriter::write_head`] and [`ResponseWriter::write_body`].
    pub async fn respond(&mut self, status: StatusCode, headers: &[(&str, &str)], body: &[u8]) -> Result<(), SendError> {
        if forbids_body(status) {
            self.write_head(status, headers)?;
        } else {
            let length = body.len().to_string();
            let mut all_headers = headers.to_vec();
            all_headers.push(("Content-Length", length.as_str()));
            self.write_head(status, &all_headers)?;
            self.write_body(body).await?;
        }
        self.flush().await
    }

    /// Pushes buffered output to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Io`] on transport failure.
    pub async fn flush(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.writer.write_all(self.buffer.as_ref()).await?;
        self.buffer.clear();
        Ok(self.writer.flush().await?)
    }
}

impl std::fmt::Debug for ResponseWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter").field("buffered", &self.buffer.len()).field("status", &self.status).finish_non_exhaustive()
    }
}

fn forbids_body(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn respond_adds_content_length() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, HeaderEncoder::new("lamp"));
        writer.respond(StatusCode::OK, &[("Content-Type", "application/json")], br#"{"r":10,"g":20,"b":30}"#).await.unwrap();
        assert_eq!(writer.status(), Some(StatusCode::OK));

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 200 OK\r\n\
             Server: lamp\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 22\r\n\
             Connection: close\r\n\
             \r\n\
             {\"r\":10,\"g\":20,\"b\":30}"
        );
    }

    #[tokio::test]
    async fn no_content_has_no_length() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, HeaderEncoder::new("lamp"));
        writer.respond(StatusCode::NO_CONTENT, &[("ETag", "\"x\"")], b"").await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(!out.contains("Content-Length"));
        assert!(out.contains("ETag: \"x\"\r\n"));
    }

    #[tokio::test]
    async fn head_only_once_and_before_body() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, HeaderEncoder::default());

        assert!(matches!(writer.write_body(b"early").await, Err(SendError::HeadNotSent)));
        writer.write_head(StatusCode::OK, &[]).unwrap();
        assert!(matches!(writer.write_head(StatusCode::OK, &[]), Err(SendError::HeadAlreadySent)));
    }

    #[tokio::test]
    async fn large_bodies_are_streamed() {
        let mut out = Vec::new();
        {
            let mut writer = ResponseWriter::new(&mut out, HeaderEncoder::new("lamp"));
            writer.write_head(StatusCode::OK, &[]).unwrap();
            for _ in 0..4 {
                writer.write_body(&[b'x'; 512]).await.unwrap();
            }
            // flushed each time the threshold was reached
            assert!(writer.buffer.len() < FLUSH_THRESHOLD);
            writer.flush().await.unwrap();
        }
        assert!(out.ends_with(&[b'x'; 2048]));
    }
}

//! Response Sink Module
//!
//! The write side of a cache hit: something with settable headers and a
//! byte-stream body.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::io::AsyncWrite;

// == Response Sink ==
/// HTTP-response-like destination for a served artifact.
///
/// The status is implicitly 200; the body is whatever gets written.
pub trait ResponseSink: AsyncWrite + Unpin + Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;
}

// == Cached Response ==
/// In-memory sink that turns into an axum response.
#[derive(Debug, Default)]
pub struct CachedResponse {
    headers: HeaderMap,
    body: Vec<u8>,
}

impl CachedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl ResponseSink for CachedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

impl AsyncWrite for CachedResponse {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().body).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().body).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().body).poll_shutdown(cx)
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.headers, Body::from(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_writes_accumulate_into_body() {
        let mut sink = CachedResponse::new();
        sink.write_all(b"hello ").await.unwrap();
        sink.write_all(b"world").await.unwrap();
        sink.flush().await.unwrap();

        assert_eq!(sink.body(), b"hello world");
    }

    #[tokio::test]
    async fn test_into_response_keeps_headers() {
        let mut sink = CachedResponse::new();
        sink.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        sink.write_all(b"body{}").await.unwrap();

        let response = sink.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"body{}");
    }
}

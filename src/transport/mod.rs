//! The pluggable async HTTP execution seam.
//!
//! The core never constructs a bare [`reqwest::Client`] internal to an
//! operation: every request goes through an injected [`HttpTransport`], so
//! that a caller can layer retry, auth-challenge handling, or request
//! logging without this crate knowing about any of it. [`ReqwestTransport`]
//! is the default implementation and the only thing in this crate that
//! depends on `reqwest` directly.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;


/// A chunk stream making up a response (or request) body.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Wraps a fully-buffered byte slice as a [`BodyStream`], for requests whose
/// body must be replayed (e.g. the buffered manifest-push body, §4.4) or
/// that have no body at all.
pub fn body_from_bytes(bytes: Bytes) -> BodyStream {
    Box::pin(futures_util::stream::once(async move { Ok(bytes) }))
}

/// An empty body, for GET/HEAD/DELETE requests and the upload-initiate POST.
pub fn empty_body() -> BodyStream {
    Box::pin(futures_util::stream::empty())
}

/// A response as delivered by an [`HttpTransport`].
pub struct HttpResponse {
    pub status: http::StatusCode,
    pub headers: http::HeaderMap,
    pub body: BodyStream,
}

impl HttpResponse {
    /// Returns a header value as a UTF-8 string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parses the `Content-Length` header, if present.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }

    /// Drains the body into memory, refusing to buffer more than `ceiling`
    /// bytes (per §4.9's bound on metadata/JSON body reads).
    ///
    /// This is for JSON/error bodies only; blob and manifest payload bytes
    /// are streamed and never routed through this function.
    pub async fn bytes_capped(mut self, ceiling: usize) -> Result<Bytes> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            let chunk = chunk.map_err(|e| Error::io_with_source("reading response body", e))?;
            if buf.len() + chunk.len() > ceiling {
                return Err(Error::size_exceeds_limit(buf.len() + chunk.len(), ceiling));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }

    /// Drains the entire body into memory with no ceiling, for blob/manifest
    /// payloads whose size is already known and verified by the caller.
    pub async fn bytes_unbounded(mut self) -> Result<Bytes> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            let chunk = chunk.map_err(|e| Error::io_with_source("reading response body", e))?;
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }
}

/// An object-safe async HTTP execution seam.
///
/// Implementations may add authentication, retry, or logging around the
/// bare request/response exchange; this crate only ever depends on this
/// trait, never on a concrete HTTP client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: http::Request<BodyStream>) -> Result<HttpResponse>;
}

/// Builder-style configuration for [`ReqwestTransport`], mirroring the
/// teacher's own `ClientConfig`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout_seconds: u64,
    pub max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }
}

/// The default [`HttpTransport`], backed by an async `reqwest::Client`.
///
/// Nothing else in this crate depends on `reqwest`; a caller that needs
/// auth-challenge handling, retries, or mocked transport wraps or replaces
/// this type entirely behind the same trait.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| Error::io_with_source("failed to build HTTP client", e))?;
        Ok(Self { client })
    }

    pub fn shared() -> Arc<dyn HttpTransport> {
        Arc::new(Self::new().expect("default reqwest client configuration is always valid"))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: http::Request<BodyStream>) -> Result<HttpResponse> {
        let (parts, body) = request.into_parts();
        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| Error::io_with_source("invalid HTTP method", e))?;

        // Streamed rather than collected: a blob push's body can be
        // arbitrarily large, and this transport must not buffer it whole.
        let body = reqwest::Body::wrap_stream(body);

        let mut builder = self.client.request(method, parts.uri.to_string()).body(body);
        for (name, value) in parts.headers.iter() {
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        let response = builder.send().await.map_err(|e| {
            Error::io_with_source(format!("request to {} failed", parts.uri), e)
        })?;

        let status = http::StatusCode::from_u16(response.status().as_u16())
            .expect("reqwest and http agree on valid status codes");
        let mut headers = http::HeaderMap::new();
        for (name, value) in response.headers().iter() {
            if let (Ok(name), Ok(value)) = (
                http::HeaderName::from_bytes(name.as_str().as_bytes()),
                http::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.append(name, value);
            }
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));

        Ok(HttpResponse {
            status,
            headers,
            body: Box::pin(stream),
        })
    }
}

//! Content-addressed fetch/push/exists/delete/resolve over
//! `/v2/{repo}/blobs/*` (§4.3), plus the range-seek reader (§4.5) used to
//! give callers seekable access to a blob body.

use crate::descriptor::Descriptor;
use crate::digest::{AlgorithmRegistry, Digest};
use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::transport::{body_from_bytes, empty_body, BodyStream, HttpTransport};
use crate::url;
use crate::warning::WarningHandler;
use async_trait::async_trait;
use bytes::Bytes;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};


fn as_async_read(body: BodyStream) -> Pin<Box<dyn AsyncRead + Send>> {
    Box::pin(tokio_util::io::StreamReader::new(body))
}

/// Which end a [`RangeSeekReader::seek_to`] offset is relative to. Modeled
/// as this two-variant enum rather than the full `std::io::SeekFrom`
/// surface: a `Current`-relative seek has no use against this protocol and
/// would just be translated back to an absolute offset internally anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    End,
}

/// Wraps an initial `206 Partial Content` body in a read/seek abstraction
/// that, on logical seeks, reissues the GET with a `Range` header and
/// splices in the new body (§4.5).
///
/// Implements [`AsyncRead`]; seeking is an inherent async method
/// (`seek_to`) rather than `tokio::io::AsyncSeek`, since a logical seek here
/// requires a new network round-trip and `AsyncSeek`'s poll-based contract
/// offers no natural place to stash an in-flight future across polls
/// without a hand-rolled state machine.
pub struct RangeSeekReader {
    transport: Arc<dyn HttpTransport>,
    method: http::Method,
    uri: http::Uri,
    base_headers: http::HeaderMap,
    size: u64,
    offset: u64,
    body: Pin<Box<dyn AsyncRead + Send>>,
    warning_handler: Option<WarningHandler>,
}

impl RangeSeekReader {
    pub(crate) fn new(
        transport: Arc<dyn HttpTransport>,
        method: http::Method,
        uri: http::Uri,
        base_headers: http::HeaderMap,
        size: u64,
        initial_offset: u64,
        initial_body: BodyStream,
        warning_handler: Option<WarningHandler>,
    ) -> Self {
        RangeSeekReader {
            transport,
            method,
            uri,
            base_headers,
            size,
            offset: initial_offset,
            body: as_async_read(initial_body),
            warning_handler,
        }
    }

    /// The descriptor size this reader was constructed against.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The current logical offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Seeks to a logical offset, reissuing the request with a `Range`
    /// header when the seek is not a no-op and not to end-of-stream.
    pub async fn seek_to(&mut self, whence: Whence, offset: i64) -> Result<()> {
        let absolute = match whence {
            Whence::Start => offset,
            Whence::End => self.size as i64 + offset,
        };
        if absolute < 0 || absolute as u64 > self.size {
            return Err(Error::invalid_reference(
                format!("{offset:?} from {whence:?}"),
                "seek offset out of range",
            ));
        }
        let absolute = absolute as u64;

        if absolute == self.offset {
            return Ok(());
        }
        if absolute == self.size {
            self.body = Box::pin(tokio::io::empty());
            self.offset = absolute;
            return Ok(());
        }

        let mut request = http::Request::builder().method(self.method.clone()).uri(self.uri.clone());
        for (name, value) in self.base_headers.iter() {
            request = request.header(name, value);
        }
        let range_value = format!("bytes={}-{}", absolute, self.size - 1);
        let request = request
            .header(http::header::RANGE, range_value)
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building range request", e))?;

        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        if response.status != http::StatusCode::PARTIAL_CONTENT {
            return Err(Error::from_response_body(
                self.method.as_str(),
                self.uri.to_string(),
                response.status.as_u16(),
                &response.bytes_capped(4096).await.unwrap_or_default(),
            ));
        }
        self.body = as_async_read(response.body);
        self.offset = absolute;
        Ok(())
    }

    /// Closes whichever body is currently open. After closing, reads return
    /// EOF without issuing a request.
    pub fn close(&mut self) {
        self.body = Box::pin(tokio::io::empty());
    }
}

impl AsyncRead for RangeSeekReader {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.body).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            self.offset += (buf.filled().len() - before) as u64;
        }
        poll
    }
}

/// A blob's fetched body: a direct stream for a plain `200 OK` response, or
/// a seekable reader for a `206 Partial Content` range probe.
pub enum Blob {
    Direct(Pin<Box<dyn AsyncRead + Send>>),
    Seekable(RangeSeekReader),
}

impl AsyncRead for Blob {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Blob::Direct(r) => Pin::new(r).poll_read(cx, buf),
            Blob::Seekable(r) => Pin::new(r).poll_read(cx, buf),
        }
    }
}

/// Wraps an [`AsyncRead`] body, hashing it as it's read and checking the
/// running digest against `expected` once the inner reader reaches EOF.
///
/// Only used for `Blob::Direct`: a `206`-backed [`RangeSeekReader`] can seek
/// to arbitrary offsets, so there is no single whole-body hash to check.
struct DigestVerifyingReader {
    inner: Pin<Box<dyn AsyncRead + Send>>,
    hasher: Option<crate::digest::Hasher>,
    expected: Digest,
}

impl DigestVerifyingReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send>>, hasher: crate::digest::Hasher, expected: Digest) -> Self {
        DigestVerifyingReader {
            inner,
            hasher: Some(hasher),
            expected,
        }
    }
}

impl AsyncRead for DigestVerifyingReader {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        match &poll {
            Poll::Ready(Ok(())) if buf.filled().len() > before => {
                if let Some(hasher) = self.hasher.as_mut() {
                    hasher.update(&buf.filled()[before..]);
                }
            }
            Poll::Ready(Ok(())) => {
                // EOF: filled length unchanged from before this poll.
                if let Some(hasher) = self.hasher.take() {
                    let actual_hex = hasher.finish_hex();
                    if actual_hex != self.expected.hex() {
                        return Poll::Ready(Err(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            Error::digest_mismatch(self.expected.to_string(), format!("{}:{actual_hex}", self.expected.algorithm())),
                        )));
                    }
                }
            }
            _ => {}
        }
        poll
    }
}

/// The `Fetch`/`Push`/`Exists`/`Delete`/`Resolve` capability bag for content
/// whose media type routes to the blob CAS (§3, §4.3).
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn fetch(&self, desc: &Descriptor) -> Result<Blob>;
    async fn push(&self, expected: &Descriptor, content: BodyStream) -> Result<()>;
    async fn exists(&self, desc: &Descriptor) -> Result<bool>;
    async fn delete(&self, desc: &Descriptor) -> Result<()>;
    async fn resolve(&self, reference: &Reference) -> Result<Descriptor>;
    async fn fetch_reference(&self, reference: &Reference) -> Result<(Descriptor, Blob)>;
}

/// The default [`BlobStore`], talking to a single repository over HTTP.
pub struct RepoBlobStore {
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) reference: Reference,
    pub(crate) plain_http: bool,
    pub(crate) metadata_byte_ceiling: usize,
    pub(crate) algorithms: AlgorithmRegistry,
    pub(crate) warning_handler: Option<WarningHandler>,
}

impl RepoBlobStore {
    async fn resolve_digest(&self, digest: &Digest) -> Result<Descriptor> {
        let locator = Reference::from_str(&format!("{}/{}@{}", self.reference.registry(), self.reference.repository(), digest))?;
        let uri = url::blob(&locator, digest, self.plain_http);
        let request = http::Request::builder()
            .method(http::Method::HEAD)
            .uri(&uri)
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building HEAD request", e))?;
        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        match response.status {
            http::StatusCode::OK => {
                let media_type = response
                    .header("content-type")
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let size = response.content_length().unwrap_or(0);
                Ok(Descriptor::new(media_type, digest.clone(), size))
            }
            http::StatusCode::NOT_FOUND => Err(Error::not_found("blob", digest.to_string())),
            status => Err(Error::from_response_body("HEAD", uri, status.as_u16(), &[])),
        }
    }
}

#[async_trait]
impl BlobStore for RepoBlobStore {
    async fn fetch(&self, desc: &Descriptor) -> Result<Blob> {
        let uri = url::blob(&self.reference, &desc.digest, self.plain_http);
        let mut builder = http::Request::builder().method(http::Method::GET).uri(&uri);
        if desc.size > 0 {
            builder = builder.header(http::header::RANGE, format!("bytes=0-{}", desc.size - 1));
        }
        let base_headers = http::HeaderMap::new();
        let request = builder
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building blob GET request", e))?;

        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        match response.status {
            http::StatusCode::OK => {
                if let Some(len) = response.content_length() {
                    if len != desc.size {
                        return Err(Error::content_length_mismatch(desc.size, len));
                    }
                }
                let reader = as_async_read(response.body);
                match self.algorithms.hasher(desc.digest.algorithm()) {
                    Some(hasher) => Ok(Blob::Direct(Box::pin(DigestVerifyingReader::new(reader, hasher, desc.digest.clone())))),
                    None => Ok(Blob::Direct(reader)),
                }
            }
            http::StatusCode::PARTIAL_CONTENT => Ok(Blob::Seekable(RangeSeekReader::new(
                self.transport.clone(),
                http::Method::GET,
                uri.parse().map_err(|e: http::uri::InvalidUri| Error::io_with_source("parsing blob uri", e))?,
                base_headers,
                desc.size,
                0,
                response.body,
                self.warning_handler.clone(),
            ))),
            http::StatusCode::NOT_FOUND => Err(Error::not_found("blob", desc.digest.to_string())),
            status => {
                let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
                Err(Error::from_response_body("GET", uri, status.as_u16(), &body))
            }
        }
    }

    async fn push(&self, expected: &Descriptor, content: BodyStream) -> Result<()> {
        let upload_uri = url::blob_upload(&self.reference, self.plain_http);
        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri(&upload_uri)
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building upload POST request", e))?;

        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        if response.status != http::StatusCode::ACCEPTED {
            let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
            return Err(Error::from_response_body("POST", upload_uri, response.status.as_u16(), &body));
        }
        let location = response
            .header("location")
            .ok_or_else(|| Error::missing_header("Location"))?
            .to_string();

        let put_uri = normalize_upload_location(&upload_uri, &location);
        let separator = if put_uri.contains('?') { "&" } else { "?" };
        let put_uri = format!("{put_uri}{separator}digest={}", expected.digest);

        let request = http::Request::builder()
            .method(http::Method::PUT)
            .uri(&put_uri)
            .header(http::header::CONTENT_TYPE, "application/octet-stream")
            .header(http::header::CONTENT_LENGTH, expected.size.to_string())
            .body(content)
            .map_err(|e| Error::io_with_source("building upload PUT request", e))?;

        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        if response.status != http::StatusCode::CREATED {
            let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
            return Err(Error::from_response_body("PUT", put_uri, response.status.as_u16(), &body));
        }
        Ok(())
    }

    async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        match self.resolve_digest(&desc.digest).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, desc: &Descriptor) -> Result<()> {
        let uri = url::blob(&self.reference, &desc.digest, self.plain_http);
        let request = http::Request::builder()
            .method(http::Method::DELETE)
            .uri(&uri)
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building blob DELETE request", e))?;
        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        match response.status {
            http::StatusCode::ACCEPTED => Ok(()),
            http::StatusCode::NOT_FOUND => Err(Error::not_found("blob", desc.digest.to_string())),
            status => {
                let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
                Err(Error::from_response_body("DELETE", uri, status.as_u16(), &body))
            }
        }
    }

    async fn resolve(&self, reference: &Reference) -> Result<Descriptor> {
        let digest = reference
            .digest()
            .ok_or_else(|| Error::invalid_reference(reference.to_string(), "blob resolve requires a digest reference"))?;
        self.resolve_digest(digest).await
    }

    async fn fetch_reference(&self, reference: &Reference) -> Result<(Descriptor, Blob)> {
        let desc = self.resolve(reference).await?;
        let blob = self.fetch(&desc).await?;
        Ok((desc, blob))
    }
}

/// Normalises an explicit-443 host mismatch: if the original request used
/// port 443 and the server's `Location` host lacks a port, re-add `:443`
/// (§4.3).
fn normalize_upload_location(original_uri: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        let Ok(original) = original_uri.parse::<http::Uri>() else {
            return location.to_string();
        };
        let Ok(loc) = location.parse::<http::Uri>() else {
            return location.to_string();
        };
        if original.port_u16() == Some(443) && loc.port_u16().is_none() {
            if let Some(authority) = loc.authority() {
                let host = authority.host();
                let rest = loc
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_default();
                return format!("{}://{}:443{}", loc.scheme_str().unwrap_or("https"), host, rest);
            }
        }
        location.to_string()
    } else {
        // relative Location: resolve against the original request's origin.
        crate::link::resolve(original_uri, location)
    }
}

/// Builds a body from fully-buffered bytes, the common case for pushing
/// small blobs where the caller already has the content in memory.
pub fn content_body(bytes: Bytes) -> BodyStream {
    body_from_bytes(bytes)
}

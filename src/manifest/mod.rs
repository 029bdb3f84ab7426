//! Content-addressed fetch/push/exists/delete/resolve over
//! `/v2/{repo}/manifests/*` (§4.4), with media-type negotiation, tagging,
//! and push-with-reference.

use crate::descriptor::Descriptor;
use crate::digest::{AlgorithmRegistry, Digest};
use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::transport::{body_from_bytes, empty_body, HttpTransport};
use crate::url;
use crate::warning::WarningHandler;
use async_trait::async_trait;
use bytes::Bytes;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// The `Fetch`/`Push`/`Exists`/`Delete`/`Resolve` capability bag for content
/// whose media type is in the configured manifest-media-type set (§3,
/// §4.4), plus tag-service operations.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    async fn fetch(&self, desc: &Descriptor) -> Result<Bytes>;
    async fn push(&self, expected: &Descriptor, content: Bytes) -> Result<()>;
    async fn push_reference(&self, expected: &Descriptor, content: Bytes, reference: &Reference) -> Result<()>;
    async fn resolve(&self, reference: &Reference) -> Result<Descriptor>;
    async fn fetch_reference(&self, reference: &Reference) -> Result<(Descriptor, Bytes)>;
    async fn tag(&self, desc: &Descriptor, reference: &Reference) -> Result<()>;
    async fn delete(&self, desc: &Descriptor) -> Result<()>;
    async fn exists(&self, desc: &Descriptor) -> Result<bool>;
}

/// The default [`ManifestStore`], talking to a single repository over HTTP.
pub struct RepoManifestStore {
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) reference: Reference,
    pub(crate) plain_http: bool,
    pub(crate) manifest_media_types: Vec<String>,
    pub(crate) metadata_byte_ceiling: usize,
    pub(crate) algorithms: AlgorithmRegistry,
    pub(crate) warning_handler: Option<WarningHandler>,
}

impl RepoManifestStore {
    fn accept_header(&self) -> String {
        let mut types = self.manifest_media_types.clone();
        types.push("*/*".to_string());
        types.join(", ")
    }

    fn digest_reference(&self, digest: &Digest) -> Result<Reference> {
        Reference::from_str(&format!("{}/{}@{}", self.reference.registry(), self.reference.repository(), digest))
    }
}

#[async_trait]
impl ManifestStore for RepoManifestStore {
    async fn fetch(&self, desc: &Descriptor) -> Result<Bytes> {
        let uri = url::manifest(&self.reference, &desc.digest.to_string(), self.plain_http);
        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(&uri)
            .header(http::header::ACCEPT, desc.media_type.clone())
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building manifest GET request", e))?;

        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        match response.status {
            http::StatusCode::OK => {
                let content_type = response.header("content-type").map(|s| s.to_string());
                if content_type.as_deref() != Some(desc.media_type.as_str()) {
                    return Err(Error::content_type_mismatch(
                        desc.media_type.clone(),
                        content_type.unwrap_or_default(),
                    ));
                }
                if let Some(len) = response.content_length() {
                    if len != desc.size {
                        return Err(Error::content_length_mismatch(desc.size, len));
                    }
                }
                let body = response.bytes_capped(self.metadata_byte_ceiling).await?;
                desc.digest.verify(&body, &self.algorithms)?;
                Ok(body)
            }
            http::StatusCode::NOT_FOUND => Err(Error::not_found("manifest", desc.digest.to_string())),
            status => {
                let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
                Err(Error::from_response_body("GET", uri, status.as_u16(), &body))
            }
        }
    }

    async fn push(&self, expected: &Descriptor, content: Bytes) -> Result<()> {
        let digest_ref = self.digest_reference(&expected.digest)?;
        self.push_reference(expected, content, &digest_ref).await
    }

    async fn push_reference(&self, expected: &Descriptor, content: Bytes, reference: &Reference) -> Result<()> {
        if content.len() as u64 != expected.size {
            return Err(Error::content_length_mismatch(expected.size, content.len() as u64));
        }
        let locator = reference
            .digest()
            .map(|d| d.to_string())
            .or_else(|| reference.tag().map(|t| t.to_string()))
            .unwrap_or_else(|| expected.digest.to_string());
        let uri = url::manifest(&self.reference, &locator, self.plain_http);

        // Buffered so the body can be replayed verbatim if the transport
        // needs a second pass (e.g. to satisfy an auth challenge, §4.4/§9).
        let request = http::Request::builder()
            .method(http::Method::PUT)
            .uri(&uri)
            .header(http::header::CONTENT_TYPE, expected.media_type.clone())
            .header(http::header::CONTENT_LENGTH, expected.size.to_string())
            .body(body_from_bytes(content))
            .map_err(|e| Error::io_with_source("building manifest PUT request", e))?;

        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        if response.status != http::StatusCode::CREATED {
            let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
            return Err(Error::from_response_body("PUT", uri, response.status.as_u16(), &body));
        }
        if let Some(server_digest) = response.header("docker-content-digest") {
            if server_digest != expected.digest.to_string() {
                return Err(Error::digest_mismatch(expected.digest.to_string(), server_digest.to_string()));
            }
        }
        Ok(())
    }

    async fn resolve(&self, reference: &Reference) -> Result<Descriptor> {
        let locator = reference
            .digest()
            .map(|d| d.to_string())
            .or_else(|| reference.tag().map(|t| t.to_string()))
            .ok_or_else(|| Error::invalid_reference(reference.to_string(), "manifest resolve requires a tag or digest"))?;
        let uri = url::manifest(&self.reference, &locator, self.plain_http);

        let request = http::Request::builder()
            .method(http::Method::HEAD)
            .uri(&uri)
            .header(http::header::ACCEPT, self.accept_header())
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building manifest HEAD request", e))?;
        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());

        match response.status {
            http::StatusCode::OK => {
                let server_digest = response.header("docker-content-digest").map(|s| s.to_string());
                let digest = match (reference.digest(), server_digest) {
                    (Some(ref_digest), Some(server)) => {
                        if ref_digest.to_string() != server {
                            return Err(Error::digest_mismatch(ref_digest.to_string(), server));
                        }
                        ref_digest.clone()
                    }
                    (None, Some(server)) => server.parse::<Digest>()?,
                    (Some(ref_digest), None) => ref_digest.clone(),
                    (None, None) => return Err(Error::missing_header("Docker-Content-Digest")),
                };
                let media_type = response
                    .header("content-type")
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let size = response.content_length().unwrap_or(0);
                Ok(Descriptor::new(media_type, digest, size))
            }
            http::StatusCode::NOT_FOUND => Err(Error::not_found("manifest", reference.to_string())),
            status => Err(Error::from_response_body("HEAD", uri, status.as_u16(), &[])),
        }
    }

    async fn fetch_reference(&self, reference: &Reference) -> Result<(Descriptor, Bytes)> {
        let locator = reference
            .digest()
            .map(|d| d.to_string())
            .or_else(|| reference.tag().map(|t| t.to_string()))
            .ok_or_else(|| Error::invalid_reference(reference.to_string(), "manifest fetch requires a tag or digest"))?;
        let uri = url::manifest(&self.reference, &locator, self.plain_http);

        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(&uri)
            .header(http::header::ACCEPT, self.accept_header())
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building manifest GET request", e))?;
        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());

        match response.status {
            http::StatusCode::OK => {
                let media_type = response
                    .header("content-type")
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let server_digest = response.header("docker-content-digest").map(|s| s.to_string());
                let body = response.bytes_capped(self.metadata_byte_ceiling).await?;

                let digest = match (reference.digest(), server_digest) {
                    (Some(ref_digest), Some(server)) => {
                        if ref_digest.to_string() != server {
                            return Err(Error::digest_mismatch(ref_digest.to_string(), server));
                        }
                        ref_digest.clone()
                    }
                    (None, Some(server)) => server.parse::<Digest>()?,
                    (Some(ref_digest), None) => ref_digest.clone(),
                    // Neither the reference nor the server names a digest: the
                    // body itself is the only source of truth left (§4.4 row 5).
                    (None, None) => Digest::sha256(&body),
                };

                let desc = Descriptor::new(media_type, digest, body.len() as u64);
                desc.verify(&body, &self.algorithms)?;
                Ok((desc, body))
            }
            http::StatusCode::NOT_FOUND => Err(Error::not_found("manifest", reference.to_string())),
            status => {
                let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
                Err(Error::from_response_body("GET", uri, status.as_u16(), &body))
            }
        }
    }

    async fn tag(&self, desc: &Descriptor, reference: &Reference) -> Result<()> {
        let content = self.fetch(desc).await?;
        self.push_reference(desc, content, reference).await
    }

    async fn delete(&self, desc: &Descriptor) -> Result<()> {
        let uri = url::manifest(&self.reference, &desc.digest.to_string(), self.plain_http);
        let request = http::Request::builder()
            .method(http::Method::DELETE)
            .uri(&uri)
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building manifest DELETE request", e))?;
        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        match response.status {
            http::StatusCode::ACCEPTED => Ok(()),
            http::StatusCode::NOT_FOUND => Err(Error::not_found("manifest", desc.digest.to_string())),
            status => {
                let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
                Err(Error::from_response_body("DELETE", uri, status.as_u16(), &body))
            }
        }
    }

    async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        let digest_ref = self.digest_reference(&desc.digest)?;
        match self.resolve(&digest_ref).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

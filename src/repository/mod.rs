//! The unified client for a single repository (§4.8): dispatches
//! `Fetch`/`Push`/`Exists`/`Delete` to the blob or manifest store by
//! descriptor media type, and exposes tagging, listing, and referrers
//! enumeration directly against the manifest and referrers stores.

use crate::blob::{content_body, Blob, BlobStore, RepoBlobStore};
use crate::config::RepositoryOptions;
use crate::descriptor::Descriptor;
use crate::digest::AlgorithmRegistry;
use crate::error::{Error, Result};
use crate::manifest::{ManifestStore, RepoManifestStore};
use crate::reference::Reference;
use crate::referrers::{ReferrersCapability, ReferrersStore, RepoReferrersStore};
use crate::transport::empty_body;
use crate::url;
use bytes::Bytes;
use std::sync::Arc;
use std::str::FromStr;


/// A fetched body, unified across the blob and manifest stores: a
/// [`Blob`] (possibly seekable) for blob-routed content, or a buffered
/// [`Bytes`] for manifest-routed content (manifests are always small
/// enough to buffer, and callers typically need the whole document anyway).
pub enum Content {
    Blob(Blob),
    Manifest(Bytes),
}

#[derive(Debug, Default, serde::Deserialize)]
struct TagsPage {
    #[serde(default)]
    tags: Vec<String>,
}

/// The façade over one repository's blob store, manifest store, and
/// referrers store, all sharing one [`Reference`] and [`RepositoryOptions`].
pub struct Repository {
    reference: Reference,
    options: RepositoryOptions,
    blobs: RepoBlobStore,
    manifests: RepoManifestStore,
    referrers: RepoReferrersStore,
}

impl Repository {
    /// Parses `reference` and builds a repository against it using `options`.
    pub fn new(reference: &str, options: RepositoryOptions) -> Result<Self> {
        Ok(Self::from_reference(Reference::from_str(reference)?, options))
    }

    /// Builds a repository from an already-parsed [`Reference`], cloning the
    /// shared transport/config into each of the three underlying stores.
    /// Used directly by [`crate::registry::Registry::repository`], which
    /// clones its repository-template options and substitutes the
    /// repository component rather than re-parsing a whole reference string.
    pub(crate) fn from_reference(reference: Reference, options: RepositoryOptions) -> Self {
        let blobs = RepoBlobStore {
            transport: options.transport().clone(),
            reference: reference.clone(),
            plain_http: options.plain_http(),
            metadata_byte_ceiling: options.metadata_byte_ceiling(),
            algorithms: AlgorithmRegistry::default(),
            warning_handler: options.warning_handler().cloned(),
        };
        let manifests = RepoManifestStore {
            transport: options.transport().clone(),
            reference: reference.clone(),
            plain_http: options.plain_http(),
            manifest_media_types: options.manifest_media_types().to_vec(),
            metadata_byte_ceiling: options.metadata_byte_ceiling(),
            algorithms: AlgorithmRegistry::default(),
            warning_handler: options.warning_handler().cloned(),
        };
        let referrers = RepoReferrersStore {
            transport: options.transport().clone(),
            reference: reference.clone(),
            plain_http: options.plain_http(),
            metadata_byte_ceiling: options.metadata_byte_ceiling(),
            page_size: options.referrer_page_size,
            capability: Arc::new(ReferrersCapability::new()),
            warning_handler: options.warning_handler().cloned(),
        };
        Repository {
            reference,
            options,
            blobs,
            manifests,
            referrers,
        }
    }

    /// The reference this repository was constructed against.
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Direct access to the underlying blob store, e.g. to `Fetch` by a bare
    /// digest without going through media-type dispatch.
    pub fn blobs(&self) -> &dyn BlobStore {
        &self.blobs
    }

    /// Direct access to the underlying manifest store.
    pub fn manifests(&self) -> &dyn ManifestStore {
        &self.manifests
    }

    fn routes_to_manifest_store(&self, desc: &Descriptor) -> bool {
        desc.routes_to_manifest_store(self.options.manifest_media_types())
    }

    /// Fetches `desc`'s content, dispatching to the blob or manifest store
    /// by its media type (§3's routing invariant).
    pub async fn fetch(&self, desc: &Descriptor) -> Result<Content> {
        if self.routes_to_manifest_store(desc) {
            Ok(Content::Manifest(self.manifests.fetch(desc).await?))
        } else {
            Ok(Content::Blob(self.blobs.fetch(desc).await?))
        }
    }

    /// Pushes `content` under `expected`, dispatching by media type.
    pub async fn push(&self, expected: &Descriptor, content: Bytes) -> Result<()> {
        if self.routes_to_manifest_store(expected) {
            self.manifests.push(expected, content).await
        } else {
            self.blobs.push(expected, content_body(content)).await
        }
    }

    /// `true` if `desc`'s content is present, dispatching by media type.
    pub async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        if self.routes_to_manifest_store(desc) {
            self.manifests.exists(desc).await
        } else {
            self.blobs.exists(desc).await
        }
    }

    /// Deletes `desc`'s content, dispatching by media type.
    pub async fn delete(&self, desc: &Descriptor) -> Result<()> {
        if self.routes_to_manifest_store(desc) {
            self.manifests.delete(desc).await
        } else {
            self.blobs.delete(desc).await
        }
    }

    /// Resolves `reference` to a descriptor via the manifest store's tag
    /// service (a bare digest reference resolves through the blob store
    /// instead via [`Repository::blobs`]).
    pub async fn resolve(&self, reference: &Reference) -> Result<Descriptor> {
        self.manifests.resolve(reference).await
    }

    /// Fetches `reference` and returns its descriptor alongside the body,
    /// computing the digest from the body when neither the reference nor
    /// the server names one (§4.4 row 5).
    pub async fn fetch_reference(&self, reference: &Reference) -> Result<(Descriptor, Bytes)> {
        self.manifests.fetch_reference(reference).await
    }

    /// Pushes `content` and tags it as `reference` in one PUT.
    pub async fn push_reference(&self, expected: &Descriptor, content: Bytes, reference: &Reference) -> Result<()> {
        self.manifests.push_reference(expected, content, reference).await
    }

    /// Tags `desc` as `reference`: fetches the manifest then pushes it again
    /// under the new locator (§9's resolved tag-flow Open Question).
    pub async fn tag(&self, desc: &Descriptor, reference: &Reference) -> Result<()> {
        self.manifests.tag(desc, reference).await
    }

    /// Lists referrers of `digest`, optionally filtered by `artifact_type`,
    /// delivering each page to `sink` (§4.6).
    pub async fn referrers(
        &self,
        digest: &crate::digest::Digest,
        artifact_type: Option<&str>,
        sink: &mut (dyn FnMut(Vec<Descriptor>) -> Result<()> + Send),
    ) -> Result<()> {
        self.referrers.list(digest, artifact_type, sink).await
    }

    async fn fetch_tags_page(&self, url: String) -> Result<(Vec<String>, Option<String>)> {
        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(&url)
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building tags GET request", e))?;
        let response = self.options.transport().execute(request).await?;
        crate::warning::deliver(&response.headers, self.options.warning_handler());
        match response.status {
            http::StatusCode::OK => {
                let link = response.header("link").map(|s| s.to_string());
                let body = response.bytes_capped(self.options.metadata_byte_ceiling()).await?;
                let page: TagsPage =
                    serde_json::from_slice(&body).map_err(|e| Error::decode_with_source("tags page", e))?;
                let next = crate::link::parse_next(link.as_deref(), &url);
                Ok((page.tags, next))
            }
            status => {
                let body = response.bytes_capped(self.options.metadata_byte_ceiling()).await.unwrap_or_default();
                Err(Error::from_response_body("GET", url, status.as_u16(), &body))
            }
        }
    }

    /// Lists tags via `/v2/{repo}/tags/list`, starting after `last` (applied
    /// only to the first request; subsequent pages come from `Link`).
    pub async fn tags(&self, last: Option<&str>, sink: &mut (dyn FnMut(Vec<String>) -> Result<()> + Send)) -> Result<()> {
        let mut initial = url::tags(&self.reference, self.options.plain_http());
        let mut query = Vec::new();
        if let Some(n) = self.options.tag_page_size {
            query.push(format!("n={n}"));
        }
        if let Some(last) = last {
            query.push(format!("last={last}"));
        }
        if !query.is_empty() {
            initial = format!("{initial}?{}", query.join("&"));
        }
        crate::link::paginate(initial, |u| async move { self.fetch_tags_page(u).await }, sink).await
    }
}

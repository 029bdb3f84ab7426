//! Enumerates manifests whose `subject` is a given descriptor (§4.6),
//! handling the three-endpoint protocol fallback, server/client-side
//! artifact-type filtering, and pagination.

use crate::descriptor::Descriptor;
use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::transport::{empty_body, HttpTransport};
use crate::url;
use crate::warning::WarningHandler;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;


const FILTER_ANNOTATION: &str = "org.opencontainers.referrers.filters.applied";

const UNKNOWN: u8 = 0;
const SUPPORTED: u8 = 1;
const UNSUPPORTED: u8 = 2;

/// A monotonic `unknown → {supported, unsupported}` cell recording whether a
/// repository's registry implements the canonical referrers endpoint.
/// Compare-and-set from `unknown` so racing callers converge on one value.
#[derive(Debug, Default)]
pub struct ReferrersCapability(AtomicU8);

impl ReferrersCapability {
    pub fn new() -> Self {
        Self(AtomicU8::new(UNKNOWN))
    }

    fn load(&self) -> u8 {
        self.0.load(Ordering::SeqCst)
    }

    fn mark_supported(&self) {
        let _ = self.0.compare_exchange(UNKNOWN, SUPPORTED, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn mark_unsupported(&self) {
        let _ = self.0.compare_exchange(UNKNOWN, UNSUPPORTED, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Resets the cache to `unknown`, forcing the next call to re-probe.
    pub fn reset(&self) {
        self.0.store(UNKNOWN, Ordering::SeqCst);
    }
}

/// One mutation against a locally-held referrer list, used by [`merge`] to
/// compute an updated set without talking to the network.
#[derive(Debug, Clone)]
pub enum ReferrerOp {
    Add(Descriptor),
    Remove(Descriptor),
}

fn descriptor_key(d: &Descriptor) -> (String, String, u64) {
    (d.media_type.clone(), d.digest.to_string(), d.size)
}

fn is_empty_descriptor(d: &Descriptor) -> bool {
    d.media_type.is_empty() || d.digest.hex().is_empty()
}

/// Applies `ops` to `current`, de-duplicating by `(mediaType, digest, size)`
/// and dropping empty descriptors. Returns `None` — the "no update" sentinel
/// — when the resulting set is unchanged (by membership, not order) and
/// `current` contained no bad entries to begin with.
pub fn merge(current: &[Descriptor], ops: &[ReferrerOp]) -> Option<Vec<Descriptor>> {
    let mut had_bad_entry = false;
    let mut set: BTreeMap<(String, String, u64), Descriptor> = BTreeMap::new();
    for d in current {
        if is_empty_descriptor(d) {
            had_bad_entry = true;
            continue;
        }
        set.insert(descriptor_key(d), d.clone());
    }

    for op in ops {
        match op {
            ReferrerOp::Add(d) => {
                if !is_empty_descriptor(d) {
                    set.insert(descriptor_key(d), d.clone());
                }
            }
            ReferrerOp::Remove(d) => {
                set.remove(&descriptor_key(d));
            }
        }
    }

    if !had_bad_entry && ops.is_empty() {
        return None;
    }

    let merged: Vec<Descriptor> = set.into_values().collect();
    if !had_bad_entry {
        let current_keys: std::collections::BTreeSet<_> = current.iter().map(descriptor_key).collect();
        let merged_keys: std::collections::BTreeSet<_> = merged.iter().map(descriptor_key).collect();
        if current_keys == merged_keys {
            return None;
        }
    }
    Some(merged)
}

#[derive(Debug, Default, serde::Deserialize)]
struct ReferrersPage {
    #[serde(default)]
    referrers: Option<Vec<Descriptor>>,
    #[serde(default)]
    references: Option<Vec<Descriptor>>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

impl ReferrersPage {
    fn into_items(self, artifact_type: Option<&str>) -> Vec<Descriptor> {
        let mut items = self.referrers.or(self.references).unwrap_or_default();
        let server_filtered = artifact_type
            .map(|at| self.annotations.get(FILTER_ANNOTATION).is_some_and(|applied| applied.contains(at)))
            .unwrap_or(true);
        if !server_filtered {
            if let Some(at) = artifact_type {
                items.retain(|d| d.artifact_type.as_deref() == Some(at));
            }
        }
        items
    }
}

/// The `Referrers` enumeration operation over `…/<repo>/referrers/*` (§4.6).
#[async_trait]
pub trait ReferrersStore: Send + Sync {
    async fn list(
        &self,
        digest: &Digest,
        artifact_type: Option<&str>,
        sink: &mut (dyn FnMut(Vec<Descriptor>) -> Result<()> + Send),
    ) -> Result<()>;
}

/// The default [`ReferrersStore`], talking to a single repository over HTTP.
pub struct RepoReferrersStore {
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) reference: Reference,
    pub(crate) plain_http: bool,
    pub(crate) metadata_byte_ceiling: usize,
    pub(crate) page_size: Option<u32>,
    pub(crate) capability: Arc<ReferrersCapability>,
    pub(crate) warning_handler: Option<WarningHandler>,
}

enum PageOutcome {
    NotFound,
    Ok { items: Vec<Descriptor>, next: Option<String> },
}

impl RepoReferrersStore {
    fn with_page_size(&self, mut url: String) -> String {
        if let Some(n) = self.page_size {
            let sep = if url.contains('?') { "&" } else { "?" };
            url = format!("{url}{sep}n={n}");
        }
        url
    }

    async fn fetch(&self, url: &str, artifact_type: Option<&str>) -> Result<PageOutcome> {
        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(url)
            .header(http::header::ACCEPT, "application/vnd.oci.image.index.v1+json")
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building referrers GET request", e))?;
        let response = self.transport.execute(request).await?;
        crate::warning::deliver(&response.headers, self.warning_handler.as_ref());
        match response.status {
            http::StatusCode::OK => {
                let link = response.header("link").map(|s| s.to_string());
                let body = response.bytes_capped(self.metadata_byte_ceiling).await?;
                let page: ReferrersPage =
                    serde_json::from_slice(&body).map_err(|e| Error::decode_with_source("referrers page", e))?;
                let items = page.into_items(artifact_type);
                let next = crate::link::parse_next(link.as_deref(), url);
                Ok(PageOutcome::Ok { items, next })
            }
            http::StatusCode::NOT_FOUND => Ok(PageOutcome::NotFound),
            status => {
                let body = response.bytes_capped(self.metadata_byte_ceiling).await.unwrap_or_default();
                Err(Error::from_response_body("GET", url, status.as_u16(), &body))
            }
        }
    }

    async fn fetch_first_page(&self, digest: &Digest, artifact_type: Option<&str>) -> Result<(Vec<Descriptor>, Option<String>)> {
        if self.capability.load() == UNSUPPORTED {
            let url = self.with_page_size(url::referrers_fallback_v2(&self.reference, digest, artifact_type, self.plain_http));
            return match self.fetch(&url, artifact_type).await? {
                PageOutcome::Ok { items, next } => Ok((items, next)),
                PageOutcome::NotFound => Err(Error::not_found("referrers", digest.to_string())),
            };
        }

        let canonical = self.with_page_size(url::referrers(&self.reference, digest, artifact_type, self.plain_http));
        if let PageOutcome::Ok { items, next } = self.fetch(&canonical, artifact_type).await? {
            self.capability.mark_supported();
            return Ok((items, next));
        }

        let fb1 = self.with_page_size(url::referrers_fallback_v1(&self.reference, digest, artifact_type, self.plain_http));
        if let PageOutcome::Ok { items, next } = self.fetch(&fb1, artifact_type).await? {
            self.capability.mark_unsupported();
            return Ok((items, next));
        }

        let fb2 = self.with_page_size(url::referrers_fallback_v2(&self.reference, digest, artifact_type, self.plain_http));
        match self.fetch(&fb2, artifact_type).await? {
            PageOutcome::Ok { items, next } => {
                self.capability.mark_unsupported();
                Ok((items, next))
            }
            PageOutcome::NotFound => Err(Error::not_found("referrers", digest.to_string())),
        }
    }
}

#[async_trait]
impl ReferrersStore for RepoReferrersStore {
    async fn list(
        &self,
        digest: &Digest,
        artifact_type: Option<&str>,
        sink: &mut (dyn FnMut(Vec<Descriptor>) -> Result<()> + Send),
    ) -> Result<()> {
        let (items, next) = self.fetch_first_page(digest, artifact_type).await?;
        sink(items)?;
        let Some(next_url) = next else {
            return Ok(());
        };
        crate::link::paginate(
            next_url,
            |u| async move { self.continue_page(u, artifact_type).await },
            sink,
        )
        .await
    }
}

impl RepoReferrersStore {
    async fn continue_page(&self, url: String, artifact_type: Option<&str>) -> Result<(Vec<Descriptor>, Option<String>)> {
        match self.fetch(&url, artifact_type).await? {
            PageOutcome::Ok { items, next } => Ok((items, next)),
            PageOutcome::NotFound => Err(Error::not_found("referrers page", url)),
        }
    }
}

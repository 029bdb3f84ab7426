//! Descriptors: the `(mediaType, digest, size, ...)` tuples that identify
//! content addressed by this crate's blob and manifest stores.

use crate::digest::{AlgorithmRegistry, Digest};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// The default OCI/Docker manifest and index media types. A [`Descriptor`]
/// whose `media_type` is in this set (or an injected override of it) routes
/// to the manifest store rather than the blob store.
pub const DEFAULT_MANIFEST_MEDIA_TYPES: &[&str] = &[
    "application/vnd.oci.image.manifest.v1+json",
    "application/vnd.oci.image.index.v1+json",
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.docker.distribution.manifest.v1+json",
];

/// A `(mediaType, digest, size[, artifactType, annotations, urls])` tuple
/// identifying content.
///
/// Two descriptors are equal iff their media type, digest, and size are
/// equal; `artifactType`, `annotations`, and `urls` are carried along but do
/// not participate in identity.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub digest: Digest,
    pub size: u64,
    #[serde(rename = "artifactType", default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

impl Descriptor {
    /// Builds a minimal descriptor from the three identity fields.
    pub fn new(media_type: impl Into<String>, digest: Digest, size: u64) -> Self {
        Descriptor {
            media_type: media_type.into(),
            digest,
            size,
            artifact_type: None,
            annotations: BTreeMap::new(),
            urls: Vec::new(),
        }
    }

    /// Parses `digest` (failing with [`Error::InvalidReference`] on a
    /// malformed digest) and builds a descriptor from it.
    pub fn from_parts(media_type: impl Into<String>, digest: &str, size: u64) -> Result<Self> {
        Ok(Descriptor::new(media_type, Digest::from_str(digest)?, size))
    }

    /// `true` if `self.digest`'s algorithm is registered in `registry`.
    pub fn has_verifiable_digest(&self, registry: &AlgorithmRegistry) -> bool {
        registry.is_registered(self.digest.algorithm())
    }

    /// Verifies `bytes` against `self.digest` and `self.size`.
    pub fn verify(&self, bytes: &[u8], registry: &AlgorithmRegistry) -> Result<()> {
        if bytes.len() as u64 != self.size {
            return Err(Error::content_length_mismatch(self.size, bytes.len() as u64));
        }
        self.digest.verify(bytes, registry)
    }

    /// `true` if `media_type` is a member of `manifest_media_types` (the
    /// configured or default manifest-media-type set), per §3's routing
    /// invariant.
    pub fn routes_to_manifest_store(&self, manifest_media_types: &[String]) -> bool {
        manifest_media_types.iter().any(|mt| mt == &self.media_type)
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.media_type == other.media_type && self.digest == other.digest && self.size == other.size
    }
}

impl Eq for Descriptor {}

impl std::hash::Hash for Descriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.media_type.hash(state);
        self.digest.hash(state);
        self.size.hash(state);
    }
}

/// Returns [`DEFAULT_MANIFEST_MEDIA_TYPES`] as owned `String`s, the default
/// value of a repository's `manifest_media_types` configuration field.
pub fn default_manifest_media_types() -> Vec<String> {
    DEFAULT_MANIFEST_MEDIA_TYPES.iter().map(|s| s.to_string()).collect()
}

//! The ambient configuration surface: builder-style options covering every
//! row of §6's configuration-surface table.
//!
//! This crate carries no CLI-facing, file-loaded configuration — output
//! format, TUI themes, and a registries list are application furniture, not
//! library configuration (the final-trim pass dropped the teacher's YAML
//! `Config` for exactly that reason; see `DESIGN.md`). What remains is the
//! knobs a `Repository` or `Registry` actually reads.

use crate::transport::{HttpTransport, ReqwestTransport, TransportConfig};
use crate::warning::WarningHandler;
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// Default ceiling on metadata/JSON body reads (§4.9): 4 MiB.
pub const DEFAULT_METADATA_BYTE_CEILING: usize = 4 * 1024 * 1024;

/// Per-repository configuration: everything a [`crate::repository::Repository`]
/// or [`crate::registry::Registry`] needs beyond the reference itself.
///
/// Mutate via the builder methods before first use; per §5, a `Repository`
/// is safe to share across concurrent operations once its configuration is
/// no longer being mutated.
#[derive(Clone)]
pub struct RepositoryOptions {
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) plain_http: bool,
    pub(crate) manifest_media_types: Vec<String>,
    pub(crate) tag_page_size: Option<u32>,
    pub(crate) referrer_page_size: Option<u32>,
    pub(crate) catalog_page_size: Option<u32>,
    pub(crate) metadata_byte_ceiling: usize,
    pub(crate) warning_handler: Option<WarningHandler>,
}

impl std::fmt::Debug for RepositoryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryOptions")
            .field("plain_http", &self.plain_http)
            .field("manifest_media_types", &self.manifest_media_types)
            .field("tag_page_size", &self.tag_page_size)
            .field("referrer_page_size", &self.referrer_page_size)
            .field("catalog_page_size", &self.catalog_page_size)
            .field("metadata_byte_ceiling", &self.metadata_byte_ceiling)
            .field("warning_handler", &self.warning_handler.is_some())
            .finish()
    }
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            transport: ReqwestTransport::shared(),
            plain_http: false,
            manifest_media_types: crate::descriptor::default_manifest_media_types(),
            tag_page_size: None,
            referrer_page_size: None,
            catalog_page_size: None,
            metadata_byte_ceiling: DEFAULT_METADATA_BYTE_CEILING,
            warning_handler: None,
        }
    }
}

impl RepositoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a caller-provided [`HttpTransport`]. Defaults to
    /// [`ReqwestTransport`] built from [`TransportConfig::default`].
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Builds and installs a [`ReqwestTransport`] from `config`.
    pub fn with_transport_config(mut self, config: TransportConfig) -> crate::error::Result<Self> {
        self.transport = Arc::new(ReqwestTransport::with_config(config)?);
        Ok(self)
    }

    /// Use `http://` instead of `https://` for every request.
    pub fn with_plain_http(mut self, plain_http: bool) -> Self {
        self.plain_http = plain_http;
        self
    }

    /// Overrides the `Accept` list used for manifest resolution, which also
    /// controls which descriptors route to the manifest store (§3).
    pub fn with_manifest_media_types(mut self, media_types: Vec<String>) -> Self {
        self.manifest_media_types = media_types;
        self
    }

    /// Sets the `n=` query parameter used on tag listing.
    pub fn with_tag_page_size(mut self, n: u32) -> Self {
        self.tag_page_size = Some(n);
        self
    }

    /// Sets the `n=` query parameter used on referrer listing.
    pub fn with_referrer_page_size(mut self, n: u32) -> Self {
        self.referrer_page_size = Some(n);
        self
    }

    /// Sets the `n=` query parameter used on catalog listing.
    pub fn with_catalog_page_size(mut self, n: u32) -> Self {
        self.catalog_page_size = Some(n);
        self
    }

    /// Overrides the bound on JSON/error body reads (default 4 MiB).
    pub fn with_metadata_byte_ceiling(mut self, ceiling: usize) -> Self {
        self.metadata_byte_ceiling = ceiling;
        self
    }

    /// Installs a callback invoked for each parsed `Warning` header.
    pub fn with_warning_handler(mut self, handler: WarningHandler) -> Self {
        self.warning_handler = Some(handler);
        self
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    pub fn plain_http(&self) -> bool {
        self.plain_http
    }

    pub fn manifest_media_types(&self) -> &[String] {
        &self.manifest_media_types
    }

    pub fn metadata_byte_ceiling(&self) -> usize {
        self.metadata_byte_ceiling
    }

    pub fn warning_handler(&self) -> Option<&WarningHandler> {
        self.warning_handler.as_ref()
    }
}

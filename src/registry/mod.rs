//! The registry-level client (§4.8): `Ping`, paginated catalog enumeration,
//! and a `Repository(name)` factory that clones the registry's own
//! transport/config template and substitutes the repository component.

use crate::config::RepositoryOptions;
use crate::error::{Error, Result};
use crate::reference::{validate_registry, Reference};
use crate::repository::Repository;
use crate::transport::empty_body;
use crate::url;
use std::str::FromStr;


#[derive(Debug, Default, serde::Deserialize)]
struct CatalogPage {
    #[serde(default)]
    repositories: Vec<String>,
}

/// A registry host plus the configuration template every [`Repository`] it
/// hands out is built from.
pub struct Registry {
    host: String,
    options: RepositoryOptions,
}

impl Registry {
    /// Validates `host` (`host[:port]`) and pairs it with `options`, the
    /// template every [`Registry::repository`] clones and substitutes.
    pub fn new(host: &str, options: RepositoryOptions) -> Result<Self> {
        validate_registry(host)?;
        Ok(Registry {
            host: host.to_string(),
            options,
        })
    }

    /// The registry host this client was constructed against.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `GET /v2/`. `true` on `200`, `false` on anything else.
    pub async fn ping(&self) -> Result<bool> {
        let uri = url::base(&self.host, self.options.plain_http());
        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(&uri)
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building ping GET request", e))?;
        let response = self.options.transport().execute(request).await?;
        crate::warning::deliver(&response.headers, self.options.warning_handler());
        Ok(response.status == http::StatusCode::OK)
    }

    async fn fetch_catalog_page(&self, url: String) -> Result<(Vec<String>, Option<String>)> {
        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(&url)
            .body(empty_body())
            .map_err(|e| Error::io_with_source("building catalog GET request", e))?;
        let response = self.options.transport().execute(request).await?;
        crate::warning::deliver(&response.headers, self.options.warning_handler());
        match response.status {
            http::StatusCode::OK => {
                let link = response.header("link").map(|s| s.to_string());
                let body = response.bytes_capped(self.options.metadata_byte_ceiling()).await?;
                let page: CatalogPage =
                    serde_json::from_slice(&body).map_err(|e| Error::decode_with_source("catalog page", e))?;
                let next = crate::link::parse_next(link.as_deref(), &url);
                Ok((page.repositories, next))
            }
            status => {
                let body = response.bytes_capped(self.options.metadata_byte_ceiling()).await.unwrap_or_default();
                Err(Error::from_response_body("GET", url, status.as_u16(), &body))
            }
        }
    }

    /// Enumerates the registry's catalog via `/v2/_catalog`, starting after
    /// `last` (applied only to the first request; subsequent pages come from
    /// `Link`), delivering each page to `sink`.
    pub async fn repositories(&self, last: Option<&str>, sink: &mut (dyn FnMut(Vec<String>) -> Result<()> + Send)) -> Result<()> {
        let mut initial = url::catalog(&self.host, self.options.plain_http());
        let mut query = Vec::new();
        if let Some(n) = self.options.catalog_page_size {
            query.push(format!("n={n}"));
        }
        if let Some(last) = last {
            query.push(format!("last={last}"));
        }
        if !query.is_empty() {
            initial = format!("{initial}?{}", query.join("&"));
        }
        crate::link::paginate(initial, |u| async move { self.fetch_catalog_page(u).await }, sink).await
    }

    /// Validates `name` against the repository grammar and returns a
    /// [`Repository`] built by cloning this registry's template and
    /// substituting `name` as the repository component.
    pub fn repository(&self, name: &str) -> Result<Repository> {
        crate::reference::validate_repository(name)?;
        let reference = Reference::from_str(&format!("{}/{name}", self.host))?;
        Ok(Repository::from_reference(reference, self.options.clone()))
    }
}

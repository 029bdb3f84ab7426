//! Link-header parsing and the generic pagination driver (§4.7).
//!
//! Every listing operation (catalog, tags, referrers) follows the same
//! shape: `url ← initial; while url ≠ ∅ { (page, next) ← get(url); sink(page);
//! url ← next }`. [`paginate`] implements that loop once; each listing
//! operation only needs to supply a `get` closure that turns a URL into a
//! page plus the raw `Link` header value.

use crate::error::Result;
use std::future::Future;

#[cfg(test)]
mod tests;

/// Extracts the `rel="next"` URL from a `Link` response header, resolving a
/// relative target against `base_url`. Returns `None` if the header is
/// absent, unparsable, or carries no `rel="next"` entry — all of which mean
/// end-of-stream to the pagination driver.
pub fn parse_next(link_header: Option<&str>, base_url: &str) -> Option<String> {
    let header = link_header?;
    for entry in header.split(',') {
        let entry = entry.trim();
        let Some((target, params)) = entry.split_once(';') else {
            continue;
        };
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let is_next = params
            .split(';')
            .map(str::trim)
            .any(|p| p == "rel=\"next\"" || p == "rel=next");
        if is_next {
            return Some(resolve(base_url, target));
        }
    }
    None
}

/// Resolves `target` against `base` the way a browser resolves an anchor
/// href: absolute targets pass through unchanged, everything else is
/// treated as path-and-query relative to `base`'s origin.
pub(crate) fn resolve(base: &str, target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    let origin_end = base
        .split_once("://")
        .and_then(|(_, rest)| rest.find('/'))
        .map(|idx| "://".len() + idx)
        .unwrap_or(base.len());
    let scheme_end = base.find("://").map(|i| i + "://".len()).unwrap_or(0);
    let origin = &base[..scheme_end + (origin_end - scheme_end)];
    if target.starts_with('/') {
        format!("{origin}{target}")
    } else {
        format!("{origin}/{target}")
    }
}

/// Drives a paged listing: repeatedly calls `get(url)` to obtain a page and
/// the next URL, passes each page to `sink`, and stops when `get` reports no
/// further URL. `sink` may abort the traversal early by returning `Err`.
pub async fn paginate<T, G, GF, S>(initial_url: String, mut get: G, mut sink: S) -> Result<()>
where
    G: FnMut(String) -> GF,
    GF: Future<Output = Result<(Vec<T>, Option<String>)>>,
    S: FnMut(Vec<T>) -> Result<()>,
{
    let mut url = Some(initial_url);
    while let Some(current) = url {
        let (page, next) = get(current).await?;
        sink(page)?;
        url = next;
    }
    Ok(())
}

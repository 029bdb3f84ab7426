//! Pure functions mapping `(reference, plainHTTP flag, action)` to absolute
//! URLs for the OCI Distribution endpoints (§4.2).
//!
//! None of these functions perform I/O or validation beyond what
//! [`Reference`] already guarantees; they exist so every component builds
//! URLs the same way.

use crate::digest::Digest;
use crate::reference::Reference;


fn scheme(plain_http: bool) -> &'static str {
    if plain_http { "http" } else { "https" }
}

/// `<scheme>://<host>/v2/`. Registry-level, so it takes a bare host rather
/// than a [`Reference`] — there is no repository component to hang it off.
pub fn base(host: &str, plain_http: bool) -> String {
    format!("{}://{}/v2/", scheme(plain_http), crate::reference::canonical_host(host))
}

/// `<scheme>://<host>/v2/_catalog`
pub fn catalog(host: &str, plain_http: bool) -> String {
    format!("{}://{}/v2/_catalog", scheme(plain_http), crate::reference::canonical_host(host))
}

fn repo_base(reference: &Reference, plain_http: bool) -> String {
    format!(
        "{}://{}/v2/{}",
        scheme(plain_http),
        reference.url_host(),
        reference.repository()
    )
}

/// `…/<repo>/tags/list`
pub fn tags(reference: &Reference, plain_http: bool) -> String {
    format!("{}/tags/list", repo_base(reference, plain_http))
}

/// `…/<repo>/manifests/<tag-or-digest>`
pub fn manifest(reference: &Reference, locator: &str, plain_http: bool) -> String {
    format!("{}/manifests/{}", repo_base(reference, plain_http), locator)
}

/// `…/<repo>/blobs/<digest>`
pub fn blob(reference: &Reference, digest: &Digest, plain_http: bool) -> String {
    format!("{}/blobs/{}", repo_base(reference, plain_http), digest)
}

/// `…/<repo>/blobs/uploads/`
pub fn blob_upload(reference: &Reference, plain_http: bool) -> String {
    format!("{}/blobs/uploads/", repo_base(reference, plain_http))
}

/// `…/<repo>/referrers/<digest>[?artifactType=…]`
pub fn referrers(reference: &Reference, digest: &Digest, artifact_type: Option<&str>, plain_http: bool) -> String {
    let base = format!("{}/referrers/{}", repo_base(reference, plain_http), digest);
    with_artifact_type_query(base, artifact_type)
}

/// `…/<repo>/_oras/artifacts/referrers?digest=…[&artifactType=…]`
pub fn referrers_fallback_v1(reference: &Reference, digest: &Digest, artifact_type: Option<&str>, plain_http: bool) -> String {
    let mut url = format!(
        "{}/_oras/artifacts/referrers?digest={}",
        repo_base(reference, plain_http),
        digest
    );
    if let Some(at) = artifact_type {
        url.push_str("&artifactType=");
        url.push_str(at);
    }
    url
}

/// `…/oras/artifacts/v1/<repo>/manifests/<digest>/referrers[?artifactType=…]`
pub fn referrers_fallback_v2(reference: &Reference, digest: &Digest, artifact_type: Option<&str>, plain_http: bool) -> String {
    let base = format!(
        "{}://{}/oras/artifacts/v1/{}/manifests/{}/referrers",
        scheme(plain_http),
        reference.url_host(),
        reference.repository(),
        digest
    );
    with_artifact_type_query(base, artifact_type)
}

fn with_artifact_type_query(mut url: String, artifact_type: Option<&str>) -> String {
    if let Some(at) = artifact_type {
        url.push_str("?artifactType=");
        url.push_str(at);
    }
    url
}

use super::*;
use crate::digest::AlgorithmRegistry;
use crate::transport::ReqwestTransport;
use std::str::FromStr;

const MANIFEST_BODY: &str = r#"{"schemaVersion":2,"config":{},"layers":[]}"#;
const MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

fn manifest_digest() -> crate::digest::Digest {
    crate::digest::Digest::sha256(MANIFEST_BODY.as_bytes())
}

fn repo_reference(server_url: &str) -> Reference {
    let host = server_url.trim_start_matches("http://");
    Reference::from_str(&format!("{host}/test")).unwrap()
}

fn store(server_url: &str) -> RepoManifestStore {
    RepoManifestStore {
        transport: Arc::new(ReqwestTransport::new().unwrap()),
        reference: repo_reference(server_url),
        plain_http: true,
        manifest_media_types: crate::descriptor::default_manifest_media_types(),
        metadata_byte_ceiling: 4 * 1024 * 1024,
        algorithms: AlgorithmRegistry::default(),
        warning_handler: None,
    }
}

#[tokio::test]
async fn fetch_verifies_content_type_and_digest() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", format!("/v2/test/manifests/{digest}").as_str())
        .match_header("accept", MEDIA_TYPE)
        .with_status(200)
        .with_header("content-type", MEDIA_TYPE)
        .with_body(MANIFEST_BODY)
        .create_async()
        .await;

    let s = store(&server.url());
    let desc = Descriptor::new(MEDIA_TYPE, digest, MANIFEST_BODY.len() as u64);
    let body = s.fetch(&desc).await.unwrap();
    assert_eq!(body.as_ref(), MANIFEST_BODY.as_bytes());
}

#[tokio::test]
async fn fetch_rejects_content_type_mismatch() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", format!("/v2/test/manifests/{digest}").as_str())
        .with_status(200)
        .with_header("content-type", "application/vnd.docker.distribution.manifest.v2+json")
        .with_body(MANIFEST_BODY)
        .create_async()
        .await;

    let s = store(&server.url());
    let desc = Descriptor::new(MEDIA_TYPE, digest, MANIFEST_BODY.len() as u64);
    let err = s.fetch(&desc).await.unwrap_err();
    assert!(matches!(err, Error::ContentTypeMismatch { .. }));
}

#[tokio::test]
async fn push_fails_fast_on_content_length_mismatch() {
    let server = mockito::Server::new_async().await;
    let s = store(&server.url());
    let desc = Descriptor::new(MEDIA_TYPE, manifest_digest(), 999);
    let err = s.push(&desc, Bytes::from_static(MANIFEST_BODY.as_bytes())).await.unwrap_err();
    assert!(matches!(err, Error::ContentLengthMismatch { .. }));
}

#[tokio::test]
async fn push_puts_to_the_digest_locator_and_verifies_server_digest() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", format!("/v2/test/manifests/{digest}").as_str())
        .match_header("content-type", MEDIA_TYPE)
        .with_status(201)
        .with_header("docker-content-digest", &digest.to_string())
        .create_async()
        .await;

    let s = store(&server.url());
    let desc = Descriptor::new(MEDIA_TYPE, digest, MANIFEST_BODY.len() as u64);
    s.push(&desc, Bytes::from_static(MANIFEST_BODY.as_bytes())).await.unwrap();
}

#[tokio::test]
async fn push_reports_digest_mismatch_from_server() {
    let digest = manifest_digest();
    let other = crate::digest::Digest::sha256(b"something else");
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", format!("/v2/test/manifests/{digest}").as_str())
        .with_status(201)
        .with_header("docker-content-digest", &other.to_string())
        .create_async()
        .await;

    let s = store(&server.url());
    let desc = Descriptor::new(MEDIA_TYPE, digest, MANIFEST_BODY.len() as u64);
    let err = s.push(&desc, Bytes::from_static(MANIFEST_BODY.as_bytes())).await.unwrap_err();
    assert!(matches!(err, Error::DigestMismatch { .. }));
}

#[tokio::test]
async fn resolve_trusts_client_digest_when_server_has_no_header() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", format!("/v2/test/manifests/{digest}").as_str())
        .with_status(200)
        .with_header("content-type", MEDIA_TYPE)
        .with_header("content-length", &MANIFEST_BODY.len().to_string())
        .create_async()
        .await;

    let s = store(&server.url());
    let digest_ref = Reference::from_str(&format!("{}/test@{digest}", server.url().trim_start_matches("http://"))).unwrap();
    let desc = s.resolve(&digest_ref).await.unwrap();
    assert_eq!(desc.digest, digest);
    assert_eq!(desc.size, MANIFEST_BODY.len() as u64);
}

#[tokio::test]
async fn resolve_uses_server_digest_for_a_tag_reference() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/v2/test/manifests/latest")
        .with_status(200)
        .with_header("content-type", MEDIA_TYPE)
        .with_header("docker-content-digest", &digest.to_string())
        .with_header("content-length", &MANIFEST_BODY.len().to_string())
        .create_async()
        .await;

    let s = store(&server.url());
    let tag_ref = Reference::from_str(&format!("{}/test:latest", server.url().trim_start_matches("http://"))).unwrap();
    let desc = s.resolve(&tag_ref).await.unwrap();
    assert_eq!(desc.digest, digest);
}

#[tokio::test]
async fn resolve_rejects_digest_mismatch_between_client_and_server() {
    let digest = manifest_digest();
    let other = crate::digest::Digest::sha256(b"something else");
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", format!("/v2/test/manifests/{digest}").as_str())
        .with_status(200)
        .with_header("docker-content-digest", &other.to_string())
        .create_async()
        .await;

    let s = store(&server.url());
    let digest_ref = Reference::from_str(&format!("{}/test@{digest}", server.url().trim_start_matches("http://"))).unwrap();
    let err = s.resolve(&digest_ref).await.unwrap_err();
    assert!(matches!(err, Error::DigestMismatch { .. }));
}

#[tokio::test]
async fn resolve_fails_without_a_client_digest_or_server_header() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/v2/test/manifests/latest")
        .with_status(200)
        .with_header("content-type", MEDIA_TYPE)
        .create_async()
        .await;

    let s = store(&server.url());
    let tag_ref = Reference::from_str(&format!("{}/test:latest", server.url().trim_start_matches("http://"))).unwrap();
    let err = s.resolve(&tag_ref).await.unwrap_err();
    assert!(matches!(err, Error::MissingHeader { .. }));
}

#[tokio::test]
async fn fetch_reference_falls_back_to_computing_the_digest_from_the_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/test/manifests/latest")
        .with_status(200)
        .with_header("content-type", MEDIA_TYPE)
        .with_body(MANIFEST_BODY)
        .create_async()
        .await;

    let s = store(&server.url());
    let tag_ref = Reference::from_str(&format!("{}/test:latest", server.url().trim_start_matches("http://"))).unwrap();
    let (desc, body) = s.fetch_reference(&tag_ref).await.unwrap();
    assert_eq!(desc.digest, manifest_digest());
    assert_eq!(desc.size, MANIFEST_BODY.len() as u64);
    assert_eq!(body.as_ref(), MANIFEST_BODY.as_bytes());
}

#[tokio::test]
async fn fetch_reference_prefers_the_server_digest_header() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/test/manifests/latest")
        .with_status(200)
        .with_header("content-type", MEDIA_TYPE)
        .with_header("docker-content-digest", &digest.to_string())
        .with_body(MANIFEST_BODY)
        .create_async()
        .await;

    let s = store(&server.url());
    let tag_ref = Reference::from_str(&format!("{}/test:latest", server.url().trim_start_matches("http://"))).unwrap();
    let (desc, _) = s.fetch_reference(&tag_ref).await.unwrap();
    assert_eq!(desc.digest, digest);
}

#[tokio::test]
async fn tag_fetches_then_pushes_to_the_new_reference() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", format!("/v2/test/manifests/{digest}").as_str())
        .with_status(200)
        .with_header("content-type", MEDIA_TYPE)
        .with_body(MANIFEST_BODY)
        .create_async()
        .await;
    server
        .mock("PUT", "/v2/test/manifests/latest")
        .with_status(201)
        .create_async()
        .await;

    let s = store(&server.url());
    let desc = Descriptor::new(MEDIA_TYPE, digest, MANIFEST_BODY.len() as u64);
    let tag_ref = Reference::from_str(&format!("{}/test:latest", server.url().trim_start_matches("http://"))).unwrap();
    s.tag(&desc, &tag_ref).await.unwrap();
}

#[tokio::test]
async fn delete_maps_202_and_404() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", format!("/v2/test/manifests/{digest}").as_str())
        .with_status(202)
        .create_async()
        .await;

    let s = store(&server.url());
    let desc = Descriptor::new(MEDIA_TYPE, digest, MANIFEST_BODY.len() as u64);
    s.delete(&desc).await.unwrap();
}

#[tokio::test]
async fn exists_returns_false_on_not_found() {
    let digest = manifest_digest();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", format!("/v2/test/manifests/{digest}").as_str())
        .with_status(404)
        .create_async()
        .await;

    let s = store(&server.url());
    let desc = Descriptor::new(MEDIA_TYPE, digest, MANIFEST_BODY.len() as u64);
    assert!(!s.exists(&desc).await.unwrap());
}

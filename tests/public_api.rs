use orex::config::RepositoryOptions;
use orex::registry::Registry;
use orex::repository::{Content, Repository};
use orex::transport::ReqwestTransport;
use orex::Descriptor;
use std::sync::Arc;

fn options() -> RepositoryOptions {
    RepositoryOptions::new()
        .with_transport(Arc::new(ReqwestTransport::new().unwrap()))
        .with_plain_http(true)
}

#[tokio::test]
async fn resolve_and_fetch_a_tagged_manifest() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"{"schemaVersion":2,"config":{},"layers":[]}"#;
    let digest = orex::Digest::sha256(body.as_bytes());
    let media_type = "application/vnd.oci.image.manifest.v1+json";

    server
        .mock("HEAD", "/v2/library/nginx/manifests/latest")
        .with_status(200)
        .with_header("content-type", media_type)
        .with_header("docker-content-digest", &digest.to_string())
        .with_header("content-length", &body.len().to_string())
        .create_async()
        .await;
    server
        .mock("GET", format!("/v2/library/nginx/manifests/{digest}").as_str())
        .with_status(200)
        .with_header("content-type", media_type)
        .with_body(body)
        .create_async()
        .await;

    let host = server.url().trim_start_matches("http://").to_string();
    let repo = Repository::new(&format!("{host}/library/nginx:latest"), options()).unwrap();

    let desc = repo.resolve(repo.reference()).await.unwrap();
    assert_eq!(desc.digest, digest);

    match repo.fetch(&desc).await.unwrap() {
        Content::Manifest(bytes) => assert_eq!(bytes.as_ref(), body.as_bytes()),
        Content::Blob(_) => panic!("manifest media type should route to the manifest store"),
    }
}

#[tokio::test]
async fn registry_enumerates_repositories_and_hands_out_a_scoped_repository() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/_catalog")
        .with_status(200)
        .with_body(r#"{"repositories":["library/nginx","library/alpine"]}"#)
        .create_async()
        .await;

    let host = server.url().trim_start_matches("http://").to_string();
    let registry = Registry::new(&host, options()).unwrap();

    let mut names = Vec::new();
    registry
        .repositories(None, &mut |page| {
            names.extend(page);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(names, vec!["library/nginx", "library/alpine"]);

    let repo = registry.repository("library/nginx").unwrap();
    assert_eq!(repo.reference().repository(), "library/nginx");
}

#[tokio::test]
async fn blob_fetch_routes_through_the_blob_store() {
    let mut server = mockito::Server::new_async().await;
    let digest = orex::Digest::sha256(b"hello world");

    server
        .mock("GET", format!("/v2/library/nginx/blobs/{digest}").as_str())
        .with_status(200)
        .with_header("content-length", "11")
        .with_body("hello world")
        .create_async()
        .await;

    let host = server.url().trim_start_matches("http://").to_string();
    let repo = Repository::new(&format!("{host}/library/nginx"), options()).unwrap();
    let desc = Descriptor::new("application/octet-stream", digest, 11);

    match repo.fetch(&desc).await.unwrap() {
        Content::Blob(_) => {}
        Content::Manifest(_) => panic!("octet-stream should route to the blob store"),
    }
}

#[tokio::test]
async fn invalid_reference_strings_are_rejected_up_front() {
    let err = Repository::new("not a reference", options()).unwrap_err();
    assert!(matches!(err, orex::Error::InvalidReference { .. }));
}

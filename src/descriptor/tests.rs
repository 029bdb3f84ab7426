use super::*;

fn registry() -> AlgorithmRegistry {
    AlgorithmRegistry::default()
}

#[test]
fn equality_ignores_annotations_and_urls() {
    let a = Descriptor::from_parts(
        "application/vnd.oci.image.layer.v1.tar",
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        11,
    )
    .unwrap();
    let mut b = a.clone();
    b.annotations.insert("org.opencontainers.image.title".into(), "x".into());
    b.urls.push("https://example.com/blob".into());
    assert_eq!(a, b);
}

#[test]
fn inequality_on_size() {
    let a = Descriptor::from_parts(
        "application/vnd.oci.image.layer.v1.tar",
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        11,
    )
    .unwrap();
    let mut b = a.clone();
    b.size = 12;
    assert_ne!(a, b);
}

#[test]
fn verify_checks_size_before_digest() {
    let d = Descriptor::from_parts(
        "application/octet-stream",
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        11,
    )
    .unwrap();
    let err = d.verify(b"short", &registry()).unwrap_err();
    assert!(matches!(err, Error::ContentLengthMismatch { expected: 11, actual: 5 }));
}

#[test]
fn verify_succeeds_for_matching_content() {
    let digest = Digest::sha256(b"hello world");
    let d = Descriptor::new("application/octet-stream", digest, 11);
    d.verify(b"hello world", &registry()).unwrap();
}

#[test]
fn routes_to_manifest_store_by_media_type() {
    let manifest_types = default_manifest_media_types();
    let manifest = Descriptor::from_parts(
        "application/vnd.oci.image.manifest.v1+json",
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        100,
    )
    .unwrap();
    let blob = Descriptor::from_parts(
        "application/vnd.oci.image.layer.v1.tar",
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        100,
    )
    .unwrap();
    assert!(manifest.routes_to_manifest_store(&manifest_types));
    assert!(!blob.routes_to_manifest_store(&manifest_types));
}

#[test]
fn json_round_trip() {
    let d = Descriptor::from_parts(
        "application/vnd.oci.image.manifest.v1+json",
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        100,
    )
    .unwrap();
    let json = serde_json::to_string(&d).unwrap();
    let back: Descriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(d, back);
}

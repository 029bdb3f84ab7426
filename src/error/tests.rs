use super::*;

#[test]
fn test_invalid_reference_helper() {
    let err = Error::invalid_reference("bad ref", "missing repository");
    assert!(matches!(err, Error::InvalidReference { .. }));
    assert!(err.to_string().contains("bad ref"));
    assert!(err.to_string().contains("missing repository"));
}

#[test]
fn test_not_found_helper() {
    let err = Error::not_found("repository", "myrepo");
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(err.to_string().contains("myrepo"));
    assert!(err.is_not_found());
}

#[test]
fn test_response_without_inner_errors() {
    let err = Error::response("GET", "https://example.com/v2/", 500, vec![]);
    assert_eq!(err.to_string(), "GET https://example.com/v2/ returned 500");
}

#[test]
fn test_response_with_inner_errors() {
    let entry = ErrorEntry {
        code: "BLOB_UNKNOWN".to_string(),
        message: "blob unknown to registry".to_string(),
        detail: None,
    };
    let err = Error::response("GET", "https://example.com/v2/x/blobs/sha256:abc", 404, vec![entry]);
    assert!(err.to_string().contains("BLOB_UNKNOWN"));
    assert!(err.to_string().contains("blob unknown to registry"));
}

#[test]
fn test_response_status_404_is_not_found() {
    let err = Error::response("HEAD", "https://example.com/v2/x/manifests/latest", 404, vec![]);
    assert!(err.is_not_found());
}

#[test]
fn test_response_status_500_is_not_not_found() {
    let err = Error::response("GET", "https://example.com/v2/", 500, vec![]);
    assert!(!err.is_not_found());
}

#[test]
fn test_digest_mismatch_helper() {
    let err = Error::digest_mismatch("sha256:aaa", "sha256:bbb");
    assert!(matches!(err, Error::DigestMismatch { .. }));
    assert!(err.to_string().contains("sha256:aaa"));
    assert!(err.to_string().contains("sha256:bbb"));
}

#[test]
fn test_content_length_mismatch_helper() {
    let err = Error::content_length_mismatch(20, 17);
    assert!(err.to_string().contains("20"));
    assert!(err.to_string().contains("17"));
}

#[test]
fn test_missing_header_helper() {
    let err = Error::missing_header("Docker-Content-Digest");
    assert!(err.to_string().contains("Docker-Content-Digest"));
}

#[test]
fn test_io_with_source_chains_error() {
    use std::error::Error as _;
    let source = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
    let err = Error::io_with_source("failed to connect", source);
    assert!(err.source().is_some());
    assert!(err.source().unwrap().to_string().contains("connection refused"));
}

#[test]
fn test_decode_with_source_chains_error() {
    use std::error::Error as _;
    let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let err = Error::decode_with_source("error response body", source);
    assert!(err.source().is_some());
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_error_implements_error_trait() {
    let err = Error::io("boom");
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn test_size_exceeds_limit_helper() {
    let err = Error::size_exceeds_limit(5_000_000, 4 * 1024 * 1024);
    assert!(matches!(err, Error::SizeExceedsLimit { .. }));
}

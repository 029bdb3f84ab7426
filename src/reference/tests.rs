use super::*;
use std::str::FromStr;

#[test]
fn parses_registry_repository_tag() {
    let r = Reference::from_str("localhost:5000/hello-world:v1").unwrap();
    assert_eq!(r.registry(), "localhost:5000");
    assert_eq!(r.repository(), "hello-world");
    assert_eq!(r.tag(), Some("v1"));
    assert_eq!(r.digest(), None);
}

#[test]
fn parses_registry_repository_digest() {
    let r = Reference::from_str("r.example/hw@sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        .unwrap();
    assert_eq!(r.registry(), "r.example");
    assert_eq!(r.repository(), "hw");
    assert_eq!(r.tag(), None);
    assert_eq!(
        r.digest().unwrap().to_string(),
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
}

#[test]
fn digest_wins_over_tag_when_both_present() {
    let r = Reference::from_str(
        "r.example/hw:v2@sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
    )
    .unwrap();
    assert_eq!(r.repository(), "hw");
    assert_eq!(r.tag(), None);
    assert_eq!(
        r.digest().unwrap().to_string(),
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
}

#[test]
fn parses_bare_repository() {
    let r = Reference::from_str("ghcr.io/user/repo").unwrap();
    assert_eq!(r.repository(), "user/repo");
    assert!(r.is_empty_locator());
}

#[test]
fn rejects_invalid_repository() {
    let err = Reference::from_str("ghcr.io/User/Repo:latest");
    assert!(err.is_err());
}

#[test]
fn rejects_missing_separator() {
    assert!(Reference::from_str("ghcr.io").is_err());
}

#[test]
fn rejects_invalid_tag() {
    assert!(Reference::from_str("ghcr.io/user/repo:").is_err());
}

#[test]
fn rejects_invalid_digest() {
    assert!(Reference::from_str("ghcr.io/user/repo@sha256:not-hex").is_err());
}

#[test]
fn display_round_trips_tag_form() {
    let s = "ghcr.io/user/repo:latest";
    let r = Reference::from_str(s).unwrap();
    assert_eq!(r.to_string(), s);
}

#[test]
fn display_round_trips_digest_form() {
    let s = "ghcr.io/user/repo@sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    let r = Reference::from_str(s).unwrap();
    assert_eq!(r.to_string(), s);
}

#[test]
fn display_round_trips_bare_form() {
    let s = "ghcr.io/user/repo";
    let r = Reference::from_str(s).unwrap();
    assert_eq!(r.to_string(), s);
}

#[test]
fn docker_io_maps_to_registry_1() {
    let r = Reference::from_str("docker.io/library/alpine:latest").unwrap();
    assert_eq!(r.registry(), "docker.io");
    assert_eq!(r.url_host(), "registry-1.docker.io");
}

#[test]
fn parse_list_expands_shared_tag_list() {
    let refs = parse_list("ghcr.io/org/repo:v1,v2").unwrap();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].repository(), "org/repo");
    assert_eq!(refs[0].tag(), Some("v1"));
    assert_eq!(refs[1].tag(), Some("v2"));
}

#[test]
fn parse_list_expands_shared_digest_list() {
    let refs = parse_list(
        "ghcr.io/org/repo@sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9,sha256:aafc4ddd3621f27f1c68ccd71cbb5806b5d4a1e3b05e6c2a3b7d0f2c4a6e7b5e",
    )
    .unwrap();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].repository(), "org/repo");
    assert!(refs[0].digest().is_some());
    assert!(refs[1].digest().is_some());
}

#[test]
fn parse_list_single_bare_repository() {
    let refs = parse_list("ghcr.io/org/repo").unwrap();
    assert_eq!(refs.len(), 1);
    assert!(refs[0].is_empty_locator());
}

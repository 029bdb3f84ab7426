use super::*;

#[test]
fn defaults_match_the_configuration_surface_table() {
    let opts = RepositoryOptions::default();
    assert!(!opts.plain_http());
    assert_eq!(opts.metadata_byte_ceiling(), DEFAULT_METADATA_BYTE_CEILING);
    assert!(opts.warning_handler().is_none());
    assert_eq!(opts.manifest_media_types(), crate::descriptor::default_manifest_media_types().as_slice());
}

#[test]
fn builder_methods_override_defaults() {
    let opts = RepositoryOptions::new()
        .with_plain_http(true)
        .with_tag_page_size(50)
        .with_referrer_page_size(25)
        .with_catalog_page_size(10)
        .with_metadata_byte_ceiling(1024);

    assert!(opts.plain_http());
    assert_eq!(opts.tag_page_size, Some(50));
    assert_eq!(opts.referrer_page_size, Some(25));
    assert_eq!(opts.catalog_page_size, Some(10));
    assert_eq!(opts.metadata_byte_ceiling(), 1024);
}

#[test]
fn with_manifest_media_types_overrides_routing_set() {
    let opts = RepositoryOptions::new().with_manifest_media_types(vec!["application/custom+json".to_string()]);
    assert_eq!(opts.manifest_media_types(), &["application/custom+json".to_string()]);
}

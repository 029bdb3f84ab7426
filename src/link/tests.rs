use super::*;

#[test]
fn parses_rel_next_with_angle_brackets() {
    let header = r#"</v2/_catalog?n=4&last=fox>; rel="next""#;
    assert_eq!(
        parse_next(Some(header), "https://registry.example.com/v2/_catalog?n=4"),
        Some("https://registry.example.com/v2/_catalog?n=4&last=fox".to_string())
    );
}

#[test]
fn absolute_target_passes_through() {
    let header = r#"<https://other.example.com/next>; rel="next""#;
    assert_eq!(
        parse_next(Some(header), "https://registry.example.com/v2/_catalog"),
        Some("https://other.example.com/next".to_string())
    );
}

#[test]
fn absent_header_means_end_of_stream() {
    assert_eq!(parse_next(None, "https://registry.example.com/v2/_catalog"), None);
}

#[test]
fn entries_without_rel_next_are_ignored() {
    let header = r#"</v2/_catalog?n=4>; rel="prev""#;
    assert_eq!(parse_next(Some(header), "https://registry.example.com/v2/_catalog"), None);
}

#[tokio::test]
async fn paginate_delivers_pages_in_order_then_stops() {
    let pages: Vec<Vec<&str>> = vec![
        vec!["the", "quick", "brown", "fox"],
        vec!["jumps", "over", "the", "lazy"],
        vec!["dog"],
    ];
    let next_urls = [Some("page2".to_string()), Some("page3".to_string()), None];

    let mut call = 0usize;
    let mut delivered: Vec<Vec<&str>> = Vec::new();

    paginate(
        "page1".to_string(),
        |_url| {
            let page = pages[call].clone();
            let next = next_urls[call].clone();
            call += 1;
            async move { Ok((page, next)) }
        },
        |page| {
            delivered.push(page);
            Ok(())
        },
    )
    .await
    .unwrap();

    assert_eq!(delivered, pages);
}

#[tokio::test]
async fn paginate_stops_when_sink_errors() {
    let mut calls = 0usize;
    let result = paginate(
        "page1".to_string(),
        |_url| {
            calls += 1;
            async move { Ok((vec![1, 2], Some("page2".to_string()))) }
        },
        |_page| Err(crate::error::Error::unsupported("stop")),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls, 1);
}

// tests/canonical_urls.rs
use event_intake::canonical::{canonicalize, is_valid_url};

#[test]
fn equivalent_links_share_identity() {
    let groups: &[&[&str]] = &[
        &[
            "https://www.reddit.com/r/humanresources/comments/1h2/shrm/",
            "http://www.reddit.com/r/humanresources/comments/1h2/shrm/?utm_source=share&utm_medium=web",
            "https://WWW.Reddit.com/r/humanresources/comments/1h2/shrm/#comments",
        ],
        &[
            "https://news.example.com/story?id=7",
            "https://news.example.com/story?fbclid=abc&id=7",
            "http://NEWS.example.com/story?id=7&gclid=zzz&ref=home",
        ],
    ];
    for group in groups {
        let first = canonicalize(group[0]).unwrap();
        for u in &group[1..] {
            assert_eq!(canonicalize(u).unwrap(), first, "{u}");
        }
    }
}

#[test]
fn distinct_paths_stay_distinct() {
    let a = canonicalize("https://example.com/Story").unwrap();
    let b = canonicalize("https://example.com/story").unwrap();
    assert_ne!(a, b);
    let c = canonicalize("https://example.com/s?id=1").unwrap();
    let d = canonicalize("https://example.com/s?id=2").unwrap();
    assert_ne!(c, d);
}

#[test]
fn canonical_form_is_a_fixed_point() {
    for u in [
        "http://Example.COM:443/a/b?x=1&utm_term=y#top",
        "https://twitter.com/i/web/status/1865000000000000000",
        "https://example.com/search?q=a%20b&lang=en",
    ] {
        let c = canonicalize(u).unwrap();
        assert_eq!(canonicalize(c.as_str()).unwrap(), c);
    }
}

#[test]
fn validity() {
    assert!(is_valid_url("https://example.com"));
    assert!(!is_valid_url("javascript:alert(1)"));
    assert!(!is_valid_url("//example.com/a"));
}

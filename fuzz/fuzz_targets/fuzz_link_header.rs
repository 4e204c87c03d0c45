#![no_main]

//! Fuzz target for pagination `Link` header parsing.

use libfuzzer_sys::fuzz_target;

use curtis::transport::{next_page_url, parse_link_header};

fuzz_target!(|header: String| {
    let entries = parse_link_header(&header);
    for entry in &entries {
        assert!(!entry.url.contains('>'));
    }

    if let Some(url) = next_page_url(&header) {
        assert!(entries.iter().any(|entry| entry.url == url));
    }
});

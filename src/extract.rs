// src/extract.rs
// =============================================================================
// This module pulls raw href values out of an HTML page.
//
// How it works:
// - A case-insensitive pattern matches the next anchor tag's href attribute
// - The scan cursor advances past each match, so links come back in
//   first-to-last document order
// - Collection stops at the cap or when no further match exists
// - Anchors without an href (or with one the pattern can't read) are skipped
//
// This is a lexical scan over the raw text, not a structural HTML parse.
// Nested quotes and script-generated markup are not resolved; that is an
// accepted limitation of the scanner.
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

// The pattern is a constant and known to be valid, so expect() here can
// only fire on a programmer error.
static HREF_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a[^>]+href=["']([^"']+)["']"#).expect("href pattern is valid")
});

/// Returns up to `cap` raw href strings in document order.
///
/// The values are returned exactly as written in the markup; resolving them
/// against the crawl origin is the normalizer's job.
pub fn extract_links(html: &str, cap: usize) -> Vec<String> {
    HREF_PATTERN
        .captures_iter(html)
        .take(cap)
        .map(|caps| caps[1].to_string())
        .collect()
}

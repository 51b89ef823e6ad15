//! Denylist filtering of raw image URLs.
//!
//! News article pages carry far more `<img>` nodes than hero photos:
//! thumbnails, book covers, stock-library assets, resized gallery
//! variants. This module shortlists download candidates by dropping any
//! URL that matches a known non-photo marker. It is a pure function over
//! strings with no network or disk I/O, so the pipeline core stays
//! testable without fixtures.

use tracing::debug;

/// Substring markers that disqualify an image URL, matched
/// case-insensitively. Kept as data rather than inline conditionals so
/// the set can grow without touching the filter itself.
pub const DENYLIST_TOKENS: &[&str] = &[
    "150x",
    "whatsapp-image",
    "paperback",
    "book",
    "gen-",
    "1024x",
    "adobestock",
    "heic_",
];

/// Shortlist image URLs for download.
///
/// Drops empty URLs and any URL whose lowercased form contains a
/// [`DENYLIST_TOKENS`] marker. Relative input order is preserved and
/// duplicates are not collapsed here; distinct URLs that later collide
/// on file name resolve as last-write-wins.
pub fn filter<'a, I>(image_urls: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let kept: Vec<String> = image_urls
        .into_iter()
        .filter(|url| !url.is_empty())
        .filter(|url| {
            let lowered = url.to_lowercase();
            let denied = DENYLIST_TOKENS.iter().find(|t| lowered.contains(*t));
            if let Some(token) = denied {
                debug!(%url, token, "Image URL rejected by denylist");
            }
            denied.is_none()
        })
        .map(str::to_string)
        .collect();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_denylisted_and_empty() {
        let input = vec![
            "https://x/a.jpg",
            "https://x/b-150x150.jpg",
            "https://x/Book-cover.jpg",
            "",
        ];
        assert_eq!(filter(input), vec!["https://x/a.jpg".to_string()]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let input = vec![
            "https://x/AdobeStock_123.jpg",
            "https://x/WhatsApp-Image-2026.jpg",
            "https://x/HEIC_0042.jpg",
            "https://x/festival.jpg",
        ];
        assert_eq!(filter(input), vec!["https://x/festival.jpg".to_string()]);
    }

    #[test]
    fn test_filter_preserves_order_and_duplicates() {
        let input = vec![
            "https://x/z.jpg",
            "https://x/a.jpg",
            "https://x/z.jpg",
        ];
        assert_eq!(
            filter(input),
            vec![
                "https://x/z.jpg".to_string(),
                "https://x/a.jpg".to_string(),
                "https://x/z.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_filter_is_idempotent() {
        let input = vec![
            "https://x/a.jpg",
            "https://x/b-150x150.jpg",
            "https://x/Book-cover.jpg",
            "",
        ];
        let once = filter(input);
        let twice = filter(once.iter().map(String::as_str));
        assert_eq!(once, twice);
    }
}

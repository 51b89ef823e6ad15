//! Data models for scraped pages, download candidates, and run accounting.
//!
//! This module defines the core data structures passed between the
//! pipeline stages:
//! - [`PageContent`]: a rendered article page with its image URLs and metadata
//! - [`CandidateImage`]: an image URL that survived filtering, plus its
//!   destination file name
//! - [`RunSummary`]: per-run counters logged at shutdown

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use url::Url;

/// Prefix ceiling for the descending day counter in saved file names.
///
/// File names are `{counter:07}_{original}` where
/// `counter = DAY_COUNTER_CEILING - days_from_ce(published)`, so images
/// from newer articles sort first in a plain lexicographic directory
/// listing (what slideshow viewers typically use).
const DAY_COUNTER_CEILING: i32 = 9_999_999;

/// A rendered article page as returned by the fetch collaborator.
///
/// Metadata fields are best-effort: sites that omit OpenGraph tags yield
/// `None` and the pipeline falls back to URL-derived values.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// The article URL the page was rendered from.
    pub url: String,
    /// Article title, if the page exposed one.
    pub title: Option<String>,
    /// Article description/standfirst, if the page exposed one.
    pub description: Option<String>,
    /// Publication timestamp, if the page exposed one.
    pub published: Option<DateTime<Utc>>,
    /// Raw `<img src>` URLs in document order, unfiltered.
    pub image_urls: Vec<String>,
}

/// An image URL that survived denylist filtering, eligible for download.
///
/// The destination file name is derived once, up front, so every later
/// stage (download, width gate, annotation, stamping) agrees on the same
/// path. Name collisions within a run overwrite; last write wins.
#[derive(Debug, Clone)]
pub struct CandidateImage {
    /// Absolute source URL of the image.
    pub source_url: String,
    /// Destination file name: `{descending day counter}_{last URL path segment}`.
    pub file_name: String,
}

impl CandidateImage {
    /// Build a candidate from an image URL and the owning article's
    /// publication time.
    ///
    /// Returns `None` when the URL has no usable final path segment
    /// (e.g. a bare host); such URLs cannot be given a stable file name
    /// and are skipped by the caller.
    pub fn from_url(source_url: &str, published: DateTime<Utc>) -> Option<Self> {
        let file_name = file_name_for(source_url, published)?;
        Some(Self {
            source_url: source_url.to_string(),
            file_name,
        })
    }
}

/// Derive the destination file name for an image URL.
///
/// The last non-empty path segment (query and fragment excluded) is
/// prefixed with a zero-padded descending day counter computed from the
/// article's publication date.
fn file_name_for(source_url: &str, published: DateTime<Utc>) -> Option<String> {
    let parsed = Url::parse(source_url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?
        .to_string();
    let counter = DAY_COUNTER_CEILING - published.date_naive().num_days_from_ce();
    Some(format!("{:07}_{}", counter, segment))
}

/// Counters for one pipeline run, logged once at the end.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    /// Hyperlinks discovered on the seed page.
    pub links_discovered: usize,
    /// Article pages actually fetched this run (after scoping, dedup, depth bound).
    pub articles_processed: usize,
    /// Images persisted to the output directory.
    pub images_saved: usize,
    /// Candidates rejected by the pixel-width gate.
    pub images_rejected: usize,
    /// Candidates that failed to download or decode.
    pub images_failed: usize,
}

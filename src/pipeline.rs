//! The curation pipeline: one seed page through to persisted images.
//!
//! One invocation fetches the seed listing, scopes its links to the
//! current calendar year, skips everything the visit log has seen,
//! bounds the remainder by the depth limit, and then processes each
//! article: rendered-image fetch, denylist filtering, bounded-
//! concurrency download, pixel-width gating, optional caption overlay,
//! and article-time stamping.
//!
//! # Failure taxonomy
//!
//! Only two conditions abort a run: the seed fetch failing, or the seed
//! yielding zero hyperlinks. Every per-article and per-candidate failure
//! is logged with the offending URL/path and skipped. Article URLs are
//! logged as visited *before* their page is processed; a crash mid-page
//! can drop images but can never cause endless reprocessing.

use crate::annotate::Annotator;
use crate::config::CurationConfig;
use crate::fetch::{MediaDownloader, PageFetcher, extract_links};
use crate::models::{CandidateImage, PageContent, RunSummary};
use crate::selector;
use crate::visit_log::UrlVisitLog;
use chrono::{DateTime, Datelike, Utc};
use futures::stream::{self, StreamExt};
use image::ImageReader;
use itertools::Itertools;
use std::error::Error;
use std::fs::{self, FileTimes, OpenOptions};
use std::io::Cursor;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Decoded pixel width below which a download is judged a thumbnail
/// rather than a hero image, and discarded.
const MIN_HERO_WIDTH: u32 = 1024;

/// Extensions the width gate (and annotation) can decode. Anything else
/// (videos in particular) is persisted as-is.
const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// What became of one download candidate.
enum CandidateOutcome {
    Saved,
    Rejected,
    Failed,
}

/// Drives one curation run against a fetcher implementation.
pub struct CurationPipeline<'a, F> {
    fetcher: &'a F,
    config: &'a CurationConfig,
    annotator: Option<&'a Annotator>,
}

impl<'a, F> CurationPipeline<'a, F>
where
    F: PageFetcher + MediaDownloader,
{
    /// Wire up a pipeline. `annotator` is `None` when caption overlay is
    /// disabled or no font could be loaded.
    pub fn new(
        fetcher: &'a F,
        config: &'a CurationConfig,
        annotator: Option<&'a Annotator>,
    ) -> Self {
        Self {
            fetcher,
            config,
            annotator,
        }
    }

    /// Process the configured seed page through to persisted images.
    ///
    /// Returns the run counters, or an error for the two fatal-to-run
    /// conditions (seed fetch failure, zero links on the seed page).
    #[instrument(level = "info", skip_all, fields(seed = %self.config.seed_url))]
    pub async fn run(&self, visit_log: &mut UrlVisitLog) -> Result<RunSummary, Box<dyn Error>> {
        let seed_html = self.fetcher.fetch_html(&self.config.seed_url).await?;
        let base = Url::parse(&self.config.seed_url)?;
        let links = extract_links(&seed_html, &base);
        if links.is_empty() {
            return Err("no hyperlinks found on the seed page".into());
        }

        let mut summary = RunSummary {
            links_discovered: links.len(),
            ..RunSummary::default()
        };

        // Date-scoping heuristic: the target site encodes the
        // publication year in the article path.
        let year_scope = format!("/{}/", Utc::now().year());
        let article_urls: Vec<String> = links
            .iter()
            .unique()
            .filter(|url| url.contains(&year_scope))
            .filter(|url| !visit_log.already_visited(url))
            .take(self.config.depth_limit)
            .cloned()
            .collect();

        info!(
            links = summary.links_discovered,
            in_scope = article_urls.len(),
            depth_limit = self.config.depth_limit,
            "Seed page indexed"
        );

        for article_url in article_urls {
            // Mark visited before processing: at-most-once per URL.
            if let Err(e) = visit_log.log_url(&article_url) {
                warn!(url = %article_url, error = %e, "Could not record visit; processing anyway");
            }

            let page = match self.fetcher.fetch_rendered_images(&article_url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %article_url, error = %e, "Article fetch failed; skipping");
                    continue;
                }
            };
            summary.articles_processed += 1;

            let kept = selector::filter(page.image_urls.iter().map(String::as_str));
            debug!(
                url = %article_url,
                raw = page.image_urls.len(),
                kept = kept.len(),
                "Filtered image candidates"
            );

            let published = page.published.unwrap_or_else(Utc::now);
            let candidates: Vec<CandidateImage> = kept
                .iter()
                .filter_map(|image_url| {
                    let candidate = CandidateImage::from_url(image_url, published);
                    if candidate.is_none() {
                        warn!(url = %image_url, "No usable file name; skipping candidate");
                    }
                    candidate
                })
                .collect();

            let outcomes: Vec<CandidateOutcome> = stream::iter(candidates)
                .map(|candidate| self.process_candidate(candidate, &page, published))
                .buffer_unordered(self.config.download_concurrency)
                .collect()
                .await;

            for outcome in outcomes {
                match outcome {
                    CandidateOutcome::Saved => summary.images_saved += 1,
                    CandidateOutcome::Rejected => summary.images_rejected += 1,
                    CandidateOutcome::Failed => summary.images_failed += 1,
                }
            }
        }

        info!(
            articles = summary.articles_processed,
            saved = summary.images_saved,
            rejected = summary.images_rejected,
            failed = summary.images_failed,
            "Curation run complete"
        );
        Ok(summary)
    }

    /// Download, gate, optionally caption, and stamp one candidate.
    /// Never propagates: every failure is logged and reported as an
    /// outcome so sibling candidates proceed untouched.
    async fn process_candidate(
        &self,
        candidate: CandidateImage,
        page: &PageContent,
        published: DateTime<Utc>,
    ) -> CandidateOutcome {
        let bytes = match self.fetcher.download(&candidate.source_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %candidate.source_url, error = %e, "Image download failed");
                return CandidateOutcome::Failed;
            }
        };

        let dest = self.config.output_dir.join(&candidate.file_name);

        // Overwrite semantics: always re-fetch and replace.
        if dest.exists() {
            if let Err(e) = fs::remove_file(&dest) {
                warn!(path = %dest.display(), error = %e, "Could not clear existing file");
            }
        }
        if let Err(e) = fs::write(&dest, &bytes) {
            warn!(path = %dest.display(), error = %e, "Could not persist download");
            return CandidateOutcome::Failed;
        }

        if is_raster_image(&candidate.file_name) {
            let width = match decoded_width(&bytes) {
                Ok(width) => width,
                Err(e) => {
                    warn!(path = %dest.display(), error = %e, "Undecodable image; discarding");
                    let _ = fs::remove_file(&dest);
                    return CandidateOutcome::Failed;
                }
            };
            if width < MIN_HERO_WIDTH {
                info!(
                    path = %dest.display(),
                    width,
                    min = MIN_HERO_WIDTH,
                    "Rejected: below hero-image width"
                );
                let _ = fs::remove_file(&dest);
                return CandidateOutcome::Rejected;
            }

            if let Some(annotator) = self.annotator {
                if let Err(e) = self.annotate_file(annotator, &dest, &bytes, &candidate, page, published)
                {
                    // The un-captioned image already passed the gate; keep it.
                    warn!(path = %dest.display(), error = %e, "Caption overlay failed; keeping plain image");
                }
            }
        }

        stamp_file_time(&dest, published);
        info!(path = %dest.display(), url = %candidate.source_url, "Saved image");
        CandidateOutcome::Saved
    }

    /// Decode, draw the caption bands, and rewrite the saved file.
    fn annotate_file(
        &self,
        annotator: &Annotator,
        dest: &Path,
        bytes: &[u8],
        candidate: &CandidateImage,
        page: &PageContent,
        published: DateTime<Utc>,
    ) -> Result<(), Box<dyn Error>> {
        let mut image = image::load_from_memory(bytes)?.to_rgb8();
        let header = self.header_text(page, candidate, published);
        let footer = page.description.clone().unwrap_or_default();
        annotator.annotate(&mut image, &header, &footer);
        image.save(dest)?;
        Ok(())
    }

    /// Header band text: title, optionally the article date and the
    /// saved file name, per configuration.
    fn header_text(
        &self,
        page: &PageContent,
        candidate: &CandidateImage,
        published: DateTime<Utc>,
    ) -> String {
        let mut parts = Vec::new();
        if let Some(title) = &page.title {
            parts.push(title.clone());
        }
        if self.config.include_date {
            parts.push(published.format(&self.config.date_format).to_string());
        }
        if self.config.include_file_name {
            parts.push(candidate.file_name.clone());
        }
        parts.join(" - ")
    }
}

/// Whether the width gate can decode this file at all.
fn is_raster_image(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let lowered = ext.to_lowercase();
            RASTER_EXTENSIONS.iter().any(|r| *r == lowered)
        })
        .unwrap_or(false)
}

/// Read the pixel width from the image header without a full decode.
fn decoded_width(bytes: &[u8]) -> Result<u32, Box<dyn Error>> {
    let (width, _height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(width)
}

/// Stamp the saved file's times to the article's publication time so the
/// retention sweep ages files by article date. Best effort.
fn stamp_file_time(path: &Path, published: DateTime<Utc>) {
    let stamp: SystemTime = published.into();
    let times = FileTimes::new().set_accessed(stamp).set_modified(stamp);
    let result = OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_times(times));
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Could not stamp file time");
    }
}

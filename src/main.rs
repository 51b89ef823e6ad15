//! # Slideshow Curator
//!
//! A batch scraper that keeps a screensaver slideshow folder stocked
//! with fresh editorial photos from a news site.
//!
//! ## Features
//!
//! - Discovers current-year article links from a seed news-listing page
//! - Skips articles already processed, via a persistent visited-URL log
//! - Filters out thumbnails, book covers, and stock assets by URL marker
//! - Downloads remaining candidates concurrently and keeps only images
//!   at hero width (1024px or wider)
//! - Optionally overlays caption bands (title/date header, description
//!   footer) colored for contrast against the image itself
//! - Evicts files and log records older than the retention window
//!
//! ## Usage
//!
//! ```sh
//! slideshow_curator --seed-url https://example.org/news
//! ```
//!
//! ## Architecture
//!
//! One run is a pipeline: seed fetch → link scoping → per-article
//! rendered-image fetch → candidate filtering → bounded-concurrency
//! download/gate/caption → retention sweep. Components receive their
//! dependencies explicitly; nothing lives in a global.

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod annotate;
mod cli;
mod config;
mod fetch;
mod models;
mod pipeline;
mod selector;
mod sweeper;
mod utils;
mod visit_log;

use annotate::{Annotator, OverlayFont};
use cli::Cli;
use config::CurationConfig;
use fetch::HttpFetcher;
use pipeline::CurationPipeline;
use utils::ensure_writable_dir;
use visit_log::{LOG_FILE_NAME, UrlVisitLog};

/// Per-request timeout for page and image fetches.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("slideshow_curator starting up");

    let args = Cli::parse();
    let config = match CurationConfig::resolve(args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return Err(e);
        }
    };
    debug!(?config, "Resolved configuration");

    // Early check: surface permission problems before any scraping.
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let mut visit_log = UrlVisitLog::open(config.output_dir.join(LOG_FILE_NAME))?;

    let annotator = if config.annotate {
        match OverlayFont::load(&config.overlay_font) {
            Ok(font) => Some(Annotator::new(font)),
            Err(e) => {
                warn!(
                    path = %config.overlay_font.display(),
                    error = %e,
                    "Could not load overlay font; captions disabled for this run"
                );
                None
            }
        }
    } else {
        None
    };

    let fetcher = HttpFetcher::new(HTTP_TIMEOUT)?;
    let pipeline = CurationPipeline::new(&fetcher, &config, annotator.as_ref());

    match pipeline.run(&mut visit_log).await {
        Ok(summary) => {
            info!(
                links = summary.links_discovered,
                articles = summary.articles_processed,
                saved = summary.images_saved,
                rejected = summary.images_rejected,
                failed = summary.images_failed,
                "Run finished"
            );

            if let Err(e) = visit_log.cleanup(config.retention_days as i64) {
                warn!(error = %e, "Visit-log cleanup failed");
            }
            match sweeper::sweep(
                &config.output_dir,
                config.retention_days,
                sweeper::ALLOWED_EXTENSIONS,
            ) {
                Ok(deleted) => info!(deleted, "Retention sweep finished"),
                Err(e) => warn!(error = %e, "Retention sweep failed"),
            }
        }
        Err(e) => {
            // Fatal-to-run: reported in the log only; the process still
            // exits cleanly and touches no files.
            error!(error = %e, "Curation run failed; skipping cleanup");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        "Execution complete"
    );

    Ok(())
}

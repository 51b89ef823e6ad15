//! Page retrieval and HTML extraction.
//!
//! The curation core never talks HTTP directly; it goes through the
//! [`PageFetcher`] and [`MediaDownloader`] capability traits so the
//! pipeline can be exercised with fake fetchers in tests. The concrete
//! [`HttpFetcher`] implements both over a single injected
//! `reqwest::Client` (plain HTTP retrieval; any rendering mechanism
//! that yields HTML plus image URLs satisfies the same contract).

use crate::models::PageContent;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static PUBLISHED_TIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="article:published_time"]"#).unwrap());

/// `/YYYY/MM[/DD]/` date segments inside an article URL path.
static URL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{4})/(\d{1,2})(?:/(\d{1,2}))?/").unwrap());

/// Retrieval of article pages.
///
/// `fetch_html` returns the raw page for link discovery;
/// `fetch_rendered_images` returns the page's image URLs plus the
/// metadata the overlay needs.
pub trait PageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, Box<dyn Error>>;
    async fn fetch_rendered_images(&self, url: &str) -> Result<PageContent, Box<dyn Error>>;
}

/// Retrieval of raw media bytes (images, videos).
pub trait MediaDownloader {
    async fn download(&self, url: &str) -> Result<Vec<u8>, Box<dyn Error>>;
}

/// Plain-HTTP implementation of both capabilities.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with its own connection pool and per-request
    /// timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("slideshow_curator/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch_html(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = body.len(), "Fetched page HTML");
        Ok(body)
    }

    async fn fetch_rendered_images(&self, url: &str) -> Result<PageContent, Box<dyn Error>> {
        let html = self.fetch_html(url).await?;
        let content = extract_page_content(url, &html);
        info!(
            %url,
            images = content.image_urls.len(),
            has_title = content.title.is_some(),
            "Rendered article page"
        );
        Ok(content)
    }
}

impl MediaDownloader for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn download(&self, url: &str) -> Result<Vec<u8>, Box<dyn Error>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Extract every hyperlink target from `html`, resolved to an absolute
/// URL against `base`. Unresolvable hrefs are skipped. Document order is
/// preserved; duplicates are left for the caller to collapse.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();
    for element in document.select(&LINK_SELECTOR) {
        if let Some(href) = element.value().attr("href") {
            match base.join(href) {
                Ok(resolved) => links.push(resolved.to_string()),
                Err(e) => warn!(%href, error = %e, "Skipping unresolvable href"),
            }
        }
    }
    links
}

/// Parse an article page into [`PageContent`]: image URLs (resolved
/// absolute), title, description, and publication time.
///
/// Publication time prefers the `article:published_time` meta tag and
/// falls back to date segments in the URL path; pages exposing neither
/// yield `None` and the pipeline stamps the current time instead.
pub fn extract_page_content(url: &str, html: &str) -> PageContent {
    let document = Html::parse_document(html);
    let base = Url::parse(url).ok();

    let mut image_urls = Vec::new();
    for element in document.select(&IMG_SELECTOR) {
        if let Some(src) = element.value().attr("src") {
            let resolved = match &base {
                Some(b) => b.join(src).map(|u| u.to_string()).unwrap_or_default(),
                None => src.to_string(),
            };
            image_urls.push(resolved);
        }
    }

    let meta_content = |selector: &Selector| -> Option<String> {
        document
            .select(selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let title = meta_content(&OG_TITLE).or_else(|| {
        document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    });
    let description = meta_content(&OG_DESCRIPTION).or_else(|| meta_content(&META_DESCRIPTION));

    let published = meta_content(&PUBLISHED_TIME)
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| published_from_url(url));

    PageContent {
        url: url.to_string(),
        title,
        description,
        published,
        image_urls,
    }
}

/// Recover a publication date from `/YYYY/MM[/DD]/` segments in a URL
/// path, at midnight UTC. Sites that only encode the date in the path
/// still get a stable file-name prefix this way.
pub fn published_from_url(url: &str) -> Option<DateTime<Utc>> {
    let captures = URL_DATE.captures(url)?;
    let year: i32 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let day: u32 = captures.get(3).map_or(Some(1), |d| d.as_str().parse().ok())?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"
        <html>
          <head>
            <title>Fallback Title | Site</title>
            <meta property="og:title" content="Spring Festival Opens" />
            <meta property="og:description" content="Thousands gather for the opening day." />
            <meta property="article:published_time" content="2026-07-14T10:30:00+00:00" />
          </head>
          <body>
            <img src="/wp-content/uploads/2026/07/opening-day.jpg" />
            <img src="https://cdn.example.org/festival-150x150.jpg" />
          </body>
        </html>"#;

    #[test]
    fn test_extract_links_resolves_relative_urls() {
        let html = r#"<a href="/2026/07/story/">s</a><a href="https://other.org/x">x</a>"#;
        let base = Url::parse("https://example.org/news/").unwrap();
        let links = extract_links(html, &base);
        assert_eq!(
            links,
            vec![
                "https://example.org/2026/07/story/".to_string(),
                "https://other.org/x".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_page_content_reads_meta_and_images() {
        let content = extract_page_content("https://example.org/2026/07/14/festival/", ARTICLE_HTML);
        assert_eq!(content.title.as_deref(), Some("Spring Festival Opens"));
        assert_eq!(
            content.description.as_deref(),
            Some("Thousands gather for the opening day.")
        );
        assert_eq!(content.image_urls.len(), 2);
        assert_eq!(
            content.image_urls[0],
            "https://example.org/wp-content/uploads/2026/07/opening-day.jpg"
        );
        let published = content.published.unwrap();
        assert_eq!(published.to_rfc3339(), "2026-07-14T10:30:00+00:00");
    }

    #[test]
    fn test_title_falls_back_to_title_element() {
        let html = r#"<html><head><title> Plain Title </title></head><body></body></html>"#;
        let content = extract_page_content("https://example.org/a", html);
        assert_eq!(content.title.as_deref(), Some("Plain Title"));
    }

    #[test]
    fn test_published_falls_back_to_url_path() {
        let html = "<html><body></body></html>";
        let content = extract_page_content("https://example.org/2026/03/05/story/", html);
        let published = content.published.unwrap();
        assert_eq!(published.date_naive().to_string(), "2026-03-05");
    }

    #[test]
    fn test_published_from_url_variants() {
        assert_eq!(
            published_from_url("https://x.org/2026/07/story/")
                .unwrap()
                .date_naive()
                .to_string(),
            "2026-07-01"
        );
        assert!(published_from_url("https://x.org/story/").is_none());
        // Nonsense month is rejected, not mis-parsed.
        assert!(published_from_url("https://x.org/2026/13/story/").is_none());
    }
}

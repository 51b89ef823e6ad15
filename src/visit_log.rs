//! Persistent visited-URL log with normalization and retention-based expiry.
//!
//! Every article URL the pipeline dispatches is recorded here so repeat
//! runs skip pages they have already processed. The log is a newline-
//! delimited UTF-8 file, one `<RFC-3339 UTC timestamp>\t<normalized URL>`
//! record per line, mirrored by an in-memory set that is rebuilt from
//! disk on open.
//!
//! # Durability model
//!
//! `log_url` appends a single line per new URL and never rewrites
//! existing records. `cleanup` is the only whole-file rewrite: it drops
//! records older than the retention window (and any malformed lines) and
//! replaces the file atomically via a temp-file rename. Single writer
//! per process; the two operations are never called concurrently.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// File name of the visited-URL log inside the output directory.
pub const LOG_FILE_NAME: &str = "VisitedUrls.log";

/// Canonicalize a URL for membership checks.
///
/// Parseable absolute URLs become
/// `lowercase(scheme://host[:port]/path-without-trailing-slash)` with the
/// raw query string appended verbatim and the fragment dropped. Anything
/// else falls back to the trimmed, lowercased input; unparseable input
/// is logged as-is rather than rejected, so one odd href can never abort
/// a run.
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(p) if p.has_host() => p,
        _ => return trimmed.to_lowercase(),
    };

    let mut base = format!("{}://", parsed.scheme());
    // has_host() checked above
    base.push_str(parsed.host_str().unwrap_or_default());
    if let Some(port) = parsed.port() {
        base.push_str(&format!(":{}", port));
    }
    let path = parsed.path();
    let path = if path != "/" {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        ""
    };
    base.push_str(path);

    let mut normalized = base.to_lowercase();
    if let Some(query) = parsed.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    normalized
}

/// Append-only log of visited URLs, with an in-memory mirror.
#[derive(Debug)]
pub struct UrlVisitLog {
    path: PathBuf,
    seen: HashSet<String>,
}

impl UrlVisitLog {
    /// Open (or start) a visit log at `path`, loading all parseable
    /// records into memory. A missing file means zero records; malformed
    /// lines are skipped, never fatal.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut seen = HashSet::new();

        match fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    if let Some((_, url)) = parse_record(line) {
                        seen.insert(url.to_string());
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let log = Self { path, seen };
        info!(records = log.len(), "Loaded visited-URL log");
        Ok(log)
    }

    /// Number of distinct URLs currently known.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when no URLs are recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Whether `url` (after normalization) has been logged before.
    pub fn already_visited(&self, url: &str) -> bool {
        self.seen.contains(&normalize(url))
    }

    /// Record `url` as visited. Idempotent: a URL whose normalized form
    /// is already present is a no-op with no disk write.
    pub fn log_url(&mut self, url: &str) -> io::Result<()> {
        let normalized = normalize(url);
        if self.seen.contains(&normalized) {
            debug!(url = %normalized, "URL already logged; skipping append");
            return Ok(());
        }

        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}\t{}", stamp, normalized)?;

        debug!(url = %normalized, "Logged visited URL");
        self.seen.insert(normalized);
        Ok(())
    }

    /// Drop records older than `retention_days` and rewrite the log to
    /// contain exactly the survivors, rebuilding the in-memory set to
    /// match. Malformed lines are dropped on the way through. Safe to
    /// call with a missing or empty file.
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub fn cleanup(&mut self, retention_days: i64) -> io::Result<()> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.seen.clear();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let cutoff = Utc::now() - Duration::days(retention_days);
        let mut retained_lines = Vec::new();
        let mut retained_urls = HashSet::new();
        let mut dropped = 0usize;

        for line in contents.lines() {
            match parse_record(line) {
                Some((stamp, url)) if stamp >= cutoff => {
                    retained_lines.push(line.to_string());
                    retained_urls.insert(url.to_string());
                }
                Some(_) => dropped += 1,
                None => {
                    if !line.trim().is_empty() {
                        warn!(%line, "Dropping malformed visit-log line");
                    }
                }
            }
        }

        let tmp_path = self.path.with_extension("log.tmp");
        let mut body = retained_lines.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        fs::write(&tmp_path, body)?;
        fs::rename(&tmp_path, &self.path)?;

        info!(
            retained = retained_urls.len(),
            expired = dropped,
            retention_days,
            "Visit log cleanup complete"
        );
        self.seen = retained_urls;
        Ok(())
    }
}

/// Parse one log line into `(timestamp, normalized url)`.
///
/// Returns `None` for anything that does not look like a record: wrong
/// column count, unparsable timestamp, or an empty URL column.
fn parse_record(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let (stamp, url) = line.split_once('\t')?;
    if url.is_empty() || url.contains('\t') {
        return None;
    }
    let stamp = DateTime::parse_from_rfc3339(stamp).ok()?;
    Some((stamp.with_timezone(&Utc), url))
}

//! Run configuration: CLI flags merged over an optional YAML file.
//!
//! Precedence per field is command line, then config file, then the
//! built-in default. The resolved [`CurationConfig`] is plain data; it
//! is handed to each component explicitly rather than living in a
//! global.

use crate::cli::Cli;
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Defaults applied when neither the CLI nor the config file sets a value.
const DEFAULT_SUBDIRECTORY: &str = "Slideshow";
const DEFAULT_DEPTH_LIMIT: usize = 10;
const DEFAULT_RETENTION_DAYS: u64 = 14;
const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;
const DEFAULT_DATE_FORMAT: &str = "%-d %B %Y";
const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// Optional YAML config file contents. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub seed_url: Option<String>,
    pub output_dir: Option<String>,
    pub use_pictures_dir: Option<bool>,
    pub subdirectory: Option<String>,
    pub depth_limit: Option<usize>,
    pub retention_days: Option<u64>,
    pub download_concurrency: Option<usize>,
    pub annotate: Option<bool>,
    pub overlay_font: Option<String>,
    pub include_date: Option<bool>,
    pub include_file_name: Option<bool>,
    pub date_format: Option<String>,
}

impl FileConfig {
    /// Parse a YAML config file.
    pub fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let contents = fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&contents)?;
        info!(path, "Loaded config file");
        Ok(config)
    }
}

/// Fully resolved configuration for one curation run.
#[derive(Debug, Clone)]
pub struct CurationConfig {
    /// Seed news-listing URL.
    pub seed_url: String,
    /// Directory images and the visit log are written to.
    pub output_dir: PathBuf,
    /// Maximum article pages processed per run.
    pub depth_limit: usize,
    /// Retention window for files and visit-log records, in days.
    pub retention_days: u64,
    /// Maximum concurrent candidate downloads.
    pub download_concurrency: usize,
    /// Whether caption bands are drawn on saved images.
    pub annotate: bool,
    /// Font file used for captions.
    pub overlay_font: PathBuf,
    /// Whether the caption header carries the article date.
    pub include_date: bool,
    /// Whether the caption header carries the saved file name.
    pub include_file_name: bool,
    /// chrono format string for the caption date.
    pub date_format: String,
}

impl CurationConfig {
    /// Merge CLI arguments over the optional config file and defaults.
    ///
    /// The only value without a default is the seed URL; a run without
    /// one is a configuration error.
    pub fn resolve(cli: Cli) -> Result<Self, Box<dyn Error>> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let seed_url = cli
            .seed_url
            .or(file.seed_url)
            .ok_or("a seed URL is required (--seed-url, CURATOR_SEED_URL, or config file)")?;

        let use_pictures_dir = cli
            .use_pictures_dir
            .or(file.use_pictures_dir)
            .unwrap_or(true);
        let subdirectory = cli
            .subdirectory
            .or(file.subdirectory)
            .unwrap_or_else(|| DEFAULT_SUBDIRECTORY.to_string());
        let output_dir = resolve_output_dir(
            cli.output_dir.or(file.output_dir).map(PathBuf::from),
            use_pictures_dir,
            &subdirectory,
        );

        Ok(Self {
            seed_url,
            output_dir,
            depth_limit: cli
                .depth_limit
                .or(file.depth_limit)
                .unwrap_or(DEFAULT_DEPTH_LIMIT),
            retention_days: cli
                .retention_days
                .or(file.retention_days)
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            download_concurrency: cli
                .download_concurrency
                .or(file.download_concurrency)
                .unwrap_or(DEFAULT_DOWNLOAD_CONCURRENCY)
                .max(1),
            annotate: cli.annotate.or(file.annotate).unwrap_or(false),
            overlay_font: cli
                .overlay_font
                .or(file.overlay_font)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FONT)),
            include_date: cli.include_date.or(file.include_date).unwrap_or(true),
            include_file_name: cli
                .include_file_name
                .or(file.include_file_name)
                .unwrap_or(false),
            date_format: cli
                .date_format
                .or(file.date_format)
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
        })
    }
}

/// Resolve the output directory: an explicit base wins; otherwise the
/// platform pictures folder (when enabled) or the working directory. The
/// sub-directory name is appended in every case.
fn resolve_output_dir(explicit: Option<PathBuf>, use_pictures_dir: bool, subdirectory: &str) -> PathBuf {
    let base = explicit.unwrap_or_else(|| {
        if use_pictures_dir {
            dirs::picture_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            PathBuf::from(".")
        }
    });
    base.join(subdirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["slideshow_curator"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_applied() {
        let config = CurationConfig::resolve(cli(&["-s", "https://example.org/news"])).unwrap();
        assert_eq!(config.seed_url, "https://example.org/news");
        assert_eq!(config.depth_limit, DEFAULT_DEPTH_LIMIT);
        assert_eq!(config.retention_days, DEFAULT_RETENTION_DAYS);
        assert!(!config.annotate);
        assert!(config.include_date);
        assert!(config.output_dir.ends_with(DEFAULT_SUBDIRECTORY));
    }

    #[test]
    fn test_seed_url_is_required() {
        assert!(CurationConfig::resolve(cli(&[])).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "seed_url: https://file.example.org/news\nretention_days: 30\ndepth_limit: 3"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = CurationConfig::resolve(cli(&[
            "--config",
            &path,
            "--retention-days",
            "7",
        ]))
        .unwrap();

        // File fills what the CLI leaves unset; the CLI wins on conflict.
        assert_eq!(config.seed_url, "https://file.example.org/news");
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.depth_limit, 3);
    }

    #[test]
    fn test_explicit_output_dir_skips_pictures_folder() {
        let config = CurationConfig::resolve(cli(&[
            "-s",
            "https://example.org/news",
            "-o",
            "/srv/frames",
            "--subdirectory",
            "news",
        ]))
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/frames/news"));
    }
}

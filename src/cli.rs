//! Command-line interface definitions for the slideshow curator.
//!
//! This module defines the CLI arguments and options using the `clap`
//! crate. Every option is optional here: values omitted on the command
//! line fall back to the YAML config file (when `--config` is given) and
//! then to built-in defaults; see [`crate::config::CurationConfig`].

use clap::Parser;

/// Command-line arguments for the slideshow curator.
///
/// # Examples
///
/// ```sh
/// # Scrape a news listing into ~/Pictures/Slideshow
/// slideshow_curator --seed-url https://example.org/news
///
/// # Explicit output directory, captions enabled
/// slideshow_curator -s https://example.org/news -o /srv/frames --annotate true
///
/// # Everything from a config file
/// slideshow_curator --config curator.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Seed news-listing URL to discover article links from
    #[arg(short, long, env = "CURATOR_SEED_URL")]
    pub seed_url: Option<String>,

    /// Base output directory (when set, the pictures folder is not used)
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Resolve output under the platform pictures folder (default: true)
    #[arg(long)]
    pub use_pictures_dir: Option<bool>,

    /// Sub-directory name under the base output directory
    #[arg(long)]
    pub subdirectory: Option<String>,

    /// Maximum number of article pages to process per run
    #[arg(short, long)]
    pub depth_limit: Option<usize>,

    /// Days to retain downloaded files and visit-log records
    #[arg(short, long)]
    pub retention_days: Option<u64>,

    /// Maximum concurrent image downloads
    #[arg(long)]
    pub download_concurrency: Option<usize>,

    /// Overlay caption bands on saved images (default: false)
    #[arg(short, long)]
    pub annotate: Option<bool>,

    /// TrueType/OpenType font file used for caption text
    #[arg(long, env = "CURATOR_OVERLAY_FONT")]
    pub overlay_font: Option<String>,

    /// Include the article date in the caption header
    #[arg(long)]
    pub include_date: Option<bool>,

    /// Include the saved file name in the caption header
    #[arg(long)]
    pub include_file_name: Option<bool>,

    /// chrono format string for the caption date
    #[arg(long)]
    pub date_format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "slideshow_curator",
            "--seed-url",
            "https://example.org/news",
            "--output-dir",
            "/tmp/frames",
            "--retention-days",
            "7",
        ]);

        assert_eq!(cli.seed_url.as_deref(), Some("https://example.org/news"));
        assert_eq!(cli.output_dir.as_deref(), Some("/tmp/frames"));
        assert_eq!(cli.retention_days, Some(7));
        assert_eq!(cli.annotate, None);
    }

    #[test]
    fn test_cli_short_flags_and_bool_values() {
        let cli = Cli::parse_from(&[
            "slideshow_curator",
            "-s",
            "https://example.org/news",
            "-d",
            "5",
            "-a",
            "true",
        ]);

        assert_eq!(cli.seed_url.as_deref(), Some("https://example.org/news"));
        assert_eq!(cli.depth_limit, Some(5));
        assert_eq!(cli.annotate, Some(true));
    }
}

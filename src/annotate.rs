//! Text-band overlay for saved hero images.
//!
//! Annotation draws two horizontal text bands over an image: a header
//! (article title, optionally date and file name) across the top 10% of
//! the image and a footer (article description) across the bottom 10%.
//! The text color is chosen per band for contrast against that band's
//! own average background color, and the font size is grown until the
//! wrapped text no longer fits the band.
//!
//! Glyph rasterization sits behind the [`MeasureText`] seam so the
//! sizing and wrapping logic is testable without a font file; the
//! concrete [`OverlayFont`] wraps an `ab_glyph` font and draws through
//! `imageproc`.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::error::Error;
use std::path::Path;
use tracing::debug;

/// Fixed brand palette considered for overlay text, alongside pure black
/// and pure white.
pub const BRAND_PALETTE: [Rgb<u8>; 6] = [
    Rgb([0x16, 0x3A, 0x5F]), // dark blue
    Rgb([0xD9, 0xC7, 0xA7]), // beige
    Rgb([0xA8, 0xC8, 0xE4]), // light blue
    Rgb([0x3E, 0x6C, 0x9E]), // medium blue
    Rgb([0xB0, 0x3A, 0x2E]), // red
    Rgb([0x7E, 0xC8, 0xE3]), // sky blue
];

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Minimum WCAG contrast ratio considered readable for overlay text.
pub const MIN_READABLE_CONTRAST: f64 = 3.0;

/// Font sizing bounds, in pixels.
const MIN_FONT_PX: u32 = 10;
const MAX_FONT_PX: u32 = 64;

/// Padding between band edges and text, in pixels.
const BAND_PADDING: u32 = 6;

/// Fraction of the image width the wrapped text may occupy.
const WRAP_WIDTH_FRACTION: f32 = 0.8;

/// Relative luminance of an sRGB color (WCAG definition).
pub fn relative_luminance(color: Rgb<u8>) -> f64 {
    fn linear(channel: u8) -> f64 {
        let c = channel as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    let Rgb([r, g, b]) = color;
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// WCAG contrast ratio between two relative luminances.
pub fn contrast_ratio(l1: f64, l2: f64) -> f64 {
    let (hi, lo) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    (hi + 0.05) / (lo + 0.05)
}

/// Choose the overlay text color for a sampled band background.
///
/// Candidates are the brand palette plus pure black and pure white; the
/// candidate with the highest contrast ratio against the background
/// wins. Should the winner still sit below [`MIN_READABLE_CONTRAST`],
/// black or white (whichever contrasts harder) is used, and if even that
/// fails the threshold, the best palette color is drawn anyway; text is
/// never left undrawn.
pub fn pick_text_color(background: Rgb<u8>) -> Rgb<u8> {
    let bg_lum = relative_luminance(background);
    let ratio = |c: Rgb<u8>| contrast_ratio(relative_luminance(c), bg_lum);

    let best = BRAND_PALETTE
        .iter()
        .copied()
        .chain([BLACK, WHITE])
        .max_by(|a, b| ratio(*a).total_cmp(&ratio(*b)))
        .unwrap_or(WHITE);
    if ratio(best) >= MIN_READABLE_CONTRAST {
        return best;
    }

    let fallback = if ratio(BLACK) >= ratio(WHITE) { BLACK } else { WHITE };
    if ratio(fallback) >= MIN_READABLE_CONTRAST {
        return fallback;
    }

    // Nothing clears the threshold; draw the best palette color anyway.
    BRAND_PALETTE
        .iter()
        .copied()
        .max_by(|a, b| ratio(*a).total_cmp(&ratio(*b)))
        .unwrap_or(WHITE)
}

/// Horizontal band of the image a text overlay occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// Top 10% of the image.
    Header,
    /// Bottom 10% of the image.
    Footer,
}

impl Band {
    /// Pixel row range `[start, end)` of this band for an image of the
    /// given height. A band is never empty, even on tiny images.
    pub fn rows(self, height: u32) -> (u32, u32) {
        let band_height = (height / 10).max(1).min(height);
        match self {
            Band::Header => (0, band_height),
            Band::Footer => (height - band_height, height),
        }
    }
}

/// Average RGB color over a band of the image.
pub fn average_band_color(image: &RgbImage, band: Band) -> Rgb<u8> {
    let (width, height) = image.dimensions();
    let (start, end) = band.rows(height);

    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for y in start..end {
        for x in 0..width {
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            sums[0] += r as u64;
            sums[1] += g as u64;
            sums[2] += b as u64;
            count += 1;
        }
    }
    if count == 0 {
        return BLACK;
    }
    Rgb([
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
    ])
}

/// Text measurement seam, so sizing/wrapping is testable without fonts.
pub trait MeasureText {
    /// Rendered pixel size of `text` at font size `px`.
    fn text_size(&self, px: f32, text: &str) -> (u32, u32);
}

/// A loaded TrueType/OpenType font used for overlay drawing.
pub struct OverlayFont {
    font: FontVec,
}

impl OverlayFont {
    /// Load a font from a `.ttf`/`.otf` file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| format!("not a parseable font file: {}", path.display()))?;
        Ok(Self { font })
    }
}

impl MeasureText for OverlayFont {
    fn text_size(&self, px: f32, text: &str) -> (u32, u32) {
        text_size(PxScale::from(px), &self.font, text)
    }
}

/// Greedy word wrap: pack words into lines whose rendered width stays
/// within `max_width` at font size `px`. A single word wider than the
/// limit gets its own (overflowing) line; the caller's fit check rejects
/// that size.
fn wrap_text(measure: &impl MeasureText, px: f32, text: &str, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let attempt = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if measure.text_size(px, &attempt).0 <= max_width || current.is_empty() {
            current = attempt;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Find the largest font size (bounded by `max_px`) whose wrapped text
/// fits inside a `max_width` x `max_height` box: grow the size by one
/// until it no longer fits and keep the last size that did. When even
/// the minimum size does not fit, the minimum is returned anyway.
///
/// Returns the chosen size and the wrapped lines at that size.
pub fn fit_font_size(
    measure: &impl MeasureText,
    text: &str,
    max_width: u32,
    max_height: u32,
    max_px: u32,
) -> (u32, Vec<String>) {
    let fits = |px: u32| -> Option<Vec<String>> {
        let lines = wrap_text(measure, px as f32, text, max_width);
        let mut total_height = 0u32;
        for line in &lines {
            let (w, h) = measure.text_size(px as f32, line);
            if w > max_width {
                return None;
            }
            total_height += h;
        }
        (total_height <= max_height).then_some(lines)
    };

    let mut best = None;
    for px in MIN_FONT_PX..=max_px.max(MIN_FONT_PX) {
        match fits(px) {
            Some(lines) => best = Some((px, lines)),
            None => break,
        }
    }
    best.unwrap_or_else(|| {
        (
            MIN_FONT_PX,
            wrap_text(measure, MIN_FONT_PX as f32, text, max_width),
        )
    })
}

/// Draws header/footer text bands onto decoded images.
pub struct Annotator {
    font: OverlayFont,
}

impl Annotator {
    pub fn new(font: OverlayFont) -> Self {
        Self { font }
    }

    /// Overlay `header` across the top band and `footer` across the
    /// bottom band of `image`. Empty band text is skipped. Each band
    /// samples its own background and picks its own color.
    pub fn annotate(&self, image: &mut RgbImage, header: &str, footer: &str) {
        for (band, text) in [(Band::Header, header), (Band::Footer, footer)] {
            if !text.trim().is_empty() {
                self.draw_band(image, band, text.trim());
            }
        }
    }

    fn draw_band(&self, image: &mut RgbImage, band: Band, text: &str) {
        let (width, height) = image.dimensions();
        let background = average_band_color(image, band);
        let color = pick_text_color(background);

        let (band_start, band_end) = band.rows(height);
        let band_height = (band_end - band_start).saturating_sub(2 * BAND_PADDING).max(1);
        let wrap_width = ((width as f32 * WRAP_WIDTH_FRACTION) as u32).max(1);

        let (px, lines) = fit_font_size(&self.font, text, wrap_width, band_height, MAX_FONT_PX);
        debug!(?band, px, lines = lines.len(), ?color, "Drawing overlay band");

        let total_height: u32 = lines
            .iter()
            .map(|l| self.font.text_size(px as f32, l).1)
            .sum();
        let mut y = match band {
            Band::Header => band_start + BAND_PADDING,
            Band::Footer => band_end
                .saturating_sub(BAND_PADDING)
                .saturating_sub(total_height)
                .max(band_start),
        };

        for line in &lines {
            let (line_width, line_height) = self.font.text_size(px as f32, line);
            let x = (width.saturating_sub(line_width) / 2) as i32;
            draw_text_mut(
                image,
                color,
                x,
                y as i32,
                PxScale::from(px as f32),
                &self.font.font,
                line,
            );
            y += line_height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic measure: every glyph is px/2 wide, lines are px tall.
    struct FixedMeasure;

    impl MeasureText for FixedMeasure {
        fn text_size(&self, px: f32, text: &str) -> (u32, u32) {
            let width = (text.chars().count() as f32 * px / 2.0).ceil() as u32;
            (width, px.ceil() as u32)
        }
    }

    #[test]
    fn test_relative_luminance_extremes() {
        assert!((relative_luminance(WHITE) - 1.0).abs() < 1e-6);
        assert!(relative_luminance(BLACK).abs() < 1e-6);
    }

    #[test]
    fn test_contrast_ratio_black_on_white_is_21() {
        let ratio = contrast_ratio(relative_luminance(WHITE), relative_luminance(BLACK));
        assert!((ratio - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_pick_text_color_on_white_background() {
        // Black has ratio 21 against white; nothing can beat it.
        let chosen = pick_text_color(WHITE);
        assert_eq!(chosen, BLACK);
        let ratio = contrast_ratio(relative_luminance(chosen), relative_luminance(WHITE));
        assert!(ratio >= MIN_READABLE_CONTRAST);
    }

    #[test]
    fn test_pick_text_color_on_black_background() {
        assert_eq!(pick_text_color(BLACK), WHITE);
    }

    #[test]
    fn test_pick_text_color_always_readable_on_midtones() {
        for gray in [64u8, 96, 128, 160, 192] {
            let bg = Rgb([gray, gray, gray]);
            let chosen = pick_text_color(bg);
            let ratio = contrast_ratio(relative_luminance(chosen), relative_luminance(bg));
            assert!(ratio >= MIN_READABLE_CONTRAST, "gray {} ratio {}", gray, ratio);
        }
    }

    #[test]
    fn test_band_rows() {
        assert_eq!(Band::Header.rows(100), (0, 10));
        assert_eq!(Band::Footer.rows(100), (90, 100));
        // Tiny images still produce a non-empty band.
        assert_eq!(Band::Header.rows(5), (0, 1));
    }

    #[test]
    fn test_average_band_color_samples_correct_band() {
        let mut image = RgbImage::from_pixel(20, 100, Rgb([0, 0, 255]));
        for y in 0..10 {
            for x in 0..20 {
                image.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        assert_eq!(average_band_color(&image, Band::Header), Rgb([255, 0, 0]));
        assert_eq!(average_band_color(&image, Band::Footer), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_fit_font_size_grows_until_box_is_full() {
        // "title" is 5 chars: width = 5*px/2, height = px. In a 100x40
        // box the width limit binds first: 5*px/2 <= 100 → px <= 40,
        // then height 40 also allows px = 40.
        let (px, lines) = fit_font_size(&FixedMeasure, "title", 100, 40, 64);
        assert_eq!(px, 40);
        assert_eq!(lines, vec!["title".to_string()]);
    }

    #[test]
    fn test_fit_font_size_respects_max() {
        let (px, _) = fit_font_size(&FixedMeasure, "t", 10_000, 10_000, 64);
        assert_eq!(px, 64);
    }

    #[test]
    fn test_fit_font_size_wraps_long_text() {
        let (px, lines) = fit_font_size(&FixedMeasure, "one two three four", 60, 200, 20);
        assert!(px >= MIN_FONT_PX);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(FixedMeasure.text_size(px as f32, line).0 <= 60);
        }
    }

    #[test]
    fn test_fit_font_size_falls_back_to_minimum() {
        // A 2-pixel-tall box fits nothing; the minimum size is used anyway.
        let (px, lines) = fit_font_size(&FixedMeasure, "unfittable headline", 40, 2, 64);
        assert_eq!(px, MIN_FONT_PX);
        assert!(!lines.is_empty());
    }
}

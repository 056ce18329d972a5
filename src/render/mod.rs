//! Quote-card typesetting.
//!
//! One algorithm draws every theme; a [`ThemeConfig`] carries all of the
//! parameters that vary between looks.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────── 1080 ────────────┐
//! │        masthead_reserve      │  wordmark or logo
//! │                              │
//! │    "wrapped quote lines,     │  centred in the free band,
//! │     each centred"            │  wrapped to 1080 - 2·padding
//! │                              │
//! │        byline_reserve        │  —Byline in accent colour
//! └──────────────────────────────┘
//! ```
//!
//! Fonts that cannot be found degrade to built-in glyphs and a missing logo
//! degrades to a text wordmark. Only the final save can fail.

pub mod font;
pub mod masthead;
pub mod normalize;
pub mod theme;
pub mod wrap;

use crate::error::PostError;
use font::{Face, FontBook};
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use theme::{Theme, ThemeConfig};
use tracing::{debug, info, warn};

pub use normalize::{ensure_wrapped, format_byline, normalize_quotes};
pub use wrap::wrap_lines;

/// Width and height of every rendered card.
pub const CANVAS_SIZE: u32 = 1080;

/// One image to produce.
#[derive(Debug, Clone)]
pub struct RenderSpec {
    pub quote: String,
    pub byline: String,
    /// File stem of the written PNG.
    pub title: String,
    pub theme: ThemeConfig,
    /// Target directory; `None` writes to the working directory.
    pub output_dir: Option<PathBuf>,
}

impl RenderSpec {
    pub fn new(
        quote: impl Into<String>,
        byline: impl Into<String>,
        title: impl Into<String>,
        theme: Theme,
    ) -> Self {
        Self {
            quote: quote.into(),
            byline: byline.into(),
            title: title.into(),
            theme: theme.config(),
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Draws quote cards with a shared [`FontBook`].
pub struct Typesetter {
    fonts: FontBook,
}

impl Typesetter {
    pub fn new(fonts: FontBook) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Render `spec` and write `{output_dir}/{title}.png`.
    ///
    /// If the output directory cannot be created the image is written to
    /// the working directory instead. Returns the written path.
    pub fn render(&self, spec: &RenderSpec) -> Result<PathBuf, PostError> {
        let image = self.compose(&spec.quote, &spec.byline, &spec.theme);
        let path = save_png(&image, spec.output_dir.as_deref(), &spec.title)?;
        info!("Rendered {}", path.display());
        Ok(path)
    }

    /// Draw the card in memory.
    pub fn compose(&self, quote: &str, byline: &str, theme: &ThemeConfig) -> RgbImage {
        let [r, g, b] = theme.background;
        let mut canvas = RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, Rgba([r, g, b, 255]));

        let body = self.fonts.resolve(&theme.body);
        let text = ensure_wrapped(&normalize_quotes(quote));
        let max_width = CANVAS_SIZE.saturating_sub(2 * theme.padding) as f32;
        let lines = wrap_lines(&text, |s| body.measure(s).0, max_width);
        debug!("Theme {}: {} line(s) at width {}", theme.name, lines.len(), max_width);

        let heights: Vec<i32> = lines
            .iter()
            .map(|l| body.measure(l).1.round() as i32)
            .collect();
        let mut y = block_top(&heights, theme);

        let faux_bold = theme.faux_bold && !body.is_true_bold();
        let offsets: &[(i32, i32)] = if faux_bold && !theme.bold_offsets.is_empty() {
            &theme.bold_offsets
        } else {
            &[(0, 0)]
        };

        for (line, h) in lines.iter().zip(&heights) {
            let (w, _) = body.measure(line);
            let x = ((CANVAS_SIZE as f32 - w) / 2.0).round() as i32;
            draw_text(&mut canvas, &body, line, x, y, theme.text_color, offsets);
            y += h + theme.line_spacing;
        }

        self.draw_byline(&mut canvas, byline, theme);
        masthead::draw_masthead(&mut canvas, theme, &self.fonts);

        DynamicImage::ImageRgba8(canvas).to_rgb8()
    }

    fn draw_byline(&self, canvas: &mut RgbaImage, byline: &str, theme: &ThemeConfig) {
        let byline = format_byline(byline);
        if byline.is_empty() {
            return;
        }
        let face = self.fonts.resolve(&theme.byline);
        let (w, h) = face.measure(&byline);
        let x = ((CANVAS_SIZE as f32 - w) / 2.0).round() as i32;
        let y = byline_top(h.round() as i32, theme);
        draw_text(canvas, &face, &byline, x, y, theme.accent, &[(0, 0)]);
    }
}

/// Render one card with system fonts.
///
/// Builds a fresh [`FontBook`] per call; render many cards through one
/// [`Typesetter`] instead.
pub fn render(spec: &RenderSpec) -> Result<PathBuf, PostError> {
    Typesetter::new(FontBook::new(&[], true)).render(spec)
}

/// Y of the first line: the block is centred between the reserves, and a
/// block taller than the band starts at the band's top.
fn block_top(line_heights: &[i32], theme: &ThemeConfig) -> i32 {
    let gaps = line_heights.len().saturating_sub(1) as i32;
    let total: i32 = line_heights.iter().sum::<i32>() + gaps * theme.line_spacing;
    let band_top = theme.masthead_reserve as i32;
    let band_bottom = CANVAS_SIZE as i32 - theme.byline_reserve as i32;
    let top = band_top + (band_bottom - band_top - total) / 2;
    top.max(band_top)
}

fn byline_top(height: i32, theme: &ThemeConfig) -> i32 {
    let canvas = CANVAS_SIZE as i32;
    if theme.byline_reserve > 0 {
        let reserve = theme.byline_reserve as i32;
        canvas - reserve + (reserve - height) / 2
    } else {
        canvas - theme.padding as i32 - height
    }
}

/// Draw `text` with its origin at `(x, y)`, once per offset.
pub(crate) fn draw_text(
    canvas: &mut RgbaImage,
    face: &Face,
    text: &str,
    x: i32,
    y: i32,
    color: [u8; 3],
    offsets: &[(i32, i32)],
) {
    let Some(sprite) = face.rasterize(text, color) else {
        return;
    };
    for (dx, dy) in offsets {
        imageops::overlay(canvas, &sprite, (x + dx) as i64, (y + dy) as i64);
    }
}

fn save_png(image: &RgbImage, dir: Option<&Path>, title: &str) -> Result<PathBuf, PostError> {
    let file_name = format!("{}.png", safe_file_stem(title, "quote"));
    let path = match dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => dir.join(&file_name),
            Err(e) => {
                warn!(
                    "Cannot create {} ({}); writing {} to the working directory",
                    dir.display(),
                    e,
                    file_name
                );
                PathBuf::from(&file_name)
            }
        },
        None => PathBuf::from(&file_name),
    };

    image
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|source| PostError::ImageSaveFailed {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// `name` as a single path component: separators replaced, and a blank or
/// dot-only name becomes `fallback`.
pub(crate) fn safe_file_stem(name: &str, fallback: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();
    if stem.is_empty() || stem == "." || stem == ".." {
        fallback.to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin_typesetter() -> Typesetter {
        Typesetter::new(FontBook::new(&[], false))
    }

    fn ink_rows(image: &RgbImage, background: [u8; 3]) -> Vec<u32> {
        (0..image.height())
            .filter(|&y| (0..image.width()).any(|x| image.get_pixel(x, y).0 != background))
            .collect()
    }

    #[test]
    fn canvas_is_square_with_background() {
        let theme = Theme::Headline.config();
        let img = builtin_typesetter().compose("", "", &theme);
        assert_eq!(img.dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
        assert_eq!(img.get_pixel(5, 540).0, theme.background);
    }

    #[test]
    fn text_is_centred_horizontally() {
        let mut theme = Theme::Default.config();
        theme.masthead = theme::Masthead::None;
        let img = builtin_typesetter().compose("Hi", "", &theme);
        let bg = theme.background;
        let cols: Vec<u32> = (0..CANVAS_SIZE)
            .filter(|&x| (0..CANVAS_SIZE).any(|y| img.get_pixel(x, y).0 != bg))
            .collect();
        let left = *cols.first().unwrap() as i32;
        let right = CANVAS_SIZE as i32 - 1 - *cols.last().unwrap() as i32;
        // Builtin glyph cells carry blank columns, so allow one cell of slack.
        assert!((left - right).abs() <= 56, "left {left} right {right}");
    }

    #[test]
    fn block_is_centred_between_reserves() {
        let theme = Theme::Headline.config();
        let top = block_top(&[100, 100], &theme);
        let total = 200 + theme.line_spacing;
        let band = CANVAS_SIZE as i32 - 320;
        assert_eq!(top, 160 + (band - total) / 2);
    }

    #[test]
    fn oversized_block_is_clamped_to_band_top() {
        let theme = Theme::Spotlight.config();
        assert_eq!(block_top(&[400; 5], &theme), theme.masthead_reserve as i32);
    }

    #[test]
    fn byline_sits_in_its_region() {
        let mut theme = Theme::Default.config();
        assert_eq!(byline_top(30, &theme), 1080 - 100 - 30);
        theme.byline_reserve = 160;
        assert_eq!(byline_top(40, &theme), 1080 - 160 + 60);
    }

    #[test]
    fn byline_uses_accent_colour() {
        let mut theme = Theme::Headline.config();
        theme.masthead = theme::Masthead::None;
        let img = builtin_typesetter().compose("Short.", "--Jane Doe", &theme);
        let lower = (CANVAS_SIZE - theme.byline_reserve)..CANVAS_SIZE;
        let accent_pixels = lower
            .flat_map(|y| (0..CANVAS_SIZE).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let [r, g, _] = img.get_pixel(x, y).0;
                r > 150 && g < 120
            })
            .count();
        assert!(accent_pixels > 0);
    }

    #[test]
    fn blank_byline_draws_nothing_below_text() {
        let mut theme = Theme::Headline.config();
        theme.masthead = theme::Masthead::None;
        let img = builtin_typesetter().compose("Short.", "  ", &theme);
        let rows = ink_rows(&img, theme.background);
        assert!(rows.iter().all(|&y| y < CANVAS_SIZE - theme.byline_reserve));
    }

    #[test]
    fn long_quotes_wrap_inside_padding() {
        let mut theme = Theme::Spotlight.config();
        theme.masthead = theme::Masthead::None;
        let quote = "The committee found that the programme delivered less than half \
                     of the promised savings while costs rose every single year.";
        let img = builtin_typesetter().compose(quote, "", &theme);
        let bg = theme.background;
        let pad = theme.padding;
        for y in 0..CANVAS_SIZE {
            for x in (0..pad.saturating_sub(3)).chain(CANVAS_SIZE - pad + 3..CANVAS_SIZE) {
                assert_eq!(img.get_pixel(x, y).0, bg, "ink at ({x}, {y})");
            }
        }
    }

    #[test]
    fn faux_bold_thickens_builtin_text() {
        let mut plain = Theme::Headline.config();
        plain.masthead = theme::Masthead::None;
        plain.faux_bold = false;
        let mut bold = plain.clone();
        bold.faux_bold = true;

        let ts = builtin_typesetter();
        let count = |img: &RgbImage| img.pixels().filter(|p| p.0[0] < 128).count();
        let a = count(&ts.compose("Ink", "", &plain));
        let b = count(&ts.compose("Ink", "", &bold));
        assert!(b > a);
    }

    #[test]
    fn render_writes_png_named_by_title() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = RenderSpec::new("A line worth quoting.", "Jane Doe", "story_1", Theme::Default)
            .with_output_dir(dir.path().join("cards"));
        spec.theme.masthead = theme::Masthead::None;

        let path = builtin_typesetter().render(&spec).unwrap();
        assert_eq!(path, dir.path().join("cards").join("story_1.png"));
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (CANVAS_SIZE, CANVAS_SIZE));
    }

    #[test]
    fn titles_become_safe_file_stems() {
        assert_eq!(safe_file_stem("a/b\\c", "quote"), "a_b_c");
        assert_eq!(safe_file_stem("  ", "quote"), "quote");
        assert_eq!(safe_file_stem("..", "post"), "post");
        assert_eq!(safe_file_stem("../up", "post"), ".._up");
        assert_eq!(safe_file_stem("story_2", "quote"), "story_2");
    }
}

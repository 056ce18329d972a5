//! Masthead drawing: stacked wordmark or a logo raster.

use super::font::FontBook;
use super::theme::{Masthead, ThemeConfig};
use super::{draw_text, CANVAS_SIZE};
use image::imageops::{self, FilterType};
use image::{ImageResult, RgbaImage};
use std::path::Path;
use tracing::{debug, warn};

const WORDMARK_CLUSTER: [(i32, i32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

pub(crate) fn draw_masthead(canvas: &mut RgbaImage, theme: &ThemeConfig, fonts: &FontBook) {
    match &theme.masthead {
        Masthead::None => {}
        Masthead::Wordmark {
            lines,
            font,
            color,
            top,
            line_gap,
        } => {
            let face = fonts.resolve(font);
            let offsets: &[(i32, i32)] = if theme.bold_offsets.is_empty() {
                &WORDMARK_CLUSTER
            } else {
                &theme.bold_offsets
            };
            let mut y = *top;
            for line in lines {
                let (w, h) = face.measure(line);
                let x = (CANVAS_SIZE as f32 - w) / 2.0;
                draw_text(canvas, &face, line, x.round() as i32, y, *color, offsets);
                y += h.round() as i32 + line_gap;
            }
        }
        Masthead::Logo {
            path,
            width,
            top,
            recolor,
            fallback_text,
            font,
        } => {
            let accent = recolor.then_some(theme.accent);
            match load_logo(path, *width, accent) {
                Ok(logo) => {
                    let x = (CANVAS_SIZE as i64 - logo.width() as i64) / 2;
                    imageops::overlay(canvas, &logo, x, *top as i64);
                }
                Err(e) => {
                    warn!("Logo {} unavailable ({}); drawing text wordmark", path.display(), e);
                    if fallback_text.trim().is_empty() {
                        return;
                    }
                    let face = fonts.resolve(font);
                    let (w, _) = face.measure(fallback_text);
                    let x = (CANVAS_SIZE as f32 - w) / 2.0;
                    draw_text(
                        canvas,
                        &face,
                        fallback_text,
                        x.round() as i32,
                        *top,
                        theme.text_color,
                        &[(0, 0)],
                    );
                }
            }
        }
    }
}

/// Load a logo, scale it to `width` keeping its aspect ratio, and
/// optionally paint every pixel `accent` while keeping the alpha mask.
pub fn load_logo(path: &Path, width: u32, accent: Option<[u8; 3]>) -> ImageResult<RgbaImage> {
    let source = image::open(path)?.to_rgba8();
    let mut logo = scale_to_width(&source, width);
    if let Some(rgb) = accent {
        recolor(&mut logo, rgb);
    }
    debug!("Logo {} → {}×{}", path.display(), logo.width(), logo.height());
    Ok(logo)
}

fn scale_to_width(source: &RgbaImage, width: u32) -> RgbaImage {
    let (sw, sh) = source.dimensions();
    if sw == 0 || sh == 0 || width == 0 || sw == width {
        return source.clone();
    }
    let height = ((width as f64 * sh as f64 / sw as f64).round() as u32).max(1);
    imageops::resize(source, width, height, FilterType::Lanczos3)
}

/// Replace RGB channels with `rgb`; alpha is untouched.
pub fn recolor(image: &mut RgbaImage, rgb: [u8; 3]) {
    for px in image.pixels_mut() {
        px.0[0] = rgb[0];
        px.0[1] = rgb[1];
        px.0[2] = rgb[2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn recolor_keeps_alpha() {
        let mut img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([10, 20, 30, 0])
            } else {
                Rgba([200, 200, 200, 128])
            }
        });
        recolor(&mut img, [242, 183, 5]);
        assert_eq!(img.get_pixel(0, 0).0, [242, 183, 5, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [242, 183, 5, 128]);
    }

    #[test]
    fn logo_scales_to_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        RgbaImage::from_pixel(400, 100, Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();

        let logo = load_logo(&path, 200, Some([1, 2, 3])).unwrap();
        assert_eq!(logo.dimensions(), (200, 50));
        assert!(logo.pixels().all(|p| p.0[..3] == [1, 2, 3]));
    }

    #[test]
    fn missing_logo_is_an_error() {
        assert!(load_logo(Path::new("/no/such/logo.png"), 200, None).is_err());
    }

    #[test]
    fn missing_logo_falls_back_to_text() {
        let fonts = FontBook::new(&[], false);
        let mut theme = crate::render::theme::Theme::Spotlight.config();
        theme.masthead = Masthead::Logo {
            path: "/no/such/logo.png".into(),
            width: 180,
            top: 40,
            recolor: true,
            fallback_text: "BRAND".into(),
            font: theme.byline.clone(),
        };
        let bg = Rgba([0, 0, 0, 255]);
        let mut canvas = RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, bg);
        draw_masthead(&mut canvas, &theme, &fonts);

        let top_band_inked = (40..120)
            .flat_map(|y| (0..CANVAS_SIZE).map(move |x| (x, y)))
            .any(|(x, y)| *canvas.get_pixel(x, y) != bg);
        assert!(top_band_inked);
    }
}

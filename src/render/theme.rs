//! Visual themes.
//!
//! A theme is pure data: one [`ThemeConfig`] drives the single layout
//! algorithm in [`crate::render`]. The named [`Theme`]s are presets;
//! callers can build their own `ThemeConfig` and pass it to the typesetter.

use super::font::{FontCandidate, FontSpec, GenericFamily};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Named theme presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark background, serif text, logo raster with text fallback.
    #[default]
    Default,
    /// White background, heavy sans with faux-bold, two-line wordmark.
    Headline,
    /// Navy background, bold sans, logo recoloured to the accent.
    Spotlight,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Default, Theme::Headline, Theme::Spotlight];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Headline => "headline",
            Theme::Spotlight => "spotlight",
        }
    }

    /// Layout parameters for this preset.
    pub fn config(self) -> ThemeConfig {
        match self {
            Theme::Default => default_theme(),
            Theme::Headline => headline_theme(),
            Theme::Spotlight => spotlight_theme(),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown theme '{}' (expected default, headline or spotlight)", s))
    }
}

/// What is drawn in the top region of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Masthead {
    None,
    /// Stacked text lines, each centred and drawn with faux-bold.
    Wordmark {
        lines: Vec<String>,
        font: FontSpec,
        color: [u8; 3],
        /// Y of the first line.
        top: i32,
        /// Added to a line's height to get the next line's y (negative tightens).
        line_gap: i32,
    },
    /// A raster logo scaled to `width` and centred.
    Logo {
        path: PathBuf,
        width: u32,
        top: i32,
        /// Replace the logo's RGB with the theme accent, keeping alpha.
        recolor: bool,
        /// Single-line text drawn when the logo cannot be loaded.
        fallback_text: String,
        font: FontSpec,
    },
}

/// Every parameter the typesetter reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeConfig {
    pub name: String,
    pub background: [u8; 3],
    pub text_color: [u8; 3],
    /// Byline colour, and the logo colour when recolouring.
    pub accent: [u8; 3],
    pub body: FontSpec,
    pub byline: FontSpec,
    /// Horizontal margin on each side; the wrap width is `canvas - 2 * padding`.
    pub padding: u32,
    /// Added after each line's measured height.
    pub line_spacing: i32,
    /// Simulate a heavy weight by overdrawing at `bold_offsets`.
    pub faux_bold: bool,
    pub bold_offsets: Vec<(i32, i32)>,
    pub masthead: Masthead,
    /// Height kept clear at the top for the masthead.
    pub masthead_reserve: u32,
    /// Height kept clear at the bottom for the byline. Zero places the
    /// byline directly above the bottom padding.
    pub byline_reserve: u32,
}

const SMALL_BOLD_CLUSTER: [(i32, i32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

const HEAVY_BOLD_CLUSTER: [(i32, i32); 9] = [
    (0, 0),
    (1, 0),
    (0, 1),
    (1, 1),
    (2, 0),
    (0, 2),
    (2, 1),
    (1, 2),
    (2, 2),
];

fn serif(size: f32, italic: bool) -> FontSpec {
    let mut candidates = Vec::new();
    if italic {
        candidates.push(FontCandidate::file_index("/System/Library/Fonts/Times.ttc", 2));
    }
    candidates.extend([
        FontCandidate::file_index("/System/Library/Fonts/Times.ttc", 0),
        FontCandidate::family("Times New Roman"),
        FontCandidate::file("/System/Library/Fonts/Georgia.ttf"),
    ]);
    if italic {
        candidates.push(FontCandidate::file(
            "/usr/share/fonts/truetype/liberation/LiberationSerif-Italic.ttf",
        ));
    }
    candidates.extend([
        FontCandidate::file("/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf"),
        FontCandidate::family("Liberation Serif"),
        FontCandidate::family("DejaVu Serif"),
        FontCandidate::Generic(GenericFamily::Serif),
    ]);
    FontSpec {
        candidates,
        size,
        weight: 400,
        italic,
    }
}

fn heavy_sans(size: f32, weight: u16) -> FontSpec {
    FontSpec {
        candidates: vec![
            FontCandidate::file_index("/System/Library/Fonts/Helvetica.ttc", 1),
            FontCandidate::file("/System/Library/Fonts/Supplemental/Arial Black.ttf"),
            FontCandidate::file("/System/Library/Fonts/Arial.ttf"),
            FontCandidate::file("/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf"),
            FontCandidate::family("Arial"),
            FontCandidate::family("Liberation Sans"),
            FontCandidate::family("DejaVu Sans"),
            FontCandidate::Generic(GenericFamily::SansSerif),
        ],
        size,
        weight,
        italic: false,
    }
}

fn default_theme() -> ThemeConfig {
    ThemeConfig {
        name: "default".to_string(),
        background: [30, 30, 30],
        text_color: [255, 255, 255],
        accent: [255, 100, 100],
        body: serif(50.0, false),
        byline: serif(30.0, false),
        padding: 100,
        line_spacing: 0,
        faux_bold: false,
        bold_offsets: Vec::new(),
        masthead: Masthead::Logo {
            path: PathBuf::from("assets/logo.png"),
            width: 200,
            top: 40,
            recolor: false,
            fallback_text: "THE SUNDIAL".to_string(),
            font: serif(36.0, false),
        },
        masthead_reserve: 160,
        byline_reserve: 0,
    }
}

fn headline_theme() -> ThemeConfig {
    ThemeConfig {
        name: "headline".to_string(),
        background: [255, 255, 255],
        text_color: [0, 0, 0],
        accent: [220, 53, 69],
        body: heavy_sans(95.0, 800),
        byline: serif(44.0, true),
        padding: 120,
        line_spacing: -5,
        faux_bold: true,
        bold_offsets: HEAVY_BOLD_CLUSTER.to_vec(),
        masthead: Masthead::Wordmark {
            lines: vec!["THE".to_string(), "FP".to_string()],
            font: heavy_sans(42.0, 800),
            color: [0, 0, 0],
            top: 60,
            line_gap: -8,
        },
        masthead_reserve: 160,
        byline_reserve: 160,
    }
}

fn spotlight_theme() -> ThemeConfig {
    ThemeConfig {
        name: "spotlight".to_string(),
        background: [16, 32, 64],
        text_color: [245, 245, 245],
        accent: [242, 183, 5],
        body: heavy_sans(64.0, 700),
        byline: serif(36.0, true),
        padding: 110,
        line_spacing: 6,
        faux_bold: true,
        bold_offsets: SMALL_BOLD_CLUSTER.to_vec(),
        masthead: Masthead::Logo {
            path: PathBuf::from("assets/logo.png"),
            width: 180,
            top: 56,
            recolor: true,
            fallback_text: "SPOTLIGHT".to_string(),
            font: heavy_sans(40.0, 700),
        },
        masthead_reserve: 180,
        byline_reserve: 140,
    }
}

//! Font resolution, measurement and glyph rasterisation.
//!
//! Outline fonts are found through a `fontdb` database and drawn by handing
//! `usvg` a one-line SVG `<text>` element pinned to the resolved face, then
//! rasterising it with `resvg`. When no candidate resolves, text falls back
//! to the built-in 8×8 bitmap glyphs of `font8x8`, scaled to the requested
//! size, so rendering never fails for lack of fonts.
//!
//! Measurement follows the ink box of the text laid out from a top-left
//! origin: width is the right edge of the ink, height its bottom edge.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight, ID};

/// Weight at which a face counts as a true bold.
pub const BOLD_WEIGHT: u16 = 600;

/// One entry of an ordered font fallback list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontCandidate {
    /// A font file; `index` selects the face inside a collection (`.ttc`).
    File { path: PathBuf, index: u32 },
    /// A family name looked up among loaded fonts.
    Family(String),
    /// A generic family.
    Generic(GenericFamily),
}

impl FontCandidate {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        FontCandidate::File {
            path: path.into(),
            index: 0,
        }
    }

    pub fn file_index(path: impl Into<PathBuf>, index: u32) -> Self {
        FontCandidate::File {
            path: path.into(),
            index,
        }
    }

    pub fn family(name: impl Into<String>) -> Self {
        FontCandidate::Family(name.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericFamily {
    Serif,
    SansSerif,
}

/// Requested font: ordered candidates plus size and style.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub candidates: Vec<FontCandidate>,
    /// Pixel size.
    pub size: f32,
    /// Preferred weight for family lookups (400 regular, 700 bold).
    pub weight: u16,
    pub italic: bool,
}

// ── Font book ─────────────────────────────────────────────────────────────

/// Loaded fonts, shared by every render.
pub struct FontBook {
    db: Arc<Database>,
    files: Mutex<HashMap<PathBuf, Option<Arc<Database>>>>,
}

impl FontBook {
    /// Database seeded with system fonts (optionally), `./fonts`, and `font_dirs`.
    pub fn new(font_dirs: &[PathBuf], system_fonts: bool) -> Self {
        let mut db = Database::new();
        if system_fonts {
            db.load_system_fonts();
        }
        load_fonts_from_dir(&mut db, Path::new("fonts"));
        for dir in font_dirs {
            load_fonts_from_dir(&mut db, dir);
        }
        debug!("Font book: {} faces", db.len());

        Self {
            db: Arc::new(db),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Number of loaded faces, excluding explicitly named files.
    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Resolve `spec` to the first candidate that exists, else the built-in glyphs.
    pub fn resolve(&self, spec: &FontSpec) -> Face {
        for candidate in &spec.candidates {
            let found = match candidate {
                FontCandidate::File { path, index } => self.resolve_file(path, *index),
                FontCandidate::Family(name) => {
                    query(&self.db, Family::Name(name), spec).map(|id| (Arc::clone(&self.db), id))
                }
                FontCandidate::Generic(GenericFamily::Serif) => {
                    query(&self.db, Family::Serif, spec).map(|id| (Arc::clone(&self.db), id))
                }
                FontCandidate::Generic(GenericFamily::SansSerif) => {
                    query(&self.db, Family::SansSerif, spec).map(|id| (Arc::clone(&self.db), id))
                }
            };

            if let Some((db, id)) = found {
                if let Some(face) = OutlineFace::new(db, id, spec) {
                    debug!("Font {:?} → '{}' ({})", candidate, face.family, face.weight);
                    return Face::Outline(face);
                }
            }
        }

        warn!(
            "No font found among {} candidate(s); using built-in glyphs",
            spec.candidates.len()
        );
        Face::builtin(spec.size)
    }

    fn resolve_file(&self, path: &Path, index: u32) -> Option<(Arc<Database>, ID)> {
        let db = {
            let mut files = self.files.lock().ok()?;
            files
                .entry(path.to_path_buf())
                .or_insert_with(|| load_single_file(path))
                .clone()?
        };
        let id = db
            .faces()
            .find(|f| f.index == index)
            .or_else(|| db.faces().next())
            .map(|f| f.id)?;
        Some((db, id))
    }
}

fn load_single_file(path: &Path) -> Option<Arc<Database>> {
    if !path.is_file() {
        return None;
    }
    let mut db = Database::new();
    if let Err(e) = db.load_font_file(path) {
        debug!("Font file {} unreadable: {}", path.display(), e);
        return None;
    }
    if db.is_empty() {
        return None;
    }
    Some(Arc::new(db))
}

fn query(db: &Database, family: Family<'_>, spec: &FontSpec) -> Option<ID> {
    let families = [family];
    db.query(&Query {
        families: &families,
        weight: Weight(spec.weight),
        stretch: Stretch::Normal,
        style: if spec.italic {
            Style::Italic
        } else {
            Style::Normal
        },
    })
}

fn load_fonts_from_dir(db: &mut Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        let _ = db.load_font_file(&path);
    }
}

// ── Faces ─────────────────────────────────────────────────────────────────

/// A resolved font at a fixed size.
#[derive(Clone)]
pub enum Face {
    Outline(OutlineFace),
    /// `font8x8` glyphs, each 8×8 cell scaled by an integer factor.
    Builtin { scale: u32 },
}

impl Face {
    pub fn builtin(size: f32) -> Self {
        Face::Builtin {
            scale: ((size / 8.0).round() as u32).max(1),
        }
    }

    /// Ink extent of `text` as `(width, height)` in pixels.
    pub fn measure(&self, text: &str) -> (f32, f32) {
        match self {
            Face::Outline(face) => face.measure(text),
            Face::Builtin { scale } => {
                let cell = (8 * scale) as f32;
                if text.is_empty() {
                    return (0.0, 0.0);
                }
                (text.chars().count() as f32 * cell, cell)
            }
        }
    }

    /// Whether the face already has a bold weight.
    pub fn is_true_bold(&self) -> bool {
        match self {
            Face::Outline(face) => face.weight >= BOLD_WEIGHT,
            Face::Builtin { .. } => false,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Face::Builtin { .. })
    }

    /// Rasterise `text` in `color` on a transparent sprite whose origin is
    /// the text origin. `None` for text with no ink.
    pub fn rasterize(&self, text: &str, color: [u8; 3]) -> Option<RgbaImage> {
        match self {
            Face::Outline(face) => face.rasterize(text, color),
            Face::Builtin { scale } => rasterize_builtin(text, *scale, color),
        }
    }
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Face::Outline(face) => f
                .debug_struct("Outline")
                .field("family", &face.family)
                .field("weight", &face.weight)
                .field("size", &face.size)
                .finish(),
            Face::Builtin { scale } => f.debug_struct("Builtin").field("scale", scale).finish(),
        }
    }
}

/// An outline face pinned by database id.
#[derive(Clone)]
pub struct OutlineFace {
    db: Arc<Database>,
    id: ID,
    pub family: String,
    pub weight: u16,
    pub italic: bool,
    pub size: f32,
}

impl OutlineFace {
    fn new(db: Arc<Database>, id: ID, spec: &FontSpec) -> Option<Self> {
        let info = db.face(id)?;
        let family = info
            .families
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        let weight = info.weight.0;
        let italic = info.style != Style::Normal;
        Some(Self {
            db,
            id,
            family,
            weight,
            italic,
            size: spec.size,
        })
    }

    fn tree(&self, text: &str, color: [u8; 3]) -> Option<usvg::Tree> {
        if text.trim().is_empty() {
            return None;
        }
        let width = (self.size * (text.chars().count() as f32 + 2.0)).ceil();
        let height = (self.size * 2.0).ceil();
        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\">\
<text x=\"0\" y=\"{size}\" font-family=\"{family}\" font-size=\"{size}\" font-weight=\"{weight}\" \
font-style=\"{style}\" fill=\"#{r:02x}{g:02x}{b:02x}\" xml:space=\"preserve\">{text}</text></svg>",
            size = self.size,
            family = escape_xml(&self.family),
            weight = self.weight,
            style = if self.italic { "italic" } else { "normal" },
            r = color[0],
            g = color[1],
            b = color[2],
            text = escape_xml(text),
        );

        let id = self.id;
        let opts = usvg::Options {
            fontdb: Arc::clone(&self.db),
            font_resolver: usvg::FontResolver {
                select_font: Box::new(move |_, _| Some(id)),
                select_fallback: usvg::FontResolver::default_fallback_selector(),
            },
            ..Default::default()
        };

        match usvg::Tree::from_data(svg.as_bytes(), &opts) {
            Ok(tree) if tree.root().has_children() => Some(tree),
            Ok(_) => None,
            Err(e) => {
                debug!("Text layout failed for '{}': {}", self.family, e);
                None
            }
        }
    }

    fn measure(&self, text: &str) -> (f32, f32) {
        match self.tree(text, [0, 0, 0]) {
            Some(tree) => {
                let bbox = tree.root().abs_bounding_box();
                (bbox.right().max(0.0), bbox.bottom().max(0.0))
            }
            None => (0.0, 0.0),
        }
    }

    fn rasterize(&self, text: &str, color: [u8; 3]) -> Option<RgbaImage> {
        let tree = self.tree(text, color)?;
        let bbox = tree.root().abs_bounding_box();
        let w = (bbox.right().ceil().max(0.0) as u32) + 2;
        let h = (bbox.bottom().ceil().max(0.0) as u32) + 2;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)?;
        resvg::render(&tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        // Every inked pixel has the fill colour; alpha carries the coverage.
        let mut sprite = RgbaImage::new(w, h);
        for (px, rgba) in sprite.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
            *px = Rgba([color[0], color[1], color[2], rgba[3]]);
        }
        Some(sprite)
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

// ── Built-in glyphs ───────────────────────────────────────────────────────

fn builtin_glyph(c: char) -> [u8; 8] {
    let c = match c {
        '\u{2014}' | '\u{2013}' => '-',
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{201C}' | '\u{201D}' => '"',
        '\u{2026}' => '.',
        other => other,
    };
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn rasterize_builtin(text: &str, scale: u32, color: [u8; 3]) -> Option<RgbaImage> {
    let count = text.chars().count() as u32;
    if count == 0 {
        return None;
    }
    let cell = 8 * scale;
    let mut sprite = RgbaImage::new(count * cell, cell);
    let ink = Rgba([color[0], color[1], color[2], 255]);

    for (i, c) in text.chars().enumerate() {
        let x0 = i as u32 * cell;
        for (row, bits) in builtin_glyph(c).iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        sprite.put_pixel(x0 + col * scale + dx, row as u32 * scale + dy, ink);
                    }
                }
            }
        }
    }
    Some(sprite)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_book() -> FontBook {
        FontBook::new(&[], false)
    }

    #[test]
    fn missing_fonts_fall_back_to_builtin() {
        let book = empty_book();
        let spec = FontSpec {
            candidates: vec![
                FontCandidate::file("/no/such/font.ttf"),
                FontCandidate::family("No Such Family"),
            ],
            size: 48.0,
            weight: 700,
            italic: false,
        };
        let face = book.resolve(&spec);
        assert!(face.is_builtin());
        assert!(!face.is_true_bold());
    }

    #[test]
    fn builtin_scale_follows_size() {
        assert!(matches!(Face::builtin(50.0), Face::Builtin { scale: 6 }));
        assert!(matches!(Face::builtin(3.0), Face::Builtin { scale: 1 }));
    }

    #[test]
    fn builtin_measure_is_monospaced() {
        let face = Face::builtin(16.0);
        assert_eq!(face.measure("abc"), (48.0, 16.0));
        assert_eq!(face.measure(""), (0.0, 0.0));
    }

    #[test]
    fn builtin_sprite_has_ink() {
        let sprite = Face::builtin(8.0).rasterize("A", [255, 0, 0]).unwrap();
        assert_eq!(sprite.dimensions(), (8, 8));
        assert!(sprite.pixels().any(|p| p.0 == [255, 0, 0, 255]));
        assert!(sprite.pixels().any(|p| p.0[3] == 0));
    }

    #[test]
    fn typographic_punctuation_has_builtin_glyphs() {
        assert_eq!(builtin_glyph('\u{2014}'), builtin_glyph('-'));
        assert_eq!(builtin_glyph('\u{201C}'), builtin_glyph('"'));
        assert_ne!(builtin_glyph('\u{2014}'), [0; 8]);
    }

    #[test]
    fn xml_is_escaped() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }
}

//! Output types and file writing.
//!
//! [`OutputManager`] turns a finished [`PostContent`] into files: one quote
//! card per quote, the caption as text, and optionally a zip of the cards.
//!
//! ```text
//! {output_dir}/
//!   {stem}_1.png … {stem}_N.png   one card per quote, in quote order
//!   {stem}_caption.txt            the caption
//!   images.zip                    the cards, when bundling is on
//! ```

use crate::config::PostConfig;
use crate::error::PostError;
use crate::pipeline::orchestrator::RunStats;
use crate::pipeline::state::PostContent;
use crate::progress::ProgressCallback;
use crate::render::theme::ThemeConfig;
use crate::render::{safe_file_stem, RenderSpec, Typesetter};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;

/// File name of the card bundle inside the output directory.
pub const BUNDLE_FILE_NAME: &str = "images.zip";

/// File stem used when the article gives none usable.
pub const DEFAULT_STEM: &str = "post";

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostOutput {
    pub summary: String,
    pub quotes: Vec<String>,
    pub caption: String,
    /// Rendered cards, one per quote, in quote order.
    pub images: Vec<PathBuf>,
    pub caption_path: PathBuf,
    /// The zip bundle, when bundling was requested.
    pub bundle: Option<PathBuf>,
    pub stats: RunStats,
}

impl PostOutput {
    /// Every file written, cards first.
    pub fn artifacts(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = self.images.iter().map(PathBuf::as_path).collect();
        files.push(&self.caption_path);
        if let Some(ref bundle) = self.bundle {
            files.push(bundle);
        }
        files
    }
}

/// Files written by [`OutputManager::write`].
#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub images: Vec<PathBuf>,
    pub caption_path: PathBuf,
    pub bundle: Option<PathBuf>,
    pub duration_ms: u64,
}

/// Writes the cards, caption and bundle for one run.
pub struct OutputManager {
    typesetter: Arc<Typesetter>,
    output_dir: PathBuf,
    theme: ThemeConfig,
    byline: String,
    bundle: bool,
    progress: Option<ProgressCallback>,
}

impl OutputManager {
    pub fn new(typesetter: Arc<Typesetter>, config: &PostConfig) -> Self {
        Self {
            typesetter,
            output_dir: config.output_dir.clone(),
            theme: config.theme.config(),
            byline: config.byline.clone(),
            bundle: config.bundle,
            progress: config.progress_callback.clone(),
        }
    }

    /// Replace the preset theme with a custom one.
    pub fn with_theme(mut self, theme: ThemeConfig) -> Self {
        self.theme = theme;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render every card, write the caption, and bundle if configured.
    ///
    /// `stem` is reduced to one path component first, so every file lands
    /// directly in the output directory under the same prefix.
    pub async fn write(&self, content: &PostContent, stem: &str) -> Result<WrittenFiles, PostError> {
        let start = Instant::now();
        let stem = safe_file_stem(stem, DEFAULT_STEM);
        let images = self.render_quotes(&content.quotes, &stem).await?;
        let caption_path = self.write_caption(&content.caption, &stem).await?;

        let bundle = if self.bundle {
            let dest = self.output_dir.join(BUNDLE_FILE_NAME);
            let paths = images.clone();
            let written = tokio::task::spawn_blocking(move || bundle_zip(&paths, &dest))
                .await
                .map_err(|e| PostError::Internal(format!("Bundle task panicked: {}", e)))??;
            Some(written)
        } else {
            None
        };

        Ok(WrittenFiles {
            images,
            caption_path,
            bundle,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Render one card per quote as `{stem}_{n}.png`, `n` starting at 1.
    ///
    /// Cards are drawn in parallel on the blocking pool; the returned paths
    /// follow quote order. The first failed save fails the call.
    pub async fn render_quotes(&self, quotes: &[String], stem: &str) -> Result<Vec<PathBuf>, PostError> {
        let stem = safe_file_stem(stem, DEFAULT_STEM);
        let specs: Vec<RenderSpec> = quotes
            .iter()
            .enumerate()
            .map(|(i, quote)| RenderSpec {
                quote: quote.clone(),
                byline: self.byline.clone(),
                title: format!("{}_{}", stem, i + 1),
                theme: self.theme.clone(),
                output_dir: Some(self.output_dir.clone()),
            })
            .collect();
        let total = specs.len();
        info!("Rendering {} card(s) with theme {}", total, self.theme.name);

        let typesetter = Arc::clone(&self.typesetter);
        let progress = self.progress.clone();
        tokio::task::spawn_blocking(move || {
            specs
                .par_iter()
                .enumerate()
                .map(|(i, spec)| {
                    let path = typesetter.render(spec)?;
                    if let Some(ref cb) = progress {
                        cb.on_image_rendered(i + 1, total, &path);
                    }
                    Ok(path)
                })
                .collect::<Result<Vec<_>, PostError>>()
        })
        .await
        .map_err(|e| PostError::Internal(format!("Render task panicked: {}", e)))?
    }

    /// Write `{stem}_caption.txt` atomically (temp file + rename).
    pub async fn write_caption(&self, caption: &str, stem: &str) -> Result<PathBuf, PostError> {
        let stem = safe_file_stem(stem, DEFAULT_STEM);
        let path = self.output_dir.join(format!("{}_caption.txt", stem));
        write_atomic(&path, caption).await?;
        debug!("Caption written to {}", path.display());
        Ok(path)
    }
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), PostError> {
    let write_err = |e: std::io::Error| PostError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Zip `paths` into `dest` (Deflated), each entry named by its file name.
pub fn bundle_zip(paths: &[PathBuf], dest: &Path) -> Result<PathBuf, PostError> {
    let bundle_err = |detail: String| PostError::BundleFailed {
        path: dest.to_path_buf(),
        detail,
    };

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| bundle_err(e.to_string()))?;
    }
    let file = File::create(dest).map_err(|e| bundle_err(e.to_string()))?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| bundle_err(format!("{} has no file name", path.display())))?;
        zip.start_file(name, options)
            .map_err(|e| bundle_err(e.to_string()))?;
        let mut source = File::open(path)
            .map_err(|e| bundle_err(format!("{}: {}", path.display(), e)))?;
        std::io::copy(&mut source, &mut zip).map_err(|e| bundle_err(e.to_string()))?;
    }

    zip.finish().map_err(|e| bundle_err(e.to_string()))?;
    info!("Bundled {} file(s) into {}", paths.len(), dest.display());
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::font::FontBook;
    use crate::render::theme::{Masthead, Theme};
    use std::io::Read;
    use std::sync::Mutex;

    fn manager(dir: &Path, bundle: bool) -> OutputManager {
        let config = PostConfig::builder()
            .output_dir(dir)
            .byline("Jane Doe")
            .theme(Theme::Headline)
            .bundle(bundle)
            .system_fonts(false)
            .build()
            .unwrap();
        let typesetter = Arc::new(Typesetter::new(FontBook::new(&[], false)));
        let mut theme = config.theme.config();
        theme.masthead = Masthead::None;
        OutputManager::new(typesetter, &config).with_theme(theme)
    }

    fn content(quotes: &[&str]) -> PostContent {
        PostContent {
            summary: "A summary.".into(),
            quotes: quotes.iter().map(|q| q.to_string()).collect(),
            caption: "Read the full story.".into(),
        }
    }

    #[tokio::test]
    async fn cards_follow_quote_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = manager(dir.path(), false);
        let paths = out
            .render_quotes(&["one".into(), "two".into(), "three".into()], "story")
            .await
            .unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["story_1.png", "story_2.png", "story_3.png"]);
        assert!(paths.iter().all(|p| p.exists()));
    }

    #[tokio::test]
    async fn caption_is_written_without_temp_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let out = manager(dir.path(), false);
        let path = out.write_caption("Caption text", "story").await.unwrap();
        assert_eq!(path, dir.path().join("story_caption.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Caption text");
        assert!(!dir.path().join("story_caption.txt.tmp").exists());
    }

    #[tokio::test]
    async fn write_bundles_cards_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let out = manager(dir.path(), true);
        let written = out.write(&content(&["a", "b"]), "story").await.unwrap();

        let bundle = written.bundle.unwrap();
        assert_eq!(bundle, dir.path().join(BUNDLE_FILE_NAME));
        let mut archive = zip::ZipArchive::new(File::open(&bundle).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut first = archive.by_name("story_1.png").unwrap();
        let mut bytes = Vec::new();
        first.read_to_end(&mut bytes).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[tokio::test]
    async fn path_like_stem_stays_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = manager(dir.path(), false);
        let written = out
            .write(&content(&["a"]), "../escaped/story")
            .await
            .unwrap();

        assert_eq!(written.images, vec![dir.path().join(".._escaped_story_1.png")]);
        assert_eq!(
            written.caption_path,
            dir.path().join(".._escaped_story_caption.txt")
        );
        assert!(written.caption_path.exists());
        assert!(!dir.path().parent().unwrap().join("escaped").exists());
    }

    #[tokio::test]
    async fn blank_stem_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let out = manager(dir.path(), false);
        let written = out.write(&content(&["a"]), "  ").await.unwrap();
        assert_eq!(written.images, vec![dir.path().join("post_1.png")]);
        assert_eq!(written.caption_path, dir.path().join("post_caption.txt"));
    }

    #[tokio::test]
    async fn no_bundle_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let out = manager(dir.path(), false);
        let written = out.write(&content(&["a"]), "story").await.unwrap();
        assert!(written.bundle.is_none());
        assert!(!dir.path().join(BUNDLE_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn every_card_is_reported() {
        #[derive(Default)]
        struct Seen(Mutex<Vec<(usize, usize)>>);
        impl crate::progress::PipelineProgressCallback for Seen {
            fn on_image_rendered(&self, index: usize, total: usize, _path: &Path) {
                self.0.lock().unwrap().push((index, total));
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Seen::default());
        let mut out = manager(dir.path(), false);
        out.progress = Some(seen.clone());
        out.render_quotes(&["a".into(), "b".into()], "s").await.unwrap();

        let mut calls = seen.0.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn bundle_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = bundle_zip(&[dir.path().join("gone.png")], &dir.path().join("x.zip")).unwrap_err();
        assert!(matches!(err, PostError::BundleFailed { .. }));
    }

    #[test]
    fn artifacts_list_cards_then_caption() {
        let output = PostOutput {
            summary: String::new(),
            quotes: vec![],
            caption: String::new(),
            images: vec!["a.png".into(), "b.png".into()],
            caption_path: "c.txt".into(),
            bundle: Some("images.zip".into()),
            stats: RunStats::default(),
        };
        let names: Vec<_> = output.artifacts().iter().map(|p| p.to_path_buf()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.png"),
                PathBuf::from("c.txt"),
                PathBuf::from("images.zip")
            ]
        );
    }
}

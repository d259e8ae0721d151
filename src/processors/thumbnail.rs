//! Image processor — verbatim copy plus a downscaled thumbnail.
//!
//! For a source `images/a.png` this produces two outputs under the build
//! root: `images/a.png` (copied) and `images/a.thumb.png` (resized with
//! Lanczos3 to a configurable width, aspect preserved). Both outputs share
//! one staleness verdict: if either is missing or older than the source,
//! both are regenerated together so they never disagree.
//!
//! Decoding and encoding are CPU-bound and run on the blocking thread pool;
//! the async worker is not held up while an image encodes.

use crate::processor::{ProcessorError, StaticProcessor};
use crate::{fsio, stale};
use async_trait::async_trait;
use image::ImageFormat;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions with decoders compiled in (see Cargo features).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

const DEFAULT_THUMB_WIDTH: u32 = 320;

pub struct ThumbnailProcessor {
    thumb_width: u32,
    content_root: PathBuf,
    build_root: PathBuf,
}

impl ThumbnailProcessor {
    pub fn new() -> Self {
        Self::with_width(DEFAULT_THUMB_WIDTH)
    }

    pub fn with_width(thumb_width: u32) -> Self {
        Self {
            thumb_width: thumb_width.max(1),
            content_root: PathBuf::new(),
            build_root: PathBuf::new(),
        }
    }

    /// `images/a.png` → `images/a.thumb.png`.
    fn thumb_rel_path(path: &str) -> PathBuf {
        let p = Path::new(path);
        let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
        let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("png");
        p.with_file_name(format!("{stem}.thumb.{ext}"))
    }

    fn format_for(path: &Path) -> Result<ImageFormat, ProcessorError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .ok_or_else(|| {
                ProcessorError::Processing(format!(
                    "no image format for extension of {}",
                    path.display()
                ))
            })
    }
}

impl Default for ThumbnailProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StaticProcessor for ThumbnailProcessor {
    fn name(&self) -> &str {
        "thumbnail"
    }

    fn matches(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }

    fn set_base_paths(&mut self, content_root: &Path, build_root: &Path) {
        self.content_root = content_root.to_path_buf();
        self.build_root = build_root.to_path_buf();
    }

    fn outputs_for(&self, path: &str) -> Vec<PathBuf> {
        vec![
            self.build_root.join(path),
            self.build_root.join(Self::thumb_rel_path(path)),
        ]
    }

    fn is_output_stale(&self, path: &str) -> bool {
        stale::outputs_stale(&self.content_root.join(path), &self.outputs_for(path))
    }

    async fn output(&self, path: &str) -> Result<Vec<PathBuf>, ProcessorError> {
        let source = self.content_root.join(path);
        if !source.exists() {
            return Err(ProcessorError::SourceNotFound(source));
        }
        let outputs = self.outputs_for(path);

        fsio::copy_atomic(&source, &outputs[0]).await?;

        let thumb_out = outputs[1].clone();
        let format = Self::format_for(&outputs[1])?;
        let width = self.thumb_width;
        let encoded = tokio::task::spawn_blocking(move || encode_thumbnail(&source, &thumb_out, width, format))
            .await
            .map_err(|e| ProcessorError::Processing(format!("thumbnail task panicked: {e}")))?;
        encoded?;

        debug!(path, thumb = %outputs[1].display(), "image processed");
        Ok(outputs)
    }
}

/// Decode, downscale, and re-encode a thumbnail. Runs on the blocking pool.
fn encode_thumbnail(
    source: &Path,
    output: &Path,
    thumb_width: u32,
    format: ImageFormat,
) -> Result<(), ProcessorError> {
    let img = image::ImageReader::open(source)?
        .decode()
        .map_err(|e| ProcessorError::Processing(format!("decode {}: {e}", source.display())))?;

    let (w, h) = (img.width(), img.height());
    let resized = if w > thumb_width {
        let target_h = ((h as f64 * thumb_width as f64 / w as f64).round() as u32).max(1);
        img.resize(thumb_width, target_h, FilterType::Lanczos3)
    } else {
        img
    };

    fsio::persist_blocking(output, |tmp| {
        // The temp path carries a .tmpN extension, so the format must be
        // passed explicitly rather than inferred from the path.
        resized
            .save_with_format(tmp, format)
            .map_err(|e| std::io::Error::other(format!("encode {}: {e}", output.display())))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_png;
    use tempfile::TempDir;

    fn make(tmp: &TempDir) -> ThumbnailProcessor {
        let mut p = ThumbnailProcessor::with_width(8);
        p.set_base_paths(&tmp.path().join("content"), &tmp.path().join("build"));
        p
    }

    #[test]
    fn matches_image_extensions_only() {
        let tmp = TempDir::new().unwrap();
        let p = make(&tmp);
        assert!(p.matches("images/a.png"));
        assert!(p.matches("images/b.JPG"));
        assert!(p.matches("c.webp"));
        assert!(!p.matches("style.css"));
        assert!(!p.matches("posts/hello.md"));
    }

    #[test]
    fn outputs_are_copy_and_thumb() {
        let tmp = TempDir::new().unwrap();
        let p = make(&tmp);
        let outputs = p.outputs_for("images/a.png");

        assert_eq!(outputs[0], tmp.path().join("build/images/a.png"));
        assert_eq!(outputs[1], tmp.path().join("build/images/a.thumb.png"));
    }

    #[tokio::test]
    async fn output_writes_both_files() {
        let tmp = TempDir::new().unwrap();
        let p = make(&tmp);
        write_png(&tmp.path().join("content"), "images/a.png", 32, 24);

        let outputs = p.output("images/a.png").await.unwrap();
        assert!(outputs[0].exists());
        assert!(outputs[1].exists());

        let thumb = image::ImageReader::open(&outputs[1])
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(thumb.width(), 8);
        assert_eq!(thumb.height(), 6);
    }

    #[tokio::test]
    async fn small_images_are_not_upscaled() {
        let tmp = TempDir::new().unwrap();
        let p = make(&tmp);
        write_png(&tmp.path().join("content"), "images/tiny.png", 4, 4);

        let outputs = p.output("images/tiny.png").await.unwrap();
        let thumb = image::ImageReader::open(&outputs[1])
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!((thumb.width(), thumb.height()), (4, 4));
    }

    #[tokio::test]
    async fn stale_when_thumb_missing_even_if_copy_exists() {
        let tmp = TempDir::new().unwrap();
        let p = make(&tmp);
        write_png(&tmp.path().join("content"), "images/a.png", 32, 24);

        p.output("images/a.png").await.unwrap();
        assert!(!p.is_output_stale("images/a.png"));

        std::fs::remove_file(tmp.path().join("build/images/a.thumb.png")).unwrap();
        assert!(p.is_output_stale("images/a.png"));
    }

    #[tokio::test]
    async fn undecodable_source_fails_without_partial_thumb() {
        let tmp = TempDir::new().unwrap();
        let p = make(&tmp);
        crate::test_helpers::write_file(&tmp.path().join("content"), "images/bad.png", b"not png");

        let err = p.output("images/bad.png").await.unwrap_err();
        assert!(matches!(err, ProcessorError::Processing(_)));
        assert!(!tmp.path().join("build/images/bad.thumb.png").exists());
    }
}

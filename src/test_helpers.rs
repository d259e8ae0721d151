//! Shared test utilities for the pressroom test suite.
//!
//! Fixture writers for source trees, mtime control for staleness tests, and
//! ready-made [`ContentItem`]/[`FormatterContext`] values so unit tests only
//! spell out what they actually vary.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

use crate::content::{ContentItem, ContentMap, StaticFileMap};
use crate::formatter::FormatterContext;
use std::sync::Arc;

// =========================================================================
// Fixture trees
// =========================================================================

/// Content and build roots under a temp directory. The content root is
/// created (config validation requires it); the build root is left to the
/// engine. Idempotent, so helpers and tests can both call it.
pub fn engine_roots(tmp: &TempDir) -> (PathBuf, PathBuf) {
    let content_root = tmp.path().join("content");
    fs::create_dir_all(&content_root).unwrap();
    (content_root, tmp.path().join("build"))
}

/// Write `bytes` to `root/rel`, creating parent directories. Returns the
/// written path.
pub fn write_file(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// Write a solid-color PNG of the given dimensions to `root/rel`.
pub fn write_png(root: &Path, rel: &str, width: u32, height: u32) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 80, 40]));
    img.save(&path).unwrap();
    path
}

// =========================================================================
// Timestamp control
// =========================================================================

/// Set a file's modification time. Staleness tests script mtimes instead of
/// sleeping between writes.
pub fn set_mtime(path: &Path, t: SystemTime) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(t).unwrap();
}

// =========================================================================
// Ready-made values
// =========================================================================

/// A content item with the last path segment as title, `last_updated` now,
/// and no source file.
pub fn content_item(path: &str, body: &str) -> ContentItem {
    let title = path.rsplit('/').next().unwrap_or(path).to_string();
    ContentItem {
        path: path.to_string(),
        title,
        body: body.to_string(),
        last_updated: SystemTime::now(),
        source: None,
    }
}

/// A formatter context with empty roots and empty maps. Tests that exercise
/// `set_parameters` replace the fields they care about.
pub fn empty_formatter_context() -> FormatterContext {
    FormatterContext {
        content_root: PathBuf::new(),
        build_root: PathBuf::new(),
        static_files: Arc::new(StaticFileMap::new()),
        content: Arc::new(ContentMap::new()),
    }
}

//! Copy-verbatim processor — the general fallback.
//!
//! Mirrors a source file to the same relative path under the build root,
//! byte for byte. Claims every path except the extensions it is told to
//! leave alone (content source files, or anything a more specific processor
//! handles), so register it last.

use crate::processor::{ProcessorError, StaticProcessor};
use crate::{fsio, stale};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CopyProcessor {
    exclude_extensions: Vec<String>,
    content_root: PathBuf,
    build_root: PathBuf,
}

impl CopyProcessor {
    pub fn new() -> Self {
        Self {
            exclude_extensions: Vec::new(),
            content_root: PathBuf::new(),
            build_root: PathBuf::new(),
        }
    }

    /// Skip files with these extensions (lowercase, without the dot).
    pub fn excluding(extensions: &[&str]) -> Self {
        Self {
            exclude_extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            content_root: PathBuf::new(),
            build_root: PathBuf::new(),
        }
    }

    fn extension_of(path: &str) -> Option<String> {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

impl Default for CopyProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StaticProcessor for CopyProcessor {
    fn name(&self) -> &str {
        "copy"
    }

    fn matches(&self, path: &str) -> bool {
        match Self::extension_of(path) {
            Some(ext) => !self.exclude_extensions.contains(&ext),
            None => true,
        }
    }

    fn set_base_paths(&mut self, content_root: &Path, build_root: &Path) {
        self.content_root = content_root.to_path_buf();
        self.build_root = build_root.to_path_buf();
    }

    fn outputs_for(&self, path: &str) -> Vec<PathBuf> {
        vec![self.build_root.join(path)]
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
        debug!(path, output = %outputs[0].display(), "copied");
        Ok(outputs)
    }
}

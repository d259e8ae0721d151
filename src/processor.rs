//! Static-asset processor trait and ordered registry.
//!
//! A [`StaticProcessor`] claims relative source paths and produces one or
//! more output files under the build root, with its own staleness test. The
//! set of processors is open: new asset kinds are added by registering
//! another implementation — the orchestrator never changes.
//!
//! # Registration order
//!
//! The registry scans processors in registration order and the first match
//! wins, so more specific processors must be registered before general
//! fallbacks (e.g. the image processor before the copy-verbatim catch-all).
//! A path no processor claims is "not a static asset", not an error.
//!
//! # Lifecycle
//!
//! Processors are constructed once, registered, and then receive their base
//! paths exactly once via [`ProcessorRegistry::set_base_paths`] before any
//! resolution. Registration after that point is a construction-time bug and
//! is rejected. Beyond the configured base paths processors hold no content
//! state.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("processing failed: {0}")]
    Processing(String),
}

/// One asset kind's processing strategy.
///
/// `output` must produce exactly the files `outputs_for` names, writing each
/// via the temp-then-rename protocol in [`crate::fsio`]. The first entry of
/// `outputs_for` is the primary artifact for the source path — the one an
/// on-demand request for that path resolves to.
#[async_trait]
pub trait StaticProcessor: Send + Sync {
    /// Stable identifier used in logs, reports, and the static-file map.
    fn name(&self) -> &str;

    /// Whether this processor claims the given relative source path.
    fn matches(&self, path: &str) -> bool;

    /// Receive the resolved content and build roots. Called exactly once,
    /// before any other per-path method.
    fn set_base_paths(&mut self, content_root: &Path, build_root: &Path);

    /// Absolute output paths this processor produces for a source path.
    fn outputs_for(&self, path: &str) -> Vec<PathBuf>;

    /// Whether any output for this path must be regenerated.
    ///
    /// Callers must never invoke [`output`](Self::output) for a path this
    /// reports fresh.
    fn is_output_stale(&self, path: &str) -> bool;

    /// Generate all outputs for the path. Returns the written paths.
    async fn output(&self, path: &str) -> Result<Vec<PathBuf>, ProcessorError>;
}

/// Ordered collection of processors with first-match routing.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn StaticProcessor>>,
    paths_set: bool,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a processor. Order is significant: first match wins.
    ///
    /// Registering after [`set_base_paths`](Self::set_base_paths) is a
    /// configuration error — the broadcast already happened and the new
    /// processor would never receive its roots.
    pub fn register(&mut self, processor: Box<dyn StaticProcessor>) -> Result<(), ProcessorError> {
        if self.paths_set {
            return Err(ProcessorError::Processing(format!(
                "processor '{}' registered after base paths were set",
                processor.name()
            )));
        }
        self.processors.push(processor);
        Ok(())
    }

    /// Broadcast the resolved roots to every registered processor. Must
    /// complete before the first resolution of the build pass.
    pub fn set_base_paths(&mut self, content_root: &Path, build_root: &Path) {
        for processor in &mut self.processors {
            processor.set_base_paths(content_root, build_root);
        }
        self.paths_set = true;
    }

    /// First processor whose `matches` accepts the path, in registration
    /// order. `None` means the path is not a static asset.
    pub fn resolve(&self, path: &str) -> Option<&dyn StaticProcessor> {
        self.processors
            .iter()
            .find(|p| p.matches(path))
            .map(|p| p.as_ref())
    }

    /// Names of all registered processors, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Mock processor that records output invocations without touching the
    /// filesystem. Staleness is scripted via `stale`. The call counter and
    /// recorded paths are behind `Arc` so tests keep a handle after the
    /// registry takes ownership of the box.
    pub struct RecordingProcessor {
        pub id: String,
        pub suffix: String,
        pub stale: bool,
        pub fail_output: bool,
        pub output_calls: Arc<AtomicUsize>,
        pub output_paths: Arc<Mutex<Vec<String>>>,
        build_root: Mutex<PathBuf>,
    }

    impl RecordingProcessor {
        pub fn new(id: &str, suffix: &str) -> Self {
            Self {
                id: id.to_string(),
                suffix: suffix.to_string(),
                stale: true,
                fail_output: false,
                output_calls: Arc::new(AtomicUsize::new(0)),
                output_paths: Arc::new(Mutex::new(Vec::new())),
                build_root: Mutex::new(PathBuf::new()),
            }
        }

        pub fn fresh(mut self) -> Self {
            self.stale = false;
            self
        }

        pub fn failing(mut self) -> Self {
            self.fail_output = true;
            self
        }

        /// Handle to the invocation counter, kept by tests across the
        /// registry's ownership of the processor.
        pub fn call_counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.output_calls)
        }

        /// Handle to the recorded output paths.
        pub fn path_log(&self) -> Arc<Mutex<Vec<String>>> {
            Arc::clone(&self.output_paths)
        }
    }

    #[async_trait]
    impl StaticProcessor for RecordingProcessor {
        fn name(&self) -> &str {
            &self.id
        }

        fn matches(&self, path: &str) -> bool {
            self.suffix.is_empty() || path.ends_with(&self.suffix)
        }

        fn set_base_paths(&mut self, _content_root: &Path, build_root: &Path) {
            *self.build_root.lock().unwrap() = build_root.to_path_buf();
        }

        fn outputs_for(&self, path: &str) -> Vec<PathBuf> {
            vec![self.build_root.lock().unwrap().join(path)]
        }

        fn is_output_stale(&self, _path: &str) -> bool {
            self.stale
        }

        async fn output(&self, path: &str) -> Result<Vec<PathBuf>, ProcessorError> {
            self.output_calls.fetch_add(1, Ordering::SeqCst);
            self.output_paths.lock().unwrap().push(path.to_string());
            if self.fail_output {
                return Err(ProcessorError::Processing(format!(
                    "scripted failure for {path}"
                )));
            }
            Ok(self.outputs_for(path))
        }
    }

    fn registry_with(processors: Vec<RecordingProcessor>) -> ProcessorRegistry {
        let mut registry = ProcessorRegistry::new();
        for p in processors {
            registry.register(Box::new(p)).unwrap();
        }
        registry
    }

    #[test]
    fn resolve_returns_first_match_in_registration_order() {
        let registry = registry_with(vec![
            RecordingProcessor::new("specific", ".png"),
            RecordingProcessor::new("fallback", ""),
        ]);

        assert_eq!(registry.resolve("images/a.png").unwrap().name(), "specific");
        assert_eq!(registry.resolve("style.css").unwrap().name(), "fallback");
    }

    #[test]
    fn resolve_order_flips_with_registration_order() {
        let registry = registry_with(vec![
            RecordingProcessor::new("fallback", ""),
            RecordingProcessor::new("specific", ".png"),
        ]);

        // The catch-all shadows the specific one — order is the caller's
        // responsibility.
        assert_eq!(registry.resolve("images/a.png").unwrap().name(), "fallback");
    }

    #[test]
    fn resolve_none_when_unclaimed() {
        let registry = registry_with(vec![RecordingProcessor::new("images", ".png")]);
        assert!(registry.resolve("notes/readme.txt").is_none());
    }

    #[test]
    fn register_after_base_paths_is_rejected() {
        let mut registry = registry_with(vec![RecordingProcessor::new("images", ".png")]);
        registry.set_base_paths(Path::new("/content"), Path::new("/build"));

        let err = registry
            .register(Box::new(RecordingProcessor::new("late", ".css")))
            .unwrap_err();
        assert!(matches!(err, ProcessorError::Processing(_)));
    }

    #[test]
    fn set_base_paths_broadcasts_to_all() {
        let mut registry = registry_with(vec![
            RecordingProcessor::new("a", ".png"),
            RecordingProcessor::new("b", ".css"),
        ]);
        registry.set_base_paths(Path::new("/content"), Path::new("/build"));

        let a = registry.resolve("x.png").unwrap();
        let b = registry.resolve("x.css").unwrap();
        assert_eq!(a.outputs_for("x.png"), vec![PathBuf::from("/build/x.png")]);
        assert_eq!(b.outputs_for("x.css"), vec![PathBuf::from("/build/x.css")]);
    }

    #[test]
    fn names_reflect_registration_order() {
        let registry = registry_with(vec![
            RecordingProcessor::new("images", ".png"),
            RecordingProcessor::new("copy", ""),
        ]);
        assert_eq!(registry.names(), vec!["images", "copy"]);
    }
}

//! Build orchestration.
//!
//! The [`BuildContext`] drives build passes over the static and content
//! source trees. Control flow is strictly pull-based: nothing is rebuilt
//! unless a pass asks, and a pass asks only when the owning processor's
//! staleness predicate says so.
//!
//! # One pass
//!
//! ```text
//! Enumerate → for each static path:   Match → CheckStale → [Skip | Output]
//!           → for each content item:  Render → FormatChain → Write
//! ```
//!
//! Per-path work is independent and fans out over a bounded worker pool;
//! within one path the stages run strictly in sequence. No state is
//! retained between passes beyond the output files themselves — staleness
//! is re-derived from filesystem metadata each time, so a steady-state pass
//! costs only `stat` calls.
//!
//! # Failure isolation
//!
//! A path's failure never aborts the pass. Each failure is logged, recorded
//! against its path in the [`BuildReport`], and the pass moves on.
//! Configuration problems, by contrast, are fatal at construction.
//!
//! # Modes
//!
//! In live mode content items always re-render (rendering is cheap; the
//! static-asset side carries the cache). In export mode content writes are
//! gated on the output file's mtime vs the item's `last_updated`, so a
//! no-change export is a no-op.

use crate::config::{BuildMode, EngineConfig, FormatterFailurePolicy};
use crate::content::{ContentEntry, ContentMap, StaticFileMap};
use crate::formatter::{ContentFormatter, FormatterChain, FormatterContext};
use crate::processor::ProcessorRegistry;
use crate::report::{BuildReport, PathOutcome};
use crate::{fsio, stale};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("build failed for '{path}': {message}")]
    Build { path: String, message: String },
}

/// Typed result of an on-demand [`BuildContext::build_one`] request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOneOutcome {
    /// The artifact is in place (freshly built or already fresh).
    Artifact(PathBuf),
    /// Nothing claims the path — the serving layer's 404.
    NotFound,
}

/// Walk `root` for source files in sorted order, pruning hidden entries.
///
/// Pruning happens at directory level: a dot-directory (`.git`, `.cache`)
/// is never descended into, so nothing under it can reach a processor. The
/// root itself is exempt — temp directories often carry a dot name.
pub fn walk_source_files(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
}

/// Cooperative cancellation for a build pass.
///
/// Cancelling stops the pass from issuing new per-path work; pipelines
/// already in flight run to completion. Outputs are temp-written and
/// renamed, so cancellation never leaves a partial artifact.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one build generation needs: validated config, the processor
/// registry with base paths broadcast, the composed formatter chain, and
/// the read-only content and static-file snapshots.
///
/// Explicitly constructed and passed down — no process-wide singletons, so
/// multiple contexts (tests, side-by-side generations) coexist freely.
pub struct BuildContext {
    config: EngineConfig,
    registry: ProcessorRegistry,
    chain: FormatterChain,
    content: Arc<ContentMap>,
    static_files: Arc<StaticFileMap>,
    /// Source files behind content items, excluded from static enumeration.
    content_sources: BTreeSet<PathBuf>,
}

impl BuildContext {
    /// Validate the config, broadcast base paths to every processor, and
    /// compose the formatter chain (broadcasting `set_parameters` in
    /// registration order). All of this completes before the first
    /// `output`/`format_html` call of any pass.
    pub fn new(
        config: EngineConfig,
        mut registry: ProcessorRegistry,
        formatters: Vec<Box<dyn ContentFormatter>>,
        content: ContentMap,
        static_files: StaticFileMap,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        std::fs::create_dir_all(&config.build_root)?;

        registry.set_base_paths(&config.content_root, &config.build_root);

        let content = Arc::new(content);
        let static_files = Arc::new(static_files);
        let chain = FormatterChain::compose(
            formatters,
            &FormatterContext {
                content_root: config.content_root.clone(),
                build_root: config.build_root.clone(),
                static_files: Arc::clone(&static_files),
                content: Arc::clone(&content),
            },
        );

        let content_sources = content
            .values()
            .filter_map(|entry| entry.item.source.clone())
            .collect();

        Ok(Self {
            config,
            registry,
            chain,
            content,
            static_files,
            content_sources,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn static_files(&self) -> &StaticFileMap {
        &self.static_files
    }

    /// Run one exhaustive pass over every static path and content item.
    pub async fn build_all(&self, cancel: &CancelFlag) -> BuildReport {
        let limit = self.config.effective_concurrency();
        let mut report = BuildReport::new();

        let static_paths = self.enumerate_static_paths();
        let static_outcomes: Vec<(String, PathOutcome)> = stream::iter(static_paths)
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|rel| async move { self.build_static_path(&rel).await })
            .buffer_unordered(limit)
            .collect()
            .await;
        for (path, outcome) in static_outcomes {
            report.record(path, outcome);
        }

        let items: Vec<(String, ContentEntry)> = self
            .content
            .iter()
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect();
        let content_outcomes: Vec<(String, PathOutcome)> = stream::iter(items)
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|(path, entry)| async move {
                let outcome = self.build_content_item(&path, &entry).await;
                (path, outcome)
            })
            .buffer_unordered(limit)
            .collect()
            .await;
        for (path, outcome) in content_outcomes {
            report.record(path, outcome);
        }

        if cancel.is_cancelled() {
            warn!(
                completed = report.outcomes.len(),
                "build pass cancelled; in-flight paths completed, rest skipped"
            );
        }
        info!(
            built = report.built(),
            skipped = report.skipped(),
            failed = report.failed(),
            unclaimed = report.unclaimed(),
            "build pass complete"
        );
        report
    }

    /// Build (or verify fresh) a single requested path — the on-demand
    /// entry point used by a serving layer. The artifact reference comes
    /// back typed: ready, not found, or a build error for this path.
    pub async fn build_one(&self, path: &str) -> Result<BuildOneOutcome, EngineError> {
        if let Some(entry) = self.content.get(path) {
            let entry = entry.clone();
            return match self.build_content_item(path, &entry).await {
                PathOutcome::Failed { error } => Err(EngineError::Build {
                    path: path.to_string(),
                    message: error,
                }),
                _ => Ok(BuildOneOutcome::Artifact(self.content_output_path(path))),
            };
        }

        let Some(processor) = self.registry.resolve(path) else {
            return Ok(BuildOneOutcome::NotFound);
        };
        // Built or fresh either way, the primary artifact is the first
        // output the owning processor declares.
        let artifact = processor
            .outputs_for(path)
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Build {
                path: path.to_string(),
                message: format!("processor '{}' declares no outputs", processor.name()),
            })?;

        match self.build_static_path(path).await {
            (_, PathOutcome::Failed { error }) => Err(EngineError::Build {
                path: path.to_string(),
                message: error,
            }),
            (_, _) => Ok(BuildOneOutcome::Artifact(artifact)),
        }
    }

    /// Relative static source paths in deterministic (sorted) order,
    /// excluding content source files and hidden entries.
    fn enumerate_static_paths(&self) -> Vec<String> {
        walk_source_files(&self.config.content_root)
            .filter_map(|entry| {
                let rel = entry
                    .path()
                    .strip_prefix(&self.config.content_root)
                    .ok()?
                    .to_path_buf();
                if rel == Path::new("pressroom.toml") || self.content_sources.contains(&rel) {
                    return None;
                }
                Some(rel.to_string_lossy().into_owned())
            })
            .collect()
    }

    async fn build_static_path(&self, rel: &str) -> (String, PathOutcome) {
        let Some(processor) = self.registry.resolve(rel) else {
            debug!(path = rel, "no processor claims path");
            return (rel.to_string(), PathOutcome::Unclaimed);
        };

        if !processor.is_output_stale(rel) {
            return (rel.to_string(), PathOutcome::Skipped);
        }

        match processor.output(rel).await {
            Ok(outputs) => {
                debug!(path = rel, processor = processor.name(), "regenerated");
                (rel.to_string(), PathOutcome::Built { outputs })
            }
            Err(e) => {
                error!(path = rel, processor = processor.name(), error = %e, "output failed");
                (
                    rel.to_string(),
                    PathOutcome::Failed {
                        error: e.to_string(),
                    },
                )
            }
        }
    }

    fn content_output_path(&self, path: &str) -> PathBuf {
        self.config.build_root.join(path).join("index.html")
    }

    async fn build_content_item(&self, path: &str, entry: &ContentEntry) -> PathOutcome {
        let output = self.content_output_path(path);

        if self.config.mode == BuildMode::Export
            && stale::output_fresh_since(&output, entry.item.last_updated)
        {
            return PathOutcome::Skipped;
        }

        let rendered = match entry.controller.render(&entry.item).await {
            Ok(html) => html,
            Err(e) => {
                error!(path, error = %e, "render failed");
                return PathOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match self.chain.format(rendered.clone(), path).await {
            Ok(html) => match fsio::write_atomic(&output, html.as_bytes()).await {
                Ok(()) => PathOutcome::Built {
                    outputs: vec![output],
                },
                Err(e) => {
                    error!(path, error = %e, "output write failed");
                    PathOutcome::Failed {
                        error: format!("write failed: {e}"),
                    }
                }
            },
            Err(e) => {
                warn!(path, formatter = %e.formatter, error = %e, "formatter failed");
                match self.config.formatter_failures {
                    FormatterFailurePolicy::FailItem => PathOutcome::Failed {
                        error: e.to_string(),
                    },
                    FormatterFailurePolicy::ServeUnformatted => {
                        match fsio::write_atomic(&output, rendered.as_bytes()).await {
                            Ok(()) => {
                                warn!(path, "serving unformatted HTML");
                                PathOutcome::UnformattedFallback {
                                    output,
                                    formatter: e.formatter,
                                }
                            }
                            Err(write_err) => PathOutcome::Failed {
                                error: format!("write failed: {write_err}"),
                            },
                        }
                    }
                }
            }
        }
    }
}

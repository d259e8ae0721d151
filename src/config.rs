//! Engine configuration.
//!
//! One flat, validated struct. The roots are set once at process start and
//! broadcast to every processor and formatter; everything that can be wrong
//! with the configuration is wrong before the first path is built, so
//! validation failures are fatal at construction, never mid-pass.
//!
//! The CLI layers an optional `pressroom.toml` under its flags; embedders
//! construct [`EngineConfig`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("content root {0} does not exist or is not a directory")]
    MissingContentRoot(PathBuf),
    #[error("build root is empty")]
    EmptyBuildRoot,
    #[error("build root {0} is inside the content root")]
    BuildRootInsideContent(PathBuf),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// How a build pass is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    /// Build once to a static tree. Content writes are gated by the output
    /// mtime vs the item's last-updated timestamp.
    Export,
    /// Build-on-demand inside a serving process. Content always re-renders
    /// (rendering is cheap; the static-asset side carries the cache).
    Live,
}

/// What to do when a formatter fails for one content item.
///
/// Either way the failure is logged with the formatter's identity and the
/// content path — the policy is explicit, never silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FormatterFailurePolicy {
    /// The item's build fails; siblings proceed.
    #[default]
    FailItem,
    /// Write the pre-chain HTML and record a warning outcome.
    ServeUnformatted,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Absolute root of source content. Processors read from here only.
    pub content_root: PathBuf,
    /// Absolute root of generated output. Processors write under here only;
    /// writing outside it is a defect.
    pub build_root: PathBuf,
    /// Upper bound on concurrent per-path pipelines.
    pub concurrency: usize,
    pub mode: BuildMode,
    pub formatter_failures: FormatterFailurePolicy,
}

impl EngineConfig {
    pub fn new(content_root: impl Into<PathBuf>, build_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            build_root: build_root.into(),
            concurrency: default_concurrency(),
            mode: BuildMode::Export,
            formatter_failures: FormatterFailurePolicy::default(),
        }
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn formatter_failures(mut self, policy: FormatterFailurePolicy) -> Self {
        self.formatter_failures = policy;
        self
    }

    /// Validate roots. Called by the engine at construction; failures here
    /// are fatal before any path is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.content_root.is_dir() {
            return Err(ConfigError::MissingContentRoot(self.content_root.clone()));
        }
        if self.build_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyBuildRoot);
        }
        if self.build_root.starts_with(&self.content_root) {
            return Err(ConfigError::BuildRootInsideContent(self.build_root.clone()));
        }
        Ok(())
    }

    /// Concurrency clamped to at least one worker.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Default worker count: the machine's parallelism, capped at 8 — per-path
/// work is I/O-heavy and more workers mostly add contention.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(8)
}

/// Optional `pressroom.toml` the CLI layers under its flags.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub concurrency: Option<usize>,
    pub mode: Option<BuildMode>,
    pub formatter_failures: Option<FormatterFailurePolicy>,
    /// Width of generated image thumbnails in pixels.
    pub thumbnail_width: Option<u32>,
}

impl FileConfig {
    /// Load from `<content_root>/pressroom.toml` if present.
    pub fn load(content_root: &Path) -> Result<Self, ConfigError> {
        let path = content_root.join("pressroom.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Apply file values onto a config built from CLI defaults. Explicitly
    /// set CLI flags win and are applied after this.
    pub fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(policy) = self.formatter_failures {
            config.formatter_failures = policy;
        }
        config
    }
}

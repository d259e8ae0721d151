//! HTML post-processing formatters and their composition.
//!
//! A [`ContentFormatter`] receives fully rendered HTML plus a
//! content-addressing context and returns transformed HTML. Formatters are
//! independent plugins (link rewriter, anchor injector, highlighter, ...)
//! composed into one pipeline by [`FormatterChain`]: the output of formatter
//! *i* is the input of formatter *i+1*, left to right.
//!
//! # Contract
//!
//! Formatters must be pure functions of `(html, path, the shared read-only
//! maps)` — ordering among formatters is exactly the registration order and
//! nothing else, so mutating shared state visible to a sibling would make
//! results order-dependent in unspecified ways. `format_html` may be called
//! concurrently across different paths; calls for a single path run
//! strictly in sequence through the chain.
//!
//! [`ContentFormatter::set_parameters`] is called once per formatter, in
//! registration order, during [`FormatterChain::compose`] — before any
//! `format_html` of the build pass. Formatters without setup needs keep the
//! default no-op.

use crate::content::{ContentMap, StaticFileMap};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A formatter failure, tagged with the formatter's identity and the
/// content path so per-item reporting can name the culprit.
#[derive(Error, Debug)]
#[error("formatter '{formatter}' failed for '{path}': {message}")]
pub struct FormatterError {
    pub formatter: String,
    pub path: String,
    pub message: String,
}

impl FormatterError {
    pub fn new(
        formatter: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            formatter: formatter.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The shared, immutable context every formatter's setup step receives.
///
/// One named struct rather than a growing ad-hoc parameter list; formatters
/// that need a subset simply ignore the rest.
#[derive(Clone)]
pub struct FormatterContext {
    pub content_root: PathBuf,
    pub build_root: PathBuf,
    pub static_files: Arc<StaticFileMap>,
    pub content: Arc<ContentMap>,
}

/// One step of the HTML post-processing pipeline.
#[async_trait]
pub trait ContentFormatter: Send + Sync {
    /// Stable identifier used to tag failures.
    fn name(&self) -> &str;

    /// Receive the resolved build context. Called once, before any
    /// `format_html` of the pass. Optional — stateless formatters keep the
    /// default.
    fn set_parameters(&mut self, _ctx: &FormatterContext) {}

    /// Transform rendered HTML for one content path.
    async fn format_html(&self, html: String, path: &str) -> Result<String, FormatterError>;
}

/// Ordered composition of formatters into a single post-processing step.
///
/// Derived from the formatter list, not stored independently — rebuilt
/// whenever the list changes, which in practice is once at process start.
pub struct FormatterChain {
    formatters: Vec<Box<dyn ContentFormatter>>,
}

impl FormatterChain {
    /// Compose an ordered formatter list, broadcasting `set_parameters` to
    /// each formatter in registration order.
    pub fn compose(mut formatters: Vec<Box<dyn ContentFormatter>>, ctx: &FormatterContext) -> Self {
        for formatter in &mut formatters {
            formatter.set_parameters(ctx);
        }
        Self { formatters }
    }

    /// An empty chain: the identity transform.
    pub fn empty() -> Self {
        Self {
            formatters: Vec::new(),
        }
    }

    /// Run the full chain for one path. Strictly sequential: formatter
    /// *i+1* only ever sees HTML that formatter *i* has finished.
    pub async fn format(&self, html: String, path: &str) -> Result<String, FormatterError> {
        let mut current = html;
        for formatter in &self.formatters {
            current = formatter.format_html(current, path).await?;
        }
        Ok(current)
    }
}

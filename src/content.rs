//! Content and static-file maps supplied by the surrounding CMS.
//!
//! The build engine does not know how content is authored or stored. Per
//! build pass the external content subsystem hands it two read-only
//! snapshots:
//!
//! - a [`ContentMap`] from logical path to ([`ContentItem`], controller able
//!   to render it to raw HTML), and
//! - a [`StaticFileMap`] from relative source path to processor metadata,
//!   used by formatters that need to resolve sibling asset URLs.
//!
//! Both are `BTreeMap`s so every observable iteration order is
//! deterministic. The engine only reads them; the collaborator is the only
//! writer, and a snapshot published mid-pass is picked up on the next pass.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("rendering '{path}' failed: {message}")]
pub struct RenderError {
    pub path: String,
    pub message: String,
}

impl RenderError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// One authored item (post, article, page) as resolved by the content
/// subsystem.
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// Logical path, e.g. `posts/hello`. Unique; the output lands at
    /// `<build_root>/<path>/index.html`.
    pub path: String,
    pub title: String,
    /// Authored body in whatever source format the controller renders.
    pub body: String,
    /// When the item was last edited. Gates regeneration in export mode.
    pub last_updated: SystemTime,
    /// Source file behind this item, relative to the content root, if it
    /// has one. Lets the orchestrator exclude it from static enumeration.
    pub source: Option<PathBuf>,
}

/// Renders a content item to raw HTML. The engine never inspects the source
/// format — that is entirely the controller's business.
#[async_trait]
pub trait ContentController: Send + Sync {
    async fn render(&self, item: &ContentItem) -> Result<String, RenderError>;
}

/// A content item paired with its controller.
#[derive(Clone)]
pub struct ContentEntry {
    pub item: ContentItem,
    pub controller: Arc<dyn ContentController>,
}

/// Logical path → content entry. Read-only snapshot for one build pass.
pub type ContentMap = BTreeMap<String, ContentEntry>;

/// Metadata the static-file collaborator publishes per registered path.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StaticFileEntry {
    /// Name of the processor that claims this path.
    pub processor: String,
}

/// Relative source path → processor metadata. Read-only snapshot for one
/// build pass; formatters use it to resolve sibling asset URLs.
pub type StaticFileMap = BTreeMap<String, StaticFileEntry>;

/// Controller for markdown-authored items.
///
/// Renders the item body with pulldown-cmark. Suits the common case where
/// the CMS stores posts as markdown and everything else (templating, chrome)
/// happens outside the engine.
pub struct MarkdownController;

#[async_trait]
impl ContentController for MarkdownController {
    async fn render(&self, item: &ContentItem) -> Result<String, RenderError> {
        let parser = pulldown_cmark::Parser::new(&item.body);
        let mut html = String::with_capacity(item.body.len() * 2);
        pulldown_cmark::html::push_html(&mut html, parser);
        Ok(html)
    }
}

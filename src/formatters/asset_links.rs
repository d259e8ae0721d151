//! Asset link rewriter.
//!
//! Authored HTML refers to static assets by their source-relative path
//! (`src="images/a.png"`). Content pages are written to nested directories
//! (`posts/hello/index.html`), so those relative references would break.
//! This formatter rewrites `src`/`href` values that name a known static
//! file — one present in the static-file map — to root-relative form
//! (`/images/a.png`). Unknown targets, absolute paths, fragments, and URLs
//! with a scheme are left untouched.

use crate::content::StaticFileMap;
use crate::formatter::{ContentFormatter, FormatterContext, FormatterError};
use async_trait::async_trait;
use std::sync::Arc;

pub struct AssetLinkFormatter {
    static_files: Arc<StaticFileMap>,
}

impl AssetLinkFormatter {
    pub fn new() -> Self {
        Self {
            static_files: Arc::new(StaticFileMap::new()),
        }
    }

    fn should_rewrite(&self, value: &str) -> bool {
        if value.is_empty()
            || value.starts_with('/')
            || value.starts_with('#')
            || value.contains("://")
            || value.starts_with("mailto:")
            || value.starts_with("data:")
        {
            return false;
        }
        self.static_files.contains_key(value)
    }

    /// Rewrite matching `src="..."` / `href="..."` values in place.
    fn rewrite(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len() + 16);
        let mut rest = html;

        while let Some(value_start) = find_attr(rest) {
            let (before, after) = rest.split_at(value_start);
            out.push_str(before);
            // after starts right after the opening quote
            match after.find('"') {
                Some(end) => {
                    let value = &after[..end];
                    if self.should_rewrite(value) {
                        out.push('/');
                    }
                    out.push_str(value);
                    out.push('"');
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(after);
                    return out;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Offset just past the opening quote of the next whole `src="` or
/// `href="` attribute. Returns `None` when neither occurs.
fn find_attr(html: &str) -> Option<usize> {
    match (
        find_whole_attr(html, "src=\""),
        find_whole_attr(html, "href=\""),
    ) {
        (Some(s), Some(h)) => Some(s.min(h)),
        (Some(s), None) => Some(s),
        (None, Some(h)) => Some(h),
        (None, None) => None,
    }
}

/// Like `str::find`, but the attribute name must start a whole attribute:
/// the preceding character is whitespace, so `data-src=` never matches.
/// Single-quoted attributes are not handled — pulldown-cmark output always
/// double-quotes.
fn find_whole_attr(html: &str, attr: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = html[from..].find(attr) {
        let start = from + pos;
        let bounded = html[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_whitespace());
        if bounded {
            return Some(start + attr.len());
        }
        from = start + attr.len();
    }
    None
}

impl Default for AssetLinkFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFormatter for AssetLinkFormatter {
    fn name(&self) -> &str {
        "asset-links"
    }

    fn set_parameters(&mut self, ctx: &FormatterContext) {
        self.static_files = Arc::clone(&ctx.static_files);
    }

    async fn format_html(&self, html: String, _path: &str) -> Result<String, FormatterError> {
        Ok(self.rewrite(&html))
    }
}

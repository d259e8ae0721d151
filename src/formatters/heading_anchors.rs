//! Heading anchor injector.
//!
//! Gives attribute-less `<h2>`/`<h3>` headings a slug `id` so section links
//! (`posts/hello#setup`) work without the author hand-writing anchors.
//! Headings that already carry attributes are left alone — the author knew
//! what they wanted.

use crate::formatter::{ContentFormatter, FormatterError};
use async_trait::async_trait;

pub struct HeadingAnchorFormatter;

/// Lowercase, alphanumerics kept, everything else collapsed to single
/// dashes. `"Getting Started!"` → `"getting-started"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Strip inline tags from heading content so the slug reflects the text.
fn text_content(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn inject(html: &str, level: u8) -> String {
    let open = format!("<h{level}>");
    let close = format!("</h{level}>");
    let mut out = String::with_capacity(html.len() + 32);
    let mut rest = html;

    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        let Some(end) = after_open.find(&close) else {
            break;
        };
        let inner = &after_open[..end];
        let slug = slugify(&text_content(inner));

        out.push_str(&rest[..start]);
        if slug.is_empty() {
            out.push_str(&open);
        } else {
            out.push_str(&format!("<h{level} id=\"{slug}\">"));
        }
        out.push_str(inner);
        out.push_str(&close);
        rest = &after_open[end + close.len()..];
    }
    out.push_str(rest);
    out
}

#[async_trait]
impl ContentFormatter for HeadingAnchorFormatter {
    fn name(&self) -> &str {
        "heading-anchors"
    }

    async fn format_html(&self, html: String, _path: &str) -> Result<String, FormatterError> {
        let mut out = inject(&html, 2);
        out = inject(&out, 3);
        Ok(out)
    }
}

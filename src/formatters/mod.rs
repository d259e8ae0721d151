//! Built-in content formatters.

pub mod asset_links;
pub mod heading_anchors;

pub use asset_links::AssetLinkFormatter;
pub use heading_anchors::HeadingAnchorFormatter;

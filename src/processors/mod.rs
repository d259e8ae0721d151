//! Built-in static processors.
//!
//! Registration order matters: [`ThumbnailProcessor`] claims image
//! extensions and must come before the [`CopyProcessor`] catch-all.

pub mod copy;
pub mod thumbnail;

pub use copy::CopyProcessor;
pub use thumbnail::ThumbnailProcessor;

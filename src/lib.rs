//! # Pressroom
//!
//! An incremental build engine for static content: the rendering backbone of
//! a filesystem-backed CMS. Source files go in, a published tree comes out,
//! and on every pass after the first only what changed gets rebuilt.
//!
//! # Architecture: One Pass, Two Pipelines
//!
//! A build pass walks two collections and fans the work out over a bounded
//! pool of per-path pipelines:
//!
//! ```text
//! static path   →  Match → CheckStale → [Skip | Output]
//! content item  →  Render → FormatChain → Write
//! ```
//!
//! This shape exists for three reasons:
//!
//! - **Incrementality without bookkeeping**: staleness is an mtime
//!   comparison between each source and its outputs, re-derived every pass.
//!   There is no manifest or cache database to corrupt, migrate, or explain.
//! - **Open extension**: new asset kinds are a new [`processor::StaticProcessor`];
//!   new HTML transforms are a new [`formatter::ContentFormatter`]. The
//!   orchestrator in [`engine`] never changes.
//! - **Failure isolation**: each path's pipeline succeeds or fails alone and
//!   the pass reports all outcomes in a [`report::BuildReport`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Build orchestration — `build_all` passes, on-demand `build_one`, cancellation |
//! | [`processor`] | `StaticProcessor` trait and the ordered first-match registry |
//! | [`processors`] | Built-in processors: copy-verbatim and image thumbnails |
//! | [`formatter`] | `ContentFormatter` trait and sequential chain composition |
//! | [`formatters`] | Built-in formatters: asset link rewriting, heading anchors |
//! | [`content`] | Content items, the rendering controller trait, markdown rendering |
//! | [`stale`] | The mtime staleness predicates everything else leans on |
//! | [`fsio`] | Atomic output writes: temp sibling, rename, one retry |
//! | [`report`] | Per-pass outcome aggregation, display and JSON |
//! | [`config`] | Engine configuration, validation, optional `pressroom.toml` |
//!
//! # Design Decisions
//!
//! ## Mtime Staleness, Not Content Hashing
//!
//! A source is stale when any of its outputs is missing or older than it.
//! That is the whole cache. Mtimes are free (`stat`), survive restarts, and
//! are wrong only in ways that cause harmless extra rebuilds. A stat failure
//! is treated as stale for the same reason: rebuilding unnecessarily is
//! cheap, serving stale output silently is not.
//!
//! ## Atomic Outputs
//!
//! Every artifact is written to a temp sibling and renamed into place, so a
//! concurrently-serving process never observes a half-written file and a
//! cancelled or crashed pass never leaves one behind. See [`fsio`].
//!
//! ## Deterministic Passes
//!
//! Enumeration is sorted and all observable collections are `BTreeMap`s, so
//! two passes over the same tree do the same work in the same order and
//! produce identical reports. Concurrency changes completion order, never
//! outcomes.
//!
//! ## Async Fan-Out, Bounded
//!
//! Per-path pipelines are independent, so a pass streams them through a
//! `buffer_unordered` pool. The bound is configuration
//! ([`config::EngineConfig::concurrency`]), defaulting to the machine's
//! parallelism capped at 8 — the work is I/O-heavy and more workers mostly
//! add contention. CPU-bound image encoding hops to a blocking thread.

pub mod config;
pub mod content;
pub mod engine;
pub mod formatter;
pub mod formatters;
pub mod fsio;
pub mod processor;
pub mod processors;
pub mod report;
pub mod stale;

#[cfg(test)]
pub(crate) mod test_helpers;

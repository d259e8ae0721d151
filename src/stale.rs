//! Staleness determination for build artifacts.
//!
//! An output is stale when it must be regenerated: it is missing, or its
//! modification time is older than its source's. There is no manifest or
//! database — the filesystem's own metadata is the single source of truth,
//! so a steady-state pass over a fresh tree costs only `stat` calls.
//!
//! # Policy
//!
//! - Output file missing → stale.
//! - Output mtime older than source mtime → stale. Equal mtimes count as
//!   fresh, so a build completed within the same clock tick is not redone.
//! - Source file missing (deleted since it was catalogued) → stale. The
//!   engine never deletes orphans itself; a higher layer decides.
//! - Any I/O error while statting → assume stale and log a warning. It is
//!   safer to rebuild than to silently serve an outdated artifact.
//!
//! A processor that produces several outputs from one input is stale if
//! *any* of its outputs is stale — all outputs of one source regenerate
//! together so they stay mutually consistent.

use std::path::Path;
use std::time::SystemTime;
use tracing::warn;

/// Modification time of a file, or `None` if it cannot be statted.
///
/// Distinguishing "missing" from "unreadable" doesn't change the verdict
/// (both mean rebuild), but unreadable paths are worth a log line.
fn mtime(path: &Path) -> Option<SystemTime> {
    match std::fs::metadata(path) {
        Ok(meta) => match meta.modified() {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "mtime unavailable, assuming stale");
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "stat failed, assuming stale");
            None
        }
    }
}

/// Authoritative staleness predicate for one source and its outputs.
///
/// Returns `true` if any output must be regenerated. Callers must never
/// regenerate when this returns `false`.
pub fn outputs_stale(source: &Path, outputs: &[impl AsRef<Path>]) -> bool {
    let Some(source_time) = mtime(source) else {
        // Source deleted or unreadable: report stale so a higher layer can
        // decide what to do with the orphaned outputs.
        return true;
    };

    outputs.iter().any(|out| {
        let out = out.as_ref();
        match mtime(out) {
            Some(out_time) => out_time < source_time,
            None => true,
        }
    })
}

/// Freshness gate for a rendered content item in export mode.
///
/// The output is fresh when it exists and was written at or after the
/// item's `last_updated` timestamp.
pub fn output_fresh_since(output: &Path, last_updated: SystemTime) -> bool {
    match mtime(output) {
        Some(out_time) => out_time >= last_updated,
        None => false,
    }
}

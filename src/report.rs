//! Per-build reporting.
//!
//! Failures are isolated per path: no single path aborts a pass, so every
//! pass produces a full report of what was built, skipped, and broken. The
//! report is the caller's view of partial failure — serializable for the
//! surrounding CMS, displayable for humans.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// What happened to one source path during a pass.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PathOutcome {
    /// Regenerated; lists the written artifacts.
    Built { outputs: Vec<PathBuf> },
    /// Fresh — the staleness predicate said no work was needed.
    Skipped,
    /// No processor or content controller claimed the path.
    Unclaimed,
    /// The path's pipeline failed; siblings were unaffected.
    Failed { error: String },
    /// A formatter failed and policy chose to serve the unformatted HTML.
    UnformattedFallback { output: PathBuf, formatter: String },
}

/// Aggregated outcomes of one build pass, keyed by source path.
#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    pub outcomes: BTreeMap<String, PathOutcome>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: impl Into<String>, outcome: PathOutcome) {
        self.outcomes.insert(path.into(), outcome);
    }

    pub fn built(&self) -> usize {
        self.count(|o| matches!(o, PathOutcome::Built { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PathOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PathOutcome::Failed { .. }))
    }

    pub fn unclaimed(&self) -> usize {
        self.count(|o| matches!(o, PathOutcome::Unclaimed))
    }

    pub fn fallbacks(&self) -> usize {
        self.count(|o| matches!(o, PathOutcome::UnformattedFallback { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    /// Paths that failed, with their error strings, in path order.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(path, o)| match o {
                PathOutcome::Failed { error } => Some((path.as_str(), error.as_str())),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&PathOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} built, {} skipped, {} failed ({} paths)",
            self.built(),
            self.skipped(),
            self.failed(),
            self.outcomes.len()
        )?;
        if self.fallbacks() > 0 {
            write!(f, ", {} served unformatted", self.fallbacks())?;
        }
        Ok(())
    }
}

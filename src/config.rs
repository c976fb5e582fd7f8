//! Run configuration.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::corpus::DocumentFilter;
use crate::pattern::MatchMode;
use crate::{Error, Result};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_DOCUMENT_EXTENSIONS: &[&str] = &[".nq"];
pub const DEFAULT_QUERY_EXTENSIONS: &[&str] = &[".sparql", ".rq"];
pub const DEFAULT_QUERY_EXCLUSIONS: &[&str] = &["complex"];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Split a comma-separated list, dropping empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ============================================================================
// RecapConfig
// ============================================================================

/// Everything one pattern-selectivity run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecapConfig {
    /// Corpus root; each top-level directory is a partition.
    pub pods: PathBuf,
    /// Directory of query files.
    pub queries: PathBuf,
    /// Document extensions, e.g. `.nq`.
    pub extensions: Vec<String>,
    pub query_extensions: Vec<String>,
    /// Query files whose name contains any of these are skipped.
    pub exclusions: Vec<String>,
    pub match_mode: MatchMode,
    pub use_predicate_index: bool,
    /// Worker threads for the scan. Partitions are the unit of work.
    pub jobs: NonZeroUsize,
}

impl RecapConfig {
    pub fn new(pods: impl Into<PathBuf>, queries: impl Into<PathBuf>) -> Self {
        Self {
            pods: pods.into(),
            queries: queries.into(),
            extensions: owned(DEFAULT_DOCUMENT_EXTENSIONS),
            query_extensions: owned(DEFAULT_QUERY_EXTENSIONS),
            exclusions: owned(DEFAULT_QUERY_EXCLUSIONS),
            match_mode: MatchMode::default(),
            use_predicate_index: true,
            jobs: NonZeroUsize::MIN,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<String>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_predicate_index(mut self, enabled: bool) -> Self {
        self.use_predicate_index = enabled;
        self
    }

    pub fn with_jobs(mut self, jobs: NonZeroUsize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Document filter for the configured extensions.
    pub fn document_filter(&self) -> Result<DocumentFilter> {
        DocumentFilter::from_extensions(&self.extensions)
    }

    /// Check everything that can be checked before any query or corpus I/O.
    pub fn validate(&self) -> Result<()> {
        if !self.pods.is_dir() {
            return Err(Error::Config(format!("Pods path {} is not a directory", self.pods.display())));
        }
        if !self.queries.is_dir() {
            return Err(Error::Config(format!("Queries path {} is not a directory", self.queries.display())));
        }
        if self.query_extensions.is_empty() {
            return Err(Error::Config("At least one query extension is required".into()));
        }
        self.document_filter().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RecapConfig::new("pods", "queries");
        assert_eq!(config.extensions, [".nq"]);
        assert_eq!(config.query_extensions, [".sparql", ".rq"]);
        assert_eq!(config.exclusions, ["complex"]);
        assert_eq!(config.match_mode, MatchMode::Approximate);
        assert_eq!(config.jobs.get(), 1);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(".nq, .nt,,"), [".nq", ".nt"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_validate() {
        let dir = TempDir::new().unwrap();
        let config = RecapConfig::new(dir.path(), dir.path());
        assert!(config.validate().is_ok());

        let bad_ext = config.clone().with_extensions(vec![".ttl".into()]);
        assert!(matches!(bad_ext.validate(), Err(Error::Config(_))));

        let missing = RecapConfig::new(dir.path().join("nope"), dir.path());
        assert!(matches!(missing.validate(), Err(Error::Config(_))));
    }
}

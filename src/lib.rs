//! # sparql-selectivity — Triple Pattern Selectivity for SPARQL Benchmarks
//!
//! Extracts every triple pattern from a benchmark's queries, deduplicates
//! them, and counts how many triples, documents and partitions of a
//! partitioned RDF corpus each pattern matches.
//!
//! ## Design Principles
//!
//! 1. **Two phases**: the pattern registry is built completely before any corpus I/O
//! 2. **Structural identity**: patterns differing only in variable or blank-node names are one entry
//! 3. **Parser owns nothing**: SPARQL → algebra is a pure function
//! 4. **Single-hop matching**: a data triple is tested on its own, never joined
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sparql_selectivity::{analyze, RecapConfig, ReportFormat};
//!
//! # fn example() -> sparql_selectivity::Result<()> {
//! let config = RecapConfig::new("solidbench/pods", "solidbench/queries");
//! let report = analyze(&config)?;
//!
//! for row in &report.rows {
//!     println!("{} matches {} of {} triples", row.pattern, row.matching_triples, row.total_triples);
//! }
//! report.write_to("patterns.tsv".as_ref(), ReportFormat::Tsv)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Match Modes
//!
//! | Mode | Description |
//! |------|-------------|
//! | `approximate` (default) | A path matches any predicate it mentions |
//! | `strict` | Single-hop witness of the path, honouring direction and negation |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod sparql;
pub mod rdf;
pub mod pattern;
pub mod query;
pub mod corpus;
pub mod report;
pub mod config;

use std::path::PathBuf;

use tracing::info;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Term, Literal, PathExpression, PathModifier,
    PatternPredicate, PatternTerm, TriplePattern,
};

// ============================================================================
// Re-exports: Patterns
// ============================================================================

pub use pattern::{MatchMode, PatternId, PatternRegistry, RegistryEntry};

// ============================================================================
// Re-exports: Corpus & Report
// ============================================================================

pub use corpus::{summarize_corpus, CorpusTotals, DocumentFilter, Scanner};
pub use report::{PatternRow, Report, ReportFormat};
pub use config::RecapConfig;

// ============================================================================
// Pipeline
// ============================================================================

/// Build the registry from every query, then scan the corpus once.
///
/// The query set is loaded and parsed in full before the corpus is touched:
/// an unparsable query fails the run without reading any document.
pub fn analyze(config: &RecapConfig) -> Result<Report> {
    config.validate()?;
    let filter = config.document_filter()?;
    let registry = build_registry(config)?;

    let mut scanner = Scanner::new(&registry, &filter, config.match_mode);
    if config.use_predicate_index {
        scanner = scanner.with_predicate_index();
    }
    let scan = scanner.scan(&config.pods, config.jobs)?;

    Ok(Report::finalize(&registry, scan))
}

/// Load, parse and register every query.
pub fn build_registry(config: &RecapConfig) -> Result<PatternRegistry> {
    let queries = query::load_queries(&config.queries, &config.query_extensions, &config.exclusions)?;

    let mut registry = PatternRegistry::new();
    let mut extracted = 0;
    for query in &queries {
        extracted += registry.add_query(&query.id, &query.algebra);
    }
    info!(
        "Extracted {extracted} patterns ({} unique) from {} queries",
        registry.len(),
        registry.total_queries()
    );
    Ok(registry)
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SPARQL syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Invalid query {id} in {}: {source}", file.display())]
    InvalidQuery {
        id: String,
        file: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Malformed document {}:{line}: {message}", path.display())]
    Document { path: PathBuf, line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! # Triple Patterns
//!
//! Query algebra → raw triples → normalized patterns → registry, plus the
//! matcher that tests data triples against registered patterns.

pub mod extract;
pub mod normalize;
pub mod registry;
pub mod matcher;

pub use extract::{extract_triples, RawTriple};
pub use normalize::{normalize, normalize_term};
pub use registry::{PatternId, PatternRegistry, RegistryEntry};
pub use matcher::{matches, matches_strict, predicate_matches, MatchMode};

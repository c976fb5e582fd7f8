//! Pattern registry — deduplicates normalized patterns across the query set
//! and records which queries contain each one.

use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::model::TriplePattern;
use crate::sparql::Algebra;
use super::extract::extract_triples;
use super::normalize::normalize;

/// Stable index of a registered pattern, assigned in first-seen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub usize);

/// One registered pattern with its canonical rendering.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub pattern: TriplePattern,
    pub rendered: String,
    pub containing_queries: HashSet<String>,
}

/// Insertion-ordered set of unique patterns.
///
/// Structural equality on [`TriplePattern`] decides identity; the rendering is
/// computed once at first registration.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    index: HashMap<TriplePattern, PatternId>,
    entries: Vec<RegistryEntry>,
    queries: HashSet<String>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern as occurring in `query_id`.
    ///
    /// Registering the same pattern for the same query again is a no-op.
    pub fn register(&mut self, query_id: &str, pattern: TriplePattern) -> PatternId {
        self.queries.insert(query_id.to_owned());
        let id = match self.index.get(&pattern) {
            Some(&id) => id,
            None => {
                let id = PatternId(self.entries.len());
                self.entries.push(RegistryEntry {
                    rendered: pattern.to_string(),
                    pattern: pattern.clone(),
                    containing_queries: HashSet::new(),
                });
                self.index.insert(pattern, id);
                id
            }
        };
        self.entries[id.0].containing_queries.insert(query_id.to_owned());
        id
    }

    /// Extract, normalize and register every pattern of one parsed query.
    ///
    /// The query counts toward [`total_queries`](Self::total_queries) even
    /// when it yields no patterns. Returns the number of patterns seen,
    /// duplicates included.
    pub fn add_query(&mut self, query_id: &str, algebra: &Algebra) -> usize {
        self.queries.insert(query_id.to_owned());
        let raw = extract_triples(query_id, algebra);
        let seen = raw.len();
        for triple in raw {
            self.register(query_id, normalize(triple));
        }
        debug!(query = query_id, patterns = seen, "Registered query patterns");
        seen
    }

    pub fn get(&self, id: PatternId) -> Option<&RegistryEntry> {
        self.entries.get(id.0)
    }

    pub fn lookup(&self, pattern: &TriplePattern) -> Option<PatternId> {
        self.index.get(pattern).copied()
    }

    /// Entries in first-seen order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &RegistryEntry)> {
        self.entries.iter().enumerate().map(|(i, entry)| (PatternId(i), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct queries processed.
    pub fn total_queries(&self) -> usize {
        self.queries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PathExpression, PatternTerm, Term};
    use crate::sparql;

    fn pattern(predicate: &str) -> TriplePattern {
        TriplePattern::new(
            PatternTerm::Variable,
            PathExpression::direct(predicate),
            PatternTerm::Variable,
        )
    }

    #[test]
    fn test_register_deduplicates() {
        let mut registry = PatternRegistry::new();
        let a = registry.register("q-0", pattern("http://x/p"));
        let b = registry.register("q-1", pattern("http://x/p"));
        let c = registry.register("q-1", pattern("http://x/q"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a).unwrap().containing_queries.len(), 2);
        assert_eq!(registry.total_queries(), 2);
    }

    #[test]
    fn test_same_query_counted_once() {
        let mut registry = PatternRegistry::new();
        registry.register("q-0", pattern("http://x/p"));
        registry.register("q-0", pattern("http://x/p"));
        assert_eq!(registry.entries()[0].containing_queries.len(), 1);
    }

    #[test]
    fn test_insertion_order_kept() {
        let mut registry = PatternRegistry::new();
        registry.register("q-0", pattern("http://x/z"));
        registry.register("q-0", pattern("http://x/a"));
        let rendered: Vec<&str> = registry.entries().iter().map(|e| e.rendered.as_str()).collect();
        assert_eq!(rendered, ["?s <http://x/z> ?o", "?s <http://x/a> ?o"]);
    }

    #[test]
    fn test_add_query_counts_patternless_queries() {
        let mut registry = PatternRegistry::new();
        let algebra = sparql::parse("ASK { <http://a> <http://x/p> \"v\" }").unwrap();
        assert_eq!(registry.add_query("q-0", &algebra), 1);
        let empty = sparql::parse("DESCRIBE <http://a>").unwrap();
        assert_eq!(registry.add_query("q-1", &empty), 0);
        assert_eq!(registry.total_queries(), 2);
        assert_eq!(registry.len(), 1);
        let entry = &registry.entries()[0];
        assert_eq!(entry.pattern.subject, PatternTerm::Constant(Term::iri("http://a")));
        assert!(registry.lookup(&entry.pattern).is_some());
    }
}

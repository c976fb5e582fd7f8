//! Predicate index over registered patterns.

use hashbrown::HashMap;

use crate::model::{PathExpression, PatternPredicate};
use crate::pattern::{PatternId, PatternRegistry};

/// `Direct` patterns bucketed by predicate IRI. Variable-predicate patterns
/// are left out since they never match. Every other pattern is a candidate
/// for every triple.
#[derive(Debug, Default)]
pub struct PredicateIndex {
    by_predicate: HashMap<String, Vec<PatternId>>,
    unindexed: Vec<PatternId>,
}

impl PredicateIndex {
    pub fn build(registry: &PatternRegistry) -> Self {
        let mut index = Self::default();
        for (id, entry) in registry.iter() {
            match &entry.pattern.predicate {
                PatternPredicate::Variable => {}
                PatternPredicate::Path(PathExpression::Direct(iri)) => {
                    index.by_predicate.entry(iri.clone()).or_default().push(id)
                }
                PatternPredicate::Path(_) => index.unindexed.push(id),
            }
        }
        index
    }

    /// Patterns that may match a triple with this predicate.
    pub fn candidates<'a>(&'a self, predicate: &str) -> impl Iterator<Item = PatternId> + 'a {
        self.by_predicate
            .get(predicate)
            .into_iter()
            .flatten()
            .chain(self.unindexed.iter())
            .copied()
    }

    pub fn indexed_predicates(&self) -> usize {
        self.by_predicate.len()
    }
}

//! Normalized triple patterns — the registry key type.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::path::PathExpression;
use super::term::Term;

/// A subject or object slot of a normalized pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternTerm {
    /// Matches any term. Variable names and blank-node labels are not kept.
    Variable,
    /// An IRI or literal, compared by equality.
    Constant(Term),
}

impl PatternTerm {
    pub fn is_variable(&self) -> bool {
        matches!(self, PatternTerm::Variable)
    }

    pub fn matches(&self, term: &Term) -> bool {
        match self {
            PatternTerm::Variable => true,
            PatternTerm::Constant(value) => value == term,
        }
    }

    fn fmt_slot(&self, f: &mut fmt::Formatter<'_>, slot: &str) -> fmt::Result {
        match self {
            PatternTerm::Variable => write!(f, "?{slot}"),
            PatternTerm::Constant(term) => write!(f, "{term}"),
        }
    }
}

/// The predicate slot of a normalized pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternPredicate {
    /// `?s ?p ?o`. Recorded and counted per query, never matched against data.
    Variable,
    Path(PathExpression),
}

impl PatternPredicate {
    pub fn as_path(&self) -> Option<&PathExpression> {
        match self {
            PatternPredicate::Variable => None,
            PatternPredicate::Path(path) => Some(path),
        }
    }
}

impl From<PathExpression> for PatternPredicate {
    fn from(path: PathExpression) -> Self {
        PatternPredicate::Path(path)
    }
}

impl fmt::Display for PatternPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternPredicate::Variable => f.write_str("?p"),
            PatternPredicate::Path(path) => write!(f, "{path}"),
        }
    }
}

/// A canonical triple pattern.
///
/// Derived `Eq`/`Hash` are the structural key: two patterns that differ only
/// in variable or blank-node names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternPredicate,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(subject: PatternTerm, predicate: impl Into<PatternPredicate>, object: PatternTerm) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

/// Canonical rendering: `?s <p> ?o`, with constants in N-Triples form.
impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.subject.fmt_slot(f, "s")?;
        write!(f, " {} ", self.predicate)?;
        self.object.fmt_slot(f, "o")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_canonical_slots() {
        let pattern = TriplePattern::new(
            PatternTerm::Variable,
            PathExpression::direct("http://x/p"),
            PatternTerm::Constant(Term::literal("v")),
        );
        assert_eq!(pattern.to_string(), "?s <http://x/p> \"v\"");

        let pattern = TriplePattern::new(
            PatternTerm::Constant(Term::iri("http://a")),
            PathExpression::direct("http://x/p"),
            PatternTerm::Variable,
        );
        assert_eq!(pattern.to_string(), "<http://a> <http://x/p> ?o");

        let pattern = TriplePattern::new(PatternTerm::Variable, PatternPredicate::Variable, PatternTerm::Variable);
        assert_eq!(pattern.to_string(), "?s ?p ?o");
    }

    #[test]
    fn test_variable_matches_anything() {
        assert!(PatternTerm::Variable.matches(&Term::blank("x")));
        assert!(PatternTerm::Constant(Term::iri("http://a")).matches(&Term::iri("http://a")));
        assert!(!PatternTerm::Constant(Term::iri("http://a")).matches(&Term::literal("http://a")));
    }
}
